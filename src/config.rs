//! Configuration types for Kai.
//!
//! Loaded from TOML; every section falls back to defaults for missing fields,
//! so an empty file is a valid configuration.

use crate::error::{KaiError, Result};
use crate::prompt;
use kai_search::SearchEngine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Hard cap on web search results merged into one turn.
pub const MAX_SEARCH_RESULTS: usize = 5;

/// Pages read per upload. Only the leading pages are ever parsed.
pub const DOCUMENT_PAGE_RANGE: RangeInclusive<usize> = 3..=5;

/// Characters of a document extract merged into one turn.
pub const MERGE_BUDGET_RANGE: RangeInclusive<usize> = 2000..=3000;

/// Reasoning depth for a turn.
///
/// Selects both the backend model and the persona template.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Default conversational model, quick replies.
    #[default]
    Fast,
    /// Reasoning model: slower, step-by-step answers.
    Deep,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Deep => write!(f, "deep"),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KaiConfig {
    /// Chat-completion backend.
    pub completion: CompletionConfig,
    /// Web search provider.
    pub search: WebSearchConfig,
    /// Uploaded document extraction.
    pub document: DocumentConfig,
    /// Text recognition on captured images.
    pub vision: VisionConfig,
    /// Spoken replies.
    pub speech: SpeechConfig,
    /// Persona prompts and greeting.
    pub persona: PersonaConfig,
    /// Where the API key is resolved from.
    pub credentials: CredentialsConfig,
}

/// Chat-completion backend settings (OpenAI-compatible API).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// Base URL of the API. `/chat/completions` is appended.
    pub base_url: String,
    /// Model used in [`Mode::Fast`].
    pub fast_model: String,
    /// Model used in [`Mode::Deep`].
    pub deep_model: String,
    /// Request timeout in seconds. Reasoning replies can take minutes.
    pub timeout_seconds: u64,
    /// Sampling temperature. `None` uses the provider default.
    pub temperature: Option<f64>,
    /// Maximum tokens per reply. `None` uses the provider default.
    pub max_tokens: Option<u32>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com".to_owned(),
            fast_model: "deepseek-chat".to_owned(),
            deep_model: "deepseek-reasoner".to_owned(),
            timeout_seconds: 180,
            temperature: None,
            max_tokens: None,
        }
    }
}

impl CompletionConfig {
    /// Model identifier for the given mode.
    pub fn model_for(&self, mode: Mode) -> &str {
        match mode {
            Mode::Fast => &self.fast_model,
            Mode::Deep => &self.deep_model,
        }
    }
}

/// Web search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSearchConfig {
    /// Whether new sessions start with search switched on.
    pub enabled_by_default: bool,
    /// Results requested per query (1..=5).
    pub max_results: usize,
    /// Engines tried in order until one answers.
    pub engines: Vec<SearchEngine>,
    /// Per-engine timeout in seconds.
    pub timeout_seconds: u64,
    /// Request safe-search filtering.
    pub safe_search: bool,
    /// Result cache lifetime in seconds. 0 disables caching.
    pub cache_ttl_seconds: u64,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            enabled_by_default: false,
            max_results: MAX_SEARCH_RESULTS,
            engines: SearchEngine::all().to_vec(),
            timeout_seconds: 8,
            safe_search: true,
            cache_ttl_seconds: 600,
        }
    }
}

impl WebSearchConfig {
    /// Build the search crate's configuration from these settings.
    pub fn to_search_config(&self) -> kai_search::SearchConfig {
        kai_search::SearchConfig {
            engines: self.engines.clone(),
            max_results: self.max_results.min(MAX_SEARCH_RESULTS),
            timeout_seconds: self.timeout_seconds,
            safe_search: self.safe_search,
            cache_ttl_seconds: self.cache_ttl_seconds,
            ..Default::default()
        }
    }
}

/// Uploaded document settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Leading pages read per upload (3..=5). Later pages are never read.
    pub max_pages: usize,
    /// Characters of the extract merged into each turn's instruction (2000..=3000).
    pub merge_budget_chars: usize,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            max_pages: 3,
            merge_budget_chars: 2500,
        }
    }
}

/// Text recognition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Recognizer language packs, in preference order.
    pub languages: Vec<String>,
    /// Explicit path to the `tesseract` binary. `None` searches `PATH`.
    pub tesseract_path: Option<PathBuf>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            languages: vec!["chi_sim".to_owned(), "eng".to_owned()],
            tesseract_path: None,
        }
    }
}

/// Spoken reply settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Whether new sessions speak replies.
    pub enabled: bool,
    /// Synthesis locale, e.g. `zh-CN`.
    pub locale: String,
    /// Characters of the reply sent to the synthesizer.
    pub max_chars: usize,
    /// Synthesis endpoint.
    pub endpoint: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            locale: "zh-CN".to_owned(),
            max_chars: 100,
            endpoint: "https://translate.google.com/translate_tts".to_owned(),
            timeout_seconds: 15,
        }
    }
}

/// Persona prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Display name of the assistant (used in transcripts).
    pub name: String,
    /// Assistant greeting seeded into every new conversation.
    pub greeting: String,
    /// Persona used in [`Mode::Fast`].
    pub fast_prompt: String,
    /// Persona used in [`Mode::Deep`].
    pub deep_prompt: String,
    /// Optional free-text appended after the persona.
    pub user_addon: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: prompt::DEFAULT_PERSONA_NAME.to_owned(),
            greeting: prompt::DEFAULT_GREETING.to_owned(),
            fast_prompt: prompt::FAST_PERSONA.to_owned(),
            deep_prompt: prompt::DEEP_PERSONA.to_owned(),
            user_addon: String::new(),
        }
    }
}

impl PersonaConfig {
    /// Persona template for the given mode.
    pub fn template_for(&self, mode: Mode) -> &str {
        match mode {
            Mode::Fast => &self.fast_prompt,
            Mode::Deep => &self.deep_prompt,
        }
    }
}

/// API key resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Environment variable checked first.
    pub env_var: String,
    /// Keyring service name.
    pub keyring_service: String,
    /// Keyring account name.
    pub keyring_account: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            env_var: "DEEPSEEK_API_KEY".to_owned(),
            keyring_service: "kai".to_owned(),
            keyring_account: "deepseek.api_key".to_owned(),
        }
    }
}

impl KaiConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content).map_err(|e| KaiError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| KaiError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default config file path: `<config dir>/kai/config.toml`.
    ///
    /// `KAI_CONFIG_DIR` overrides the directory.
    pub fn default_config_path() -> PathBuf {
        if let Some(dir) = std::env::var_os("KAI_CONFIG_DIR") {
            return PathBuf::from(dir).join("config.toml");
        }
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("kai")
            .join("config.toml")
    }

    /// Check value ranges that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`KaiError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let c = &self.completion;
        if c.base_url.trim().is_empty() {
            return Err(config_err("completion.base_url must not be empty"));
        }
        if c.fast_model.trim().is_empty() || c.deep_model.trim().is_empty() {
            return Err(config_err("completion models must not be empty"));
        }
        if c.timeout_seconds == 0 {
            return Err(config_err("completion.timeout_seconds must be greater than 0"));
        }

        let s = &self.search;
        if s.max_results == 0 || s.max_results > MAX_SEARCH_RESULTS {
            return Err(KaiError::Config(format!(
                "search.max_results must be between 1 and {MAX_SEARCH_RESULTS}"
            )));
        }
        if s.engines.is_empty() {
            return Err(config_err("search.engines must list at least one engine"));
        }
        if s.timeout_seconds == 0 {
            return Err(config_err("search.timeout_seconds must be greater than 0"));
        }

        let d = &self.document;
        if !DOCUMENT_PAGE_RANGE.contains(&d.max_pages) {
            return Err(KaiError::Config(format!(
                "document.max_pages must be between {} and {}",
                DOCUMENT_PAGE_RANGE.start(),
                DOCUMENT_PAGE_RANGE.end()
            )));
        }
        if !MERGE_BUDGET_RANGE.contains(&d.merge_budget_chars) {
            return Err(KaiError::Config(format!(
                "document.merge_budget_chars must be between {} and {}",
                MERGE_BUDGET_RANGE.start(),
                MERGE_BUDGET_RANGE.end()
            )));
        }

        if self.vision.languages.is_empty() {
            return Err(config_err("vision.languages must not be empty"));
        }

        if self.speech.max_chars == 0 {
            return Err(config_err("speech.max_chars must be greater than 0"));
        }

        if self.persona.greeting.trim().is_empty() {
            return Err(config_err("persona.greeting must not be empty"));
        }
        Ok(())
    }
}

fn config_err(message: &str) -> KaiError {
    KaiError::Config(message.to_owned())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = KaiConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.max_results, 5);
        assert_eq!(config.document.max_pages, 3);
        assert_eq!(config.document.merge_budget_chars, 2500);
        assert_eq!(config.speech.max_chars, 100);
        assert!(!config.search.enabled_by_default);
    }

    #[test]
    fn model_for_mode() {
        let c = CompletionConfig::default();
        assert_eq!(c.model_for(Mode::Fast), "deepseek-chat");
        assert_eq!(c.model_for(Mode::Deep), "deepseek-reasoner");
    }

    #[test]
    fn persona_template_differs_by_mode() {
        let p = PersonaConfig::default();
        assert_ne!(p.template_for(Mode::Fast), p.template_for(Mode::Deep));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut config = KaiConfig::default();
        config.completion.deep_model = "custom-reasoner".to_owned();
        config.document.merge_budget_chars = 2000;
        config.search.engines = vec![SearchEngine::Bing];

        config.save_to_file(&path).expect("save");
        let loaded = KaiConfig::from_file(&path).expect("load");
        assert_eq!(loaded.completion.deep_model, "custom-reasoner");
        assert_eq!(loaded.document.merge_budget_chars, 2000);
        assert_eq!(loaded.search.engines, vec![SearchEngine::Bing]);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: KaiConfig = toml::from_str(
            r#"
            [speech]
            locale = "en"
            "#,
        )
        .unwrap();
        assert_eq!(config.speech.locale, "en");
        assert_eq!(config.speech.max_chars, 100);
        assert_eq!(config.completion.fast_model, "deepseek-chat");
    }

    #[test]
    fn mode_serializes_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: Mode,
        }
        let w: Wrapper = toml::from_str(r#"mode = "deep""#).unwrap();
        assert_eq!(w.mode, Mode::Deep);
        assert_eq!(Mode::Fast.to_string(), "fast");
    }

    #[test]
    fn from_file_nonexistent_returns_error() {
        let result = KaiConfig::from_file(Path::new("/nonexistent/kai/config.toml"));
        assert!(matches!(result, Err(KaiError::Io(_))));
    }

    #[test]
    fn from_file_invalid_toml_returns_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid toml {{{").unwrap();
        assert!(matches!(KaiConfig::from_file(&path), Err(KaiError::Config(_))));
    }

    #[test]
    fn too_many_search_results_rejected() {
        let mut config = KaiConfig::default();
        config.search.max_results = 6;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("search.max_results"));
    }

    #[test]
    fn too_many_pages_rejected() {
        let mut config = KaiConfig::default();
        config.document.max_pages = 10;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("document.max_pages"));
    }

    #[test]
    fn too_few_pages_rejected() {
        let mut config = KaiConfig::default();
        config.document.max_pages = 1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("between 3 and 5"));
    }

    #[test]
    fn merge_budget_outside_range_rejected() {
        for budget in [0, 1999, 3001, 10_000] {
            let mut config = KaiConfig::default();
            config.document.merge_budget_chars = budget;
            let err = config.validate().unwrap_err();
            assert!(
                err.to_string().contains("document.merge_budget_chars"),
                "budget {budget}: {err}"
            );
        }
        for budget in [2000, 3000] {
            let mut config = KaiConfig::default();
            config.document.merge_budget_chars = budget;
            assert!(config.validate().is_ok(), "budget {budget}");
        }
    }

    #[test]
    fn empty_greeting_rejected() {
        let mut config = KaiConfig::default();
        config.persona.greeting = "  ".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn search_config_conversion_caps_results() {
        let settings = WebSearchConfig {
            max_results: 50,
            ..Default::default()
        };
        let converted = settings.to_search_config();
        assert_eq!(converted.max_results, MAX_SEARCH_RESULTS);
        assert!(converted.validate().is_ok());
    }

    #[test]
    fn default_config_path_ends_with_config_toml() {
        let path = KaiConfig::default_config_path();
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }
}

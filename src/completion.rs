//! Chat-completion dispatch.
//!
//! One non-streaming request per turn: the per-turn instruction as the
//! leading `system` message followed by the whole conversation. No retries.

use crate::config::{CompletionConfig, Mode};
use crate::conversation::{Conversation, Turn};
use crate::credentials::Credential;
use crate::error::{KaiError, error_chain};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// A completed reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Answer text.
    pub content: String,
    /// Chain of thought from reasoning models. Shown, never stored.
    pub reasoning: Option<String>,
    /// Model that produced the reply, as reported by the backend.
    pub model: String,
}

/// Backend failures.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// The request never got a response (DNS, TLS, timeout, ...).
    #[error("request failed: {0}")]
    Request(String),

    /// Non-success status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Status code.
        status: u16,
        /// Provider error message, or the raw body.
        message: String,
    },

    /// The response body was not a usable completion.
    #[error("invalid response: {0}")]
    Parse(String),
}

impl From<CompletionError> for KaiError {
    fn from(e: CompletionError) -> Self {
        KaiError::Backend(e.to_string())
    }
}

/// A chat-completion service.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Complete `messages` with `model_id`.
    async fn complete(
        &self,
        credential: &Credential,
        model_id: &str,
        messages: &[Turn],
    ) -> Result<Reply, CompletionError>;
}

/// OpenAI-compatible `/chat/completions` client (DeepSeek by default).
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    base_url: String,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
}

impl OpenAiCompatibleBackend {
    /// Client for the configured base URL.
    ///
    /// # Errors
    ///
    /// Returns [`KaiError::Config`] if the HTTP client cannot be built.
    pub fn from_config(config: &CompletionConfig) -> Result<Self, KaiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| KaiError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

/// JSON body for a non-streaming chat completion.
pub fn build_request(
    model: &str,
    messages: &[Turn],
    temperature: Option<f64>,
    max_tokens: Option<u32>,
) -> serde_json::Value {
    let messages: Vec<serde_json::Value> = messages
        .iter()
        .map(|turn| {
            serde_json::json!({
                "role": turn.role.as_str(),
                "content": turn.content,
            })
        })
        .collect();

    let mut body = serde_json::json!({
        "model": model,
        "messages": messages,
        "stream": false,
    });
    if let Some(obj) = body.as_object_mut() {
        if let Some(temperature) = temperature {
            obj.insert("temperature".into(), serde_json::json!(temperature));
        }
        if let Some(max_tokens) = max_tokens {
            obj.insert("max_tokens".into(), serde_json::json!(max_tokens));
        }
    }
    body
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

/// Parse a chat-completion response body.
///
/// # Errors
///
/// [`CompletionError::Parse`] for malformed JSON or a response with no choices.
pub fn parse_response(body: &str, requested_model: &str) -> Result<Reply, CompletionError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Parse(e.to_string()))?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CompletionError::Parse("response contained no choices".into()))?;
    Ok(Reply {
        content: choice.message.content.unwrap_or_default(),
        reasoning: choice
            .message
            .reasoning_content
            .filter(|r| !r.trim().is_empty()),
        model: response.model.unwrap_or_else(|| requested_model.to_owned()),
    })
}

/// Pull `error.message` out of an error body, falling back to the raw text.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_owned())
}

#[async_trait]
impl CompletionBackend for OpenAiCompatibleBackend {
    async fn complete(
        &self,
        credential: &Credential,
        model_id: &str,
        messages: &[Turn],
    ) -> Result<Reply, CompletionError> {
        let body = build_request(model_id, messages, self.temperature, self.max_tokens);
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::Request(error_chain(&e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| {
                CompletionError::Request(format!("failed to read body: {}", error_chain(&e)))
            })?;
        if !status.is_success() {
            return Err(CompletionError::Http {
                status: status.as_u16(),
                message: extract_error_message(&text),
            });
        }
        parse_response(&text, model_id)
    }
}

/// Selects the model for a mode and sends the turn.
#[derive(Clone)]
pub struct Dispatcher {
    backend: Arc<dyn CompletionBackend>,
    config: CompletionConfig,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("fast_model", &self.config.fast_model)
            .field("deep_model", &self.config.deep_model)
            .finish()
    }
}

impl Dispatcher {
    /// Dispatcher sending through `backend`.
    pub fn new(backend: Arc<dyn CompletionBackend>, config: CompletionConfig) -> Self {
        Self { backend, config }
    }

    /// Model id used for `mode`.
    pub fn model_for(&self, mode: Mode) -> &str {
        self.config.model_for(mode)
    }

    /// Send `instruction` plus the full conversation.
    ///
    /// # Errors
    ///
    /// [`KaiError::Auth`] when `credential` is `None` (nothing is sent);
    /// [`KaiError::Backend`] when the call fails.
    pub async fn dispatch(
        &self,
        instruction: &str,
        conversation: &Conversation,
        mode: Mode,
        credential: Option<&Credential>,
    ) -> Result<Reply, KaiError> {
        let credential = credential.ok_or_else(missing_credential)?;
        let model = self.model_for(mode);

        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(Turn::system(instruction));
        messages.extend(conversation.turns().iter().cloned());

        tracing::debug!(model, messages = messages.len(), "dispatching completion");
        let reply = self
            .backend
            .complete(credential, model, &messages)
            .await
            .inspect_err(|e| tracing::warn!(model, error = %e, "completion failed"))?;
        Ok(reply)
    }
}

pub(crate) fn missing_credential() -> KaiError {
    KaiError::Auth("no API key configured; set DEEPSEEK_API_KEY or provide a key".into())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use std::sync::Mutex;

    #[test]
    fn request_body_has_messages_in_order() {
        let messages = vec![
            Turn::system("persona"),
            Turn::assistant("hi"),
            Turn::user("question"),
        ];
        let body = build_request("deepseek-chat", &messages, None, None);
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["stream"], false);
        let roles: Vec<&str> = body["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, ["system", "assistant", "user"]);
        assert!(body.get("temperature").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn request_body_optional_fields() {
        let body = build_request("m", &[], Some(0.7), Some(512));
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["max_tokens"], 512);
    }

    #[test]
    fn parse_response_with_reasoning() {
        let body = r#"{
            "model": "deepseek-reasoner",
            "choices": [{"message": {"role": "assistant", "content": "42", "reasoning_content": "think"}}]
        }"#;
        let reply = parse_response(body, "requested").unwrap();
        assert_eq!(reply.content, "42");
        assert_eq!(reply.reasoning.as_deref(), Some("think"));
        assert_eq!(reply.model, "deepseek-reasoner");
    }

    #[test]
    fn parse_response_falls_back_to_requested_model() {
        let body = r#"{"choices": [{"message": {"content": "hi"}}]}"#;
        let reply = parse_response(body, "deepseek-chat").unwrap();
        assert_eq!(reply.model, "deepseek-chat");
        assert!(reply.reasoning.is_none());
    }

    #[test]
    fn parse_response_without_choices_fails() {
        let err = parse_response(r#"{"choices": []}"#, "m").unwrap_err();
        assert!(matches!(err, CompletionError::Parse(_)));
    }

    #[test]
    fn error_message_extraction() {
        assert_eq!(
            extract_error_message(r#"{"error": {"message": "Insufficient Balance"}}"#),
            "Insufficient Balance"
        );
        assert_eq!(extract_error_message("gateway timeout\n"), "gateway timeout");
    }

    #[test]
    fn completion_error_becomes_backend_error() {
        let err: KaiError = CompletionError::Http {
            status: 402,
            message: "Insufficient Balance".into(),
        }
        .into();
        assert_eq!(err.code(), "BACKEND_FAILED");
        assert!(err.to_string().contains("HTTP 402: Insufficient Balance"));
    }

    struct Recording {
        seen: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl CompletionBackend for Recording {
        async fn complete(
            &self,
            _: &Credential,
            model_id: &str,
            messages: &[Turn],
        ) -> Result<Reply, CompletionError> {
            self.seen
                .lock()
                .unwrap()
                .push((model_id.to_owned(), messages.len()));
            Ok(Reply {
                content: "ok".into(),
                reasoning: None,
                model: model_id.to_owned(),
            })
        }
    }

    #[tokio::test]
    async fn dispatch_selects_model_by_mode() {
        let backend = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
        });
        let dispatcher = Dispatcher::new(backend.clone(), CompletionConfig::default());
        let conv = Conversation::new("hi");
        let key = Credential::new("sk-test");

        dispatcher
            .dispatch("p", &conv, Mode::Fast, key.as_ref())
            .await
            .unwrap();
        dispatcher
            .dispatch("p", &conv, Mode::Deep, key.as_ref())
            .await
            .unwrap();

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0], ("deepseek-chat".to_owned(), 2));
        assert_eq!(seen[1], ("deepseek-reasoner".to_owned(), 2));
    }

    #[tokio::test]
    async fn dispatch_without_credential_sends_nothing() {
        let backend = Arc::new(Recording {
            seen: Mutex::new(Vec::new()),
        });
        let dispatcher = Dispatcher::new(backend.clone(), CompletionConfig::default());
        let err = dispatcher
            .dispatch("p", &Conversation::new("hi"), Mode::Fast, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "AUTH_MISSING");
        assert!(backend.seen.lock().unwrap().is_empty());
    }
}

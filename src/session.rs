//! Turn orchestration.
//!
//! [`Kai`] holds the collaborators shared by every session (completion
//! backend, search, document reader, recognizer, speech). [`Session`] holds
//! one user's state. A turn borrows the session mutably, so turns on one
//! session are strictly sequential.

use crate::completion::{CompletionBackend, Dispatcher, OpenAiCompatibleBackend, missing_credential};
use crate::config::{KaiConfig, Mode};
use crate::conversation::{Conversation, Turn};
use crate::credentials::Credential;
use crate::error::{AuxiliaryError, KaiError};
use crate::input::{CandidateInputs, InputSource, resolve_active_input};
use crate::prompt;
use crate::signals::document::{self, DocumentExtract, DocumentReader, PdfReader};
use crate::signals::search::{self, SearchBackend, WebSearch};
use crate::signals::vision::{ImageTextProvider, RecognizerFactory};
use crate::signals::{AuxiliarySignal, Gathered, SignalKind};
use crate::speech::{GoogleTranslateSpeech, SpeechRenderer, SpeechSynthesizer};
use bytes::Bytes;
use std::sync::Arc;
use uuid::Uuid;

/// One user's conversation state.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    conversation: Conversation,
    web_search: bool,
    speech: bool,
    document: Option<DocumentExtract>,
    pending_image_text: Option<String>,
    credential: Option<Credential>,
}

impl Session {
    /// Identifier used in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The conversation so far.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Whether web search runs on each turn.
    pub fn web_search(&self) -> bool {
        self.web_search
    }

    /// Switch web search on or off for later turns.
    pub fn set_web_search(&mut self, enabled: bool) {
        self.web_search = enabled;
    }

    /// Whether replies are spoken.
    pub fn speech(&self) -> bool {
        self.speech
    }

    /// Switch spoken replies on or off.
    pub fn set_speech(&mut self, enabled: bool) {
        self.speech = enabled;
    }

    /// The cached extract of the last successful upload.
    pub fn document(&self) -> Option<&DocumentExtract> {
        self.document.as_ref()
    }

    /// Forget the uploaded document.
    pub fn clear_document(&mut self) {
        self.document = None;
    }

    /// Text from the last capture, waiting for the next turn.
    pub fn pending_image_text(&self) -> Option<&str> {
        self.pending_image_text.as_deref()
    }

    /// Replace the session credential.
    pub fn set_credential(&mut self, credential: Option<Credential>) {
        self.credential = credential;
    }

    /// Whether a credential is resolved.
    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Reset the conversation to its greeting and drop pending image text.
    ///
    /// Toggles, the uploaded document and the credential are kept.
    pub fn clear(&mut self) {
        self.conversation.clear();
        self.pending_image_text = None;
        tracing::info!(session = %self.id, "conversation cleared");
    }
}

/// Input for one turn.
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    /// Competing inputs; one is chosen by priority.
    pub inputs: CandidateInputs,
    /// Reasoning depth.
    pub mode: Mode,
}

impl TurnRequest {
    /// Typed text in `mode`.
    pub fn typed(text: impl Into<String>, mode: Mode) -> Self {
        Self {
            inputs: CandidateInputs::typed(text),
            mode,
        }
    }

    /// Voice transcript in `mode`.
    pub fn voice(text: impl Into<String>, mode: Mode) -> Self {
        Self {
            inputs: CandidateInputs::voice(text),
            mode,
        }
    }
}

/// Result of a completed turn.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Reply text, as stored in the conversation.
    pub reply: String,
    /// Chain of thought, when the model reports one. Not stored.
    pub reasoning: Option<String>,
    /// Model that answered.
    pub model: String,
    /// Mode the turn ran in.
    pub mode: Mode,
    /// Which input drove the turn.
    pub input_source: InputSource,
    /// Signals merged into the instruction.
    pub signals: Vec<SignalKind>,
    /// Audio for the reply prefix, if speech is on and synthesis worked.
    pub audio: Option<Bytes>,
    /// Auxiliary failures that were skipped.
    pub diagnostics: Vec<String>,
}

/// The conversational engine.
///
/// Cheap to share behind an [`Arc`]; holds no per-user state.
pub struct Kai {
    config: KaiConfig,
    dispatcher: Dispatcher,
    search: Arc<dyn SearchBackend>,
    documents: Arc<dyn DocumentReader>,
    vision: ImageTextProvider,
    speech: SpeechRenderer,
}

impl std::fmt::Debug for Kai {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Kai")
            .field("dispatcher", &self.dispatcher)
            .field("vision", &self.vision)
            .field("speech", &self.speech)
            .finish_non_exhaustive()
    }
}

impl Kai {
    /// Engine with the default collaborators: OpenAI-compatible completion,
    /// embedded web search, `lopdf` documents, Tesseract recognition and
    /// Google Translate speech.
    ///
    /// # Errors
    ///
    /// Returns [`KaiError::Config`] if `config` is invalid or an HTTP client
    /// cannot be built.
    pub fn from_config(config: KaiConfig) -> Result<Self, KaiError> {
        config.validate()?;
        let completion = OpenAiCompatibleBackend::from_config(&config.completion)?;
        let speech = GoogleTranslateSpeech::from_config(&config.speech)?;
        Ok(Self {
            dispatcher: Dispatcher::new(Arc::new(completion), config.completion.clone()),
            search: Arc::new(WebSearch::new(config.search.to_search_config())),
            documents: Arc::new(PdfReader),
            vision: ImageTextProvider::tesseract(&config.vision),
            speech: SpeechRenderer::new(Arc::new(speech), &config.speech),
            config,
        })
    }

    /// Replace the completion backend.
    #[must_use]
    pub fn with_completion_backend(mut self, backend: Arc<dyn CompletionBackend>) -> Self {
        self.dispatcher = Dispatcher::new(backend, self.config.completion.clone());
        self
    }

    /// Replace the search backend.
    #[must_use]
    pub fn with_search_backend(mut self, backend: Arc<dyn SearchBackend>) -> Self {
        self.search = backend;
        self
    }

    /// Replace the document reader.
    #[must_use]
    pub fn with_document_reader(mut self, reader: Arc<dyn DocumentReader>) -> Self {
        self.documents = reader;
        self
    }

    /// Replace how the text recognizer is built.
    #[must_use]
    pub fn with_recognizer_factory(mut self, factory: impl RecognizerFactory + 'static) -> Self {
        self.vision = ImageTextProvider::new(factory);
        self
    }

    /// Replace the speech synthesizer.
    #[must_use]
    pub fn with_speech_synthesizer(mut self, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        self.speech = SpeechRenderer::new(synthesizer, &self.config.speech);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &KaiConfig {
        &self.config
    }

    /// Start a session. Toggles take their configured defaults.
    pub fn new_session(&self, credential: Option<Credential>) -> Session {
        let session = Session {
            id: Uuid::new_v4(),
            conversation: Conversation::new(self.config.persona.greeting.clone()),
            web_search: self.config.search.enabled_by_default,
            speech: self.config.speech.enabled,
            document: None,
            pending_image_text: None,
            credential,
        };
        tracing::info!(
            session = %session.id,
            credential = session.credential.is_some(),
            "session started"
        );
        session
    }

    /// Recognize text in a captured image.
    ///
    /// Recognized text is held in the session until the next turn. There it
    /// is the image-text input candidate, or an instruction block when a
    /// voice transcript wins. Empty or failed recognition leaves the session
    /// unchanged.
    pub async fn capture_image(&self, session: &mut Session, image: &[u8]) -> Gathered {
        let gathered = self.vision.recognize(image).await;
        if let Gathered::Data(signal) = &gathered {
            tracing::info!(
                session = %session.id,
                chars = signal.text.chars().count(),
                "image text captured"
            );
            session.pending_image_text = Some(signal.text.clone());
        }
        gathered
    }

    /// Extract and cache an uploaded document.
    ///
    /// Replaces the previous extract on success. On failure the session is
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns the extraction failure as [`AuxiliaryError::Document`]. It is
    /// a diagnostic for the user, not a turn failure.
    pub async fn upload_document<'s>(
        &self,
        session: &'s mut Session,
        name: &str,
        bytes: &[u8],
    ) -> Result<&'s DocumentExtract, AuxiliaryError> {
        let extract = document::extract(
            self.documents.as_ref(),
            name,
            bytes,
            self.config.document.max_pages,
        )
        .await
        .inspect_err(|e| {
            tracing::warn!(session = %session.id, name, error = %e, "document upload failed");
        })?;
        Ok(session.document.insert(extract))
    }

    /// Run one turn.
    ///
    /// Returns `Ok(None)` when no input is active; nothing else happens then.
    ///
    /// # Errors
    ///
    /// - [`KaiError::Auth`] when the session has no credential. The
    ///   conversation is unchanged.
    /// - [`KaiError::Backend`] when the completion call fails. The user turn
    ///   stays in the conversation so a retry resends the same history.
    pub async fn submit_turn(
        &self,
        session: &mut Session,
        request: TurnRequest,
    ) -> Result<Option<TurnOutcome>, KaiError> {
        let mut candidates = request.inputs;
        if candidates.image_text.is_none() {
            candidates.image_text = session.pending_image_text.clone();
        }
        let Some(active) = resolve_active_input(&candidates) else {
            tracing::debug!(session = %session.id, "no active input, skipping turn");
            return Ok(None);
        };
        if session.credential.is_none() {
            return Err(missing_credential());
        }

        let mode = request.mode;
        let mut signals: Vec<AuxiliarySignal> = Vec::new();
        let mut diagnostics: Vec<String> = Vec::new();
        let mut merge = |gathered: Gathered| match gathered {
            Gathered::Diagnostic(message) => diagnostics.push(message),
            other => signals.extend(other.into_signal()),
        };

        if session.web_search {
            let max_results = self.config.search.max_results;
            merge(search::gather(self.search.as_ref(), &active.text, max_results).await);
        }
        if let Some(extract) = &session.document {
            merge(extract.signal(self.config.document.merge_budget_chars));
        }
        // Captured text already used as the input is not repeated as context.
        if let Some(text) = session.pending_image_text.take() {
            if active.source != InputSource::ImageText {
                merge(Gathered::Data(AuxiliarySignal::new(SignalKind::ImageText, text)));
            }
        }

        let instruction = prompt::assemble(&self.config.persona, mode, &signals);
        let signal_kinds: Vec<SignalKind> = signals.iter().map(|s| s.kind).collect();
        tracing::info!(
            session = %session.id,
            %mode,
            model = self.dispatcher.model_for(mode),
            input = %active.source,
            signals = ?signal_kinds,
            "turn started"
        );

        session.conversation.push(Turn::user(active.user_content()));
        let reply = self
            .dispatcher
            .dispatch(&instruction, &session.conversation, mode, session.credential.as_ref())
            .await?;
        session.conversation.push(Turn::assistant(reply.content.clone()));

        let audio = if session.speech {
            self.speech.render(&reply.content).await
        } else {
            None
        };

        tracing::info!(
            session = %session.id,
            turns = session.conversation.len(),
            audio = audio.is_some(),
            diagnostics = diagnostics.len(),
            "turn completed"
        );

        Ok(Some(TurnOutcome {
            reply: reply.content,
            reasoning: reply.reasoning,
            model: reply.model,
            mode,
            input_source: active.source,
            signals: signal_kinds,
            audio,
            diagnostics,
        }))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Kai>();
        assert_send_sync::<Session>();
    }

    #[test]
    fn new_session_uses_config_defaults() {
        let mut config = KaiConfig::default();
        config.search.enabled_by_default = true;
        config.speech.enabled = false;
        let kai = Kai::from_config(config).unwrap();
        let session = kai.new_session(None);
        assert!(session.web_search());
        assert!(!session.speech());
        assert!(!session.has_credential());
        assert_eq!(session.conversation().len(), 1);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = KaiConfig::default();
        config.document.max_pages = 0;
        assert!(matches!(Kai::from_config(config), Err(KaiError::Config(_))));
    }

    #[test]
    fn clear_keeps_toggles_and_credential() {
        let kai = Kai::from_config(KaiConfig::default()).unwrap();
        let mut session = kai.new_session(Credential::new("sk-test"));
        session.set_web_search(true);
        session.conversation.push(Turn::user("hi"));
        session.pending_image_text = Some("text".into());
        session.clear();
        assert_eq!(session.conversation().len(), 1);
        assert!(session.pending_image_text().is_none());
        assert!(session.web_search());
        assert!(session.has_credential());
    }

    #[tokio::test]
    async fn no_input_is_not_a_turn() {
        let kai = Kai::from_config(KaiConfig::default()).unwrap();
        let mut session = kai.new_session(None);
        let outcome = kai
            .submit_turn(&mut session, TurnRequest::typed("   ", Mode::Fast))
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(session.conversation().len(), 1);
    }
}

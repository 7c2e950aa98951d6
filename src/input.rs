//! Active-input resolution.
//!
//! A turn has exactly one input. When several sources produce text in the
//! same cycle, the highest-priority one wins and the rest are dropped.

use std::fmt;

/// Where an input came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    /// Speech-to-text transcript.
    Voice,
    /// Text recognized in a captured image.
    ImageText,
    /// Typed text.
    Typed,
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Voice => write!(f, "voice"),
            Self::ImageText => write!(f, "image_text"),
            Self::Typed => write!(f, "typed"),
        }
    }
}

/// Resolution order, highest priority first.
pub const INPUT_PRIORITY: &[InputSource] =
    &[InputSource::Voice, InputSource::ImageText, InputSource::Typed];

/// Everything that could drive this turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateInputs {
    /// Voice transcript.
    pub voice: Option<String>,
    /// Recognized image text.
    pub image_text: Option<String>,
    /// Typed text.
    pub typed: Option<String>,
}

impl CandidateInputs {
    /// Only typed text.
    pub fn typed(text: impl Into<String>) -> Self {
        Self {
            typed: Some(text.into()),
            ..Self::default()
        }
    }

    /// Only a voice transcript.
    pub fn voice(text: impl Into<String>) -> Self {
        Self {
            voice: Some(text.into()),
            ..Self::default()
        }
    }

    fn get(&self, source: InputSource) -> Option<&str> {
        match source {
            InputSource::Voice => self.voice.as_deref(),
            InputSource::ImageText => self.image_text.as_deref(),
            InputSource::Typed => self.typed.as_deref(),
        }
    }
}

/// The input chosen for a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveInput {
    /// Which candidate won.
    pub source: InputSource,
    /// Raw text as supplied.
    pub text: String,
}

impl ActiveInput {
    /// Content of the user turn built from this input.
    ///
    /// Image text is framed as a request to process what the camera saw;
    /// other sources are used as-is.
    pub fn user_content(&self) -> String {
        match self.source {
            InputSource::ImageText => frame_image_text(&self.text),
            InputSource::Voice | InputSource::Typed => self.text.clone(),
        }
    }
}

/// Pick the active input by [`INPUT_PRIORITY`]. Blank candidates count as absent.
pub fn resolve_active_input(candidates: &CandidateInputs) -> Option<ActiveInput> {
    INPUT_PRIORITY.iter().find_map(|&source| {
        let text = candidates.get(source)?;
        if text.trim().is_empty() {
            return None;
        }
        Some(ActiveInput {
            source,
            text: text.to_owned(),
        })
    })
}

/// Wrap recognized text as a user request.
pub fn frame_image_text(text: &str) -> String {
    format!("我刚拍了一张照片，里面识别出的文字是：\n---\n{text}\n---\n请帮我处理一下这段文字。")
}

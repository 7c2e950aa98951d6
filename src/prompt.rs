//! Per-turn system instruction assembly.
//!
//! The instruction is rebuilt from scratch every turn: persona template for
//! the mode, optional user add-on, then one labelled block per non-empty
//! auxiliary signal in the fixed order search, document, image text. It is
//! sent as the leading system message and never stored in the conversation.

use crate::config::{Mode, PersonaConfig};
use crate::signals::{AuxiliarySignal, SignalKind};

/// Default assistant name.
pub const DEFAULT_PERSONA_NAME: &str = "程凯";

/// Greeting seeded into every new conversation.
pub const DEFAULT_GREETING: &str = "我是程凯。请问是来聊物理的，还是聊人生的？";

/// Fast-mode persona: a humorous, well-read friend.
pub const FAST_PERSONA: &str = "你是一个幽默、博学且抽象的朋友程凯。说话风趣，不用太严肃。";

/// Deep-mode persona: a rigorous physicist and mathematician.
pub const DEEP_PERSONA: &str = "你是一个严谨的物理学家和数学家。请一步步进行链式推理(Chain of Thought)，不要跳过步骤。如果涉及公式，请使用 LaTeX 格式。";

/// Merge order of signal blocks.
const BLOCK_ORDER: [SignalKind; 3] = [SignalKind::Search, SignalKind::Document, SignalKind::ImageText];

fn block_header(kind: SignalKind, truncated: bool) -> &'static str {
    match (kind, truncated) {
        (SignalKind::Search, _) => "[Web search results]",
        (SignalKind::Document, false) => "[Uploaded document excerpt]",
        (SignalKind::Document, true) => "[Uploaded document excerpt (truncated)]",
        (SignalKind::ImageText, _) => "[Text recognized in the captured image]",
    }
}

/// Build the system instruction for one turn.
///
/// Deterministic for a given input. Signals with blank text add nothing.
/// If a kind appears more than once, only the first is used.
pub fn assemble(persona: &PersonaConfig, mode: Mode, signals: &[AuxiliarySignal]) -> String {
    let mut out = persona.template_for(mode).trim().to_owned();

    let addon = persona.user_addon.trim();
    if !addon.is_empty() {
        out.push_str("\n\n");
        out.push_str(addon);
    }

    for kind in BLOCK_ORDER {
        let Some(signal) = signals.iter().find(|s| s.kind == kind) else {
            continue;
        };
        let text = signal.text.trim();
        if text.is_empty() {
            continue;
        }
        out.push_str("\n\n");
        out.push_str(block_header(kind, signal.truncated));
        out.push('\n');
        out.push_str(text);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn persona() -> PersonaConfig {
        PersonaConfig::default()
    }

    #[test]
    fn no_signals_is_persona_only() {
        assert_eq!(assemble(&persona(), Mode::Fast, &[]), FAST_PERSONA);
        assert_eq!(assemble(&persona(), Mode::Deep, &[]), DEEP_PERSONA);
    }

    #[test]
    fn blocks_follow_fixed_order() {
        let signals = vec![
            AuxiliarySignal::new(SignalKind::ImageText, "IMG"),
            AuxiliarySignal::new(SignalKind::Document, "DOC"),
            AuxiliarySignal::new(SignalKind::Search, "WEB"),
        ];
        let out = assemble(&persona(), Mode::Fast, &signals);
        let web = out.find("WEB").unwrap_or(usize::MAX);
        let doc = out.find("DOC").unwrap_or(usize::MAX);
        let img = out.find("IMG").unwrap_or(usize::MAX);
        assert!(web < doc && doc < img, "unexpected order in {out}");
    }

    #[test]
    fn empty_signals_add_no_block() {
        let signals = vec![AuxiliarySignal::new(SignalKind::Search, "   ")];
        let out = assemble(&persona(), Mode::Fast, &signals);
        assert_eq!(out, FAST_PERSONA);
        assert!(!out.contains("[Web search results]"));
    }

    #[test]
    fn user_addon_follows_persona() {
        let mut p = persona();
        p.user_addon = "Answer in English.".into();
        let signals = vec![AuxiliarySignal::new(SignalKind::Search, "WEB")];
        let out = assemble(&p, Mode::Fast, &signals);
        assert!(out.starts_with(FAST_PERSONA));
        let addon = out.find("Answer in English.").unwrap_or(usize::MAX);
        let web = out.find("[Web search results]").unwrap_or(usize::MAX);
        assert!(addon < web);
    }

    #[test]
    fn truncated_document_is_labelled() {
        let signal = AuxiliarySignal::bounded(SignalKind::Document, &"a".repeat(10), 4);
        let out = assemble(&persona(), Mode::Deep, &[signal]);
        assert!(out.contains("[Uploaded document excerpt (truncated)]\naaaa"));
    }

    #[test]
    fn deterministic() {
        let signals = vec![AuxiliarySignal::new(SignalKind::Document, "DOC")];
        assert_eq!(
            assemble(&persona(), Mode::Deep, &signals),
            assemble(&persona(), Mode::Deep, &signals)
        );
    }
}

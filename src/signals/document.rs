//! Uploaded document extraction.
//!
//! Text is extracted once per upload and cached in the session as a
//! [`DocumentExtract`]. The full extract is kept; it is cut to the merge
//! budget only when a turn's instruction is assembled.

use super::{AuxiliarySignal, Gathered, SignalKind};
use crate::config::{DOCUMENT_PAGE_RANGE, MERGE_BUDGET_RANGE};
use crate::error::AuxiliaryError;
use async_trait::async_trait;

/// Extracts plain text from an uploaded file.
#[async_trait]
pub trait DocumentReader: Send + Sync {
    /// Text of the first `max_pages` pages. Later pages are never read.
    async fn extract_text(&self, bytes: &[u8], max_pages: usize) -> Result<String, AuxiliaryError>;
}

/// PDF reader backed by `lopdf`. UTF-8 plain text is accepted as one page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfReader;

#[async_trait]
impl DocumentReader for PdfReader {
    async fn extract_text(&self, bytes: &[u8], max_pages: usize) -> Result<String, AuxiliaryError> {
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || extract_blocking(&bytes, max_pages))
            .await
            .map_err(|e| AuxiliaryError::Document(format!("extraction task failed: {e}")))?
    }
}

fn extract_blocking(bytes: &[u8], max_pages: usize) -> Result<String, AuxiliaryError> {
    if bytes.starts_with(b"%PDF-") {
        return extract_pdf(bytes, max_pages);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_owned()),
        Err(_) => Err(AuxiliaryError::Document(
            "unsupported format: expected a PDF or UTF-8 text file".into(),
        )),
    }
}

fn extract_pdf(bytes: &[u8], max_pages: usize) -> Result<String, AuxiliaryError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| AuxiliaryError::Document(format!("invalid PDF: {e}")))?;

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().take(max_pages).collect();
    tracing::debug!(pages = page_numbers.len(), "extracting PDF text");

    let mut text = String::new();
    for page in page_numbers {
        match doc.extract_text(&[page]) {
            Ok(page_text) => text.push_str(&page_text),
            // One unreadable page should not lose the others.
            Err(e) => tracing::warn!(page, error = %e, "skipping unreadable PDF page"),
        }
    }
    Ok(text)
}

/// Text extracted from one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentExtract {
    /// File name as uploaded.
    pub name: String,
    /// Full extracted text, untruncated.
    pub text: String,
}

impl DocumentExtract {
    /// Signal for a turn, cut to `budget_chars` clamped to `2000..=3000`.
    pub fn signal(&self, budget_chars: usize) -> Gathered {
        if self.text.trim().is_empty() {
            return Gathered::Empty;
        }
        let budget_chars =
            budget_chars.clamp(*MERGE_BUDGET_RANGE.start(), *MERGE_BUDGET_RANGE.end());
        Gathered::Data(AuxiliarySignal::bounded(
            SignalKind::Document,
            &self.text,
            budget_chars,
        ))
    }

    /// Length of the full extract in characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Extract text from an upload.
///
/// `max_pages` is clamped to `3..=5`.
///
/// # Errors
///
/// Returns the reader's [`AuxiliaryError::Document`]; the caller reports it
/// and caches nothing.
pub async fn extract(
    reader: &dyn DocumentReader,
    name: &str,
    bytes: &[u8],
    max_pages: usize,
) -> Result<DocumentExtract, AuxiliaryError> {
    let max_pages = max_pages.clamp(*DOCUMENT_PAGE_RANGE.start(), *DOCUMENT_PAGE_RANGE.end());
    let text = reader.extract_text(bytes, max_pages).await?;
    tracing::info!(name, chars = text.chars().count(), "document extracted");
    Ok(DocumentExtract {
        name: name.to_owned(),
        text,
    })
}

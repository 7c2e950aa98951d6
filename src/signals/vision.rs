//! Text recognition on captured images.
//!
//! The recognizer is built lazily on first use and then shared by every
//! session of the engine. Construction goes through a [`RecognizerFactory`]
//! hook so it can be swapped or counted.

use super::{AuxiliarySignal, Gathered, SignalKind};
use crate::config::VisionConfig;
use crate::error::AuxiliaryError;
use image::DynamicImage;
use once_cell::sync::OnceCell;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

/// One recognized line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    /// Recognized text.
    pub text: String,
    /// Recognizer confidence in `0.0..=1.0`, when reported.
    pub confidence: Option<f32>,
}

impl TextSpan {
    /// Span without a confidence score.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: None,
        }
    }
}

/// Recognizes text in an image. Blocking; called from a blocking task.
pub trait TextRecognizer: Send + Sync {
    /// Spans in detection order.
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextSpan>, AuxiliaryError>;
}

/// Builds the recognizer. Called at most once per successful construction.
pub trait RecognizerFactory: Send + Sync {
    /// Construct a recognizer.
    fn create(&self) -> Result<Arc<dyn TextRecognizer>, AuxiliaryError>;
}

impl<F> RecognizerFactory for F
where
    F: Fn() -> Result<Arc<dyn TextRecognizer>, AuxiliaryError> + Send + Sync,
{
    fn create(&self) -> Result<Arc<dyn TextRecognizer>, AuxiliaryError> {
        self()
    }
}

/// Lazily constructed, shared recognizer.
pub struct ImageTextProvider {
    cell: OnceCell<Arc<dyn TextRecognizer>>,
    factory: Box<dyn RecognizerFactory>,
}

impl std::fmt::Debug for ImageTextProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageTextProvider")
            .field("initialized", &self.cell.get().is_some())
            .finish()
    }
}

impl ImageTextProvider {
    /// Provider that builds its recognizer with `factory` on first use.
    pub fn new(factory: impl RecognizerFactory + 'static) -> Self {
        Self {
            cell: OnceCell::new(),
            factory: Box::new(factory),
        }
    }

    /// Provider using the Tesseract command-line recognizer.
    pub fn tesseract(config: &VisionConfig) -> Self {
        let config = config.clone();
        Self::new(move || -> Result<Arc<dyn TextRecognizer>, AuxiliaryError> {
            Ok(Arc::new(TesseractRecognizer::discover(&config)?))
        })
    }

    /// Whether the recognizer has been built.
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    fn recognizer(&self) -> Result<Arc<dyn TextRecognizer>, AuxiliaryError> {
        self.cell
            .get_or_try_init(|| {
                tracing::info!("initializing text recognizer");
                self.factory.create()
            })
            .cloned()
    }

    /// Decode `bytes` and recognize text in it.
    ///
    /// Lines are joined with `\n` in detection order. An image with no text
    /// is [`Gathered::Empty`], not a failure.
    pub async fn recognize(&self, bytes: &[u8]) -> Gathered {
        match self.recognize_inner(bytes).await {
            Ok(spans) => {
                let text = spans
                    .iter()
                    .map(|span| span.text.as_str())
                    .filter(|line| !line.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join("\n");
                if text.is_empty() {
                    tracing::debug!("no text recognized in image");
                    Gathered::Empty
                } else {
                    tracing::debug!(lines = spans.len(), "image text recognized");
                    Gathered::Data(AuxiliarySignal::new(SignalKind::ImageText, text))
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "text recognition failed");
                Gathered::Diagnostic(e.to_string())
            }
        }
    }

    async fn recognize_inner(&self, bytes: &[u8]) -> Result<Vec<TextSpan>, AuxiliaryError> {
        let recognizer = self.recognizer()?;
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || {
            let image = image::load_from_memory(&bytes)
                .map_err(|e| AuxiliaryError::Vision(format!("could not decode image: {e}")))?;
            recognizer.recognize(&image)
        })
        .await
        .map_err(|e| AuxiliaryError::Vision(format!("recognition task failed: {e}")))?
    }
}

/// Recognizer running the `tesseract` binary.
///
/// The image is piped in as PNG; each non-blank output line is one span.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    binary: PathBuf,
    languages: String,
}

impl TesseractRecognizer {
    /// Recognizer using `binary` with `languages` joined by `+`.
    pub fn new(binary: impl Into<PathBuf>, languages: &[String]) -> Self {
        Self {
            binary: binary.into(),
            languages: languages.join("+"),
        }
    }

    /// Locate the binary: the configured path first, then `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`AuxiliaryError::Vision`] if no binary is found.
    pub fn discover(config: &VisionConfig) -> Result<Self, AuxiliaryError> {
        let binary = match config.tesseract_path.as_deref() {
            Some(path) if path.is_file() => path.to_path_buf(),
            Some(path) => {
                return Err(AuxiliaryError::Vision(format!(
                    "configured tesseract binary not found at {}",
                    path.display()
                )));
            }
            None => which::which("tesseract").map_err(|e| {
                AuxiliaryError::Vision(format!("tesseract not found on PATH: {e}"))
            })?,
        };
        tracing::debug!(binary = %binary.display(), "using tesseract");
        Ok(Self::new(binary, &config.languages))
    }

    /// Path of the binary in use.
    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<TextSpan>, AuxiliaryError> {
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
            .map_err(|e| AuxiliaryError::Vision(format!("could not encode image: {e}")))?;

        let mut command = Command::new(&self.binary);
        command.args(["stdin", "stdout", "-l", &self.languages]);
        let stdout = run_piped(&mut command, &png)?;
        Ok(parse_lines(&String::from_utf8_lossy(&stdout)))
    }
}

/// Run `command` with `input` on stdin and return its stdout.
///
/// The child is always reaped. When it exits early (a missing language pack
/// makes tesseract quit before reading the image) the failed write is
/// reported together with the child's stderr.
fn run_piped(command: &mut Command, input: &[u8]) -> Result<Vec<u8>, AuxiliaryError> {
    let program = command.get_program().to_string_lossy().into_owned();
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| AuxiliaryError::Vision(format!("failed to run {program}: {e}")))?;

    // Dropping stdin closes the pipe so the child sees EOF.
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(input),
        None => Ok(()),
    };

    let output = child
        .wait_with_output()
        .map_err(|e| AuxiliaryError::Vision(format!("{program} did not finish: {e}")))?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();

    if let Err(e) = written {
        return Err(AuxiliaryError::Vision(format!(
            "failed to send image to {program}: {e}; exited with {}: {stderr}",
            output.status
        )));
    }
    if !output.status.success() {
        return Err(AuxiliaryError::Vision(format!(
            "{program} exited with {}: {stderr}",
            output.status
        )));
    }
    Ok(output.stdout)
}

fn parse_lines(stdout: &str) -> Vec<TextSpan> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(TextSpan::new)
        .collect()
}

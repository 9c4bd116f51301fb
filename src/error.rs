//! Error types for the sentinai library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`AuditError`] is **fatal**: the run cannot proceed at all (inputs
//!   missing, manual is not a PDF, the video tooling is not installed, the
//!   provider is not configured). Returned as `Err(AuditError)` from
//!   [`crate::audit::Auditor::run`].
//!
//! * [`StageFailure`] is **non-fatal**: one of the two remote model calls
//!   failed. It is carried inside [`crate::output::AuditOutcome`] so the UI
//!   can show exactly which stage broke, and so an error message can never be
//!   mistaken for an extracted rule or a verdict.
//!
//! [`ModelError`] is what a [`crate::client::ModelClient`] returns; the stage
//! wrappers turn it into a `StageFailure`.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the sentinai library.
#[derive(Debug, Error)]
pub enum AuditError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The manual, the video, or both were not supplied.
    #[error("Please upload both Video and PDF first!")]
    MissingInputs {
        manual_missing: bool,
        video_missing: bool,
    },

    /// An upload has the wrong file type for its slot.
    #[error("'{file_name}' is not a {expected} file")]
    InvalidUpload {
        file_name: String,
        expected: &'static str,
    },

    /// A local input file was not found.
    #[error("File not found: '{path}'")]
    FileNotFound { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Manual errors ─────────────────────────────────────────────────────
    /// The manual was read, but is not a PDF.
    #[error("Manual '{file_name}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { file_name: String, magic: Vec<u8> },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("Manual '{file_name}' could not be parsed: {detail}")]
    CorruptPdf { file_name: String, detail: String },

    /// PDF requires a password.
    #[error("Manual '{file_name}' is encrypted and requires a password")]
    PasswordRequired { file_name: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Install libpdfium or set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Video errors ──────────────────────────────────────────────────────
    /// ffmpeg / ffprobe is not installed or not on PATH.
    #[error("Video tool '{tool}' was not found. Install ffmpeg or pass --ffmpeg/--ffprobe.")]
    VideoToolNotFound { tool: String },

    /// The decoder could not open the uploaded video.
    #[error("Error: Could not load video file. ({detail})")]
    VideoOpenFailed { detail: String },

    /// The sampled frame could not be written as JPEG.
    #[error("Failed to encode frame {index} as JPEG: {detail}")]
    FrameEncodeFailed { index: u64, detail: String },

    // ── Provider errors ───────────────────────────────────────────────────
    /// Neither `GOOGLE_API_KEY` nor `GEMINI_API_KEY` is set.
    #[error("API Key Missing! Set {var} in the environment or a .env file.")]
    MissingApiKey { var: &'static str },

    /// The configured provider could not be initialised.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Config / I/O ──────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Temp-file or other local I/O failed.
    #[error("I/O error while {action}: {source}")]
    Io {
        action: &'static str,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuditError {
    pub(crate) fn io(action: &'static str, source: std::io::Error) -> Self {
        AuditError::Io { action, source }
    }
}

/// A non-fatal failure of one remote model call.
///
/// The display strings keep the fixed prefixes users already know from the
/// banner text.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum StageFailure {
    #[error("Error extracting rule: {detail}")]
    RuleExtraction { detail: String },

    #[error("Error analyzing image: {detail}")]
    ComplianceAnalysis { detail: String },
}

/// Error returned by a [`crate::client::ModelClient`].
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ModelError {
    pub message: String,
}

impl ModelError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

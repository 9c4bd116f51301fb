//! # sentinai
//!
//! Audit a short CCTV clip against a rule taken from a PDF safety manual.
//!
//! A text model reads the manual and states the rule for a topic such as
//! "mobile phone"; a vision model then looks at the middle frame of the clip
//! and answers PASS or FAIL with an observation.
//!
//! ## Pipeline Overview
//!
//! ```text
//! manual.pdf + clip.mp4 + topic
//!  │
//!  ├─ 1. Manual    concatenate page text via pdfium (spawn_blocking)
//!  ├─ 2. Rule      one text-model call → one-sentence rule
//!  ├─ 3. Frame     temp-file the clip, decode frame N/2 via ffmpeg
//!  ├─ 4. Judgment  one vision-model call with the JPEG frame and the rule
//!  └─ 5. Report    AuditOutcome + AuditStats; "PASS" substring → green
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sentinai::{AuditConfig, AuditRequest, Auditor, LlmModelClient, Upload};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads GOOGLE_API_KEY (or GEMINI_API_KEY).
//!     let config = AuditConfig::default();
//!     let client = Arc::new(LlmModelClient::from_config(&config)?);
//!     let auditor = Auditor::with_default_backends(client, config);
//!
//!     let report = auditor
//!         .run(AuditRequest {
//!             manual: Some(Upload::new("manual.pdf", std::fs::read("manual.pdf")?)),
//!             video: Some(Upload::new("floor.mp4", std::fs::read("floor.mp4")?)),
//!             topic: "mobile phone".into(),
//!         })
//!         .await?;
//!     println!("pass: {}", report.outcome.is_pass_styled());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | The `sentinai` binary and the [`web`] module (axum, clap, indicatif) |
//!
//! ## External tools
//!
//! * **libpdfium**: found via `PDFIUM_LIB_PATH`, the working directory, or
//!   the system library path.
//! * **ffmpeg / ffprobe**: on `PATH`, or configured with
//!   [`AuditConfigBuilder::ffmpeg_path`] and
//!   [`AuditConfigBuilder::ffprobe_path`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod audit;
pub mod client;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "server")]
pub mod web;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use audit::{AuditRequest, Auditor};
pub use client::{LlmModelClient, ModelClient, ModelReply};
pub use config::{AuditConfig, AuditConfigBuilder};
pub use error::{AuditError, ModelError, StageFailure};
pub use output::{
    AuditOutcome, AuditReport, AuditStats, ExtractedRule, FrameView, Status, Verdict,
    VerdictSections,
};
pub use pipeline::input::{load_source, Upload};
pub use progress::{AuditProgressCallback, AuditStage, NoopProgressCallback, ProgressCallback};

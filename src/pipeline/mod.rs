//! Pipeline stages for a compliance audit.
//!
//! Each submodule implements exactly one step; [`crate::audit::Auditor`]
//! wires them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ manual ──▶ rule ──▶ frame ──▶ encode ──▶ judge
//! (uploads)  (pdfium)   (LLM)   (ffmpeg)   (JPEG)    (VLM)
//! ```
//!
//! 1. [`input`]   upload type checks; CLI path/URL loading
//! 2. [`manual`]  concatenate the manual's page text; blocking (pdfium)
//! 3. [`rule`]    one text-model call that returns the governing rule
//! 4. [`frame`]   temp-file the clip, decode the middle frame; blocking
//! 5. [`encode`]  JPEG-encode the frame and wrap it for the API
//! 6. [`judge`]   one vision-model call with the frame and the rule

pub mod encode;
pub mod frame;
pub mod input;
pub mod judge;
pub mod manual;
pub mod rule;

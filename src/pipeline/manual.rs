//! Manual text extraction via pdfium.
//!
//! Every page's text layer is concatenated in page order, exactly as pdfium
//! recovers it: no layout repair and no OCR, so an image-only page simply
//! contributes nothing. A file that is not a PDF or that pdfium cannot parse
//! aborts the run.
//!
//! pdfium is not async-safe; [`crate::audit::Auditor`] calls the reader from
//! `spawn_blocking`.

use crate::error::AuditError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Text recovered from a manual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualText {
    pub text: String,
    pub page_count: usize,
}

/// Anything that can turn manual bytes into text.
pub trait ManualReader: Send + Sync {
    fn read_text(&self, file_name: &str, bytes: &[u8]) -> Result<ManualText, AuditError>;

    /// Human-readable backend name, for logs and [`crate::AuditStats`].
    fn backend_name(&self) -> &str;
}

/// [`ManualReader`] backed by pdfium-render.
#[derive(Debug, Clone, Default)]
pub struct PdfiumManualReader {
    lib_path: Option<PathBuf>,
}

impl PdfiumManualReader {
    pub fn new(lib_path: Option<PathBuf>) -> Self {
        Self { lib_path }
    }

    /// Bind to libpdfium: explicit path, then `PDFIUM_LIB_PATH`, then the
    /// working directory, then the system library search path.
    pub fn bind(&self) -> Result<Pdfium, AuditError> {
        let explicit = self
            .lib_path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        let bindings = match explicit {
            Some(path) => Pdfium::bind_to_library(library_file(&path)),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| AuditError::PdfiumBindingFailed(e.to_string()))?;

        Ok(Pdfium::new(bindings))
    }
}

/// Accept either the library file itself or the directory containing it.
fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}

impl ManualReader for PdfiumManualReader {
    fn read_text(&self, file_name: &str, bytes: &[u8]) -> Result<ManualText, AuditError> {
        ensure_pdf_magic(file_name, bytes)?;

        let pdfium = self.bind()?;
        let document = pdfium.load_pdf_from_byte_slice(bytes, None).map_err(|e| {
            let detail = format!("{:?}", e);
            if detail.contains("Password") || detail.contains("password") {
                AuditError::PasswordRequired {
                    file_name: file_name.to_string(),
                }
            } else {
                AuditError::CorruptPdf {
                    file_name: file_name.to_string(),
                    detail,
                }
            }
        })?;

        let pages = document.pages();
        let page_count = pages.len() as usize;
        let mut text = String::new();

        for (idx, page) in pages.iter().enumerate() {
            let page_text = page.text().map_err(|e| AuditError::CorruptPdf {
                file_name: file_name.to_string(),
                detail: format!("page {}: {:?}", idx + 1, e),
            })?;
            let chunk = page_text.all();
            debug!("Page {}: {} chars", idx + 1, chunk.len());
            text.push_str(&chunk);
        }

        info!(
            "Extracted {} chars from {} pages of '{}'",
            text.len(),
            page_count,
            file_name
        );
        Ok(ManualText { text, page_count })
    }

    fn backend_name(&self) -> &str {
        "pdfium"
    }
}

/// Reject files that do not start with `%PDF` before handing them to pdfium.
pub fn ensure_pdf_magic(file_name: &str, bytes: &[u8]) -> Result<(), AuditError> {
    if bytes.starts_with(b"%PDF") {
        Ok(())
    } else {
        Err(AuditError::NotAPdf {
            file_name: file_name.to_string(),
            magic: bytes.iter().take(4).copied().collect(),
        })
    }
}

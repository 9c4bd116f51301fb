//! Uploads: the raw bytes of the manual and the video, plus where they came
//! from.
//!
//! The web UI builds [`Upload`]s straight from multipart fields. The CLI
//! builds them with [`load_source`], which accepts either a local path or an
//! HTTP(S) URL and reads the whole file into memory; both files are small
//! enough (manual pages, a short clip) that streaming buys nothing.

use crate::error::AuditError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One uploaded file.
#[derive(Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Lower-cased extension of the file name, without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    /// Check the extension against the slot this upload is used for.
    pub fn ensure_kind(&self, kind: UploadKind) -> Result<(), AuditError> {
        if self.extension().as_deref() == Some(kind.extension()) {
            Ok(())
        } else {
            Err(AuditError::InvalidUpload {
                file_name: self.file_name.clone(),
                expected: kind.label(),
            })
        }
    }
}

/// The two upload slots and the single file type each accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Manual,
    Video,
}

impl UploadKind {
    pub fn extension(self) -> &'static str {
        match self {
            UploadKind::Manual => "pdf",
            UploadKind::Video => "mp4",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UploadKind::Manual => "PDF",
            UploadKind::Video => "MP4",
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load a local file or download a URL into an [`Upload`].
pub async fn load_source(input: &str, timeout_secs: u64) -> Result<Upload, AuditError> {
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(input).await
    }
}

async fn read_local(path_str: &str) -> Result<Upload, AuditError> {
    let path = PathBuf::from(path_str);
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AuditError::FileNotFound { path: path.clone() }
        } else {
            AuditError::io("reading input file", e)
        }
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path_str.to_string());
    debug!("Read {} ({} bytes)", path.display(), bytes.len());
    Ok(Upload { file_name, bytes })
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<Upload, AuditError> {
    info!("Downloading: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| AuditError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            AuditError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            AuditError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(AuditError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let disposition = response
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = response
        .bytes()
        .await
        .map_err(|e| AuditError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let file_name = downloaded_file_name(url, disposition.as_deref(), &bytes);
    info!("Downloaded {} ({} bytes)", file_name, bytes.len());
    Ok(Upload {
        file_name,
        bytes: bytes.to_vec(),
    })
}

/// Name for a downloaded body: `Content-Disposition` first, then the URL.
///
/// Share links (`.../uc?id=...&export=download`) often carry no extension;
/// the slot check needs one, so it is taken from the magic bytes.
fn downloaded_file_name(url: &str, content_disposition: Option<&str>, bytes: &[u8]) -> String {
    let name = content_disposition
        .and_then(disposition_file_name)
        .unwrap_or_else(|| file_name_from_url(url));

    let known = Path::new(&name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| {
            e == UploadKind::Manual.extension() || e == UploadKind::Video.extension()
        });
    if known {
        return name;
    }
    match sniff_kind(bytes) {
        Some(kind) => format!("{name}.{}", kind.extension()),
        None => name,
    }
}

/// `filename` parameter of a `Content-Disposition` header value.
fn disposition_file_name(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|param| param.strip_prefix("filename="))
        .map(|v| v.trim_matches('"').trim())
        .and_then(|v| Path::new(v).file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.is_empty())
}

/// Upload kind from the leading bytes: `%PDF` or an ISO-BMFF `ftyp` box.
fn sniff_kind(bytes: &[u8]) -> Option<UploadKind> {
    if bytes.starts_with(b"%PDF") {
        Some(UploadKind::Manual)
    } else if bytes.get(4..8) == Some(b"ftyp".as_slice()) {
        Some(UploadKind::Video)
    } else {
        None
    }
}

/// Last path segment of a URL, without query or fragment.
fn file_name_from_url(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').find(|s| !s.is_empty()))
        .filter(|s| !s.contains(':'))
        .unwrap_or("download")
        .to_string()
}

//! Configuration for an audit run.
//!
//! All run behaviour is controlled through [`AuditConfig`], built via its
//! [`AuditConfigBuilder`]. The model client itself is not part of the config;
//! it is handed to [`crate::audit::Auditor::new`] so tests can substitute it.

use crate::error::AuditError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Default provider name passed to `edgequake_llm::ProviderFactory`.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Default model; the "latest" alias tracks the stable flash release and has
/// the higher rate limits.
pub const DEFAULT_MODEL: &str = "gemini-flash-latest";

/// Topic pre-filled in the UI and used by the CLI when none is given.
pub const DEFAULT_TOPIC: &str = "mobile phone";

/// Configuration for an audit run.
///
/// # Example
/// ```rust
/// use sentinai::AuditConfig;
///
/// let config = AuditConfig::builder()
///     .model("gemini-2.0-flash")
///     .jpeg_quality(85)
///     .build()
///     .unwrap();
/// assert_eq!(config.default_topic, "mobile phone");
/// ```
#[derive(Clone)]
pub struct AuditConfig {
    /// LLM provider name (e.g. "gemini", "openai"). Default: "gemini".
    pub provider_name: String,

    /// Model identifier used for both the text and the vision call.
    pub model: String,

    /// Sampling temperature. `None` leaves the provider default in place.
    pub temperature: Option<f32>,

    /// Output token cap per call. `None` leaves the provider default in place.
    pub max_tokens: Option<usize>,

    /// Topic used when the caller does not supply one. Default: "mobile phone".
    pub default_topic: String,

    /// Directory for the temporary video and frame files. Default: OS temp dir.
    pub work_dir: PathBuf,

    /// ffmpeg executable used to decode the sampled frame.
    pub ffmpeg_path: PathBuf,

    /// ffprobe executable used to count frames.
    pub ffprobe_path: PathBuf,

    /// Explicit libpdfium location. `None` searches `PDFIUM_LIB_PATH`, the
    /// working directory, then the system library path.
    pub pdfium_lib_path: Option<PathBuf>,

    /// JPEG quality (1–100) of the persisted frame. Default: 90.
    pub jpeg_quality: u8,

    /// Upper bound on a single upload request body. Default: 200 MiB.
    pub max_upload_bytes: usize,

    /// Timeout for downloading URL inputs (CLI only). Default: 120 s.
    pub download_timeout_secs: u64,

    /// Stage-level progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            provider_name: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
            default_topic: DEFAULT_TOPIC.to_string(),
            work_dir: std::env::temp_dir(),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            pdfium_lib_path: None,
            jpeg_quality: 90,
            max_upload_bytes: 200 * 1024 * 1024,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AuditConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditConfig")
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("default_topic", &self.default_topic)
            .field("work_dir", &self.work_dir)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("ffprobe_path", &self.ffprobe_path)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn AuditProgressCallback>"),
            )
            .finish()
    }
}

impl AuditConfig {
    /// Create a new builder for `AuditConfig`.
    pub fn builder() -> AuditConfigBuilder {
        AuditConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AuditConfig`].
#[derive(Debug)]
pub struct AuditConfigBuilder {
    config: AuditConfig,
}

impl AuditConfigBuilder {
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn default_topic(mut self, topic: impl Into<String>) -> Self {
        self.config.default_topic = topic.into();
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = dir.into();
        self
    }

    pub fn ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ffmpeg_path = path.into();
        self
    }

    pub fn ffprobe_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ffprobe_path = path.into();
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AuditConfig, AuditError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(AuditError::InvalidConfig("model must not be empty".into()));
        }
        if c.provider_name.trim().is_empty() {
            return Err(AuditError::InvalidConfig(
                "provider name must not be empty".into(),
            ));
        }
        if !(1..=100).contains(&c.jpeg_quality) {
            return Err(AuditError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        if c.max_upload_bytes == 0 {
            return Err(AuditError::InvalidConfig(
                "max upload size must be > 0".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_hosted_setup() {
        let c = AuditConfig::default();
        assert_eq!(c.provider_name, "gemini");
        assert_eq!(c.model, "gemini-flash-latest");
        assert_eq!(c.default_topic, "mobile phone");
        assert_eq!(c.max_upload_bytes, 200 * 1024 * 1024);
        assert!(c.temperature.is_none());
    }

    #[test]
    fn download_timeout_is_carried_and_shown() {
        let c = AuditConfig::builder().download_timeout_secs(7).build().unwrap();
        assert_eq!(c.download_timeout_secs, 7);
        assert!(format!("{c:?}").contains("download_timeout_secs: 7"));
    }

    #[test]
    fn builder_rejects_zero_jpeg_quality() {
        let err = AuditConfig::builder().jpeg_quality(0).build().unwrap_err();
        assert!(err.to_string().contains("JPEG quality"));
    }

    #[test]
    fn builder_rejects_blank_model() {
        assert!(AuditConfig::builder().model("  ").build().is_err());
    }

    #[test]
    fn builder_clamps_temperature() {
        let c = AuditConfig::builder().temperature(5.0).build().unwrap();
        assert_eq!(c.temperature, Some(2.0));
    }
}

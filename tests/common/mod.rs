//! Substitute backends shared by the integration tests.
//!
//! None of them touch the network, pdfium or ffmpeg.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::{DynamicImage, Rgb, RgbImage};
use sentinai::error::{AuditError, ModelError};
use sentinai::pipeline::frame::FrameDecoder;
use sentinai::pipeline::manual::{ManualReader, ManualText};
use sentinai::{AuditConfig, Auditor, ModelClient, ModelReply, Upload};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub const MANUAL_TEXT: &str = "Section 4. Employees must not use mobile phones on the floor.";
pub const RULE: &str = "Employees must not use mobile phones on the production floor.";
pub const PASS_REPLY: &str =
    "STATUS: PASS\nOBSERVATION: The worker's hands are empty.\nVERDICT: Compliant.";
pub const FAIL_REPLY: &str =
    "STATUS: FAIL\nOBSERVATION: The worker is holding a phone.\nVERDICT: Non-compliant.";

// ── Model ────────────────────────────────────────────────────────────────────

/// One recorded `generate` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    /// `(mime type, decoded bytes)` of the attached image.
    pub image: Option<(String, Vec<u8>)>,
}

/// Replays scripted replies in order and records every prompt.
#[derive(Default)]
pub struct FakeModelClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeModelClient {
    pub fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for FakeModelClient {
    fn model_name(&self) -> &str {
        "fake-vision-model"
    }

    async fn generate(
        &self,
        prompt: &str,
        image: Option<ImageData>,
    ) -> Result<ModelReply, ModelError> {
        let image = image.map(|img| {
            let bytes = STANDARD.decode(&img.data).expect("image data is base64");
            (img.mime_type.clone(), bytes)
        });
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: prompt.to_string(),
            image,
        });
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(ModelReply {
                text,
                prompt_tokens: 100,
                completion_tokens: 20,
            }),
            Some(Err(message)) => Err(ModelError::new(message)),
            None => Err(ModelError::new("no scripted reply left")),
        }
    }
}

// ── Manual ───────────────────────────────────────────────────────────────────

/// Returns fixed text for any input.
pub struct FakeReader {
    pub text: String,
}

impl Default for FakeReader {
    fn default() -> Self {
        Self {
            text: MANUAL_TEXT.to_string(),
        }
    }
}

impl ManualReader for FakeReader {
    fn read_text(&self, _file_name: &str, _bytes: &[u8]) -> Result<ManualText, AuditError> {
        Ok(ManualText {
            text: self.text.clone(),
            page_count: 1,
        })
    }

    fn backend_name(&self) -> &str {
        "fake"
    }
}

// ── Video ────────────────────────────────────────────────────────────────────

/// How the fake decoder treats the clip.
#[derive(Debug, Clone, Copy)]
pub enum ClipBehaviour {
    /// Opens with this many frames and every frame decodes.
    Frames(u64),
    /// Opens with this many frames, but no frame decodes.
    Undecodable(u64),
    /// Cannot be opened.
    Corrupt,
}

/// Records the paths and indices it is asked about.
pub struct FakeDecoder {
    behaviour: ClipBehaviour,
    pub opened: Mutex<Vec<PathBuf>>,
    /// Contents of the temp video at the moment it was opened.
    pub saw_bytes: Mutex<Vec<Vec<u8>>>,
    pub decoded: Mutex<Vec<u64>>,
}

impl FakeDecoder {
    pub fn new(behaviour: ClipBehaviour) -> Arc<Self> {
        Arc::new(Self {
            behaviour,
            opened: Mutex::new(Vec::new()),
            saw_bytes: Mutex::new(Vec::new()),
            decoded: Mutex::new(Vec::new()),
        })
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().unwrap().len()
    }
}

impl FrameDecoder for FakeDecoder {
    fn frame_count(&self, path: &Path) -> Result<u64, AuditError> {
        self.opened.lock().unwrap().push(path.to_path_buf());
        self.saw_bytes
            .lock()
            .unwrap()
            .push(std::fs::read(path).unwrap_or_default());
        match self.behaviour {
            ClipBehaviour::Frames(n) | ClipBehaviour::Undecodable(n) => Ok(n),
            ClipBehaviour::Corrupt => Err(AuditError::VideoOpenFailed {
                detail: "moov atom not found".into(),
            }),
        }
    }

    fn decode_frame(&self, _path: &Path, index: u64) -> Option<DynamicImage> {
        self.decoded.lock().unwrap().push(index);
        match self.behaviour {
            ClipBehaviour::Frames(_) => Some(DynamicImage::ImageRgb8(RgbImage::from_pixel(
                64,
                36,
                Rgb([40, 120, 200]),
            ))),
            _ => None,
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

pub fn manual_upload() -> Upload {
    Upload::new("safety_manual.pdf", b"%PDF-1.7 fake manual".to_vec())
}

pub fn video_upload() -> Upload {
    Upload::new("floor_cam.mp4", b"\x00\x00\x00\x18ftypmp42 fake clip".to_vec())
}

pub fn config_in(work_dir: &Path) -> AuditConfig {
    AuditConfig::builder()
        .work_dir(work_dir)
        .build()
        .expect("valid test config")
}

/// Route library logs to the test harness; `RUST_LOG=debug` shows them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn auditor(
    client: Arc<FakeModelClient>,
    decoder: Arc<FakeDecoder>,
    config: AuditConfig,
) -> Auditor {
    init_tracing();
    Auditor::new(client, Arc::new(FakeReader::default()), decoder, config)
}

/// Names of the files left in `dir`.
pub fn leftover_files(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}

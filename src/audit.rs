//! The audit pipeline: manual → rule → frame → judgment.
//!
//! One run is a single forward-only sequence with no retries:
//!
//! ```text
//! inputs missing ─────────────▶ Err(MissingInputs)        (nothing runs)
//! manual unreadable ──────────▶ Err(NotAPdf / CorruptPdf)
//! rule call failed ───────────▶ Ok(RuleUnavailable)       (video untouched)
//! video won't open ───────────▶ Ok(VideoUnreadable)       (no frame file)
//! no frames / decode failed ──▶ Ok(NoFrame)               (silent stop)
//! otherwise ──────────────────▶ Ok(Judged)
//! ```
//!
//! The two remote calls block the run until they return; there is no
//! timeout or cancellation.

use crate::client::{ModelClient, ModelReply};
use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::output::{AuditOutcome, AuditReport, AuditStats, FrameView};
use crate::pipeline::frame::{self, FfmpegDecoder, FrameDecoder, Sampled};
use crate::pipeline::input::{Upload, UploadKind};
use crate::pipeline::manual::{ManualReader, PdfiumManualReader};
use crate::pipeline::{encode, judge, rule};
use crate::progress::AuditStage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Inputs of one run, as collected by the UI or the CLI.
#[derive(Debug, Clone)]
pub struct AuditRequest {
    pub manual: Option<Upload>,
    pub video: Option<Upload>,
    /// Free-form; not validated.
    pub topic: String,
}

/// Runs audits. Holds the model client and the two local backends; cheap to
/// share behind an `Arc`.
pub struct Auditor {
    client: Arc<dyn ModelClient>,
    reader: Arc<dyn ManualReader>,
    decoder: Arc<dyn FrameDecoder>,
    config: AuditConfig,
}

impl Auditor {
    pub fn new(
        client: Arc<dyn ModelClient>,
        reader: Arc<dyn ManualReader>,
        decoder: Arc<dyn FrameDecoder>,
        config: AuditConfig,
    ) -> Self {
        Self {
            client,
            reader,
            decoder,
            config,
        }
    }

    /// pdfium for manuals and ffmpeg for video, as configured.
    pub fn with_default_backends(client: Arc<dyn ModelClient>, config: AuditConfig) -> Self {
        let reader = Arc::new(PdfiumManualReader::new(config.pdfium_lib_path.clone()));
        let decoder = Arc::new(FfmpegDecoder::new(
            config.ffmpeg_path.clone(),
            config.ffprobe_path.clone(),
        ));
        Self::new(client, reader, decoder, config)
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Run one audit.
    ///
    /// # Errors
    /// Only fatal conditions are `Err`: missing or mistyped inputs, an
    /// unreadable manual, missing video tooling, local I/O. Remote-call
    /// failures and an unreadable video are reported through
    /// [`AuditOutcome`].
    pub async fn run(&self, request: AuditRequest) -> Result<AuditReport, AuditError> {
        let total_start = Instant::now();

        let (manual, video) = match (request.manual, request.video) {
            (Some(m), Some(v)) => (m, v),
            (m, v) => {
                return Err(AuditError::MissingInputs {
                    manual_missing: m.is_none(),
                    video_missing: v.is_none(),
                })
            }
        };
        manual.ensure_kind(UploadKind::Manual)?;
        video.ensure_kind(UploadKind::Video)?;

        let topic = request.topic;
        info!(
            "Starting audit: topic '{}', manual '{}', video '{}'",
            topic, manual.file_name, video.file_name
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_audit_start(&topic);
        }

        let mut stats = AuditStats::default();

        // ── Step 1: Manual text ──────────────────────────────────────────
        self.stage_start(AuditStage::ManualIngestion);
        let step = Instant::now();
        let reader = Arc::clone(&self.reader);
        stats.manual_backend = reader.backend_name().to_string();
        debug!("Reading manual with the {} backend", stats.manual_backend);
        let manual_text = tokio::task::spawn_blocking(move || {
            reader.read_text(&manual.file_name, &manual.bytes)
        })
        .await
        .map_err(|e| AuditError::Internal(format!("Manual task panicked: {e}")))??;
        stats.manual_pages = manual_text.page_count;
        stats.manual_chars = manual_text.text.chars().count();
        stats.manual_duration_ms = step.elapsed().as_millis() as u64;
        self.stage_complete(
            AuditStage::ManualIngestion,
            &format!(
                "{} pages, {} chars",
                stats.manual_pages, stats.manual_chars
            ),
        );

        // ── Step 2: Rule ─────────────────────────────────────────────────
        self.stage_start(AuditStage::RuleExtraction);
        let step = Instant::now();
        let (rule, reply) = rule::extract_rule(&*self.client, &manual_text.text, &topic).await;
        add_tokens(&mut stats, &reply);
        stats.rule_duration_ms = step.elapsed().as_millis() as u64;

        let rule = match rule {
            Ok(rule) => {
                self.stage_complete(AuditStage::RuleExtraction, rule.as_str());
                rule
            }
            Err(failure) => {
                self.stage_complete(AuditStage::RuleExtraction, &failure.to_string());
                let outcome = AuditOutcome::RuleUnavailable { failure };
                return Ok(self.finish(topic, outcome, stats, total_start));
            }
        };

        // ── Step 3: Frame ────────────────────────────────────────────────
        self.stage_start(AuditStage::FrameSampling);
        let step = Instant::now();
        let decoder = Arc::clone(&self.decoder);
        let work_dir = self.config.work_dir.clone();
        let quality = self.config.jpeg_quality;
        let sampled = tokio::task::spawn_blocking(move || {
            frame::sample_middle_frame(&*decoder, &video.bytes, &work_dir, quality)
        })
        .await
        .map_err(|e| AuditError::Internal(format!("Frame task panicked: {e}")))?;
        stats.frame_duration_ms = step.elapsed().as_millis() as u64;

        let sampled = match sampled {
            Ok(Sampled::Frame(frame)) => frame,
            Ok(Sampled::Empty { total_frames }) => {
                stats.total_frames = Some(total_frames);
                self.stage_complete(AuditStage::FrameSampling, "no frame decoded");
                let outcome = AuditOutcome::NoFrame { rule, total_frames };
                return Ok(self.finish(topic, outcome, stats, total_start));
            }
            Err(AuditError::VideoOpenFailed { detail }) => {
                warn!("Video could not be opened: {}", detail);
                self.stage_complete(AuditStage::FrameSampling, "video could not be opened");
                let outcome = AuditOutcome::VideoUnreadable { rule, detail };
                return Ok(self.finish(topic, outcome, stats, total_start));
            }
            Err(e) => return Err(e),
        };
        stats.total_frames = Some(sampled.total_frames);
        stats.frame_index = Some(sampled.index);
        self.stage_complete(
            AuditStage::FrameSampling,
            &format!("frame {}/{}", sampled.index, sampled.total_frames),
        );

        // ── Step 4: Judgment ─────────────────────────────────────────────
        self.stage_start(AuditStage::ComplianceJudgment);
        let step = Instant::now();
        // The model sees exactly what was written to disk.
        let jpeg = tokio::fs::read(&sampled.path)
            .await
            .map_err(|e| AuditError::io("reading frame file", e))?;
        let (judgment, reply) =
            judge::analyze_compliance(&*self.client, encode::jpeg_image_data(&jpeg), &rule).await;
        add_tokens(&mut stats, &reply);
        stats.judge_duration_ms = step.elapsed().as_millis() as u64;
        self.stage_complete(
            AuditStage::ComplianceJudgment,
            match &judgment {
                Ok(v) if v.is_pass() => "PASS",
                Ok(_) => "FAIL",
                Err(_) => "error",
            },
        );

        let view = FrameView {
            index: sampled.index,
            total_frames: sampled.total_frames,
            width: sampled.width,
            height: sampled.height,
            jpeg,
        };
        if let Err(e) = sampled.path.close() {
            warn!("Could not remove frame file: {}", e);
        }

        let outcome = AuditOutcome::Judged {
            rule,
            frame: view,
            judgment,
        };
        Ok(self.finish(topic, outcome, stats, total_start))
    }

    fn finish(
        &self,
        topic: String,
        outcome: AuditOutcome,
        mut stats: AuditStats,
        start: Instant,
    ) -> AuditReport {
        stats.total_duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Audit complete in {}ms (pass-styled: {})",
            stats.total_duration_ms,
            outcome.is_pass_styled()
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_audit_complete(&outcome);
        }
        AuditReport {
            topic,
            model: self.client.model_name().to_string(),
            outcome,
            stats,
        }
    }

    fn stage_start(&self, stage: AuditStage) {
        info!("{}…", stage);
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_start(stage);
        }
    }

    fn stage_complete(&self, stage: AuditStage, detail: &str) {
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_stage_complete(stage, detail);
        }
    }
}

fn add_tokens(stats: &mut AuditStats, reply: &ModelReply) {
    stats.total_input_tokens += reply.prompt_tokens;
    stats.total_output_tokens += reply.completion_tokens;
}

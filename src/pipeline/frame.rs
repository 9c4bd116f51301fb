//! Frame sampling: pull the temporal middle frame out of the uploaded clip.
//!
//! The decoder needs a file-system path, so the upload is first written to a
//! uniquely named temp file inside `work_dir`. The frame count is read from
//! the container, the frame at `total / 2` is decoded, and the result is
//! written as a JPEG to a second unique temp file. Both files are
//! `tempfile` guards: the video is removed when this stage returns, the JPEG
//! when the [`SampledFrame`] is dropped at the end of the run, on every exit
//! path.
//!
//! Three results are possible:
//! * `Err(AuditError::VideoOpenFailed)`: the decoder could not open the clip.
//! * `Ok(Sampled::Empty)`: the clip opened, but has no frames or the middle
//!   frame did not decode. The caller stops without showing an error.
//! * `Ok(Sampled::Frame(_))`.

use crate::error::AuditError;
use crate::pipeline::encode;
use image::DynamicImage;
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempPath;
use tracing::{debug, info, warn};

/// Opens a video by path, counts frames and decodes one of them.
pub trait FrameDecoder: Send + Sync {
    /// Number of frames in the first video stream.
    ///
    /// Returns [`AuditError::VideoOpenFailed`] when the file cannot be opened
    /// as a video at all.
    fn frame_count(&self, path: &Path) -> Result<u64, AuditError>;

    /// Decode the frame at zero-based `index`. `None` when decoding fails.
    fn decode_frame(&self, path: &Path, index: u64) -> Option<DynamicImage>;
}

/// The middle frame, persisted as JPEG for the judgment call.
#[derive(Debug)]
pub struct SampledFrame {
    pub index: u64,
    pub total_frames: u64,
    pub width: u32,
    pub height: u32,
    /// JPEG file; deleted when this value is dropped.
    pub path: TempPath,
}

/// Result of [`sample_middle_frame`] for a clip that opened.
#[derive(Debug)]
pub enum Sampled {
    Frame(SampledFrame),
    Empty { total_frames: u64 },
}

/// `total / 2`, or `None` for an empty clip.
pub fn middle_frame_index(total_frames: u64) -> Option<u64> {
    (total_frames > 0).then_some(total_frames / 2)
}

/// Run the frame-sampling stage. Blocking; call from `spawn_blocking`.
pub fn sample_middle_frame(
    decoder: &dyn FrameDecoder,
    video: &[u8],
    work_dir: &Path,
    jpeg_quality: u8,
) -> Result<Sampled, AuditError> {
    let mut video_file = tempfile::Builder::new()
        .prefix("sentinai-video-")
        .suffix(".mp4")
        .tempfile_in(work_dir)
        .map_err(|e| AuditError::io("creating temp video file", e))?;
    video_file
        .write_all(video)
        .and_then(|_| video_file.flush())
        .map_err(|e| AuditError::io("writing temp video file", e))?;
    // Close our handle; the decoder reopens the file by path.
    let video_path = video_file.into_temp_path();
    debug!(
        "Wrote {} bytes to {}",
        video.len(),
        video_path.display()
    );

    let total_frames = decoder.frame_count(&video_path)?;
    let Some(index) = middle_frame_index(total_frames) else {
        warn!("Video reports 0 frames; nothing to sample");
        return Ok(Sampled::Empty { total_frames });
    };

    let Some(image) = decoder.decode_frame(&video_path, index) else {
        warn!("Frame {}/{} did not decode", index, total_frames);
        return Ok(Sampled::Empty { total_frames });
    };

    let jpeg = encode::encode_jpeg(&image, jpeg_quality).map_err(|e| {
        AuditError::FrameEncodeFailed {
            index,
            detail: e.to_string(),
        }
    })?;

    let mut frame_file = tempfile::Builder::new()
        .prefix("audit_frame-")
        .suffix(".jpg")
        .tempfile_in(work_dir)
        .map_err(|e| AuditError::io("creating frame file", e))?;
    frame_file
        .write_all(&jpeg)
        .and_then(|_| frame_file.flush())
        .map_err(|e| AuditError::io("writing frame file", e))?;

    info!(
        "Sampled frame {}/{} ({}x{})",
        index,
        total_frames,
        image.width(),
        image.height()
    );

    Ok(Sampled::Frame(SampledFrame {
        index,
        total_frames,
        width: image.width(),
        height: image.height(),
        path: frame_file.into_temp_path(),
    }))
    // `video_path` drops here and removes the temp video.
}

// ── ffmpeg backend ───────────────────────────────────────────────────────────

/// [`FrameDecoder`] that shells out to `ffprobe` and `ffmpeg`.
#[derive(Debug, Clone)]
pub struct FfmpegDecoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegDecoder {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegDecoder {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Check that both tools can be executed.
    pub fn is_available(&self) -> bool {
        [&self.ffmpeg, &self.ffprobe].iter().all(|tool| {
            Command::new(tool)
                .arg("-version")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false)
        })
    }
}

impl FrameDecoder for FfmpegDecoder {
    fn frame_count(&self, path: &Path) -> Result<u64, AuditError> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error", "-select_streams", "v:0"])
            .args(["-show_entries", "stream=nb_frames,avg_frame_rate,duration"])
            .args(["-of", "json"])
            .arg(path)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    AuditError::VideoToolNotFound {
                        tool: self.ffprobe.display().to_string(),
                    }
                } else {
                    AuditError::VideoOpenFailed {
                        detail: format!("ffprobe failed to start: {e}"),
                    }
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AuditError::VideoOpenFailed {
                detail: first_line(&stderr),
            });
        }

        parse_probe(&output.stdout)
    }

    fn decode_frame(&self, path: &Path, index: u64) -> Option<DynamicImage> {
        let output = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .arg("-vf")
            .arg(format!("select=eq(n\\,{index})"))
            .args(["-frames:v", "1", "-f", "image2pipe", "-c:v", "png", "-"])
            .output();

        let output = match output {
            Ok(o) => o,
            Err(e) => {
                warn!("ffmpeg failed to start: {}", e);
                return None;
            }
        };

        if !output.status.success() || output.stdout.is_empty() {
            debug!(
                "ffmpeg produced no frame {}: {}",
                index,
                first_line(&String::from_utf8_lossy(&output.stderr))
            );
            return None;
        }

        match image::load_from_memory_with_format(&output.stdout, image::ImageFormat::Png) {
            Ok(img) => Some(img),
            Err(e) => {
                warn!("Decoded frame {} is not a readable PNG: {}", index, e);
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    nb_frames: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Frame count from `ffprobe -of json` output.
///
/// Uses the container's `nb_frames` when present; otherwise estimates
/// `duration × avg_frame_rate`.
/// A file with no video stream cannot be opened as a video.
fn parse_probe(stdout: &[u8]) -> Result<u64, AuditError> {
    let probe: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|e| AuditError::VideoOpenFailed {
            detail: format!("unreadable ffprobe output: {e}"),
        })?;

    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| AuditError::VideoOpenFailed {
            detail: "no video stream".into(),
        })?;

    if let Some(n) = stream.nb_frames.as_deref().and_then(|s| s.parse::<u64>().ok()) {
        return Ok(n);
    }

    let duration = stream
        .duration
        .as_deref()
        .and_then(|s| s.parse::<f64>().ok());
    let fps = stream.avg_frame_rate.as_deref().and_then(parse_rate);

    Ok(match (duration, fps) {
        (Some(d), Some(r)) if d > 0.0 && r > 0.0 => (d * r).round() as u64,
        _ => 0,
    })
}

/// Parse an ffprobe rational such as `30000/1001`.
fn parse_rate(s: &str) -> Option<f64> {
    let (num, den) = s.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    (den != 0.0).then(|| num / den)
}

fn first_line(s: &str) -> String {
    s.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("unknown decoder error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_index_is_half_rounded_down() {
        assert_eq!(middle_frame_index(300), Some(150));
        assert_eq!(middle_frame_index(7), Some(3));
        assert_eq!(middle_frame_index(1), Some(0));
        assert_eq!(middle_frame_index(0), None);
    }

    #[test]
    fn probe_prefers_nb_frames() {
        let json = br#"{"streams":[{"nb_frames":"241","avg_frame_rate":"30/1","duration":"10.0"}]}"#;
        assert_eq!(parse_probe(json).unwrap(), 241);
    }

    #[test]
    fn probe_estimates_from_duration_and_rate() {
        let json = br#"{"streams":[{"avg_frame_rate":"30000/1001","duration":"10.010000"}]}"#;
        assert_eq!(parse_probe(json).unwrap(), 300);
    }

    #[test]
    fn probe_without_video_stream_is_open_failure() {
        let err = parse_probe(br#"{"streams":[]}"#).unwrap_err();
        assert!(matches!(err, AuditError::VideoOpenFailed { .. }));
        let err = parse_probe(br#"{}"#).unwrap_err();
        assert!(matches!(err, AuditError::VideoOpenFailed { .. }));
    }

    #[test]
    fn probe_with_no_timing_reports_zero() {
        let json = br#"{"streams":[{"nb_frames":"N/A","avg_frame_rate":"0/0"}]}"#;
        assert_eq!(parse_probe(json).unwrap(), 0);
    }

    #[test]
    fn rate_parsing() {
        assert_eq!(parse_rate("25/1"), Some(25.0));
        assert_eq!(parse_rate("0/0"), None);
        assert_eq!(parse_rate("abc"), None);
    }

    #[test]
    fn first_line_skips_blanks() {
        assert_eq!(
            first_line("\n  \nmoov atom not found\nmore"),
            "moov atom not found"
        );
        assert_eq!(first_line(""), "unknown decoder error");
    }

    #[test]
    fn missing_ffprobe_is_tool_not_found() {
        let decoder = FfmpegDecoder::new(
            "/nonexistent/sentinai-ffmpeg",
            "/nonexistent/sentinai-ffprobe",
        );
        let err = decoder.frame_count(Path::new("clip.mp4")).unwrap_err();
        assert!(matches!(err, AuditError::VideoToolNotFound { .. }));
        assert!(!decoder.is_available());
    }
}

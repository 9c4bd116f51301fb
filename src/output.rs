//! Result types produced by an audit run.

use crate::error::StageFailure;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// The rule pulled out of the manual, trimmed. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRule {
    pub text: String,
}

impl ExtractedRule {
    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Free-form text returned by the vision model. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub text: String,
}

impl Verdict {
    /// `true` iff the literal, case-sensitive substring `"PASS"` occurs
    /// anywhere in the text.
    ///
    /// Loose on purpose: "does NOT PASS" also matches. [`Verdict::sections`]
    /// exposes the stricter `STATUS:` reading for reports.
    pub fn is_pass(&self) -> bool {
        self.text.contains("PASS")
    }

    /// Best-effort split of the reply into the sections the prompt asks for.
    pub fn sections(&self) -> VerdictSections {
        let grab = |re: &Regex| {
            re.captures(&self.text)
                .map(|c| c[1].trim().trim_matches('*').trim().to_string())
                .filter(|s| !s.is_empty())
        };
        VerdictSections {
            status: grab(&RE_STATUS).and_then(|s| Status::parse(&s)),
            observation: grab(&RE_OBSERVATION),
            verdict: grab(&RE_VERDICT),
        }
    }
}

static RE_STATUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^[\s*#>-]*STATUS\**\s*:\s*\**\s*([A-Za-z]+)").unwrap());
static RE_OBSERVATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^[\s*#>-]*OBSERVATION\**\s*:\s*(.+)$").unwrap());
static RE_VERDICT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?mi)^[\s*#>-]*VERDICT\**\s*:\s*(.+)$").unwrap());

/// Explicit `STATUS:` value, when the model produced one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Pass,
    Fail,
}

impl Status {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "PASS" => Some(Status::Pass),
            "FAIL" => Some(Status::Fail),
            _ => None,
        }
    }
}

/// Sections recovered from a [`Verdict`]; any of them may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictSections {
    pub status: Option<Status>,
    pub observation: Option<String>,
    pub verdict: Option<String>,
}

/// The frame that was judged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameView {
    /// Zero-based frame index (`total_frames / 2`).
    pub index: u64,
    pub total_frames: u64,
    pub width: u32,
    pub height: u32,
    /// The JPEG bytes that were sent to the model.
    #[serde(skip)]
    pub jpeg: Vec<u8>,
}

impl FrameView {
    /// `data:` URI for embedding the frame in HTML.
    pub fn data_uri(&self) -> String {
        format!("data:image/jpeg;base64,{}", STANDARD.encode(&self.jpeg))
    }
}

/// How a run ended. Fatal errors are `Err(AuditError)` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditOutcome {
    /// The rule could not be extracted; the video was never touched.
    RuleUnavailable { failure: StageFailure },

    /// The decoder could not open the video. No frame, no judgment.
    VideoUnreadable { rule: ExtractedRule, detail: String },

    /// The video opened but yielded no frame (zero frames or a failed
    /// decode). Nothing further is shown.
    NoFrame { rule: ExtractedRule, total_frames: u64 },

    /// The frame was judged; `judgment` carries the verdict or the failure.
    Judged {
        rule: ExtractedRule,
        frame: FrameView,
        judgment: Result<Verdict, StageFailure>,
    },
}

impl AuditOutcome {
    /// The extracted rule, if the run got that far.
    pub fn rule(&self) -> Option<&ExtractedRule> {
        match self {
            AuditOutcome::RuleUnavailable { .. } => None,
            AuditOutcome::VideoUnreadable { rule, .. }
            | AuditOutcome::NoFrame { rule, .. }
            | AuditOutcome::Judged { rule, .. } => Some(rule),
        }
    }

    /// Whether the result block gets the success (green) styling.
    ///
    /// Only a successful verdict can be pass-styled; a failed model call is
    /// never mistaken for a verdict.
    pub fn is_pass_styled(&self) -> bool {
        matches!(
            self,
            AuditOutcome::Judged {
                judgment: Ok(verdict),
                ..
            } if verdict.is_pass()
        )
    }
}

/// Aggregated statistics for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditStats {
    /// [`crate::pipeline::manual::ManualReader::backend_name`] of the reader used.
    pub manual_backend: String,
    pub manual_pages: usize,
    pub manual_chars: usize,
    pub total_frames: Option<u64>,
    pub frame_index: Option<u64>,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub manual_duration_ms: u64,
    pub rule_duration_ms: u64,
    pub frame_duration_ms: u64,
    pub judge_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Complete output of [`crate::audit::Auditor::run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub topic: String,
    pub model: String,
    pub outcome: AuditOutcome,
    pub stats: AuditStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(text: &str) -> Verdict {
        Verdict { text: text.into() }
    }

    #[test]
    fn status_pass_is_pass_styled() {
        assert!(verdict("STATUS: PASS\nOBSERVATION: hands empty").is_pass());
    }

    #[test]
    fn not_pass_still_matches_substring() {
        // Known false positive of the substring rule.
        assert!(verdict("STATUS: FAIL. The worker does NOT PASS inspection.").is_pass());
    }

    #[test]
    fn substring_check_is_case_sensitive() {
        assert!(!verdict("status: pass").is_pass());
        assert!(!verdict("STATUS: FAIL").is_pass());
    }

    #[test]
    fn sections_parse_markdown_decorated_reply() {
        let v = verdict(
            "**STATUS:** FAIL\n**OBSERVATION:** The worker holds a phone.\n**VERDICT:** Non-compliant.",
        );
        let s = v.sections();
        assert_eq!(s.status, Some(Status::Fail));
        assert_eq!(s.observation.as_deref(), Some("The worker holds a phone."));
        assert_eq!(s.verdict.as_deref(), Some("Non-compliant."));
    }

    #[test]
    fn sections_missing_when_format_ignored() {
        let s = verdict("Looks fine to me.").sections();
        assert_eq!(s, VerdictSections::default());
    }

    #[test]
    fn failed_judgment_is_never_pass_styled() {
        let outcome = AuditOutcome::Judged {
            rule: ExtractedRule { text: "r".into() },
            frame: FrameView {
                index: 0,
                total_frames: 1,
                width: 1,
                height: 1,
                jpeg: vec![],
            },
            judgment: Err(StageFailure::ComplianceAnalysis {
                detail: "PASS-through proxy failed".into(),
            }),
        };
        assert!(!outcome.is_pass_styled());
    }

    #[test]
    fn outcome_serialises_with_kind_tag() {
        let outcome = AuditOutcome::NoFrame {
            rule: ExtractedRule { text: "r".into() },
            total_frames: 0,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["kind"], "no_frame");
        assert_eq!(json["total_frames"], 0);
    }
}

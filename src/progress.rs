//! Stage-level progress events for an audit run.
//!
//! The web UI does not need them (the browser just waits for the response),
//! but the CLI drives a spinner from them and tests use them to assert stage
//! ordering. All methods have no-op defaults.

use crate::output::AuditOutcome;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The four pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditStage {
    ManualIngestion,
    RuleExtraction,
    FrameSampling,
    ComplianceJudgment,
}

impl fmt::Display for AuditStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuditStage::ManualIngestion => "Reading manual",
            AuditStage::RuleExtraction => "Extracting rule",
            AuditStage::FrameSampling => "Sampling frame",
            AuditStage::ComplianceJudgment => "Judging compliance",
        };
        f.write_str(label)
    }
}

/// Receives events while [`crate::audit::Auditor::run`] executes.
///
/// Implementations must be `Send + Sync`; the callback is stored in an `Arc`
/// inside [`crate::config::AuditConfig`].
pub trait AuditProgressCallback: Send + Sync {
    /// Called once after inputs are validated, before any stage starts.
    fn on_audit_start(&self, topic: &str) {
        let _ = topic;
    }

    /// Called just before a stage begins.
    fn on_stage_start(&self, stage: AuditStage) {
        let _ = stage;
    }

    /// Called when a stage finishes, successfully or not.
    ///
    /// `detail` is a short human-readable summary ("3 pages", "frame 150/300").
    fn on_stage_complete(&self, stage: AuditStage, detail: &str) {
        let _ = (stage, detail);
    }

    /// Called once with the final outcome. Not called for fatal errors.
    fn on_audit_complete(&self, outcome: &AuditOutcome) {
        let _ = outcome;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AuditProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AuditConfig`].
pub type ProgressCallback = Arc<dyn AuditProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl AuditProgressCallback for Recorder {
        fn on_stage_start(&self, stage: AuditStage) {
            self.events.lock().unwrap().push(format!("start {stage}"));
        }

        fn on_stage_complete(&self, stage: AuditStage, detail: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {stage}: {detail}"));
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_audit_start("mobile phone");
        cb.on_stage_start(AuditStage::ManualIngestion);
        cb.on_stage_complete(AuditStage::ManualIngestion, "2 pages");
    }

    #[test]
    fn recorder_sees_events_in_order() {
        let rec = Recorder::default();
        rec.on_stage_start(AuditStage::FrameSampling);
        rec.on_stage_complete(AuditStage::FrameSampling, "frame 5/10");
        let events = rec.events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                "start Sampling frame".to_string(),
                "done Sampling frame: frame 5/10".to_string()
            ]
        );
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_stage_start(AuditStage::RuleExtraction);
    }
}

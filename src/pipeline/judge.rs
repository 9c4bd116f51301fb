//! Compliance judgment: show the vision model the sampled frame and the rule.

use crate::client::{ModelClient, ModelReply};
use crate::error::StageFailure;
use crate::output::{ExtractedRule, Verdict};
use crate::prompts::compliance_prompt;
use edgequake_llm::ImageData;
use tracing::{debug, warn};

/// Judge one frame against `rule`.
///
/// Like [`crate::pipeline::rule::extract_rule`], failures come back as a
/// value ([`StageFailure::ComplianceAnalysis`]) and an empty reply counts as
/// a failure. The reply text is kept verbatim; classification happens in
/// [`Verdict::is_pass`].
pub async fn analyze_compliance(
    client: &dyn ModelClient,
    frame: ImageData,
    rule: &ExtractedRule,
) -> (Result<Verdict, StageFailure>, ModelReply) {
    let prompt = compliance_prompt(rule.as_str());
    debug!("Compliance prompt: {} chars", prompt.len());

    match client.generate(&prompt, Some(frame)).await {
        Ok(reply) if reply.text.trim().is_empty() => {
            warn!("Compliance analysis returned an empty reply");
            (
                Err(StageFailure::ComplianceAnalysis {
                    detail: "the model returned an empty response".into(),
                }),
                reply,
            )
        }
        Ok(reply) => {
            let verdict = Verdict {
                text: reply.text.clone(),
            };
            (Ok(verdict), reply)
        }
        Err(e) => {
            warn!("Compliance analysis failed: {}", e);
            (
                Err(StageFailure::ComplianceAnalysis { detail: e.message }),
                ModelReply::default(),
            )
        }
    }
}

//! Rule extraction: ask the text model for the one rule about a topic.

use crate::client::{ModelClient, ModelReply};
use crate::error::StageFailure;
use crate::output::ExtractedRule;
use crate::prompts::rule_extraction_prompt;
use tracing::{debug, warn};

/// Extract the rule about `topic` from the manual text.
///
/// Never panics and never propagates: a failed or empty model reply comes
/// back as [`StageFailure::RuleExtraction`]. On success the reply is trimmed
/// and guaranteed non-empty. No retry.
pub async fn extract_rule(
    client: &dyn ModelClient,
    manual_text: &str,
    topic: &str,
) -> (Result<ExtractedRule, StageFailure>, ModelReply) {
    let prompt = rule_extraction_prompt(manual_text, topic);
    debug!("Rule prompt: {} chars, topic '{}'", prompt.len(), topic);

    match client.generate(&prompt, None).await {
        Ok(reply) => {
            let text = reply.text.trim().to_string();
            if text.is_empty() {
                warn!("Rule extraction returned an empty reply");
                let failure = StageFailure::RuleExtraction {
                    detail: "the model returned an empty response".into(),
                };
                return (Err(failure), reply);
            }
            (Ok(ExtractedRule { text }), reply)
        }
        Err(e) => {
            warn!("Rule extraction failed: {}", e);
            (
                Err(StageFailure::RuleExtraction { detail: e.message }),
                ModelReply::default(),
            )
        }
    }
}

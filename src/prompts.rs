//! Prompt templates for the two remote model calls.
//!
//! Both templates embed their inputs verbatim. No escaping is applied, so a
//! manual that itself contains `"""` can blur the boundary of the quoted
//! block.

/// Template for pulling one rule out of the manual.
///
/// `{manual}` and `{topic}` are substituted by [`rule_extraction_prompt`].
pub const RULE_EXTRACTION_TEMPLATE: &str = r#"
Manual Content: """{manual}"""
Extract the specific rule regarding '{topic}'. Summarize in 1 sentence.
"#;

/// Template for judging a single frame against the extracted rule.
///
/// Asks for a `STATUS: PASS` / `STATUS: FAIL` line plus an observation and a
/// verdict. Nothing enforces the format; see [`crate::output::Verdict`].
pub const COMPLIANCE_TEMPLATE: &str = r#"
Rule: "{rule}"
Analyze the image.
If the person follows the rule, output STATUS: PASS.
If they break the rule, output STATUS: FAIL.
Also provide a short OBSERVATION and VERDICT.
"#;

/// Build the rule-extraction prompt.
pub fn rule_extraction_prompt(manual: &str, topic: &str) -> String {
    // Topic first: a manual containing the literal `{topic}` must stay as-is.
    RULE_EXTRACTION_TEMPLATE
        .replacen("{topic}", topic, 1)
        .replacen("{manual}", manual, 1)
}

/// Build the compliance prompt for a rule.
pub fn compliance_prompt(rule: &str) -> String {
    COMPLIANCE_TEMPLATE.replacen("{rule}", rule, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_prompt_embeds_manual_and_topic() {
        let p = rule_extraction_prompt("No phones on the floor.", "mobile phone");
        assert!(p.contains(r#"Manual Content: """No phones on the floor.""""#));
        assert!(p.contains("regarding 'mobile phone'"));
        assert!(p.contains("Summarize in 1 sentence."));
    }

    #[test]
    fn rule_prompt_keeps_braces_in_manual() {
        let p = rule_extraction_prompt("see {topic} table", "helmet");
        assert!(p.contains("see {topic} table"));
        assert!(p.contains("regarding 'helmet'"));
    }

    #[test]
    fn compliance_prompt_requests_status_line() {
        let p = compliance_prompt("Phones are prohibited.");
        assert!(p.contains(r#"Rule: "Phones are prohibited.""#));
        assert!(p.contains("STATUS: PASS"));
        assert!(p.contains("STATUS: FAIL"));
        assert!(p.contains("OBSERVATION and VERDICT"));
    }
}

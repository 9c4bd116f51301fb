//! HTML for the page and the results fragment.
//!
//! Everything that came from a user or a model goes through [`escape_html`].

use crate::output::{AuditOutcome, AuditReport, ExtractedRule, FrameView};

const INDEX_HTML: &str = include_str!("ui/index.html");

/// Escape `&`, `<`, `>`, `"` and `'`.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// The full page, with the sidebar and the topic field filled in.
pub fn index_page(model: &str, default_topic: &str, credential_loaded: bool) -> String {
    let key_status = if credential_loaded {
        r#"<div class="banner success">API Key Loaded ✅</div>"#
    } else {
        r#"<div class="banner error">API Key Missing! Please check your .env file.</div>"#
    };
    INDEX_HTML
        .replace("{{KEY_STATUS}}", key_status)
        .replace("{{MODEL}}", &escape_html(model))
        .replace("{{DEFAULT_TOPIC}}", &escape_html(default_topic))
}

pub fn warning_banner(message: &str) -> String {
    banner("warning", &escape_html(message))
}

pub fn error_banner(message: &str) -> String {
    banner("error", &escape_html(message))
}

fn banner(kind: &str, inner_html: &str) -> String {
    format!(r#"<div class="banner {kind}">{inner_html}</div>"#)
}

fn rule_banner(rule: &ExtractedRule) -> String {
    banner(
        "success",
        &format!(
            "<strong>Extracted Rule:</strong> {}",
            escape_html(rule.as_str())
        ),
    )
}

/// Results area for a finished run.
pub fn report_fragment(report: &AuditReport) -> String {
    match &report.outcome {
        AuditOutcome::RuleUnavailable { failure } => error_banner(&failure.to_string()),
        AuditOutcome::VideoUnreadable { rule, detail } => format!(
            "{}{}",
            rule_banner(rule),
            banner(
                "error",
                &format!(
                    "Error: Could not load video file.<br><small>{}</small>",
                    escape_html(detail)
                ),
            )
        ),
        // Nothing past the rule when the clip yields no frame.
        AuditOutcome::NoFrame { rule, .. } => rule_banner(rule),
        AuditOutcome::Judged {
            rule,
            frame,
            judgment,
        } => {
            let (kind, text) = match judgment {
                Ok(verdict) if verdict.is_pass() => ("success", verdict.text.clone()),
                Ok(verdict) => ("error", verdict.text.clone()),
                Err(failure) => ("error", failure.to_string()),
            };
            format!(
                r#"{rule_banner}
<hr>
<h3>📊 Audit Results</h3>
<div class="columns">
  <div class="pane">{frame}</div>
  <div class="pane">
    <p><strong>Applied Rule:</strong></p>
    <blockquote><em>{rule}</em></blockquote>
    <div class="banner {kind} verdict">{text}</div>
  </div>
</div>"#,
                rule_banner = rule_banner(rule),
                frame = frame_figure(frame),
                rule = escape_html(rule.as_str()),
                text = escape_html(&text),
            )
        }
    }
}

fn frame_figure(frame: &FrameView) -> String {
    format!(
        r#"<figure><img src="{}" alt="Analyzed Frame"><figcaption>Analyzed Frame ({} of {}, {}×{})</figcaption></figure>"#,
        frame.data_uri(),
        frame.index,
        frame.total_frames,
        frame.width,
        frame.height
    )
}

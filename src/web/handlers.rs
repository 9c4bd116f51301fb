//! HTTP handlers.

use super::{render, AppState};
use crate::audit::AuditRequest;
use crate::error::AuditError;
use crate::pipeline::input::Upload;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

/// GET /
pub async fn serve_index(State(state): State<AppState>) -> Html<String> {
    let config = state.auditor.config();
    Html(render::index_page(
        state.auditor.model_name(),
        &config.default_topic,
        state.credential_loaded,
    ))
}

/// POST /audit
///
/// Multipart fields: `manual` (PDF), `video` (MP4), `topic` (text). A file
/// field with no content counts as not uploaded. The response body is
/// always an HTML fragment for the results area, also on errors.
pub async fn run_audit(
    State(state): State<AppState>,
    multipart: Multipart,
) -> (StatusCode, Html<String>) {
    let request = match read_form(multipart, &state.auditor.config().default_topic).await {
        Ok(r) => r,
        Err(message) => {
            warn!("Rejected audit form: {}", message);
            return (
                StatusCode::BAD_REQUEST,
                Html(render::error_banner(&message)),
            );
        }
    };

    let _running = state.gate.lock().await;
    match state.auditor.run(request).await {
        Ok(report) => (StatusCode::OK, Html(render::report_fragment(&report))),
        Err(e @ AuditError::MissingInputs { .. }) => {
            info!("Audit not started: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Html(render::warning_banner(&e.to_string())),
            )
        }
        Err(e) => {
            warn!("Audit failed: {}", e);
            (status_for(&e), Html(render::error_banner(&e.to_string())))
        }
    }
}

async fn read_form(mut multipart: Multipart, default_topic: &str) -> Result<AuditRequest, String> {
    let mut manual = None;
    let mut video = None;
    let mut topic = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| e.body_text())? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "manual" | "video" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| e.body_text())?;
                if file_name.is_empty() || bytes.is_empty() {
                    continue;
                }
                let upload = Some(Upload::new(file_name, bytes.to_vec()));
                if name == "manual" {
                    manual = upload;
                } else {
                    video = upload;
                }
            }
            "topic" => {
                topic = Some(field.text().await.map_err(|e| e.body_text())?);
            }
            other => warn!("Ignoring unknown form field '{}'", other),
        }
    }

    Ok(AuditRequest {
        manual,
        video,
        topic: topic.unwrap_or_else(|| default_topic.to_string()),
    })
}

fn status_for(e: &AuditError) -> StatusCode {
    match e {
        AuditError::MissingInputs { .. } | AuditError::InvalidUpload { .. } => {
            StatusCode::BAD_REQUEST
        }
        AuditError::NotAPdf { .. }
        | AuditError::CorruptPdf { .. }
        | AuditError::PasswordRequired { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub model: String,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        model: state.auditor.model_name().to_string(),
    })
}

// src/server.rs
// HTTP front end: every form posts here and is answered with a redirect back to the page

use crate::backtest::{BacktestInputs, SourceMode};
use crate::dashboard::Dashboard;
use crate::errors::DashboardError;
use crate::types::ExportType;
use crate::upload::{FileCandidate, UploadSlot, UploadSource, MAX_UPLOAD_BYTES, TOO_LARGE_MESSAGE};
use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use std::collections::HashMap;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Headroom above the accepted file size so most oversized uploads still
/// reach validation; larger bodies are caught in `multipart_failure`.
const BODY_LIMIT_BYTES: usize = MAX_UPLOAD_BYTES + 10 * 1024 * 1024;

pub fn router(dashboard: Dashboard) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/strategy", post(select_strategy))
        .route("/strategies/reload", post(reload_strategies))
        .route("/upload/:slot", post(upload))
        .route("/backtest", post(run_backtest))
        .route("/export/:mode", post(export))
        .route("/alerts/:id/dismiss", post(dismiss_alert))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .with_state(dashboard)
}

fn back_to_page() -> Redirect {
    Redirect::to("/")
}

async fn index(State(dashboard): State<Dashboard>) -> Html<String> {
    Html(dashboard.page_html().await)
}

async fn health() -> &'static str {
    "OK"
}

async fn select_strategy(
    State(dashboard): State<Dashboard>,
    Form(fields): Form<HashMap<String, String>>,
) -> Redirect {
    let name = fields.get("strategy").map(String::as_str).unwrap_or("");
    if let Err(e) = dashboard.select_strategy(name).await {
        debug!("Strategy selection failed: {}", e);
    }
    back_to_page()
}

async fn reload_strategies(State(dashboard): State<Dashboard>) -> Redirect {
    if let Err(e) = dashboard.load_catalog().await {
        debug!("Catalog reload failed: {}", e);
    }
    back_to_page()
}

async fn upload(
    State(dashboard): State<Dashboard>,
    Path(slot): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let slot: UploadSlot = match slot.parse() {
        Ok(slot) => slot,
        Err(e) => return (StatusCode::NOT_FOUND, e.to_string()).into_response(),
    };

    let mut source = UploadSource::Picker;
    let mut files = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return multipart_failure(&dashboard, slot, e).await,
        };

        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("source") => {
                let raw = field.text().await.unwrap_or_default();
                source = raw.parse().unwrap_or(UploadSource::Picker);
            }
            Some("file") => {
                let name = field.file_name().unwrap_or_default().to_string();
                let mime = field.content_type().unwrap_or_default().to_string();
                match field.bytes().await {
                    // An empty picker submits a nameless part; nothing was chosen
                    Ok(_) if name.is_empty() => {}
                    Ok(bytes) => files.push(FileCandidate::new(name, mime, bytes.to_vec())),
                    Err(e) => return multipart_failure(&dashboard, slot, e).await,
                }
            }
            _ => {}
        }
    }

    let accepted = match source {
        UploadSource::Drop => dashboard.accept_drop(slot, files).await,
        UploadSource::Picker => match files.into_iter().next() {
            Some(file) => dashboard.accept_upload(slot, file, source).await.map(Some),
            None => Ok(None),
        },
    };

    // Progress plays out in the background so the page can show it
    match accepted {
        Ok(Some(pending)) => {
            tokio::spawn(pending.finish());
        }
        Ok(None) => {}
        Err(e) => debug!("Upload into {} rejected: {}", slot, e),
    }
    back_to_page().into_response()
}

/// A body over the request limit is reported like any other oversized file;
/// other malformed bodies are a plain 400.
async fn multipart_failure(dashboard: &Dashboard, slot: UploadSlot, e: MultipartError) -> Response {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("⚠️ Upload for {} exceeded the request limit", slot);
        dashboard
            .reject_upload(slot, &DashboardError::Upload(TOO_LARGE_MESSAGE.to_string()))
            .await;
        return back_to_page().into_response();
    }
    warn!("⚠️ Unreadable upload for {}: {}", slot, e);
    (StatusCode::BAD_REQUEST, e.body_text()).into_response()
}

fn inputs_from(fields: &HashMap<String, String>) -> BacktestInputs {
    let text = |key: &str| fields.get(key).cloned().unwrap_or_default();
    let source = |key: &str| {
        fields
            .get(key)
            .map(|raw| SourceMode::parse(raw))
            .unwrap_or_default()
    };
    BacktestInputs {
        data_source: source("data_source"),
        stock_source: source("stock_source"),
        start_date: text("start_date"),
        end_date: text("end_date"),
        initial_capital: text("initial_capital"),
    }
}

/// Validation answers immediately; the backend call finishes in the background
/// while the page shows the spinner.
async fn run_backtest(
    State(dashboard): State<Dashboard>,
    Form(fields): Form<HashMap<String, String>>,
) -> Redirect {
    match dashboard.submit_backtest(inputs_from(&fields), &fields).await {
        Ok(pending) => {
            tokio::spawn(async move {
                let _ = pending.finish().await;
            });
        }
        Err(e) => debug!("Backtest not started: {}", e),
    }
    back_to_page()
}

async fn export(State(dashboard): State<Dashboard>, Path(mode): Path<String>) -> Response {
    let export_type: ExportType = match mode.parse() {
        Ok(t) => t,
        Err(e) => return (StatusCode::NOT_FOUND, e).into_response(),
    };

    match dashboard.export_results(export_type).await {
        Ok(file) => (
            [
                (header::CONTENT_TYPE, file.content_type),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", file.file_name),
                ),
            ],
            file.bytes,
        )
            .into_response(),
        Err(DashboardError::NoResults) => back_to_page().into_response(),
        Err(e) => {
            error!("❌ Export request failed: {}", e);
            back_to_page().into_response()
        }
    }
}

async fn dismiss_alert(State(dashboard): State<Dashboard>, Path(id): Path<String>) -> Redirect {
    match Uuid::parse_str(&id) {
        Ok(id) => {
            dashboard.dismiss_alert(id).await;
        }
        Err(_) => debug!("Ignoring dismiss for unknown alert id '{}'", id),
    }
    back_to_page()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_from_form_fields() {
        let mut fields = HashMap::new();
        fields.insert("data_source".to_string(), "excel".to_string());
        fields.insert("stock_source".to_string(), "database".to_string());
        fields.insert("start_date".to_string(), "2024-01-01".to_string());
        fields.insert("initial_capital".to_string(), "500000".to_string());

        let inputs = inputs_from(&fields);
        assert_eq!(inputs.data_source, SourceMode::Excel);
        assert_eq!(inputs.stock_source, SourceMode::parse("database"));
        assert_eq!(inputs.start_date, "2024-01-01");
        assert!(inputs.end_date.is_empty());
        assert_eq!(inputs.initial_capital, "500000");
    }

    #[test]
    fn test_missing_source_defaults_to_excel() {
        let inputs = inputs_from(&HashMap::new());
        assert!(inputs.data_source.is_file_based());
        assert!(inputs.stock_source.is_file_based());
    }
}

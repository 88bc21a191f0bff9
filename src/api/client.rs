// src/api/client.rs
// Typed client for the backtest backend REST API

use crate::errors::DashboardError;
use crate::types::{
    BacktestPayload, BacktestResult, ExportRequest, ExportType, ParameterSchema,
    ParametersPayload, StatusInfo, StrategiesPayload, StrategyDescriptor, SystemStatusPayload,
};
use reqwest::multipart::Form;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

const BODY_PREVIEW_CHARS: usize = 200;

/// Raw spreadsheet returned by the export endpoint.
#[derive(Debug, Clone)]
pub struct ExportPayload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, DashboardError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DashboardError::Config(format!("'{}' cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn system_status(&self) -> Result<StatusInfo, DashboardError> {
        let url = self.endpoint(&["api", "system", "status"])?;
        let response = self.client.get(url.clone()).send().await?;
        let payload: SystemStatusPayload = read_envelope(&url, response).await?;
        Ok(payload.status_info)
    }

    pub async fn strategies(&self) -> Result<Vec<StrategyDescriptor>, DashboardError> {
        let url = self.endpoint(&["api", "strategies"])?;
        let response = self.client.get(url.clone()).send().await?;
        let payload: StrategiesPayload = read_envelope(&url, response).await?;
        Ok(payload.strategies)
    }

    pub async fn strategy_parameters(&self, name: &str) -> Result<ParameterSchema, DashboardError> {
        let url = self.endpoint(&["api", "strategy", name, "parameters"])?;
        let response = self.client.get(url.clone()).send().await?;
        let payload: ParametersPayload = read_envelope(&url, response).await?;
        Ok(payload.parameters)
    }

    pub async fn execute_backtest(
        &self,
        form: Form,
        timeout: Option<Duration>,
    ) -> Result<BacktestResult, DashboardError> {
        let url = self.endpoint(&["api", "backtest", "execute"])?;
        let mut request = self.client.post(url.clone()).multipart(form);
        if let Some(limit) = timeout {
            request = request.timeout(limit);
        }
        let response = request.send().await?;
        let payload: BacktestPayload = read_envelope(&url, response).await?;
        Ok(payload.results)
    }

    pub async fn export_excel(
        &self,
        results: &BacktestResult,
        export_type: ExportType,
    ) -> Result<ExportPayload, DashboardError> {
        let url = self.endpoint(&["api", "backtest", "export-excel"])?;
        let body = ExportRequest {
            results,
            export_type,
        };
        let response = self.client.post(url.clone()).json(&body).send().await?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(DashboardError::Http {
                status,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        // A JSON body here is an error envelope, not a spreadsheet
        if content_type
            .as_deref()
            .map(|ct| ct.starts_with("application/json"))
            .unwrap_or(false)
        {
            let text = String::from_utf8_lossy(&bytes);
            return match parse_envelope::<Value>(&text) {
                Ok(_) => Err(DashboardError::Malformed(
                    "expected a spreadsheet, got a JSON document".to_string(),
                )),
                Err(e) => Err(e),
            };
        }

        debug!("✅ POST {} → {} ({} bytes)", url, status, bytes.len());
        Ok(ExportPayload {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

async fn read_envelope<T: DeserializeOwned>(url: &Url, response: Response) -> Result<T, DashboardError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(DashboardError::Http { status, body });
    }

    debug!("✅ {} → {}", url, status);
    parse_envelope(&body)
}

/// Parses a `{status, ...}` envelope. A non-"success" status is an application
/// failure (`Rejected`); a body that is not an envelope or whose payload does
/// not match `T` is `Malformed`.
pub fn parse_envelope<T: DeserializeOwned>(body: &str) -> Result<T, DashboardError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        DashboardError::Malformed(format!("{} (body: {})", e, preview(body)))
    })?;

    let object = value
        .as_object()
        .ok_or_else(|| DashboardError::Malformed(format!("expected a JSON object, got {}", preview(body))))?;

    match object.get("status").and_then(Value::as_str) {
        Some("success") => {}
        Some(other) => {
            let message = ["message", "error", "detail"]
                .iter()
                .find_map(|field| object.get(*field).and_then(Value::as_str))
                .map(str::to_string)
                .unwrap_or_else(|| format!("status '{}'", other));
            return Err(DashboardError::Rejected(message));
        }
        None => {
            return Err(DashboardError::Malformed(
                "response has no 'status' field".to_string(),
            ))
        }
    }

    serde_json::from_value(value).map_err(|e| DashboardError::Malformed(e.to_string()))
}

fn preview(body: &str) -> String {
    if body.chars().count() <= BODY_PREVIEW_CHARS {
        body.to_string()
    } else {
        let cut: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
        format!("{}…", cut)
    }
}

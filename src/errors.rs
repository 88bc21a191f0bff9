// src/errors.rs
// Error taxonomy for the dashboard: client-side validation, upload rejection, backend failures

use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Upload(String),

    #[error("A backtest is already running, please wait...")]
    AlreadyRunning,

    #[error("No backtest results to export")]
    NoResults,

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    /// Well-formed envelope whose `status` field is not "success".
    #[error("Server rejected request: {0}")]
    Rejected(String),

    /// Body that does not match the expected contract.
    #[error("Malformed server response: {0}")]
    Malformed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    /// Text shown to the user in an alert.
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::Http { status, body } => {
                let detail = extract_detail(body);
                match canned_status_message(*status) {
                    Some(canned) if detail.is_empty() => canned.to_string(),
                    Some(canned) => format!("{} ({})", canned, detail),
                    None if detail.is_empty() => format!("Request failed: HTTP {}", status.as_u16()),
                    None => detail,
                }
            }
            DashboardError::Transport(e) => format!("Request failed: {}", e),
            DashboardError::Rejected(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Client-side errors are detected before any network call is made.
    pub fn is_client_side(&self) -> bool {
        matches!(
            self,
            DashboardError::Validation(_)
                | DashboardError::Upload(_)
                | DashboardError::AlreadyRunning
                | DashboardError::NoResults
        )
    }
}

pub fn canned_status_message(status: StatusCode) -> Option<&'static str> {
    match status.as_u16() {
        401 => Some("Please log in first"),
        403 => Some("Permission denied"),
        404 => Some("Requested resource does not exist"),
        500 => Some("Internal server error"),
        _ => None,
    }
}

/// FastAPI reports errors as `{"detail": "..."}`; fall back to the raw body.
pub fn extract_detail(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for field in ["detail", "message", "error"] {
            if let Some(text) = value.get(field).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    trimmed.to_string()
}

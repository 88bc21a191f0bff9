// src/export.rs
// Excel export of the cached backtest result

use crate::alerts::AlertLevel;
use crate::dashboard::Dashboard;
use crate::errors::DashboardError;
use crate::session::SessionEvent;
use crate::types::ExportType;
use crate::upload::XLSX_MIME;
use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const EXPORT_SUCCESS_MESSAGE: &str = "Backtest results exported";

/// A spreadsheet ready to hand to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    /// Writes the file into `dir` (created if needed) and returns its path.
    pub async fn save_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, DashboardError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&self.file_name);
        tokio::fs::write(&path, &self.bytes).await?;
        info!("💾 Saved export to {}", path.display());
        Ok(path)
    }
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("backtest_results_{}.xlsx", date.format("%Y-%m-%d"))
}

impl Dashboard {
    /// Sends the last successful result to the export endpoint. Without a
    /// cached result no request is made.
    pub async fn export_results(&self, export_type: ExportType) -> Result<ExportedFile, DashboardError> {
        let cached = self.read(|s| s.last_result.clone()).await;
        let result = match cached {
            Some(result) => result,
            None => {
                self.alert(AlertLevel::Danger, DashboardError::NoResults.to_string())
                    .await;
                return Err(DashboardError::NoResults);
            }
        };

        info!(
            "📤 Exporting {} trades ({})",
            result.trade_records.len(),
            export_type.as_str()
        );

        match self.api.export_excel(&result, export_type).await {
            Ok(payload) => {
                let file = ExportedFile {
                    file_name: export_file_name(Utc::now().date_naive()),
                    content_type: payload
                        .content_type
                        .filter(|ct| !ct.trim().is_empty())
                        .unwrap_or_else(|| XLSX_MIME.to_string()),
                    bytes: payload.bytes,
                };
                self.alert(AlertLevel::Success, EXPORT_SUCCESS_MESSAGE).await;
                self.emit(SessionEvent::Exported {
                    file_name: file.file_name.clone(),
                });
                Ok(file)
            }
            Err(e) => {
                error!("❌ Export failed: {}", e);
                self.alert(AlertLevel::Danger, format!("Export failed: {}", e.user_message()))
                    .await;
                Err(e)
            }
        }
    }
}

// src/upload.rs
// Spreadsheet upload zones: client-side validation and a simulated progress stream

use crate::alerts::AlertLevel;
use crate::dashboard::Dashboard;
use crate::errors::DashboardError;
use crate::session::SessionEvent;
use rand::Rng;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const XLS_MIME: &str = "application/vnd.ms-excel";
pub const ALLOWED_MIME_TYPES: [&str; 2] = [XLSX_MIME, XLS_MIME];
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub const INVALID_TYPE_MESSAGE: &str = "Only Excel files (.xlsx, .xls) are supported";
pub const TOO_LARGE_MESSAGE: &str = "File size cannot exceed 50MB";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadSlot {
    PriceFile,
    StockFile,
}

impl UploadSlot {
    /// Multipart field name sent to the backend.
    pub fn field_name(&self) -> &'static str {
        match self {
            UploadSlot::PriceFile => "price_file",
            UploadSlot::StockFile => "stock_file",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            UploadSlot::PriceFile => "Price data",
            UploadSlot::StockFile => "Stock list",
        }
    }
}

impl fmt::Display for UploadSlot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

impl FromStr for UploadSlot {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price_file" | "price-file" => Ok(UploadSlot::PriceFile),
            "stock_file" | "stock-file" => Ok(UploadSlot::StockFile),
            other => Err(DashboardError::Validation(format!("Unknown upload slot '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadSource {
    Drop,
    Picker,
}

impl FromStr for UploadSource {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop" => Ok(UploadSource::Drop),
            "picker" | "" => Ok(UploadSource::Picker),
            other => Err(DashboardError::Validation(format!("Unknown upload source '{}'", other))),
        }
    }
}

/// A file offered to a zone, not yet validated.
#[derive(Debug, Clone, PartialEq)]
pub struct FileCandidate {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadZone {
    slot: UploadSlot,
    accepted: Option<AcceptedFile>,
    progress: Option<f64>,
    dragover: bool,
}

impl UploadZone {
    pub fn new(slot: UploadSlot) -> Self {
        Self {
            slot,
            accepted: None,
            progress: None,
            dragover: false,
        }
    }

    pub fn slot(&self) -> UploadSlot {
        self.slot
    }

    pub fn accepted(&self) -> Option<&AcceptedFile> {
        self.accepted.as_ref()
    }

    pub fn has_file(&self) -> bool {
        self.accepted.is_some()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.accepted.as_ref().map(|f| f.name.as_str())
    }

    /// `Some(percent)` while a simulated upload is in progress.
    pub fn progress(&self) -> Option<f64> {
        self.progress
    }

    pub fn is_dragover(&self) -> bool {
        self.dragover
    }

    pub fn drag_enter(&mut self) {
        self.dragover = true;
    }

    pub fn drag_leave(&mut self) {
        self.dragover = false;
    }

    fn begin(&mut self) {
        self.dragover = false;
        self.progress = Some(0.0);
    }

    fn finish(&mut self, file: AcceptedFile) {
        self.progress = None;
        self.accepted = Some(file);
    }

    pub fn clear(&mut self) {
        self.accepted = None;
        self.progress = None;
        self.dragover = false;
    }
}

pub fn validate_candidate(file: &FileCandidate) -> Result<(), DashboardError> {
    if !ALLOWED_MIME_TYPES.contains(&file.mime.as_str()) {
        return Err(DashboardError::Upload(INVALID_TYPE_MESSAGE.to_string()));
    }
    if file.size() > MAX_UPLOAD_BYTES {
        return Err(DashboardError::Upload(TOO_LARGE_MESSAGE.to_string()));
    }
    Ok(())
}

/// Progress percentages rising by a random step every `tick` until 100.
/// Not tied to any real transfer; the file goes to the backend with the backtest.
pub fn spawn_simulated_progress(tick: Duration) -> watch::Receiver<f64> {
    let (tx, rx) = watch::channel(0.0_f64);
    tokio::spawn(async move {
        let mut progress = 0.0_f64;
        while progress < 100.0 {
            tokio::time::sleep(tick).await;
            let step: f64 = rand::thread_rng().gen_range(1.0..20.0);
            progress = (progress + step).min(100.0);
            if tx.send(progress).is_err() {
                break;
            }
        }
    });
    rx
}

/// A validated file whose zone is showing progress but has not accepted it yet.
#[derive(Debug)]
pub struct PendingUpload {
    dashboard: Dashboard,
    slot: UploadSlot,
    file: FileCandidate,
}

impl PendingUpload {
    pub fn slot(&self) -> UploadSlot {
        self.slot
    }

    /// Plays the simulated progress to 100, then accepts the file into its zone.
    pub async fn finish(self) {
        let PendingUpload {
            dashboard,
            slot,
            file,
        } = self;

        let mut progress = spawn_simulated_progress(dashboard.config.upload_tick);
        while progress.changed().await.is_ok() {
            let percent = *progress.borrow_and_update();
            dashboard
                .update(|s| s.upload_mut(slot).progress = Some(percent))
                .await;
            dashboard.emit(SessionEvent::UploadProgress { slot, percent });
            if percent >= 100.0 {
                break;
            }
        }

        let file_name = file.name.clone();
        dashboard
            .update(|s| {
                s.upload_mut(slot).finish(AcceptedFile {
                    name: file.name,
                    mime: file.mime,
                    bytes: file.bytes,
                })
            })
            .await;

        info!("📁 Accepted {} for {}", file_name, slot);
        dashboard
            .alert(AlertLevel::Success, format!("File uploaded: {}", file_name))
            .await;
        dashboard.emit(SessionEvent::UploadAccepted { slot, file_name });
    }
}

impl Dashboard {
    pub async fn drag_enter(&self, slot: UploadSlot) {
        self.update(|s| s.upload_mut(slot).drag_enter()).await;
    }

    pub async fn drag_leave(&self, slot: UploadSlot) {
        self.update(|s| s.upload_mut(slot).drag_leave()).await;
    }

    /// A drop takes the first file; an empty drop does nothing.
    pub async fn drop_files(&self, slot: UploadSlot, files: Vec<FileCandidate>) -> Result<(), DashboardError> {
        if let Some(pending) = self.accept_drop(slot, files).await? {
            pending.finish().await;
        }
        Ok(())
    }

    pub async fn accept_drop(
        &self,
        slot: UploadSlot,
        files: Vec<FileCandidate>,
    ) -> Result<Option<PendingUpload>, DashboardError> {
        self.drag_leave(slot).await;
        match files.into_iter().next() {
            Some(first) => self.accept_upload(slot, first, UploadSource::Drop).await.map(Some),
            None => Ok(None),
        }
    }

    /// Validates and accepts a file into a zone. A rejected file leaves the
    /// zone's previously accepted file in place.
    pub async fn upload_file(
        &self,
        slot: UploadSlot,
        file: FileCandidate,
        source: UploadSource,
    ) -> Result<(), DashboardError> {
        self.accept_upload(slot, file, source).await?.finish().await;
        Ok(())
    }

    /// Validation only; the zone starts showing progress at 0%.
    pub async fn accept_upload(
        &self,
        slot: UploadSlot,
        file: FileCandidate,
        source: UploadSource,
    ) -> Result<PendingUpload, DashboardError> {
        if let Err(e) = validate_candidate(&file) {
            self.reject_upload(slot, &e).await;
            return Err(e);
        }

        debug!("📁 {:?} {} ({} bytes) into {}", source, file.name, file.size(), slot);
        self.update(|s| s.upload_mut(slot).begin()).await;
        Ok(PendingUpload {
            dashboard: self.clone(),
            slot,
            file,
        })
    }

    /// Shows the rejection and leaves the zone's accepted file untouched.
    pub async fn reject_upload(&self, slot: UploadSlot, error: &DashboardError) {
        self.drag_leave(slot).await;
        self.alert(AlertLevel::Danger, error.user_message()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_mime_and_size() {
        assert!(validate_candidate(&FileCandidate::new("p.xlsx", XLSX_MIME, vec![0; 10])).is_ok());
        assert!(validate_candidate(&FileCandidate::new("p.xls", XLS_MIME, vec![0; 10])).is_ok());

        let csv = validate_candidate(&FileCandidate::new("p.csv", "text/csv", vec![0; 10]));
        assert_eq!(csv.unwrap_err().user_message(), INVALID_TYPE_MESSAGE);

        let big = FileCandidate::new("big.xlsx", XLSX_MIME, vec![0; MAX_UPLOAD_BYTES + 1]);
        assert_eq!(validate_candidate(&big).unwrap_err().user_message(), TOO_LARGE_MESSAGE);

        let exact = FileCandidate::new("edge.xlsx", XLSX_MIME, vec![0; MAX_UPLOAD_BYTES]);
        assert!(validate_candidate(&exact).is_ok());
    }

    #[test]
    fn test_slot_names() {
        assert_eq!("price-file".parse::<UploadSlot>().unwrap(), UploadSlot::PriceFile);
        assert_eq!("stock_file".parse::<UploadSlot>().unwrap(), UploadSlot::StockFile);
        assert!("logo".parse::<UploadSlot>().is_err());
        assert_eq!("drop".parse::<UploadSource>().unwrap(), UploadSource::Drop);
    }

    #[tokio::test]
    async fn test_simulated_progress_reaches_100() {
        let mut rx = spawn_simulated_progress(Duration::from_millis(1));
        let mut last = 0.0;
        while rx.changed().await.is_ok() {
            let value = *rx.borrow_and_update();
            assert!(value >= last);
            last = value;
            if value >= 100.0 {
                break;
            }
        }
        assert_eq!(last, 100.0);
    }

    #[tokio::test]
    async fn test_accepted_upload_shows_progress_until_finished() {
        let mut config = crate::config::DashboardConfig::for_backend(
            url::Url::parse("http://127.0.0.1:9").unwrap(),
        );
        config.upload_tick = Duration::from_millis(1);
        let dashboard = Dashboard::new(config);

        let pending = dashboard
            .accept_upload(
                UploadSlot::StockFile,
                FileCandidate::new("stocks.xls", XLS_MIME, vec![7; 8]),
                UploadSource::Picker,
            )
            .await
            .unwrap();
        assert_eq!(pending.slot(), UploadSlot::StockFile);

        let html = dashboard.page_html().await;
        assert!(html.contains(r#"http-equiv="refresh""#));
        assert!(html.contains(r#"class="progress-bar""#));
        assert!(dashboard.read(|s| s.uploads_in_progress()).await);

        pending.finish().await;
        let zone = dashboard.read(|s| s.stock_upload.clone()).await;
        assert_eq!(zone.file_name(), Some("stocks.xls"));
        assert!(zone.progress().is_none());
        assert!(!dashboard.page_html().await.contains(r#"http-equiv="refresh""#));
    }
}

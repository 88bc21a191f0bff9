// src/session.rs
// Process-lifetime view state, owned by the Dashboard behind a single lock

use crate::alerts::{AlertCenter, AlertLevel};
use crate::backtest::BacktestInputs;
use crate::params::ParameterForm;
use crate::status::StatusBoard;
use crate::strategy::StrategySelector;
use crate::types::BacktestResult;
use crate::upload::{UploadSlot, UploadZone};
use std::collections::HashMap;
use std::time::Duration;

/// What the results region currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResultsPanel {
    #[default]
    Empty,
    InProgress,
    Rendered(Box<BacktestResult>),
}

/// Change notifications published on the dashboard's broadcast channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatusUpdated,
    CatalogLoaded { count: usize },
    ParametersReplaced { strategy: Option<String> },
    UploadProgress { slot: UploadSlot, percent: f64 },
    UploadAccepted { slot: UploadSlot, file_name: String },
    BacktestStarted { strategy: String },
    BacktestFinished { success: bool },
    Exported { file_name: String },
    AlertRaised { level: AlertLevel, message: String },
}

#[derive(Debug, Clone)]
pub struct AppSession {
    pub status: StatusBoard,
    pub selector: StrategySelector,
    pub form: Option<ParameterForm>,
    pub inputs: BacktestInputs,
    pub price_upload: UploadZone,
    pub stock_upload: UploadZone,
    pub results: ResultsPanel,
    /// Last successful result, kept so export can re-send it without re-running.
    pub last_result: Option<BacktestResult>,
    pub alerts: AlertCenter,
}

impl AppSession {
    pub fn new(alert_ttl: Duration) -> Self {
        Self {
            status: StatusBoard::default(),
            selector: StrategySelector::default(),
            form: None,
            inputs: BacktestInputs::default(),
            price_upload: UploadZone::new(UploadSlot::PriceFile),
            stock_upload: UploadZone::new(UploadSlot::StockFile),
            results: ResultsPanel::Empty,
            last_result: None,
            alerts: AlertCenter::new(alert_ttl),
        }
    }

    /// Records what the user typed into the backtest form and parameter controls.
    pub fn apply_submission(&mut self, inputs: BacktestInputs, fields: &HashMap<String, String>) {
        self.inputs = inputs;
        if let Some(form) = self.form.as_mut() {
            form.apply_submission(fields);
        }
    }

    pub fn selected_strategy(&self) -> Option<&str> {
        self.selector.selected()
    }

    pub fn upload(&self, slot: UploadSlot) -> &UploadZone {
        match slot {
            UploadSlot::PriceFile => &self.price_upload,
            UploadSlot::StockFile => &self.stock_upload,
        }
    }

    pub fn uploads_in_progress(&self) -> bool {
        self.price_upload.progress().is_some() || self.stock_upload.progress().is_some()
    }

    pub fn upload_mut(&mut self, slot: UploadSlot) -> &mut UploadZone {
        match slot {
            UploadSlot::PriceFile => &mut self.price_upload,
            UploadSlot::StockFile => &mut self.stock_upload,
        }
    }
}

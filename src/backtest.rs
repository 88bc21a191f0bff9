// src/backtest.rs
// Backtest submission: single in-flight guard, input validation, multipart payload, result caching

use crate::alerts::AlertLevel;
use crate::dashboard::Dashboard;
use crate::errors::DashboardError;
use crate::params::ParamValue;
use crate::session::{ResultsPanel, SessionEvent};
use crate::types::BacktestResult;
use crate::upload::AcceptedFile;
use chrono::NaiveDate;
use reqwest::multipart::{Form, Part};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

pub const MISSING_STRATEGY_MESSAGE: &str = "Please select a strategy";
pub const MISSING_INPUT_MESSAGE: &str = "Please fill in all backtest parameters";
pub const INVALID_RANGE_MESSAGE: &str = "Invalid backtest date range";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BacktestPhase {
    Idle,
    Submitting,
}

/// Allows at most one backtest in flight. The permit releases the guard when
/// dropped, so every exit path returns to `Idle`.
#[derive(Debug, Clone, Default)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

#[derive(Debug)]
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                running: Arc::clone(&self.running),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> BacktestPhase {
        if self.is_running() {
            BacktestPhase::Submitting
        } else {
            BacktestPhase::Idle
        }
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Where price or stock data comes from. Only `Excel` attaches an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SourceMode {
    #[default]
    Excel,
    Other(String),
}

impl SourceMode {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("excel") {
            SourceMode::Excel
        } else {
            SourceMode::Other(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SourceMode::Excel => "excel",
            SourceMode::Other(s) => s,
        }
    }

    pub fn is_file_based(&self) -> bool {
        matches!(self, SourceMode::Excel)
    }
}

impl fmt::Display for SourceMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backtest form fields as the user typed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestInputs {
    pub data_source: SourceMode,
    pub stock_source: SourceMode,
    pub start_date: String,
    pub end_date: String,
    pub initial_capital: String,
}

/// Everything needed for one submission, checked and parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestRequest {
    pub strategy: String,
    pub parameters: BTreeMap<String, ParamValue>,
    pub data_source: SourceMode,
    pub stock_source: SourceMode,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub price_file: Option<AcceptedFile>,
    pub stock_file: Option<AcceptedFile>,
}

impl BacktestRequest {
    /// Checks presence first (strategy, then dates and capital), then shape.
    pub fn validate(
        strategy: Option<&str>,
        inputs: &BacktestInputs,
        parameters: BTreeMap<String, ParamValue>,
        missing_required: &[&str],
    ) -> Result<Self, DashboardError> {
        let strategy = match strategy.map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => s.to_string(),
            None => return Err(DashboardError::Validation(MISSING_STRATEGY_MESSAGE.to_string())),
        };

        let start = inputs.start_date.trim();
        let end = inputs.end_date.trim();
        let capital = inputs
            .initial_capital
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|c| c.is_finite() && *c != 0.0);

        let initial_capital = match capital {
            Some(c) if !start.is_empty() && !end.is_empty() => c,
            _ => return Err(DashboardError::Validation(MISSING_INPUT_MESSAGE.to_string())),
        };

        if !missing_required.is_empty() {
            return Err(DashboardError::Validation(format!(
                "Please fill in required parameters: {}",
                missing_required.join(", ")
            )));
        }

        let start_date = NaiveDate::parse_from_str(start, "%Y-%m-%d")
            .map_err(|_| DashboardError::Validation(INVALID_RANGE_MESSAGE.to_string()))?;
        let end_date = NaiveDate::parse_from_str(end, "%Y-%m-%d")
            .map_err(|_| DashboardError::Validation(INVALID_RANGE_MESSAGE.to_string()))?;
        if start_date > end_date {
            return Err(DashboardError::Validation(INVALID_RANGE_MESSAGE.to_string()));
        }

        Ok(Self {
            strategy,
            parameters,
            data_source: inputs.data_source.clone(),
            stock_source: inputs.stock_source.clone(),
            start_date,
            end_date,
            initial_capital,
            price_file: None,
            stock_file: None,
        })
    }

    /// Attaches files only for the sources that read from an uploaded spreadsheet.
    pub fn with_files(mut self, price_file: Option<AcceptedFile>, stock_file: Option<AcceptedFile>) -> Self {
        self.price_file = price_file.filter(|_| self.data_source.is_file_based());
        self.stock_file = stock_file.filter(|_| self.stock_source.is_file_based());
        self
    }

    pub fn into_multipart(self) -> Result<Form, DashboardError> {
        let parameters = serde_json::to_string(&self.parameters)
            .map_err(|e| DashboardError::Validation(format!("Unserialisable parameters: {}", e)))?;

        let mut form = Form::new()
            .text("strategy", self.strategy)
            .text("parameters", parameters)
            .text("data_source", self.data_source.as_str().to_string())
            .text("stock_source", self.stock_source.as_str().to_string())
            .text("start_date", self.start_date.format("%Y-%m-%d").to_string())
            .text("end_date", self.end_date.format("%Y-%m-%d").to_string())
            .text("initial_capital", self.initial_capital.to_string());

        if let Some(file) = self.price_file {
            form = form.part("price_file", file_part(file)?);
        }
        if let Some(file) = self.stock_file {
            form = form.part("stock_file", file_part(file)?);
        }
        Ok(form)
    }
}

fn file_part(file: AcceptedFile) -> Result<Part, DashboardError> {
    Ok(Part::bytes(file.bytes)
        .file_name(file.name)
        .mime_str(&file.mime)?)
}

/// A validated submission holding the run guard. Dropping it without
/// calling `finish` releases the guard.
#[derive(Debug)]
pub struct PendingBacktest {
    dashboard: Dashboard,
    strategy: String,
    form: Form,
    _permit: RunPermit,
}

impl PendingBacktest {
    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    /// Posts the payload once and settles the results panel either way.
    pub async fn finish(self) -> Result<BacktestResult, DashboardError> {
        let PendingBacktest {
            dashboard,
            strategy,
            form,
            _permit,
        } = self;

        dashboard.update(|s| s.results = ResultsPanel::InProgress).await;
        dashboard.emit(SessionEvent::BacktestStarted { strategy });

        let started = Instant::now();
        let outcome = dashboard
            .api
            .execute_backtest(form, dashboard.config.backtest_timeout)
            .await;

        match outcome {
            Ok(result) => {
                info!(
                    "✅ Backtest finished in {:?}: {} trades",
                    started.elapsed(),
                    result.trade_records.len()
                );
                dashboard
                    .update(|s| {
                        s.last_result = Some(result.clone());
                        s.results = ResultsPanel::Rendered(Box::new(result.clone()));
                    })
                    .await;
                dashboard.emit(SessionEvent::BacktestFinished { success: true });
                Ok(result)
            }
            Err(e) => {
                error!("❌ Backtest failed after {:?}: {}", started.elapsed(), e);
                dashboard.update(|s| s.results = ResultsPanel::Empty).await;
                dashboard
                    .alert(AlertLevel::Danger, format!("Backtest failed: {}", e.user_message()))
                    .await;
                dashboard.emit(SessionEvent::BacktestFinished { success: false });
                Err(e)
            }
        }
    }
}

impl Dashboard {
    pub fn backtest_phase(&self) -> BacktestPhase {
        self.run_guard.phase()
    }

    /// Runs one backtest with the current selection, parameters, inputs and
    /// uploaded files.
    pub async fn run_backtest(&self) -> Result<BacktestResult, DashboardError> {
        self.begin_backtest().await?.finish().await
    }

    /// Takes the run guard and validates the current inputs without touching
    /// the network. Rejected with a warning if another run is in flight.
    pub async fn begin_backtest(&self) -> Result<PendingBacktest, DashboardError> {
        self.start_backtest(None).await
    }

    /// Like `begin_backtest`, but records a submitted form first. The form is
    /// written only once the guard is held, so a rejected submit never alters
    /// the inputs of the run in flight.
    pub async fn submit_backtest(
        &self,
        inputs: BacktestInputs,
        fields: &HashMap<String, String>,
    ) -> Result<PendingBacktest, DashboardError> {
        self.start_backtest(Some((inputs, fields))).await
    }

    async fn start_backtest(
        &self,
        submission: Option<(BacktestInputs, &HashMap<String, String>)>,
    ) -> Result<PendingBacktest, DashboardError> {
        let permit = match self.run_guard.try_acquire() {
            Some(permit) => permit,
            None => {
                self.alert(AlertLevel::Warning, DashboardError::AlreadyRunning.to_string())
                    .await;
                return Err(DashboardError::AlreadyRunning);
            }
        };

        // Apply and read under one write lock
        let prepared = self
            .update(|s| {
                if let Some((inputs, fields)) = submission {
                    s.apply_submission(inputs, fields);
                }
                let (parameters, missing) = match s.form.as_ref() {
                    Some(form) => (
                        form.collect(),
                        form.missing_required().into_iter().map(str::to_string).collect(),
                    ),
                    None => (BTreeMap::new(), Vec::<String>::new()),
                };
                let missing: Vec<&str> = missing.iter().map(String::as_str).collect();
                BacktestRequest::validate(s.selected_strategy(), &s.inputs, parameters, &missing).map(
                    |request| {
                        request.with_files(
                            s.price_upload.accepted().cloned(),
                            s.stock_upload.accepted().cloned(),
                        )
                    },
                )
            })
            .await;

        let request = match prepared {
            Ok(request) => request,
            Err(e) => {
                self.alert(AlertLevel::Danger, e.user_message()).await;
                return Err(e);
            }
        };

        let strategy = request.strategy.clone();
        info!(
            "🚀 Backtest {} {}..{} capital {} (price file: {}, stock file: {})",
            strategy,
            request.start_date,
            request.end_date,
            request.initial_capital,
            request.price_file.is_some(),
            request.stock_file.is_some()
        );

        let form = match request.into_multipart() {
            Ok(form) => form,
            Err(e) => {
                self.alert(AlertLevel::Danger, format!("Backtest failed: {}", e.user_message()))
                    .await;
                return Err(e);
            }
        };

        Ok(PendingBacktest {
            dashboard: self.clone(),
            strategy,
            form,
            _permit: permit,
        })
    }
}

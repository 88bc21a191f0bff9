// tests/common/mod.rs
// In-process mock of the backtest backend that counts hits per endpoint

#![allow(dead_code)]

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use backtest_dashboard::{Dashboard, DashboardConfig};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use url::Url;

pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Default, Debug)]
pub struct Hits {
    pub status: AtomicUsize,
    pub strategies: AtomicUsize,
    pub parameters: AtomicUsize,
    pub execute: AtomicUsize,
    pub export: AtomicUsize,
}

impl Hits {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// Canned response: status code, content type, body.
#[derive(Clone, Debug)]
pub struct Canned {
    pub code: StatusCode,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Canned {
    pub fn json(value: Value) -> Self {
        Self {
            code: StatusCode::OK,
            content_type: "application/json",
            body: value.to_string().into_bytes(),
        }
    }

    pub fn raw(code: StatusCode, body: &str) -> Self {
        Self {
            code,
            content_type: "text/plain",
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn spreadsheet(bytes: &[u8]) -> Self {
        Self {
            code: StatusCode::OK,
            content_type: XLSX,
            body: bytes.to_vec(),
        }
    }
}

impl IntoResponse for Canned {
    fn into_response(self) -> Response {
        (self.code, [(header::CONTENT_TYPE, self.content_type)], self.body).into_response()
    }
}

#[derive(Clone, Debug)]
pub struct Behavior {
    pub status: Canned,
    pub strategies: Canned,
    pub parameters: Canned,
    pub execute: Canned,
    pub export: Canned,
    /// Execute waits for `MockBackend::release` before answering.
    pub hold_execute: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            status: Canned::json(json!({
                "status": "success",
                "status_info": {
                    "api_status": "normal",
                    "database_status": "normal",
                    "auto_trading_status": "stopped"
                }
            })),
            strategies: Canned::json(json!({
                "status": "success",
                "strategies": [
                    {"name": "ma_cross", "display_name": "MA Cross"},
                    {"name": "rsi_reversal", "display_name": "RSI Reversal"}
                ]
            })),
            parameters: Canned::json(json!({
                "status": "success",
                "parameters": {
                    "period": {"type": "number", "default": 20, "min": 5, "max": 200, "required": true},
                    "ma_type": {"type": "select", "default": "ema", "options": [
                        {"value": "sma", "label": "Simple"},
                        {"value": "ema", "label": "Exponential"}
                    ]},
                    "allow_short": {"type": "boolean", "default": true}
                }
            })),
            execute: Canned::json(json!({
                "status": "success",
                "results": sample_result()
            })),
            export: Canned::spreadsheet(b"PK\x03\x04fake-xlsx"),
            hold_execute: false,
        }
    }
}

pub fn sample_result() -> Value {
    json!({
        "total_trades": 10,
        "win_rate": 0.6,
        "total_profit_loss_rate": 0.125,
        "max_drawdown_rate": 0.08,
        "sharpe_ratio": 1.234,
        "total_profit_loss": 125000,
        "winning_trades": 6,
        "trade_records": [
            {
                "entry_date": "2024-01-02",
                "exit_date": "2024-01-09",
                "stock_id": "2330",
                "trade_direction": "buy",
                "entry_price": 580.0,
                "exit_price": 575.0,
                "shares": 100,
                "profit_loss": -500,
                "profit_loss_rate": -0.0086,
                "net_profit_loss": -620
            }
        ]
    })
}

/// One multipart part seen by the execute endpoint.
#[derive(Clone, Debug)]
pub struct CapturedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub text: Option<String>,
}

#[derive(Clone)]
pub struct MockState {
    pub hits: Arc<Hits>,
    pub behavior: Arc<Behavior>,
    pub release: Arc<Notify>,
    pub parts: Arc<Mutex<Vec<CapturedPart>>>,
    pub export_body: Arc<Mutex<Option<Value>>>,
}

pub struct MockBackend {
    pub base_url: Url,
    pub state: MockState,
}

impl MockBackend {
    pub async fn start(behavior: Behavior) -> Self {
        let state = MockState {
            hits: Arc::new(Hits::default()),
            behavior: Arc::new(behavior),
            release: Arc::new(Notify::new()),
            parts: Arc::new(Mutex::new(Vec::new())),
            export_body: Arc::new(Mutex::new(None)),
        };

        let app = Router::new()
            .route("/api/system/status", get(status))
            .route("/api/strategies", get(strategies))
            .route("/api/strategy/:name/parameters", get(parameters))
            .route("/api/backtest/execute", post(execute))
            .route("/api/backtest/export-excel", post(export))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: Url::parse(&format!("http://{}", addr)).unwrap(),
            state,
        }
    }

    pub fn hits(&self) -> &Hits {
        &self.state.hits
    }

    pub fn release(&self) {
        self.state.release.notify_one();
    }

    pub fn config(&self) -> DashboardConfig {
        let mut config = DashboardConfig::for_backend(self.base_url.clone());
        config.upload_tick = Duration::from_millis(1);
        config.alert_ttl = Duration::from_secs(60);
        config
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard::new(self.config())
    }

    pub async fn parts(&self) -> Vec<CapturedPart> {
        self.state.parts.lock().await.clone()
    }

    pub async fn export_body(&self) -> Option<Value> {
        self.state.export_body.lock().await.clone()
    }
}

async fn status(State(state): State<MockState>) -> Canned {
    state.hits.status.fetch_add(1, Ordering::SeqCst);
    state.behavior.status.clone()
}

async fn strategies(State(state): State<MockState>) -> Canned {
    state.hits.strategies.fetch_add(1, Ordering::SeqCst);
    state.behavior.strategies.clone()
}

async fn parameters(State(state): State<MockState>, Path(_name): Path<String>) -> Canned {
    state.hits.parameters.fetch_add(1, Ordering::SeqCst);
    state.behavior.parameters.clone()
}

async fn execute(State(state): State<MockState>, mut multipart: Multipart) -> Canned {
    state.hits.execute.fetch_add(1, Ordering::SeqCst);

    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.unwrap();
        let text = if file_name.is_none() {
            Some(String::from_utf8_lossy(&bytes).into_owned())
        } else {
            None
        };
        parts.push(CapturedPart {
            name,
            file_name,
            text,
        });
    }
    *state.parts.lock().await = parts;

    if state.behavior.hold_execute {
        state.release.notified().await;
    }
    state.behavior.execute.clone()
}

async fn export(State(state): State<MockState>, Json(body): Json<Value>) -> Canned {
    state.hits.export.fetch_add(1, Ordering::SeqCst);
    *state.export_body.lock().await = Some(body);
    state.behavior.export.clone()
}

/// Polls `check` until it holds or a second passes.
pub async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    check()
}

// src/dashboard.rs
// Shared dashboard handle: API client, session state, run guard and change notifications

use crate::alerts::AlertLevel;
use crate::api::ApiClient;
use crate::backtest::{BacktestInputs, RunGuard};
use crate::config::DashboardConfig;
use crate::render::render_page;
use crate::session::{AppSession, SessionEvent};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{broadcast, RwLock};
use tracing::info;
use uuid::Uuid;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub(crate) api: ApiClient,
    pub(crate) config: Arc<DashboardConfig>,
    pub(crate) session: Arc<RwLock<AppSession>>,
    pub(crate) run_guard: RunGuard,
    events: broadcast::Sender<SessionEvent>,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        info!("📊 Dashboard using backend {}", config.api_base_url);

        Self {
            api: ApiClient::new(config.api_base_url.clone()),
            session: Arc::new(RwLock::new(AppSession::new(config.alert_ttl))),
            config: Arc::new(config),
            run_guard: RunGuard::default(),
            events,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    /// Runs `f` against the session under the write lock. Never await inside.
    pub async fn update<R>(&self, f: impl FnOnce(&mut AppSession) -> R) -> R {
        let mut session = self.session.write().await;
        f(&mut session)
    }

    pub async fn read<R>(&self, f: impl FnOnce(&AppSession) -> R) -> R {
        let session = self.session.read().await;
        f(&session)
    }

    pub async fn snapshot(&self) -> AppSession {
        self.session.read().await.clone()
    }

    pub fn is_running(&self) -> bool {
        self.run_guard.is_running()
    }

    pub async fn alert(&self, level: AlertLevel, message: impl Into<String>) -> Uuid {
        let message = message.into();
        let id = self
            .update(|s| s.alerts.push(level, message.clone()))
            .await;
        self.emit(SessionEvent::AlertRaised { level, message });
        id
    }

    pub async fn dismiss_alert(&self, id: Uuid) -> bool {
        self.update(|s| s.alerts.dismiss(id)).await
    }

    /// Remembers what the user typed into the backtest form and parameter controls.
    pub async fn apply_form_submission(&self, inputs: BacktestInputs, fields: &HashMap<String, String>) {
        self.update(|s| s.apply_submission(inputs, fields)).await;
    }

    /// Full page for the current state; expired alerts are dropped first.
    pub async fn page_html(&self) -> String {
        let running = self.is_running();
        let mut session = self.session.write().await;
        session.alerts.prune(Instant::now());
        render_page(&session, running)
    }
}

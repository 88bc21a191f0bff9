// src/alerts.rs
// Transient, dismissible user-facing messages

use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Success,
    Danger,
    Warning,
    Info,
}

impl AlertLevel {
    /// Bootstrap contextual class suffix (`alert-{}`).
    pub fn css(&self) -> &'static str {
        match self {
            AlertLevel::Success => "success",
            AlertLevel::Danger => "danger",
            AlertLevel::Warning => "warning",
            AlertLevel::Info => "info",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub id: Uuid,
    pub level: AlertLevel,
    pub message: String,
    pub raised_at: Instant,
}

#[derive(Debug, Clone)]
pub struct AlertCenter {
    alerts: Vec<Alert>,
    ttl: Duration,
}

impl AlertCenter {
    pub fn new(ttl: Duration) -> Self {
        Self {
            alerts: Vec::new(),
            ttl,
        }
    }

    pub fn success(&mut self, message: impl Into<String>) -> Uuid {
        self.push(AlertLevel::Success, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> Uuid {
        self.push(AlertLevel::Danger, message)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> Uuid {
        self.push(AlertLevel::Warning, message)
    }

    pub fn info(&mut self, message: impl Into<String>) -> Uuid {
        self.push(AlertLevel::Info, message)
    }

    /// Newest alert goes first.
    pub fn push(&mut self, level: AlertLevel, message: impl Into<String>) -> Uuid {
        let message = message.into();
        match level {
            AlertLevel::Danger => error!("🚨 {}", message),
            AlertLevel::Warning => warn!("⚠️ {}", message),
            _ => info!("💬 {}", message),
        }

        let now = Instant::now();
        self.prune(now);
        let alert = Alert {
            id: Uuid::new_v4(),
            level,
            message,
            raised_at: now,
        };
        let id = alert.id;
        self.alerts.insert(0, alert);
        id
    }

    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|a| a.id != id);
        self.alerts.len() != before
    }

    pub fn prune(&mut self, now: Instant) {
        let ttl = self.ttl;
        self.alerts
            .retain(|a| now.saturating_duration_since(a.raised_at) < ttl);
    }

    pub fn visible(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn latest(&self) -> Option<&Alert> {
        self.alerts.first()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}

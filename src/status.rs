// src/status.rs
// System status badges and the background poller that keeps them fresh

use crate::dashboard::Dashboard;
use crate::errors::DashboardError;
use crate::session::SessionEvent;
use crate::types::StatusInfo;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeKind {
    Api,
    Database,
    AutoTrading,
}

impl BadgeKind {
    pub fn title(&self) -> &'static str {
        match self {
            BadgeKind::Api => "API",
            BadgeKind::Database => "Database",
            BadgeKind::AutoTrading => "Auto trading",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBadge {
    pub kind: BadgeKind,
    pub label: &'static str,
    pub class: &'static str,
}

impl StatusBadge {
    fn unknown(kind: BadgeKind) -> Self {
        Self {
            kind,
            label: "Checking...",
            class: "badge-secondary",
        }
    }
}

/// Maps a reported status string onto its badge. Anything other than the
/// healthy value (including a missing field) shows as unhealthy.
pub fn badge_for(kind: BadgeKind, status: Option<&str>) -> StatusBadge {
    let (label, class) = match kind {
        BadgeKind::Api | BadgeKind::Database => match status {
            Some("normal") => ("Normal", "badge-success"),
            _ => ("Abnormal", "badge-danger"),
        },
        BadgeKind::AutoTrading => match status {
            Some("running") => ("Running", "badge-success"),
            _ => ("Stopped", "badge-secondary"),
        },
    };
    StatusBadge { kind, label, class }
}

#[derive(Debug, Clone)]
pub struct StatusBoard {
    pub api: StatusBadge,
    pub database: StatusBadge,
    pub auto_trading: StatusBadge,
    pub active_strategies: Option<u32>,
    pub total_strategies: Option<u32>,
    pub system_time: Option<String>,
    pub last_checked: Option<Instant>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self {
            api: StatusBadge::unknown(BadgeKind::Api),
            database: StatusBadge::unknown(BadgeKind::Database),
            auto_trading: StatusBadge::unknown(BadgeKind::AutoTrading),
            active_strategies: None,
            total_strategies: None,
            system_time: None,
            last_checked: None,
        }
    }
}

impl StatusBoard {
    pub fn apply(&mut self, info: &StatusInfo) {
        self.api = badge_for(BadgeKind::Api, info.api_status.as_deref());
        self.database = badge_for(BadgeKind::Database, info.database_status.as_deref());
        self.auto_trading = badge_for(BadgeKind::AutoTrading, info.auto_trading_status.as_deref());
        self.active_strategies = info.active_strategies;
        self.total_strategies = info.total_strategies;
        self.system_time = info.system_time.clone();
        self.last_checked = Some(Instant::now());
    }

    pub fn badges(&self) -> [&StatusBadge; 3] {
        [&self.api, &self.database, &self.auto_trading]
    }
}

impl Dashboard {
    /// One status check. Failures are logged, never shown to the user.
    pub async fn check_system_status(&self) -> Result<(), DashboardError> {
        match self.api.system_status().await {
            Ok(info) => {
                debug!("System status: {:?}", info);
                self.update(|s| s.status.apply(&info)).await;
                self.emit(SessionEvent::StatusUpdated);
                Ok(())
            }
            Err(e) => {
                warn!("⚠️ System status check failed: {}", e);
                Err(e)
            }
        }
    }

    /// Checks immediately, then once per configured interval. Each check runs
    /// in its own task, so a slow response may land after a newer one.
    pub fn spawn_status_poller(&self) -> JoinHandle<()> {
        let dashboard = self.clone();
        let period = self.config.status_poll_interval;
        info!("🩺 Status poller started (every {:?})", period);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let check = dashboard.clone();
                tokio::spawn(async move {
                    let _ = check.check_system_status().await;
                });
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_mapping() {
        assert_eq!(badge_for(BadgeKind::Api, Some("normal")).class, "badge-success");
        assert_eq!(badge_for(BadgeKind::Api, Some("degraded")).label, "Abnormal");
        assert_eq!(badge_for(BadgeKind::Database, None).class, "badge-danger");
        assert_eq!(badge_for(BadgeKind::AutoTrading, Some("running")).label, "Running");
        assert_eq!(badge_for(BadgeKind::AutoTrading, Some("stopped")).class, "badge-secondary");
    }

    #[test]
    fn test_board_apply() {
        let mut board = StatusBoard::default();
        assert_eq!(board.api.label, "Checking...");

        board.apply(&StatusInfo {
            api_status: Some("normal".into()),
            database_status: Some("down".into()),
            auto_trading_status: Some("running".into()),
            active_strategies: Some(2),
            total_strategies: Some(5),
            system_time: None,
        });
        let labels: Vec<&str> = board.badges().iter().map(|b| b.label).collect();
        assert_eq!(labels, vec!["Normal", "Abnormal", "Running"]);
        assert_eq!(board.active_strategies, Some(2));
        assert!(board.last_checked.is_some());
    }
}

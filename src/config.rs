// src/config.rs
// Runtime configuration: .env / environment variables, overridable from the command line

use crate::errors::DashboardError;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(Parser, Debug, Clone)]
#[command(name = "backtest_dashboard", about = "Web dashboard for running and exporting strategy backtests")]
pub struct CliArgs {
    /// Base URL of the backtest backend
    #[arg(long, env = "API_BASE_URL", default_value = "http://127.0.0.1:8000")]
    pub api_base_url: String,

    #[arg(long, env = "DASHBOARD_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "DASHBOARD_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Seconds between system status checks
    #[arg(long, env = "STATUS_POLL_SECS", default_value_t = 30)]
    pub status_poll_secs: u64,

    /// Seconds an alert stays visible
    #[arg(long, env = "ALERT_TTL_SECS", default_value_t = 5)]
    pub alert_ttl_secs: u64,

    /// Tick of the simulated upload progress bar
    #[arg(long, env = "UPLOAD_TICK_MS", default_value_t = 200)]
    pub upload_tick_ms: u64,

    /// Give up on a backtest request after this many seconds (no limit when unset)
    #[arg(long, env = "BACKTEST_TIMEOUT_SECS")]
    pub backtest_timeout_secs: Option<u64>,

    #[arg(long, env = "LOG_DIR", default_value = "logs")]
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub api_base_url: Url,
    pub host: String,
    pub port: u16,
    pub status_poll_interval: Duration,
    pub alert_ttl: Duration,
    pub upload_tick: Duration,
    pub backtest_timeout: Option<Duration>,
    pub log_dir: PathBuf,
}

impl DashboardConfig {
    /// Default settings pointed at `api_base_url`.
    pub fn for_backend(api_base_url: Url) -> Self {
        Self {
            api_base_url,
            host: "127.0.0.1".to_string(),
            port: 3000,
            status_poll_interval: Duration::from_secs(30),
            alert_ttl: Duration::from_secs(5),
            upload_tick: Duration::from_millis(200),
            backtest_timeout: None,
            log_dir: PathBuf::from("logs"),
        }
    }

    /// Environment only (after loading `.env`), ignoring the process arguments.
    pub fn from_env() -> Result<Self, DashboardError> {
        dotenv::dotenv().ok();
        let args = CliArgs::try_parse_from(["backtest_dashboard"])
            .map_err(|e| DashboardError::Config(e.to_string()))?;
        Self::try_from(args)
    }

    pub fn with_api_base_url(mut self, base: &str) -> Result<Self, DashboardError> {
        self.api_base_url = parse_base_url(base)?;
        Ok(self)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl TryFrom<CliArgs> for DashboardConfig {
    type Error = DashboardError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.status_poll_secs == 0 {
            return Err(DashboardError::Config(
                "STATUS_POLL_SECS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_base_url: parse_base_url(&args.api_base_url)?,
            host: args.host,
            port: args.port,
            status_poll_interval: Duration::from_secs(args.status_poll_secs),
            alert_ttl: Duration::from_secs(args.alert_ttl_secs),
            upload_tick: Duration::from_millis(args.upload_tick_ms.max(1)),
            backtest_timeout: args.backtest_timeout_secs.map(Duration::from_secs),
            log_dir: args.log_dir,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, DashboardError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| DashboardError::Config(format!("invalid API_BASE_URL '{}': {}", raw, e)))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(DashboardError::Config(format!(
            "API_BASE_URL must be an http(s) URL, got '{}'",
            raw
        )));
    }
    Ok(url)
}

// src/lib.rs
pub mod alerts;
pub mod api;
pub mod backtest;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod export;
pub mod format;
pub mod params;
pub mod render;
pub mod server;
pub mod session;
pub mod status;
pub mod strategy;
pub mod types;
pub mod upload;

pub use config::{CliArgs, DashboardConfig};
pub use dashboard::Dashboard;
pub use errors::DashboardError;
pub use server::router;

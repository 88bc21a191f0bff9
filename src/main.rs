// src/main.rs
// Backtest dashboard web server

use backtest_dashboard::{router, CliArgs, Dashboard, DashboardConfig};
use clap::Parser;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Console plus a daily rolling file under `log_dir`
fn init_logging(log_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "backtest_dashboard");

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_target(true)
                .with_level(true)
                .with_ansi(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()?;

    println!("📋 Logging initialized:");
    println!("   📄 Daily logs: {}/backtest_dashboard.YYYY-MM-DD", log_dir.display());
    println!("   📺 Console: enabled");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env first so clap sees its values as environment defaults
    if let Err(e) = dotenv::dotenv() {
        println!("Warning: Could not load .env file: {}", e);
    }

    let args = CliArgs::parse();
    let config = DashboardConfig::try_from(args)?;

    if let Err(e) = init_logging(&config.log_dir) {
        eprintln!("Failed to initialize logging: {}", e);
        tracing_subscriber::fmt()
            .with_target(false)
            .with_level(true)
            .init();
    }

    info!("🚀 Starting Backtest Dashboard...");
    info!("⚙️  Configuration:");
    info!("   🔗 Backend: {}", config.api_base_url);
    info!("   🩺 Status poll: {:?}", config.status_poll_interval);
    info!(
        "   ⏱️  Backtest timeout: {}",
        config
            .backtest_timeout
            .map(|t| format!("{:?}", t))
            .unwrap_or_else(|| "none".to_string())
    );

    let bind_address = config.bind_address();
    let dashboard = Dashboard::new(config);
    dashboard.spawn_status_poller();

    let catalog = dashboard.clone();
    tokio::spawn(async move {
        if let Err(e) = catalog.load_catalog().await {
            error!("❌ Initial strategy load failed: {}", e);
        }
    });

    let app = router(dashboard);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!("✅ Dashboard ready at http://{}", bind_address);
    axum::serve(listener, app).await?;

    Ok(())
}

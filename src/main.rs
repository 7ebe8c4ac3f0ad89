mod app;
mod engine;
mod sim;
mod util;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use engine::clock::{MAX_INTERVAL, MIN_INTERVAL};
use engine::session::Session;
use sim::HttpSimulationApi;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Base URL of the traffic simulation server.
    #[arg(long, env = "TRAFFIC_DASH_API_URL", default_value = "http://localhost:5000")]
    api_url: String,

    /// Seconds between automatic simulation steps.
    #[arg(long, env = "TRAFFIC_DASH_INTERVAL", default_value_t = 1.0, value_parser = parse_interval)]
    interval: f64,

    /// Timeout in seconds for each request to the server.
    #[arg(long, env = "TRAFFIC_DASH_REQUEST_TIMEOUT", default_value_t = 10)]
    request_timeout: u64,

    /// Start the simulation clock once the first snapshot arrives.
    #[arg(long, env = "TRAFFIC_DASH_AUTOSTART")]
    autostart: bool,

    /// Default log filter; `RUST_LOG` takes precedence.
    #[arg(long, env = "TRAFFIC_DASH_LOG", default_value = "info")]
    log: String,
}

fn parse_interval(raw: &str) -> Result<f64, String> {
    let secs: f64 = raw
        .parse()
        .map_err(|error| format!("`{raw}` is not a number: {error}"))?;
    let (min, max) = (MIN_INTERVAL.as_secs_f64(), MAX_INTERVAL.as_secs_f64());
    if (min..=max).contains(&secs) {
        Ok(secs)
    } else {
        Err(format!("interval must be between {min} and {max} seconds"))
    }
}

fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log);

    let interval = Duration::from_secs_f64(args.interval);
    let api = HttpSimulationApi::new(&args.api_url, Duration::from_secs(args.request_timeout))
        .with_context(|| format!("failed to set up a client for {}", args.api_url))?;
    info!(api = %api.base_url(), interval_secs = args.interval, "starting dashboard");
    let session = Session::new(Arc::new(api), interval).context("invalid step interval")?;

    let config = app::AppConfig {
        api_url: args.api_url.clone(),
        interval,
        autostart: args.autostart,
    };
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Traffic Control Dashboard",
        options,
        Box::new(move |cc| Ok(Box::new(app::DashboardApp::new(cc, session, config)))),
    )
    .map_err(|error| anyhow!("dashboard window failed: {error}"))
}

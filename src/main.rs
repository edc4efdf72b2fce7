use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dailyhues::{
    analyzer::OpenRouterAnalyzer,
    cache::{AnalysisStore, RequestStore},
    config::{Config, LogFormat},
    services::LookupOrchestrator,
    sources::BingFeedClient,
    web::WebServer,
};

#[derive(Parser)]
#[command(name = "dailyhues")]
#[command(version)]
#[command(about = "AI-extracted color palettes for the daily Bing wallpaper")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Cache directory (overrides config file)
    #[arg(short = 'd', long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Log output format (overrides config file)
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

fn init_logging(level: &str, format: LogFormat) {
    let log_filter = if level == "trace" {
        format!("dailyhues={level},tower_http=trace")
    } else {
        format!("dailyhues={level},tower_http={level}")
    };
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into()),
    );

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging comes up before the config file is loaded (or created)
    let log_format = cli
        .log_format
        .unwrap_or_else(|| Config::configured_log_format(&cli.config));
    init_logging(&cli.log_level, log_format);
    info!("Starting dailyhues v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    // Override config with CLI arguments
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(cache_dir) = cli.cache_dir {
        config.storage.cache_dir = cache_dir;
    }
    config.logging.format = log_format;
    config.validate()?;

    info!("Using cache directory: {}", config.storage.cache_dir.display());

    let request_store = Arc::new(RequestStore::new(&config.storage.cache_dir));
    let analysis_store = Arc::new(AnalysisStore::new(&config.storage.cache_dir));

    // A cold cache is fine; the stores fill up on demand
    if let Err(e) = request_store.load_all().await {
        warn!("Failed to load request cache: {}", e);
    }
    if let Err(e) = analysis_store.load_all().await {
        warn!("Failed to load analysis cache: {}", e);
    }

    if !config.has_api_key() {
        error!(
            "No analyzer API key configured (set OPENROUTER_API_KEY); only already analyzed wallpapers can be served"
        );
    }

    let feed = Arc::new(BingFeedClient::new(&config.feed)?);
    let analyzer = Arc::new(OpenRouterAnalyzer::new(config.analyzer.clone())?);
    let orchestrator = Arc::new(LookupOrchestrator::new(
        request_store,
        analysis_store.clone(),
        feed,
        analyzer,
        config.cache.expiry_interval,
    ));

    if let Some(interval) = config.cache.lock_sweep_interval {
        info!("Fingerprint lock sweep every {}", humantime::format_duration(interval));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let pruned = analysis_store.prune_idle_locks().await;
                if pruned > 0 {
                    debug!("Pruned {} idle fingerprint locks", pruned);
                }
            }
        });
    }

    let web_server = WebServer::new(Arc::new(config), orchestrator)?;

    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );
    web_server.serve().await?;

    Ok(())
}

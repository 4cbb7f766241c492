use anyhow::{Context, Result};
use clap::Parser;
use eaton_ups_exporter::{
    collection::CollectionOrchestrator, config::Config, server, ups::Credentials,
};
use secrecy::SecretString;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/Default.toml")]
    config: String,

    /// JSON file mapping device names to address, user and password
    #[arg(short, long, env = "EATON_UPS_DEVICES", conflicts_with = "address")]
    devices: Option<String>,

    /// Address of a single UPS, e.g. https://ups.local
    #[arg(long, env = "EATON_UPS_ADDRESS")]
    address: Option<String>,

    /// Web UI user of the single UPS
    #[arg(short, long, env = "EATON_UPS_USER")]
    user: Option<String>,

    /// Web UI password of the single UPS
    #[arg(long, env = "EATON_UPS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Name of the single UPS (derived from the device when omitted)
    #[arg(long, requires = "address")]
    name: Option<String>,

    /// Accept self-signed UPS certificates
    #[arg(short = 'k', long)]
    insecure: bool,

    /// Scrape all devices concurrently
    #[arg(short, long)]
    threading: bool,

    /// Login timeout in seconds
    #[arg(long, env = "EATON_UPS_LOGIN_TIMEOUT")]
    login_timeout: Option<u64>,

    /// Port to listen on for metrics
    #[arg(short, long, env = "EXPORTER_PORT")]
    port: Option<u16>,

    /// Address to bind to
    #[arg(short, long, env = "EXPORTER_ADDR")]
    addr: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize tracing
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Eaton UPS Prometheus Exporter v{}",
        env!("CARGO_PKG_VERSION")
    );

    // Load configuration
    let mut config = Config::load(&args.config)?;

    // Override with CLI arguments if provided
    if args.insecure {
        config.exporter.insecure = true;
    }
    if args.threading {
        config.exporter.threading = true;
    }
    if let Some(timeout) = args.login_timeout {
        config.exporter.login_timeout_seconds = timeout;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }

    let orchestrator = match (args.devices, args.address) {
        (Some(path), _) => CollectionOrchestrator::from_json_file(&path, &config.exporter)
            .with_context(|| format!("Failed to load devices from {}", path))?,
        (None, Some(address)) => {
            let user = args.user.context("--user is required together with --address")?;
            let password = args
                .password
                .context("--password or EATON_UPS_PASSWORD is required together with --address")?;
            CollectionOrchestrator::single(
                address,
                Credentials::new(user, SecretString::from(password)),
                args.name,
                &config.exporter,
            )?
        }
        (None, None) => anyhow::bail!("Either --devices or --address must be given"),
    };

    info!("Configuration loaded successfully");
    info!(
        "Monitoring {} UPS device(s), {} collection",
        orchestrator.len(),
        if orchestrator.is_concurrent() {
            "concurrent"
        } else {
            "sequential"
        }
    );
    info!(
        "Metrics endpoint: http://{}:{}/metrics",
        config.server.addr, config.server.port
    );

    // Start the metrics server
    if let Err(e) = server::start(config, orchestrator).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

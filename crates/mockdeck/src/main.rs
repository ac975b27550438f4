use anyhow::Context;
use clap::Parser;
use mockdeck::{MockEngine, MockServer, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Configuration-driven mock and forwarding HTTP endpoints
#[derive(Parser, Debug)]
#[command(name = "mockdeck", author, version, about)]
struct Args {
    /// Server configuration file (YAML or JSON)
    #[arg(short, long, env = "MOCKDECK_CONFIG")]
    config: Option<PathBuf>,

    /// Mock listener port
    #[arg(short, long, env = "MOCKDECK_PORT")]
    port: Option<u16>,

    /// Admin listener port
    #[arg(long, env = "MOCKDECK_ADMIN_PORT")]
    admin_port: Option<u16>,

    /// Workspace file (projects, APIs, rules, callbacks) loaded at startup
    #[arg(short, long, env = "MOCKDECK_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "MOCKDECK_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "MOCKDECK_LOG_JSON")]
    log_json: bool,
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config(args: &Args) -> anyhow::Result<ServerConfig> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ServerConfig::default(),
    };

    if let Some(port) = args.port {
        config.listen.port = port;
    }
    if let Some(port) = args.admin_port {
        config.admin.port = port;
    }
    if let Some(workspace) = &args.workspace {
        config.workspace = Some(workspace.clone());
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json);

    let config = load_config(&args)?;
    let engine = MockEngine::from_config(config).context("Failed to initialize engine")?;
    let server = MockServer::new(Arc::new(engine));

    info!("Starting mockdeck v{}", env!("CARGO_PKG_VERSION"));

    tokio::select! {
        result = server.run() => {
            if let Err(e) = &result {
                error!("Server error: {:#}", e);
            }
            result
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}

//! `feastd`: serves the Feast JSON API over an in-memory store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use feast::api::MemoryStore;
use feast::config::{ConfigLoader, DEFAULT_ENV_PREFIX};
use feast::server::Server;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command-line arguments.
struct Args {
    config: Option<PathBuf>,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    config = args.next().map(PathBuf::from);
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("feastd {VERSION}");
                    std::process::exit(0);
                }
                other => {
                    eprintln!("Unknown argument: {other}");
                    eprintln!("Use --help for usage information");
                    std::process::exit(1);
                }
            }
        }

        Self { config }
    }
}

fn print_help() {
    println!(
        r"feastd - Feast JSON API server

USAGE:
    feastd [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Configuration file (TOML or JSON); defaults to ./feast.toml if present
    -h, --help             Print help information
    -v, --version          Print version information

ENVIRONMENT VARIABLES:
    FEAST__SERVER__HTTP_ADDR          Listen address (default: 0.0.0.0:8080)
    FEAST__SERVER__REQUEST_TIMEOUT_MS Per-request timeout (default: 30000)
    FEAST__SERVER__MAX_BODY_SIZE      Request body limit in bytes (default: 1048576)
    FEAST__API__ENABLED               Serve API requests (default: true)
    FEAST__API__JSONP_ENABLED         Honor _jsonp (default: true)
    FEAST__API__ROUTE_PREFIX          URL prefix (default: /feast/api)
    FEAST__LOGGING__LEVEL             Log filter (default: info)
    FEAST__METRICS__ENABLED           Prometheus exporter (default: false)

A .env file in the working directory is loaded first.
"
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let loader = match &args.config {
        Some(path) => ConfigLoader::new()
            .with_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ConfigLoader::new().with_optional_file("feast.toml")?,
    };
    let config = loader
        .with_dotenv()?
        .with_env_prefix(DEFAULT_ENV_PREFIX)
        .load()
        .context("invalid configuration")?;

    feast::telemetry::init_telemetry(&config.log_config(), &config.metrics_config())
        .context("initializing telemetry")?;

    info!(
        version = VERSION,
        http_addr = %config.server.http_addr,
        route_prefix = %config.api.route_prefix,
        users = config.auth.users.len(),
        "starting feastd"
    );

    let service = feast::build_service(&config, Arc::new(MemoryStore::new()))
        .context("building route table")?;
    Server::new(service).run().await?;

    info!("feastd stopped");
    Ok(())
}

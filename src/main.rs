//! Order Router - Main Entry Point
//!
//! Serves the routing API, or runs a single routing request from the
//! command line.

use clap::{Parser, Subcommand};
use order_router::agent::{Orchestrator, Prompts};
use order_router::api::{self, ApiState};
use order_router::config::RouterConfig;
use order_router::data::{InMemoryRepository, Repository};
use order_router::health::{HealthCheckManager, LlmProviderHealthCheck, RepositoryHealthCheck};
use order_router::llm::provider::LlmProvider;
use order_router::llm::providers::{OpenAiConfig, OpenAiProvider};
use order_router::observability::{init_default_logging, init_logging, LogFormat};
use order_router::tools::ToolSystem;
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn, Level};

/// Multi-agent order routing assistant
#[derive(Parser)]
#[command(name = "order-router")]
#[command(about = "Route orders to a fulfillment location and carrier")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "ORDER_ROUTER_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        host: Option<IpAddr>,
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Route one order and print the JSON outcome
    Route {
        product_id: String,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
        customer_id: String,
        /// Business priority, e.g. MINIMIZE_COST
        #[arg(short, long)]
        priority: Option<String>,
    },
    /// Validate configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Inspect the fulfillment tables
    Data {
        /// Run the cross-table integrity checks
        #[arg(long)]
        check: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.verbose {
        0 => init_default_logging(),
        1 => init_logging(Level::DEBUG, LogFormat::Compact, false),
        _ => init_logging(Level::TRACE, LogFormat::Pretty, true),
    }

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Serve { host, port } => run_server(config, host, port).await,
        Commands::Route {
            product_id,
            quantity,
            customer_id,
            priority,
        } => run_single_route(config, product_id, quantity, customer_id, priority).await,
        Commands::Config { show } => handle_config_command(&config, show),
        Commands::Data { check } => handle_data_command(&config, check),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(2),
        Err(e) => {
            error!("Command failed: {}", e);
            process::exit(1);
        }
    }
}

type CommandResult = Result<bool, Box<dyn std::error::Error>>;

fn load_configuration(
    config_path: Option<&Path>,
) -> Result<RouterConfig, Box<dyn std::error::Error>> {
    if let Some(path) = config_path {
        info!("Loading configuration from: {}", path.display());
        return Ok(RouterConfig::load_from_file(path)?);
    }

    for path_str in ["router.toml", "config/router.toml"] {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!("Loading configuration from: {}", path.display());
            return Ok(RouterConfig::load_from_file(&path)?);
        }
    }

    info!("No configuration file found, using defaults");
    Ok(RouterConfig::default())
}

fn build_repository(config: &RouterConfig) -> Result<Arc<dyn Repository>, Box<dyn std::error::Error>> {
    let repository = match &config.data.fixtures_dir {
        Some(dir) => {
            info!("Loading fixtures from: {}", dir.display());
            InMemoryRepository::load_from_dir(dir)?
        }
        None => InMemoryRepository::seeded()?,
    };

    for violation in repository.check_integrity() {
        warn!(%violation, "Fixture integrity violation");
    }
    Ok(Arc::new(repository))
}

/// Provider factory for creating LLM providers from configuration
struct LlmProviderFactory;

impl LlmProviderFactory {
    fn create_provider(
        config: &RouterConfig,
    ) -> Result<Arc<dyn LlmProvider>, Box<dyn std::error::Error>> {
        match config.llm.provider.to_lowercase().as_str() {
            "openai" => {
                let mut openai_config = OpenAiConfig {
                    api_key: config.get_llm_api_key()?,
                    timeout: Duration::from_secs(config.llm.request_timeout_secs),
                    ..Default::default()
                };
                if let Some(base_url) = &config.llm.base_url {
                    openai_config.base_url = base_url.trim_end_matches('/').to_string();
                }
                Ok(Arc::new(OpenAiProvider::new(openai_config)?))
            }
            other => Err(format!("Unsupported LLM provider: {other}").into()),
        }
    }
}

fn build_orchestrator(
    config: &RouterConfig,
) -> Result<Arc<Orchestrator>, Box<dyn std::error::Error>> {
    let repository = build_repository(config)?;
    let tools = Arc::new(ToolSystem::with_builtin_tools(repository.clone()));
    let llm = LlmProviderFactory::create_provider(config)?;
    let prompts = Arc::new(Prompts::load(config.prompts.dir.as_deref())?);

    info!(
        provider = llm.name(),
        model = %config.llm.model,
        tools = tools.list_tools().len(),
        "Orchestrator ready"
    );
    Ok(Arc::new(Orchestrator::new(
        config, repository, tools, llm, prompts,
    )))
}

async fn run_server(config: RouterConfig, host: Option<IpAddr>, port: Option<u16>) -> CommandResult {
    let orchestrator = build_orchestrator(&config)?;

    let mut health = HealthCheckManager::new();
    health.add_health_check(Box::new(LlmProviderHealthCheck::new(
        orchestrator.llm().clone(),
    )));
    health.add_health_check(Box::new(RepositoryHealthCheck::new(
        orchestrator.repository().clone(),
    )));

    let host = match host {
        Some(host) => host,
        None => config.server.host.parse()?,
    };
    let addr = SocketAddr::new(host, port.unwrap_or(config.server.port));

    let state = Arc::new(ApiState::new(orchestrator, Arc::new(health)));
    api::serve(state, addr, shutdown_signal()).await?;

    info!("Application shutdown complete");
    Ok(true)
}

async fn run_single_route(
    config: RouterConfig,
    product_id: String,
    quantity: i64,
    customer_id: String,
    priority: Option<String>,
) -> CommandResult {
    let orchestrator = build_orchestrator(&config)?;

    let mut order = json!({
        "product_id": product_id,
        "quantity": quantity,
        "customer_id": customer_id,
    });
    if let Some(priority) = priority {
        order["business_priority"] = json!(priority);
    }

    let report = orchestrator.optimize_route(&order).await;
    println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    Ok(report.outcome.is_ok())
}

fn handle_config_command(config: &RouterConfig, show: bool) -> CommandResult {
    config.validate()?;
    info!("Configuration is valid");

    if show {
        println!("{}", toml::to_string_pretty(config)?);
    }
    if config.get_llm_api_key().is_err() {
        warn!(
            env = %config.llm.api_key_env,
            "API key environment variable is not set; serve and route will fail"
        );
    }
    Ok(true)
}

fn handle_data_command(config: &RouterConfig, check: bool) -> CommandResult {
    let repository = build_repository(config)?;

    println!(
        "customers={} locations={} products={} lanes={} orders={} skus={}",
        repository.customers().len(),
        repository.locations().len(),
        repository.products().len(),
        repository.shipping_lanes().len(),
        repository.orders().len(),
        repository.sku_inventory().len(),
    );

    if !check {
        return Ok(true);
    }

    let violations = repository.check_integrity();
    if violations.is_empty() {
        println!("integrity: ok");
        return Ok(true);
    }
    for violation in &violations {
        println!("integrity: {violation}");
    }
    Ok(false)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down gracefully..."),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully..."),
    }
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs, DatabaseConfig, ServerConfig};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use api_ingress::{ApiIngress, ApiIngressConfig};
use axum::Router;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use users::api::rest::{register_routes, UsersApiDoc};
use users::domain::repo::UsersRepository;
use users::domain::service::Service;
use users::infra::storage::{InMemoryUsersRepository, PgConnParams, PgUsersRepository};
use utoipa::OpenApi;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Users Server - REST service for user records
#[derive(Parser)]
#[command(name = "users-server")]
#[command(about = "Users Server - REST service for user records backed by PostgreSQL")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use the in-memory store instead of PostgreSQL
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // CLI args passed down to config/app
    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;

    // Apply CLI overrides (port / verbosity)
    config.apply_cli_overrides(&args);

    // Initialize logging
    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Users Server starting");
    tracing::debug!("Effective configuration: {:?}", config);

    // Print config and exit if requested
    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    // Execute command
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(config, args),
    }
}

fn ingress_config(server: &ServerConfig) -> ApiIngressConfig {
    let request_timeout = match server.timeout_sec {
        0 => DEFAULT_REQUEST_TIMEOUT,
        secs => Duration::from_secs(secs),
    };
    ApiIngressConfig {
        bind_addr: format!("{}:{}", server.host, server.port),
        cors_enabled: server.cors_enabled,
        enable_docs: server.enable_docs,
        request_timeout,
    }
}

fn pg_params(db: &DatabaseConfig) -> PgConnParams {
    PgConnParams {
        host: db.host.clone(),
        port: db.port,
        database: db.name.clone(),
        user: db.user.clone(),
        password: db.password.clone(),
        connect_timeout: Duration::from_secs(db.connect_timeout_sec),
    }
}

/// Pick the store: in-memory with `--mock`, otherwise PostgreSQL from `database`.
fn build_repository(config: &AppConfig, args: &CliArgs) -> Result<Arc<dyn UsersRepository>> {
    if args.mock {
        tracing::warn!("Running with the in-memory store; data is lost on exit");
        return Ok(Arc::new(InMemoryUsersRepository::new()));
    }

    let db = config
        .database
        .as_ref()
        .context("Missing 'database' config section (required unless --mock is given)")?;
    let params = pg_params(db);
    tracing::info!(
        "Using PostgreSQL at {}:{}/{}",
        params.host,
        params.port,
        params.database
    );
    Ok(Arc::new(PgUsersRepository::new(&params)))
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Initializing modules...");

    let repo = build_repository(&config, &args)?;
    let service = Arc::new(Service::new(repo));
    service.bootstrap().await;

    let ingress =
        ApiIngress::new(ingress_config(&config.server)).with_openapi(UsersApiDoc::openapi());
    let router = ingress.build_router(register_routes(Router::new(), service));

    let shutdown = async {
        if let Err(e) = api_ingress::wait_for_shutdown().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signals");
        }
    };
    ingress.bind_and_serve(router, shutdown).await?;

    tracing::info!("Goodbye, and thanks for all the fish.");
    Ok(())
}

fn check_config(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Checking configuration...");

    // AppConfig::load_* already normalized & created home_dir
    let bind_addr = ingress_config(&config.server).bind_addr;
    bind_addr
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid server address '{bind_addr}'"))?;

    if !args.mock && config.database.is_none() {
        anyhow::bail!("Missing 'database' config section (required unless --mock is given)");
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);

    Ok(())
}

//! Fleetgate management API server
//!
//! This is the main entry point for the REST API server. It exposes the
//! group-scoped RBAC engine over a device-fleet management API:
//! - Role and user management
//! - Device inventory with per-caller visibility filtering
//! - Deployments gated by group-scoped permissions
//! - Device configuration endpoints
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (0.0.0.0:8080)
//! cargo run
//!
//! # Start on custom host and port
//! cargo run -- --host 127.0.0.1 --port 9090
//!
//! # Enable debug logging
//! RUST_LOG=debug cargo run
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Logging level (trace, debug, info, warn, error)
//! - `FLEETGATE_HOST`: Server host (default: 0.0.0.0)
//! - `FLEETGATE_PORT`: Server port (default: 8080)
//! - `FLEETGATE_TENANT`: Tenant bootstrapped at startup (default: default)
//! - `FLEETGATE_ADMIN`: Id of the seeded admin user (default: admin)
//! - `FLEETGATE_ADMIN_EMAIL`: Email of the seeded admin user

use anyhow::Result;
use clap::Parser;
use fleetgate_api_server::{server::ServerBuilder, state::AppState};
use fleetgate_authz::TenantId;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Fleetgate management API server
#[derive(Parser, Debug)]
#[command(
    name = "fleetgate-server",
    version,
    about = "Group-scoped RBAC gateway for fleet management",
    long_about = None
)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "FLEETGATE_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short = 'p', long, default_value = "8080", env = "FLEETGATE_PORT")]
    port: u16,

    /// Tenant to bootstrap at startup
    #[arg(long, default_value = "default", env = "FLEETGATE_TENANT")]
    tenant: String,

    /// Id of the seeded admin user
    #[arg(long, default_value = "admin", env = "FLEETGATE_ADMIN")]
    admin: String,

    /// Email of the seeded admin user
    #[arg(
        long,
        default_value = "admin@example.com",
        env = "FLEETGATE_ADMIN_EMAIL"
    )]
    admin_email: String,

    /// Enable JSON logging format
    #[arg(long, env = "FLEETGATE_JSON_LOGS")]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args)?;

    info!("Starting Fleetgate management API server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    info!(tenant = %args.tenant, admin = %args.admin, "Bootstrapping tenant");
    let state = AppState::bootstrap(
        TenantId::new(&args.tenant),
        &args.admin,
        &args.admin_email,
    )
    .await?;

    let server = ServerBuilder::new()
        .host(&args.host)
        .port(args.port)
        .state(state)
        .build()?;

    info!("API documentation: http://{}:{}/api-docs/", args.host, args.port);
    info!("Health check: http://{}:{}/health", args.host, args.port);
    info!("Press Ctrl+C to shutdown gracefully");

    if let Err(e) = server.run().await {
        error!("Server error: {:#}", e);
        std::process::exit(1);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging subsystem
fn init_tracing(args: &Args) -> Result<()> {
    let log_level = args.log_level.parse::<tracing::Level>().unwrap_or_else(|_| {
        eprintln!("Invalid log level '{}', using 'info'", args.log_level);
        tracing::Level::INFO
    });

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "fleetgate_api_server={},fleetgate_authz={},tower_http={}",
            log_level,
            log_level,
            if log_level <= tracing::Level::DEBUG {
                "debug"
            } else {
                "info"
            }
        )
        .into()
    });

    if args.json_logs {
        // JSON structured logging for production
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        // Human-readable logging for development
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }

    Ok(())
}

//! ReasonKit CORS policy tool
//!
//! Inspects an origin policy from the command line and serves its
//! diagnostics endpoints behind the policy's own CORS guard.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use axum::{middleware, Router};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use reasonkit_cors::config::{socket_addr, PolicyConfig};
use reasonkit_cors::cors::{cors_layer, enforce_origin_policy, validate_origin, OriginGuard};
use reasonkit_cors::handlers::{status_router, AppState};
use reasonkit_cors::metrics::OriginMetrics;
use reasonkit_cors::policy::OriginPolicy;

/// ReasonKit CORS policy tool
#[derive(Parser, Debug)]
#[command(name = "rk-cors")]
#[command(author = "ReasonKit Team <team@reasonkit.sh>")]
#[command(version)]
#[command(about = "Origin allow-list evaluation for ReasonKit services")]
struct Args {
    /// JSON configuration file (defaults to REASONKIT_CORS_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Allowed origins, overriding the configured list
    #[arg(short, long, global = true)]
    origins: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate origins against the policy (exit code 1 if any is denied)
    Check {
        /// Origin header values to evaluate
        #[arg(required = true, value_name = "ORIGIN")]
        values: Vec<String>,
    },

    /// Print the effective policy as JSON
    Describe,

    /// Serve the diagnostics endpoints
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "9102")]
        port: u16,

        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let policy = Arc::new(load_policy(&args)?);

    match args.command {
        Command::Check { values } => Ok(check(&policy, &values)),
        Command::Describe => {
            let description = serde_json::to_string_pretty(&policy.describe())?;
            println!("{}", description);
            Ok(ExitCode::SUCCESS)
        }
        Command::Serve { port, host } => {
            serve(policy, &host, port).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_policy(args: &Args) -> anyhow::Result<OriginPolicy> {
    let mut config = match &args.config {
        Some(path) => PolicyConfig::from_json_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => PolicyConfig::from_env().context("reading CORS environment")?,
    };

    if let Some(origins) = &args.origins {
        config = config.with_origins(origins.as_str());
    }

    Ok(config.build_policy())
}

fn check(policy: &OriginPolicy, origins: &[String]) -> ExitCode {
    let mut all_allowed = true;

    for origin in origins {
        let result = validate_origin(policy, origin);
        all_allowed &= result.allowed;
        println!(
            "{} {} ({})",
            if result.allowed { "ALLOW" } else { "DENY " },
            result.origin,
            result.reason
        );
    }

    if all_allowed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn serve(policy: Arc<OriginPolicy>, host: &str, port: u16) -> anyhow::Result<()> {
    let addr = socket_addr(host, port)?;
    let metrics = Arc::new(OriginMetrics::new());
    let state = Arc::new(AppState::new(policy.clone(), metrics.clone()));
    let guard = OriginGuard::new(policy.clone(), metrics);

    let app: Router = status_router(state)
        .layer(cors_layer(policy))
        .layer(middleware::from_fn_with_state(guard, enforce_origin_policy));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;

    tracing::info!("ReasonKit CORS diagnostics listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
    }
}

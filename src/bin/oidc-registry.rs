//! OIDC registry operator CLI.
//!
//! Loads a registry document, validates it and answers questions about it:
//!
//! ```bash
//! # Validate a registry document; exits non-zero on any configuration error
//! oidc-registry --config demos/quickstart.json check
//!
//! # Evaluate a token request
//! oidc-registry --config demos/quickstart.json evaluate \
//!   --client-id spa --grant-type authorization_code --pkce \
//!   --redirect-uri http://localhost:5004/callback.html --scope "openid api1"
//!
//! # Keep a registry loaded and reload it on SIGHUP
//! oidc-registry --config demos/quickstart.json watch
//! ```
//!
//! Exit codes:
//! - 0: Success (or an allowed decision)
//! - 1: General error
//! - 2: Registry could not be loaded
//! - 3: Request denied or client not found

use clap::{Args, Parser, Subcommand, ValueEnum};
use oidc_registry::{
    config::Config,
    errors::{LoadError, LookupError},
    registry::{GrantType, Registry, RequestDescriptor, SharedRegistry, parse_scope},
    storage::{FileRegistrySource, RegistrySource},
};
use serde::Serialize;
use serde_json::json;
use std::{env, path::PathBuf, process, sync::Arc};
use tokio::signal;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(
    name = "oidc-registry",
    about = "Validate and query an OpenID Connect client & resource registry",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    /// Registry document path
    #[arg(
        long,
        short,
        help = "Registry document path (defaults to REGISTRY_PATH, then registry.json)"
    )]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "json-pretty")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON output
    Json,
    /// Pretty-printed JSON output
    JsonPretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate the registry document
    Check,
    /// List scope definitions and discovery metadata
    Scopes,
    /// Show the public fields of one client
    Client(ClientArgs),
    /// Evaluate a token or authorization request
    Evaluate(EvaluateArgs),
    /// Keep the registry loaded and reload it on SIGHUP
    Watch,
}

#[derive(Args)]
struct ClientArgs {
    /// Client identifier
    client_id: String,
}

#[derive(Args)]
struct EvaluateArgs {
    #[arg(long)]
    client_id: String,

    #[arg(
        long,
        help = "client_credentials, authorization_code, hybrid or resource_owner_password"
    )]
    grant_type: GrantType,

    #[arg(long, help = "Client secret presented with the request")]
    secret: Option<String>,

    #[arg(long, help = "Requested scopes as a space-separated string")]
    scope: Option<String>,

    #[arg(long)]
    redirect_uri: Option<String>,

    #[arg(long, help = "Browser origin of a CORS request")]
    origin: Option<String>,

    #[arg(long, help = "The request carried a PKCE code challenge")]
    pkce: bool,
}

/// Application errors
#[derive(Debug)]
enum AppError {
    /// Configuration or output errors
    General(anyhow::Error),
    /// Registry document could not be loaded
    Load(LoadError),
    /// Client is not registered
    Lookup(LookupError),
}

impl AppError {
    fn exit_code(&self) -> i32 {
        match self {
            AppError::General(_) => 1,
            AppError::Load(_) => 2,
            AppError::Lookup(_) => 3,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::General(err) => write!(f, "{}", err),
            AppError::Load(err) => write!(f, "Registry load failed: {}", err),
            AppError::Lookup(err) => write!(f, "{}", err),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            env::var("RUST_LOG").unwrap_or_else(|_| "oidc_registry=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(&cli).await {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("Error: {}", err);
            process::exit(err.exit_code());
        }
    }
}

async fn run(cli: &Cli) -> Result<i32, AppError> {
    let config = Config::new().map_err(AppError::General)?;
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| config.registry_path.as_ref().clone());
    let source = FileRegistrySource::new(path);

    tracing::debug!(version = %config.version, source = %source.describe(), "starting");

    match &cli.command {
        Commands::Check => {
            let registry = Registry::load_from(&source).await.map_err(AppError::Load)?;
            print_output(
                cli,
                &json!({
                    "source": source.describe(),
                    "scopes": registry.scopes().len(),
                    "clients": registry.clients().len(),
                    "loaded_at": registry.loaded_at(),
                }),
            )?;
            Ok(0)
        }
        Commands::Scopes => {
            let registry = Registry::load_from(&source).await.map_err(AppError::Load)?;
            let scopes = registry.scopes();
            print_output(
                cli,
                &json!({
                    "scopes": scopes.definitions().collect::<Vec<_>>(),
                    "scopes_supported": scopes.discovery_scope_names(),
                    "claims_supported": scopes.supported_claims(),
                }),
            )?;
            Ok(0)
        }
        Commands::Client(args) => {
            let registry = Registry::load_from(&source).await.map_err(AppError::Load)?;
            let summary = registry
                .public_info(&args.client_id)
                .map_err(AppError::Lookup)?;
            print_output(cli, &summary)?;
            Ok(0)
        }
        Commands::Evaluate(args) => {
            let registry = Registry::load_from(&source).await.map_err(AppError::Load)?;
            let request = build_request(args);
            let decision = registry.evaluate(&request);
            print_output(
                cli,
                &json!({
                    "result": decision,
                    "error_response": decision.error_response(),
                }),
            )?;
            Ok(if decision.is_allowed() { 0 } else { 3 })
        }
        Commands::Watch => watch(&config, source).await,
    }
}

fn build_request(args: &EvaluateArgs) -> RequestDescriptor {
    let mut request = RequestDescriptor::new(&args.client_id, args.grant_type)
        .with_scopes(args.scope.as_deref().map(parse_scope).unwrap_or_default())
        .with_pkce(args.pkce);
    if let Some(secret) = &args.secret {
        request = request.with_secret(secret);
    }
    if let Some(redirect_uri) = &args.redirect_uri {
        request = request.with_redirect_uri(redirect_uri);
    }
    if let Some(origin) = &args.origin {
        request = request.with_origin(origin);
    }
    request
}

fn print_output<T: Serialize>(cli: &Cli, value: &T) -> Result<(), AppError> {
    let rendered = match cli.format {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value),
    }
    .map_err(|e| AppError::General(e.into()))?;
    println!("{}", rendered);
    Ok(())
}

async fn watch(config: &Config, source: FileRegistrySource) -> Result<i32, AppError> {
    // Startup load failures are fatal; only reloads fall back to the old snapshot.
    let shared = Arc::new(
        SharedRegistry::from_source(&source)
            .await
            .map_err(AppError::Load)?,
    );
    tracing::info!(source = %source.describe(), "registry loaded");

    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    {
        let inner_token = token.clone();

        let ctrl_c = async {
            if let Err(err) = signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut terminate) => {
                    terminate.recv().await;
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tracker.spawn(async move {
            tokio::select! {
                () = inner_token.cancelled() => { },
                _ = terminate => {},
                _ = ctrl_c => {},
            }
            tracing::info!("shutting down");
            inner_token.cancel();
        });
    }

    if *config.reload_on_hangup.as_ref() {
        spawn_reload_task(&tracker, token.clone(), shared.clone(), source);
    }

    tracker.close();
    tracker.wait().await;

    Ok(0)
}

#[cfg(unix)]
fn spawn_reload_task(
    tracker: &TaskTracker,
    token: CancellationToken,
    shared: Arc<SharedRegistry>,
    source: FileRegistrySource,
) {
    tracker.spawn(async move {
        let mut hangup = match signal::unix::signal(signal::unix::SignalKind::hangup()) {
            Ok(hangup) => hangup,
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGHUP handler");
                return;
            }
        };

        loop {
            tokio::select! {
                () = token.cancelled() => break,
                received = hangup.recv() => {
                    if received.is_none() {
                        break;
                    }
                    // Rejected reloads are logged by the registry and keep the old snapshot.
                    if let Ok(registry) = shared.reload(&source).await {
                        tracing::info!(
                            scopes = registry.scopes().len(),
                            clients = registry.clients().len(),
                            "registry reloaded"
                        );
                    }
                }
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_task(
    _tracker: &TaskTracker,
    _token: CancellationToken,
    _shared: Arc<SharedRegistry>,
    _source: FileRegistrySource,
) {
    tracing::warn!("reload on SIGHUP is not supported on this platform");
}

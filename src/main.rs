//! Payment Gate - inbound payment submission and webhook gateway.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

use payment_gate::audit::{AuditLogger, AuditSink, NullAuditLogger};
use payment_gate::auth::{
    InMemoryIdempotencyStore, InboundAuthenticator, RateLimiter, ReplayWindow, SignatureVerifier,
    WebhookAuthenticator,
};
use payment_gate::config::{
    load_secret, Settings, ENV_HMAC_SECRET, ENV_PROVIDER_API_KEY, ENV_WEBHOOK_SECRET,
};
use payment_gate::error::GateError;
use payment_gate::payments::{CheckoutPolicy, CheckoutService, WebhookService};
use payment_gate::provider::{HttpPaymentProvider, SignedHeaderVerifier};
use payment_gate::server::{wait_for_drain, AppState, GateServer};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

type FilterHandle = reload::Handle<EnvFilter, Registry>;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{} {}", NAME, VERSION);
        return ExitCode::SUCCESS;
    }

    let config_path = get_config_path(&args);

    let settings = match Settings::load(&config_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filter_handle = match init_logging(&settings) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Error initializing logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Starting {} v{}", NAME, VERSION);
    info!("Configuration loaded from: {}", config_path);
    info!("Bind address: {}", settings.server.bind_address);
    info!("Log level: {}", settings.logging.level);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(async_main(settings, config_path, filter_handle)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn async_main(
    settings: Settings,
    config_path: String,
    filter_handle: FilterHandle,
) -> Result<(), GateError> {
    // Any missing secret aborts here, before the listener binds.
    let state = build_state(&settings)?;
    let server = GateServer::bind(&settings.server, state).await?;
    let metrics = server.metrics();

    let shutdown = Arc::new(Notify::new());
    let mut server_task = tokio::spawn(server.run(Arc::clone(&shutdown)));

    loop {
        tokio::select! {
            result = &mut server_task => {
                return match result {
                    Ok(result) => result,
                    Err(e) => Err(GateError::Server {
                        message: format!("Server task failed: {}", e),
                    }),
                };
            }
            _ = shutdown_signal() => {
                info!("Shutdown signal received, initiating graceful shutdown...");
                shutdown.notify_waiters();

                let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
                    wait_for_drain(&metrics).await;
                    let _ = (&mut server_task).await;
                })
                .await;

                match drained {
                    Ok(()) => info!("Graceful shutdown complete"),
                    Err(_) => {
                        warn!(
                            "Shutdown timeout after {}s, some requests may be terminated",
                            DRAIN_TIMEOUT.as_secs()
                        );
                        server_task.abort();
                    }
                }
                break;
            }
            _ = reload_signal() => {
                info!("Reload signal received, reloading logging configuration...");
                reload_logging(&config_path, &settings, &filter_handle);
            }
        }
    }

    info!("Gateway stopped");
    Ok(())
}

/// Wire secrets, ledger, provider and services together.
fn build_state(settings: &Settings) -> Result<AppState, GateError> {
    let hmac_secret = load_secret(&settings.security.hmac_secret_path, ENV_HMAC_SECRET)?;
    let webhook_secret = load_secret(&settings.security.webhook_secret_path, ENV_WEBHOOK_SECRET)?;
    let api_key = load_secret(&settings.payments.provider_api_key_path, ENV_PROVIDER_API_KEY)?;

    let window = ReplayWindow::new(Duration::from_secs(settings.security.replay_window_seconds));
    let provider_timeout = Duration::from_secs(settings.payments.provider_timeout_seconds);

    let ledger = Arc::new(InMemoryIdempotencyStore::new(
        Duration::from_secs(settings.idempotency.lease_seconds),
        Duration::from_secs(settings.idempotency.retention_seconds),
    ));
    ledger.start_cleanup_task(Duration::from_secs(
        settings.idempotency.cleanup_interval_seconds,
    ));
    info!(
        retention_seconds = settings.idempotency.retention_seconds,
        lease_seconds = settings.idempotency.lease_seconds,
        "Idempotency ledger ready"
    );

    let provider = Arc::new(HttpPaymentProvider::new(
        &settings.payments.provider_api_base,
        &api_key,
        provider_timeout,
    )?);

    let checkout = CheckoutService::new(
        InboundAuthenticator::new(SignatureVerifier::new(&hmac_secret)?, window),
        ledger.clone(),
        provider,
        CheckoutPolicy::new(
            settings.payments.expected_amount,
            &settings.payments.currency,
            provider_timeout,
        ),
    );

    let webhooks = WebhookService::new(
        WebhookAuthenticator::new(
            Arc::new(SignedHeaderVerifier::new(&webhook_secret)?),
            window,
            provider_timeout,
        ),
        ledger,
    );

    let rate_limiter = Arc::new(RateLimiter::new(
        settings.security.rate_limit_requests,
        settings.security.rate_limit_window_seconds,
    ));
    rate_limiter.start_cleanup_task(Duration::from_secs(60));
    info!(
        max_requests = settings.security.rate_limit_requests,
        window_seconds = settings.security.rate_limit_window_seconds,
        "Per-client rate limiting enabled"
    );

    let audit: Arc<dyn AuditSink> = if settings.audit.enabled {
        match AuditLogger::new(&settings.audit.log_path) {
            Ok(logger) => {
                info!(path = %settings.audit.log_path.display(), "Audit logging enabled");
                Arc::new(logger)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    path = %settings.audit.log_path.display(),
                    "Failed to create audit logger, audit logging disabled"
                );
                Arc::new(NullAuditLogger::new())
            }
        }
    } else {
        info!("Audit logging disabled");
        Arc::new(NullAuditLogger::new())
    };

    Ok(AppState::new(checkout, webhooks, rate_limiter, audit))
}

/// Apply a new log level from the config file. Secrets are never reloaded.
fn reload_logging(config_path: &str, current: &Settings, handle: &FilterHandle) {
    let new_settings = match Settings::load(config_path) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to reload configuration, keeping existing settings");
            return;
        }
    };

    if !new_settings
        .logging
        .format
        .eq_ignore_ascii_case(&current.logging.format)
    {
        warn!("Log format changes require a restart, ignoring");
    }

    match handle.reload(EnvFilter::new(&new_settings.logging.level)) {
        Ok(()) => info!(level = %new_settings.logging.level, "Log level reloaded"),
        Err(e) => error!(error = %e, "Failed to apply new log level"),
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Wait for a reload signal (SIGHUP).
#[cfg(unix)]
async fn reload_signal() {
    match signal::unix::signal(signal::unix::SignalKind::hangup()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            error!(error = %e, "Failed to install SIGHUP handler");
            std::future::pending::<()>().await;
        }
    }
}

/// No-op reload signal for non-Unix platforms.
#[cfg(not(unix))]
async fn reload_signal() {
    std::future::pending::<()>().await;
}

/// Print help message.
fn print_help() {
    println!(
        r#"{} {}
Inbound payment gateway: signed submissions, replay defense and idempotent checkout.

USAGE:
    {} [OPTIONS]

OPTIONS:
    -c, --config <PATH>    Path to configuration file
                           [default: /etc/payment-gate/gate.toml]
    -h, --help             Print help information
    -V, --version          Print version information

ENVIRONMENT:
    {}      Overrides the HMAC secret file
    {}   Overrides the webhook secret file
    {} Overrides the provider API key file
"#,
        NAME, VERSION, NAME, ENV_HMAC_SECRET, ENV_WEBHOOK_SECRET, ENV_PROVIDER_API_KEY
    );
}

/// Get configuration file path from command line arguments.
fn get_config_path(args: &[String]) -> String {
    for (i, arg) in args.iter().enumerate() {
        if (arg == "--config" || arg == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return path.to_string();
        }
    }
    "/etc/payment-gate/gate.toml".to_string()
}

/// Initialize logging based on settings.
///
/// Returns a handle for swapping the level filter at runtime.
fn init_logging(settings: &Settings) -> Result<FilterHandle, Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    let (filter, handle) = reload::Layer::new(env_filter);

    match settings.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json())
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().pretty())
                .try_init()?;
        }
    }

    Ok(handle)
}

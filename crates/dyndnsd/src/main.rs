// # dyndnsd - dynamic DNS daemon
//
// Thin integration layer. All reconcile logic lives in dyndns-core; this
// binary only:
// 1. Reads configuration from flags (each with an environment fallback)
// 2. Initializes logging and the runtime
// 3. Registers the IP source and provider
// 4. Runs the engine until a signal or a fatal error
//
// ## Example
//
// ```bash
// export DDNS_EMAIL=admin@example.com
// export DDNS_TOKEN=your_api_key
//
// dyndnsd --domain example.com --target home.example.com --ttl 120
// ```

use anyhow::Result;
use clap::Parser;
use dyndns_core::config::{DEFAULT_API_URL, DEFAULT_IP_LOOKUP_URL};
use dyndns_core::{
    DdnsConfig, EngineConfig, EngineEvent, ExitReason, HttpTransport, IpLookupConfig,
    ProviderConfig, ProviderRegistry, ReconcileEngine, ReqwestTransport, WriteFailurePolicy,
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (record edit failed under the exit policy)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl From<&ExitReason> for DdnsExitCode {
    fn from(reason: &ExitReason) -> Self {
        match reason {
            ExitReason::Shutdown => DdnsExitCode::CleanShutdown,
            ExitReason::StartupFailed(_) => DdnsExitCode::ConfigError,
            ExitReason::WriteFailed(_) => DdnsExitCode::RuntimeError,
        }
    }
}

/// Keep a Cloudflare A record pointed at this host's public IP
#[derive(Parser)]
#[command(name = "dyndnsd", version, about)]
struct Cli {
    /// Public IP lookup service URL (plain-text response)
    #[arg(long, env = "DDNS_IP_LOOKUP_URL", default_value = DEFAULT_IP_LOOKUP_URL)]
    url: String,

    /// Cloudflare zone
    #[arg(long, env = "DDNS_DOMAIN", default_value = "example.com")]
    domain: String,

    /// Record to keep updated
    #[arg(long, env = "DDNS_TARGET", default_value = "home.example.com")]
    target: String,

    /// E-mail address associated with the API key
    #[arg(long, env = "DDNS_EMAIL", default_value = "admin@example.com")]
    email: String,

    /// API key from the Cloudflare account page
    #[arg(long, env = "DDNS_TOKEN", default_value = "-", hide_env_values = true)]
    token: String,

    /// Record TTL in seconds. 1 = automatic, otherwise between 120 and 86400
    #[arg(long, env = "DDNS_TTL", default_value_t = 120)]
    ttl: u32,

    /// Cloudflare client API endpoint
    #[arg(long, env = "DDNS_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// What to do when a record edit fails: retry (next tick) or exit
    #[arg(long, env = "DDNS_ON_WRITE_FAILURE", default_value = "retry")]
    on_write_failure: WriteFailurePolicy,

    /// Use the lookup response verbatim, even if it is not an IP address
    #[arg(long, env = "DDNS_NO_VALIDATE_IP")]
    no_validate_ip: bool,

    /// Resolve the record but only log edits
    #[arg(long, env = "DDNS_DRY_RUN")]
    dry_run: bool,

    /// Log level
    #[arg(
        long,
        env = "DDNS_LOG_LEVEL",
        default_value = "info",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    log_level: String,
}

impl Cli {
    /// Build the immutable runtime configuration
    fn to_config(&self) -> DdnsConfig {
        DdnsConfig {
            ip_lookup: IpLookupConfig::Http {
                url: self.url.clone(),
                validate: !self.no_validate_ip,
            },
            provider: ProviderConfig::Cloudflare {
                email: self.email.clone(),
                api_token: self.token.clone(),
                domain: self.domain.clone(),
                target: self.target.clone(),
                ttl: self.ttl,
                api_url: self.api_url.clone(),
                dry_run: self.dry_run,
            },
            engine: EngineConfig {
                write_failure_policy: self.on_write_failure,
                ..EngineConfig::default()
            },
        }
    }

    fn log_level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = cli.to_config();
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting dyndnsd");
    info!(
        "Keeping {} in zone {} up to date (lookup: {})",
        config.provider.target(),
        cli.domain,
        cli.url
    );

    // Only one task ever does work, a current-thread runtime is enough
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run_daemon(&config).await {
            Ok(reason) => DdnsExitCode::from(&reason),
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DdnsExitCode::ConfigError
            }
        }
    });

    code.into()
}

/// Wire components together and run the engine
async fn run_daemon(config: &DdnsConfig) -> Result<ExitReason> {
    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);

    let registry = ProviderRegistry::new();
    dyndns_provider_cloudflare::register(&registry, Arc::clone(&transport));
    dyndns_ip_http::register(&registry, transport);

    let ip_source = registry.create_ip_source(&config.ip_lookup)?;
    let provider = registry.create_provider(&config.provider)?;

    let (mut engine, events) = ReconcileEngine::new(ip_source, provider, config)?;
    tokio::spawn(log_events(events));

    let reason = engine.run_until(wait_for_shutdown()).await;
    match reason.error() {
        Some(e) => error!("Engine stopped: {}", e),
        None => info!("Shutting down daemon"),
    }

    Ok(reason)
}

/// Drain engine events into the debug log
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        debug!(?event, "engine event");
    }
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_shutdown() {
    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to set up signal handlers: {}", e);
            std::future::pending::<()>().await;
            return;
        }
    };

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    info!("Received shutdown signal: {}", name);
}

/// Wait for SIGINT (Ctrl-C)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal: SIGINT"),
        Err(e) => {
            error!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

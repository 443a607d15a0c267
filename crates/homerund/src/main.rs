// # homerund - homerun daemon
//
// Thin integration layer: all reconciliation logic lives in homerun-core.
//
// The daemon is responsible for:
// 1. Reading daemon settings from environment variables
// 2. Loading the configuration file
// 3. Initializing logging and the runtime
// 4. Wiring the HTTP resolver and Cloudflare provider into the scheduler
// 5. Running until SIGTERM/SIGINT
//
// ## Configuration
//
// The record to maintain comes from a TOML file:
//
// ```toml
// ip_server = "https://api.ipify.org"
// subdomain = "home"
// domain = "example.com"
// proxy = false
// update_every = 5
// ```
//
// ### Daemon
// - `HOMERUN_CONFIG`: Path to the configuration file (default `config.toml`)
// - `HOMERUN_LOG_LEVEL`: trace, debug, info, warn, error (default `info`)
// - `HOMERUN_MODE`: `live` (default) or `dry-run`
//
// ### Credentials
// - `CLOUDFLARE_API_TOKEN` or `CF_API_TOKEN`: Scoped API token
// - `CF_API_KEY` + `CF_API_EMAIL`: Global API key and account email
//
// ## Example
//
// ```bash
// export HOMERUN_CONFIG=/etc/homerun/config.toml
// export CLOUDFLARE_API_TOKEN=your_token
//
// homerund
// ```

use anyhow::{Context, Result};
use homerun_core::{HomerunConfig, Scheduler};
use homerun_ip_http::HttpIpResolver;
use homerun_provider_cloudflare::CloudflareProvider;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Default configuration file path
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HomerunExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<HomerunExitCode> for ExitCode {
    fn from(code: HomerunExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Settings taken from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
struct DaemonSettings {
    config_path: PathBuf,
    log_level: String,
    mode: String,
}

impl DaemonSettings {
    /// Load settings from environment variables
    fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            config_path: lookup("HOMERUN_CONFIG")
                .filter(|path| !path.is_empty())
                .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
                .into(),
            log_level: lookup("HOMERUN_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            mode: lookup("HOMERUN_MODE").unwrap_or_else(|| "live".to_string()),
        }
    }

    /// Validate the settings
    fn validate(&self) -> Result<()> {
        self.level()?;

        match self.mode.to_lowercase().as_str() {
            "live" | "dry-run" => {}
            _ => anyhow::bail!(
                "HOMERUN_MODE '{}' is not valid. Valid modes: live, dry-run",
                self.mode
            ),
        }

        Ok(())
    }

    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "HOMERUN_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    fn dry_run(&self) -> bool {
        self.mode.eq_ignore_ascii_case("dry-run")
    }
}

fn main() -> ExitCode {
    let settings = DaemonSettings::from_env();

    if let Err(e) = settings.validate() {
        eprintln!("Configuration validation error: {}", e);
        return HomerunExitCode::ConfigError.into();
    }

    let log_level = settings.level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return HomerunExitCode::ConfigError.into();
    }

    info!("Starting homerund daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return HomerunExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(settings)).into()
}

/// Run the daemon
async fn run_daemon(settings: DaemonSettings) -> HomerunExitCode {
    let config = match HomerunConfig::load(&settings.config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return HomerunExitCode::ConfigError;
        }
    };

    info!(
        "Configuration loaded from {}: {}.{} every {} minute(s)",
        settings.config_path.display(),
        config.subdomain,
        config.domain,
        config.update_every
    );

    let scheduler = match build_scheduler(&config, settings.dry_run()) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            error!("Startup error: {:#}", e);
            return HomerunExitCode::ConfigError;
        }
    };

    let shutdown = match shutdown_signal() {
        Ok(shutdown) => shutdown,
        Err(e) => {
            error!("Signal handler error: {:#}", e);
            return HomerunExitCode::RuntimeError;
        }
    };

    match scheduler.run_until(shutdown).await {
        Ok(()) => {
            info!("Shutting down daemon");
            HomerunExitCode::CleanShutdown
        }
        Err(e) => {
            if let Some(hint) = e.hint() {
                error!("{}", hint);
            }
            if e.is_configuration() {
                HomerunExitCode::ConfigError
            } else {
                HomerunExitCode::RuntimeError
            }
        }
    }
}

/// Wire the resolver and provider into a scheduler
fn build_scheduler(config: &HomerunConfig, dry_run: bool) -> Result<Scheduler> {
    let resolver = HttpIpResolver::new(config.ip_server.clone())
        .context("Failed to create IP resolver")?;

    let provider =
        CloudflareProvider::from_env(dry_run).context("Failed to create Cloudflare provider")?;

    if !provider.has_credentials() {
        warn!(
            "No Cloudflare credentials found; every update will fail until \
            CLOUDFLARE_API_TOKEN or CF_API_KEY/CF_API_EMAIL is set"
        );
    }

    if dry_run {
        warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
    }

    // Events are only consumed by tests; dropping the receiver discards them
    let (scheduler, _events) = Scheduler::new(Box::new(resolver), Arc::new(provider), config)?;
    Ok(scheduler)
}

/// Install SIGTERM and SIGINT handlers
///
/// Handlers are installed before the first cycle runs, so a signal during
/// startup is not lost.
///
/// # Returns
///
/// A future that completes when either signal arrives.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()> + Send> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(async move {
        let name = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("Received shutdown signal: {}", name);
    })
}

/// Wait for CTRL-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()> + Send> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received shutdown signal: SIGINT"),
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> DaemonSettings {
        let env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DaemonSettings::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[]);

        assert_eq!(settings.config_path, PathBuf::from("config.toml"));
        assert_eq!(settings.level().unwrap(), Level::INFO);
        assert!(!settings.dry_run());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_dry_run_mode() {
        let settings = settings(&[
            ("HOMERUN_MODE", "DRY-RUN"),
            ("HOMERUN_CONFIG", "/etc/homerun.toml"),
        ]);

        assert!(settings.dry_run());
        assert_eq!(settings.config_path, PathBuf::from("/etc/homerun.toml"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let err = settings(&[("HOMERUN_LOG_LEVEL", "verbose")])
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("HOMERUN_LOG_LEVEL"));
    }

    #[test]
    fn test_invalid_mode_rejected() {
        assert!(settings(&[("HOMERUN_MODE", "staging")]).validate().is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(HomerunExitCode::CleanShutdown as u8, 0);
        assert_eq!(HomerunExitCode::ConfigError as u8, 1);
        assert_eq!(HomerunExitCode::RuntimeError as u8, 2);
    }

    #[tokio::test]
    async fn test_missing_config_file_is_config_error() {
        let settings = settings(&[("HOMERUN_CONFIG", "/nonexistent/homerun/config.toml")]);
        assert_eq!(run_daemon(settings).await, HomerunExitCode::ConfigError);
    }

    #[test]
    fn test_build_scheduler_without_credentials() {
        let config = HomerunConfig {
            ip_server: "http://127.0.0.1:1/ip".to_string(),
            subdomain: "home".to_string(),
            domain: "example.com".to_string(),
            proxy: false,
            update_every: 5,
        };

        // Missing credentials only warn; the failure surfaces per cycle
        let scheduler = build_scheduler(&config, true).unwrap();
        assert_eq!(scheduler.record().fqdn(), "home.example.com");
    }
}

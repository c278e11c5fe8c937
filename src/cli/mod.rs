//! Command-line interface for the relay binary.
//!
//! The binary is the host-process adapter: it reads newline-delimited JSON
//! snapshots on stdin (one document per flush interval) and relays each to
//! OpenTSDB.

use crate::application::Application;
use crate::core::{unix_now, Config, MetricSnapshot, RelayError, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Relay statsd flush snapshots to OpenTSDB's line protocol.
#[derive(Parser, Debug)]
#[command(name = "opentsdb-relay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// OpenTSDB host (single-endpoint mode, overrides config file)
    #[arg(long, env = "RELAY_HOST")]
    pub host: Option<String>,

    /// OpenTSDB port for single-endpoint mode
    #[arg(long, env = "RELAY_PORT", default_value = "4242")]
    pub port: u16,

    /// Configuration file path (default: ~/.config/opentsdb-relay/config.yaml)
    #[arg(short, long, env = "RELAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log the delivery status entries every N seconds
    #[arg(long, env = "RELAY_STATUS_INTERVAL")]
    pub status_interval: Option<u64>,

    /// Enable debug logging
    #[arg(short, long, env = "RELAY_DEBUG")]
    pub debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub check_config: bool,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Load configuration with proper precedence:
    /// 1. CLI arguments (highest priority)
    /// 2. Environment variables
    /// 3. Config file
    /// 4. Defaults (lowest priority)
    pub async fn load_config(&self) -> Result<Config> {
        use crate::core::config::ConfigBuilder;

        let mut builder = ConfigBuilder::new();

        let config_path = if let Some(path) = &self.config {
            Some(path.clone())
        } else {
            dirs::config_dir()
                .map(|d| d.join("opentsdb-relay").join("config.yaml"))
                .filter(|p| p.exists())
        };

        if let Some(path) = config_path {
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => {
                    builder = builder.from_yaml(&content)?;
                    tracing::info!("Loaded configuration from: {:?}", path);
                },
                Err(e) if self.config.is_some() => {
                    return Err(RelayError::config(format!(
                        "Failed to read config file {:?}: {}",
                        path, e
                    )));
                },
                Err(_) => {
                    tracing::debug!("No config file found at {:?}, using defaults", path);
                },
            }
        }

        // CLI arguments override everything.
        if let Some(host) = &self.host {
            builder = builder.endpoint(host.clone(), self.port);
        }
        builder = builder.debug(self.debug);

        builder.build()
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self) -> Result<()> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

        let env_log_level = std::env::var("RELAY_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_level = if self.debug {
            "debug"
        } else {
            env_log_level.as_str()
        };

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

        let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).compact();

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| RelayError::config(format!("Failed to initialize logging: {}", e)))?;

        Ok(())
    }
}

/// Execute the relay.
pub async fn execute(cli: Cli) -> Result<()> {
    cli.init_logging()?;

    let config = cli.load_config().await?;

    if cli.check_config {
        config.validate()?;
        println!("Configuration is valid!");
        for endpoint in config.resolved_endpoints() {
            println!("  Endpoint: {}:{}", endpoint.host, endpoint.port);
        }
        println!("  Dead host retry: {:?}", config.endpoints.dead_host_retry);
        println!(
            "  Namespace mode: {}",
            if config.namespace.legacy { "legacy" } else { "structured" }
        );
        return Ok(());
    }

    run(config, cli.status_interval.map(Duration::from_secs)).await
}

/// Run the relay against stdin until EOF or Ctrl-C.
async fn run(config: Config, status_interval: Option<Duration>) -> Result<()> {
    use tokio::io::AsyncBufReadExt;

    let (app, handle) = Application::new(config)?;
    let loop_handle = tokio::spawn(app.run());

    if let Some(interval) = status_interval {
        let status_handle = handle.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                match status_handle.status().await {
                    Ok(entries) => {
                        for entry in entries {
                            tracing::info!(source = entry.source, stat = entry.name, value = entry.value);
                        }
                    },
                    Err(_) => break,
                }
            }
        });
    }

    tracing::info!("reading flush snapshots from stdin");
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line? {
                    Some(line) if line.trim().is_empty() => continue,
                    Some(line) => match serde_json::from_str::<MetricSnapshot>(&line) {
                        Ok(snapshot) => handle.flush(unix_now(), snapshot).await?,
                        Err(e) => tracing::warn!(error = %e, "skipping malformed snapshot"),
                    },
                    None => {
                        tracing::info!("stdin closed, shutting down");
                        break;
                    },
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received shutdown signal, stopping");
                break;
            }
        }
    }

    drop(handle);
    loop_handle.await.map_err(|_| RelayError::ChannelReceive)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cli_endpoint_override() {
        let cli = Cli {
            host: Some("tsdb.example.com".to_string()),
            port: 9999,
            config: None,
            status_interval: None,
            debug: true,
            check_config: false,
        };

        let config = cli.load_config().await.unwrap();
        let endpoints = config.resolved_endpoints();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].host, "tsdb.example.com");
        assert_eq!(endpoints[0].port, 9999);
        assert!(config.debug);
    }

    #[tokio::test]
    async fn test_explicit_missing_config_file_errors() {
        let cli = Cli {
            host: None,
            port: 4242,
            config: Some(PathBuf::from("/nonexistent/config.yaml")),
            status_interval: None,
            debug: false,
            check_config: false,
        };

        assert!(cli.load_config().await.is_err());
    }

    #[tokio::test]
    async fn test_config_file_loaded() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "endpoints:\n  hosts:\n    - host: from-file\n      port: 4242"
        )
        .unwrap();

        let cli = Cli {
            host: None,
            port: 4242,
            config: Some(file.path().to_path_buf()),
            status_interval: None,
            debug: false,
            check_config: false,
        };

        let config = cli.load_config().await.unwrap();
        assert_eq!(config.resolved_endpoints()[0].host, "from-file");
    }
}

//! spate - LAN throughput testing with zero-config discovery

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use spate::client::{Client, ClientConfig};
use spate::config::Config;
use spate::net;
use spate::output::{output_csv, output_json, output_plain};
use spate::protocol::DISCOVERY_PORT;
use spate::serve::{Server, ServerConfig};

/// Initialize logging with optional file output
fn init_logging(log_file: Option<&str>, log_level: Option<&str>) -> anyhow::Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let level = log_level.unwrap_or("info");
    let env_filter =
        EnvFilter::from_default_env().add_directive(format!("spate={}", level).parse()?);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .without_time();

    if let Some(file_path) = log_file {
        let expanded_path = if file_path.starts_with("~/") {
            dirs::home_dir()
                .map(|home| home.join(&file_path[2..]))
                .unwrap_or_else(|| PathBuf::from(file_path))
        } else {
            PathBuf::from(file_path)
        };

        if let Some(parent) = expanded_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file_appender = tracing_appender::rolling::daily(
            expanded_path
                .parent()
                .unwrap_or_else(|| std::path::Path::new(".")),
            expanded_path
                .file_name()
                .unwrap_or_else(|| std::ffi::OsStr::new("spate.log")),
        );
        let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

        // Keep guard alive for the duration of the program
        std::mem::forget(_guard);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(non_blocking)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "spate")]
#[command(author, version, about = "LAN throughput testing with zero-config discovery")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log file path (e.g., "~/.config/spate/spate.log")
    #[arg(long, env = "SPATE_LOG_FILE", global = true)]
    log_file: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "SPATE_LOG_LEVEL", global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start server mode: broadcast offers and serve transfers
    Serve {
        /// Discovery port to broadcast offers on
        #[arg(short = 'p', long, default_value_t = DISCOVERY_PORT, env = "SPATE_DISCOVERY_PORT")]
        discovery_port: u16,

        /// Interval between offer broadcasts
        #[arg(short = 'i', long, default_value = "1s", value_parser = parse_duration)]
        interval: Duration,
    },

    /// Start client mode: discover a server and run transfers
    Run {
        /// Bytes per transfer (e.g., 1G, 100M, 10000)
        #[arg(short = 's', long, value_parser = parse_size, env = "SPATE_SIZE")]
        size: Option<u64>,

        /// Number of parallel TCP transfers
        #[arg(short = 't', long, env = "SPATE_TCP")]
        tcp: Option<u32>,

        /// Number of parallel UDP transfers
        #[arg(short = 'u', long, env = "SPATE_UDP")]
        udp: Option<u32>,

        /// Discovery port to listen for offers on
        #[arg(short = 'p', long, default_value_t = DISCOVERY_PORT, env = "SPATE_DISCOVERY_PORT")]
        discovery_port: u16,

        /// Exit after one orchestration cycle
        #[arg(long)]
        once: bool,

        /// JSON output
        #[arg(long)]
        json: bool,

        /// CSV output
        #[arg(long)]
        csv: bool,
    },
}

fn parse_duration(s: &str) -> Result<Duration, String> {
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.to_uppercase();
    let (num, suffix) = if s.ends_with('G') {
        (s.trim_end_matches('G'), 1024 * 1024 * 1024u64)
    } else if s.ends_with('M') {
        (s.trim_end_matches('M'), 1024 * 1024u64)
    } else if s.ends_with('K') {
        (s.trim_end_matches('K'), 1024u64)
    } else {
        (s.as_str(), 1u64)
    };

    num.parse::<u64>()
        .map(|n| n * suffix)
        .map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config file (falls back to defaults if not found)
    let file_config = Config::load().unwrap_or_default();

    match cli.command {
        Commands::Serve {
            discovery_port,
            interval,
        } => {
            let log_file = cli
                .log_file
                .as_ref()
                .or(file_config.server.log_file.as_ref());
            let log_level = cli
                .log_level
                .as_ref()
                .or(file_config.server.log_level.as_ref());
            init_logging(log_file.map(|s| s.as_str()), log_level.map(|s| s.as_str()))?;

            // CLI values win; the config file fills anything left at defaults
            let discovery_port = if discovery_port != DISCOVERY_PORT {
                discovery_port
            } else {
                file_config
                    .server
                    .discovery_port
                    .unwrap_or(DISCOVERY_PORT)
            };
            let interval = if interval != Duration::from_secs(1) {
                interval
            } else {
                file_config
                    .server
                    .broadcast_interval_secs
                    .map(Duration::from_secs)
                    .unwrap_or(interval)
            };

            let server = Server::bind(ServerConfig {
                discovery_port,
                broadcast_interval: interval,
                broadcast_dest: None,
            })
            .await?;

            info!(
                "Server started, listening on IP address {} (tcp {}, udp {})",
                net::local_ip(),
                server.tcp_port(),
                server.udp_port()
            );
            server.run().await?;
        }

        Commands::Run {
            size,
            tcp,
            udp,
            discovery_port,
            once,
            json,
            csv,
        } => {
            let log_file = cli
                .log_file
                .as_ref()
                .or(file_config.client.log_file.as_ref());
            let log_level = cli
                .log_level
                .as_ref()
                .or(file_config.client.log_level.as_ref());
            init_logging(log_file.map(|s| s.as_str()), log_level.map(|s| s.as_str()))?;

            let defaults = ClientConfig::default();
            let config = ClientConfig {
                file_size: size
                    .or(file_config.client.file_size)
                    .unwrap_or(defaults.file_size),
                tcp_connections: tcp
                    .or(file_config.client.tcp_connections)
                    .unwrap_or(defaults.tcp_connections),
                udp_connections: udp
                    .or(file_config.client.udp_connections)
                    .unwrap_or(defaults.udp_connections),
                discovery_port,
            };
            let client = Client::new(config);

            loop {
                let results = client.run_once().await?;

                if json {
                    println!("{}", output_json(&results)?);
                } else if csv {
                    print!("{}", output_csv(&results));
                } else {
                    print!("{}", output_plain(&results));
                }

                if once {
                    break;
                }
                info!("All transfers complete, listening for offers");
            }
        }
    }

    Ok(())
}

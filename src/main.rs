//! Bloop server binary.

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use bloop::config::Config;

/// Bloop chat-analysis server
#[derive(Parser)]
#[command(name = "bloop")]
#[command(about = "HTTP server that analyzes exported chat transcripts")]
#[command(version)]
struct Args {
    /// Listen address override, e.g. 127.0.0.1:9000
    #[arg(short, long)]
    listen: Option<String>,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit JSON logs
    #[arg(long)]
    json_logs: bool,
}

fn setup_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    setup_logging(&args.log_level, args.json_logs);

    let mut config = Config::from_env();
    if let Some(listen) = args.listen {
        match listen.rsplit_once(':') {
            Some((host, port)) => match port.parse() {
                Ok(port) => {
                    config.host = host.to_string();
                    config.port = port;
                }
                Err(_) => {
                    error!("invalid --listen port in {listen:?}");
                    return ExitCode::FAILURE;
                }
            },
            None => {
                error!("invalid --listen address {listen:?}, expected host:port");
                return ExitCode::FAILURE;
            }
        }
    }

    info!("press Ctrl+C to stop");
    if let Err(e) = bloop::server::run(config).await {
        error!("server error: {e}");
        return ExitCode::FAILURE;
    }

    info!("server stopped");
    ExitCode::SUCCESS
}

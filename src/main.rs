//! CLI entry point for the Dublin Bus RTPI client.
//!
//! Loads configuration, then either fetches arrivals once, polls on a fixed
//! interval, or resolves a stop code against the journey planner.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use dublin_bus_rtpi::RtpiClient;
use dublin_bus_rtpi::config::{FeedKind, RtpiConfig};
use dublin_bus_rtpi::output::{append_arrivals, print_pretty, to_json};
use std::ffi::OsStr;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "dublin_bus_rtpi")]
#[command(about = "Real-time bus arrivals for configured stops", long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Overrides {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Upstream API flavour
    #[arg(long, global = true, value_enum)]
    feed: Option<FeedKind>,

    /// API key; repeat for fallback keys
    #[arg(short = 'k', long = "api-key", global = true)]
    api_keys: Vec<String>,

    /// Stop number; repeat or comma-separate for several stops
    #[arg(short, long = "stop", global = true, value_delimiter = ',')]
    stops: Vec<String>,

    /// Only keep these routes
    #[arg(short, long = "route", global = true, value_delimiter = ',')]
    routes: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch arrivals once and print them
    Arrivals {
        /// Print JSON to stdout instead of log lines
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Arrivals shown per stop
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Poll arrivals on a fixed interval
    Watch {
        /// Seconds between fetches
        #[arg(short, long, default_value_t = 30)]
        interval: u64,

        /// Number of fetches (0 = infinite)
        #[arg(short = 'n', long, default_value_t = 0)]
        samples: usize,

        /// Optional CSV file to append arrivals to
        #[arg(short, long)]
        output: Option<String>,

        /// Arrivals shown per stop
        #[arg(short, long, default_value_t = 3)]
        limit: usize,
    },
    /// Resolve a stop number through the journey planner
    Lookup {
        #[arg(value_name = "STOP")]
        stop: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/dublin_bus_rtpi.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("dublin_bus_rtpi.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.overrides)?;

    match cli.command {
        Commands::Arrivals { json, limit } => {
            let mut client = RtpiClient::from_config(&config)?;
            let results = client.fetch().await?;

            if json {
                println!("{}", to_json(&results)?);
            } else {
                for result in results.values() {
                    print_pretty(result, limit);
                }
            }
        }
        Commands::Watch {
            interval,
            samples,
            output,
            limit,
        } => {
            let mut client = RtpiClient::from_config(&config)?;
            watch(&mut client, interval, samples, limit, output.as_deref()).await?;
        }
        Commands::Lookup { stop } => {
            config.feed = FeedKind::JourneyPlanner;
            config.stops = vec![stop.clone()];
            let mut client = RtpiClient::from_config(&config)?;

            match client.resolve_stop(&stop).await? {
                Some(meta) => info!(
                    stop = %stop,
                    full_id = %meta.full_id,
                    name = %meta.name,
                    stop_type = %meta.stop_type,
                    "Stop resolved"
                ),
                None => warn!(stop = %stop, "Stop not found"),
            }
        }
    }

    Ok(())
}

/// Config file (if any), then command-line flags, then environment for
/// anything still empty.
fn load_config(overrides: Overrides) -> Result<RtpiConfig> {
    let mut config = match &overrides.config {
        Some(path) => RtpiConfig::load(path)?,
        None => RtpiConfig::default(),
    };

    if let Some(feed) = overrides.feed {
        config.feed = feed;
    }
    if !overrides.api_keys.is_empty() {
        config.api_keys = overrides.api_keys;
    }
    if !overrides.stops.is_empty() {
        config.stops = overrides.stops;
    }
    if !overrides.routes.is_empty() {
        config.route_filters = overrides.routes;
    }

    Ok(config.with_env())
}

/// Fetches every `interval` seconds. A failed round is logged and the next
/// round starts fresh.
#[tracing::instrument(skip(client, output), fields(stops = client.stops().len()))]
async fn watch(
    client: &mut RtpiClient,
    interval: u64,
    samples: usize,
    limit: usize,
    output: Option<&str>,
) -> Result<()> {
    if samples == 0 {
        info!(interval, "Polling infinitely. Press Ctrl+C to stop.");
    } else {
        info!(samples, interval, "Starting polling");
    }

    let mut sample_count = 0;

    loop {
        // Check if we've reached the sample limit (0 = infinite)
        if samples > 0 && sample_count >= samples {
            break;
        }
        sample_count += 1;

        match client.fetch().await {
            Ok(results) => {
                for result in results.values() {
                    print_pretty(result, limit);
                    if let Some(path) = output {
                        if let Err(e) = append_arrivals(path, result) {
                            error!(path, error = %e, "Failed to append arrivals");
                        }
                    }
                }
            }
            Err(e) => error!(sample = sample_count, error = %e, "Fetch failed"),
        }

        if samples == 0 || sample_count < samples {
            tokio::time::sleep(tokio::time::Duration::from_secs(interval)).await;
        }
    }

    info!(sample_count, "Finished polling");
    Ok(())
}

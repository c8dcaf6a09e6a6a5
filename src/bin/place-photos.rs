//! place-photos - Main binary

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures_util::future::join_all;
use place_photos::config::{
    DEFAULT_QUOTA_LIMIT, DEFAULT_RESULT_LIMIT, DEFAULT_TIMEOUT_SECS, ProviderEndpoints,
};
use place_photos::transport::HttpTransport;
use place_photos::{PhotoService, ProviderKind, ResolverConfig, ServerConfig};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "place-photos")]
#[command(about = "Resolve place ids to provider photo references and URLs")]
#[command(version)]
struct Cli {
    /// Provider API key
    #[arg(long, env = "PLACES_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,

    /// Provider API generation to fetch from
    #[arg(long, env = "PLACES_PROVIDER", value_enum, default_value_t = ProviderKind::Current, global = true)]
    provider: ProviderKind,

    /// Provider fetches allowed per session
    #[arg(long, env = "PLACES_QUOTA_LIMIT", default_value_t = DEFAULT_QUOTA_LIMIT, global = true)]
    quota_limit: u32,

    /// References returned when a request does not set a limit (current provider)
    #[arg(long, env = "PLACES_DEFAULT_LIMIT", default_value_t = DEFAULT_RESULT_LIMIT, global = true)]
    default_limit: usize,

    /// Provider request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info", global = true)]
    log_level: String,

    /// Override the legacy place details endpoint
    #[arg(long, global = true)]
    legacy_details_endpoint: Option<String>,

    /// Override the legacy photo endpoint
    #[arg(long, global = true)]
    legacy_photo_endpoint: Option<String>,

    /// Override the current place endpoint
    #[arg(long, global = true)]
    places_endpoint: Option<String>,

    /// Override the current media base URL
    #[arg(long, global = true)]
    media_endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "localhost")]
        host: String,

        /// Port to bind to
        #[arg(long, default_value = "3000")]
        port: u16,

        /// Allowed CORS origins
        #[arg(long, value_delimiter = ',', default_value = "*")]
        cors_origins: Vec<String>,
    },
    /// Resolve one or more place ids and print their photo URLs
    Resolve {
        /// Place ids to resolve
        #[arg(required = true)]
        place_ids: Vec<String>,

        /// Maximum references per place
        #[arg(long)]
        limit: Option<usize>,

        /// Image width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Print JSON instead of one URL per line
        #[arg(long)]
        json: bool,
    },
    /// Build a display URL from a photo reference
    Url {
        reference: String,

        /// Image width in pixels
        #[arg(long)]
        width: Option<u32>,
    },
}

impl Cli {
    fn resolver_config(&self) -> ResolverConfig {
        let defaults = ProviderEndpoints::default();
        let endpoints = ProviderEndpoints {
            legacy_details: self
                .legacy_details_endpoint
                .clone()
                .unwrap_or(defaults.legacy_details),
            legacy_photo: self
                .legacy_photo_endpoint
                .clone()
                .unwrap_or(defaults.legacy_photo),
            places: self.places_endpoint.clone().unwrap_or(defaults.places),
            media: self.media_endpoint.clone().unwrap_or(defaults.media),
        };

        let mut config = ResolverConfig::new(self.api_key.clone().unwrap_or_default())
            .with_provider(self.provider)
            .with_quota_limit(self.quota_limit)
            .with_default_limit(self.default_limit)
            .with_endpoints(endpoints);
        config.request_timeout_secs = self.timeout_secs;
        config
    }
}

fn init_tracing(log_level: &str, to_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if to_stderr {
        // Keep stdout for command output
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .with_writer(std::io::stderr),
            )
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(filter)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, !matches!(cli.command, Command::Serve { .. }));

    let resolver_config = cli.resolver_config();
    if !resolver_config.has_credential() {
        warn!("No provider API key configured (set PLACES_API_KEY); provider requests will fail");
    }

    match cli.command {
        Command::Serve {
            host,
            port,
            cors_origins,
        } => {
            info!("Starting place-photos v{}", place_photos::VERSION);

            let server_config = ServerConfig {
                host,
                port,
                cors_origins,
            };
            let service = PhotoService::new(server_config, &resolver_config)?;
            let transport = HttpTransport::new(service);

            let shutdown_signal = async {
                match signal::ctrl_c().await {
                    Ok(_) => info!("Received Ctrl+C, shutting down..."),
                    Err(err) => error!("Unable to listen for shutdown signal: {}", err),
                }
            };

            tokio::select! {
                result = transport.start() => {
                    if let Err(e) = result {
                        error!("HTTP transport error: {:#}", e);
                        return Err(e);
                    }
                }
                _ = shutdown_signal => {
                    info!("Shutdown signal received, stopping HTTP transport");
                }
            }

            if let Err(e) = transport.shutdown().await {
                error!("Error during HTTP transport shutdown: {}", e);
            }
            info!("place-photos shutdown complete");
        }
        Command::Resolve {
            place_ids,
            limit,
            width,
            json,
        } => {
            let service = PhotoService::new(ServerConfig::default(), &resolver_config)?;
            let results = join_all(
                place_ids
                    .iter()
                    .map(|place_id| service.photos_for(place_id, limit, width)),
            )
            .await;

            if json {
                let output = serde_json::to_string_pretty(&results)
                    .context("Failed to serialize results")?;
                println!("{output}");
            } else {
                for photos in &results {
                    if photos.urls.is_empty() {
                        println!("{}\t-", photos.place_id);
                    }
                    for url in &photos.urls {
                        println!("{}\t{}", photos.place_id, url);
                    }
                }
            }
            service.resolver().log_stats();
        }
        Command::Url { reference, width } => {
            let service = PhotoService::new(ServerConfig::default(), &resolver_config)?;
            match service.url_for_token(&reference, width) {
                Some(url) => println!("{url}"),
                None => anyhow::bail!("Photo reference must not be empty"),
            }
        }
    }

    Ok(())
}

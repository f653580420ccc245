use anyhow::Context;
use clap::Parser;
use cn_core::{EventKind, Limit};
use cn_inference::summary::DEFAULT_CONCURRENCY;
use cn_inference::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use cn_news::geocode::DEFAULT_NOMINATIM_URL;
use cn_news::{create_geocoder, NewsService, ServiceOptions, DEFAULT_NEARBY_RADIUS_KM};
use cn_storage::seed::{load_articles, seed_articles};
use cn_storage::Storage;
use cn_web::{create_app, AppState};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Contextual news API", long_about = None)]
pub struct Cli {
    /// Storage backend: memory or sqlite
    #[arg(long, env = "STORAGE_BACKEND", default_value = "memory")]
    storage: String,
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:news.db")]
    database_url: String,
    /// Completion backend: openrouter (any OpenAI-compatible API) or dummy
    #[arg(long, env = "LLM_PROVIDER", default_value = "openrouter")]
    llm_provider: String,
    #[arg(long, env = "LLM_TOKEN", hide_env_values = true)]
    llm_token: Option<String>,
    #[arg(long, env = "LLM_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    llm_endpoint: String,
    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_MODEL)]
    llm_model: String,
    /// Geocoder: nominatim or static
    #[arg(long, env = "GEOCODER", default_value = "nominatim")]
    geocoder: String,
    #[arg(long, env = "GEOCODER_URL", default_value = DEFAULT_NOMINATIM_URL)]
    geocoder_url: String,
    /// Maximum number of summaries generated at once
    #[arg(long, env = "SUMMARY_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    summary_concurrency: usize,
    /// Radius in kilometers used when a search query names a place
    #[arg(long, env = "NEARBY_RADIUS_KM", default_value_t = DEFAULT_NEARBY_RADIUS_KM)]
    nearby_radius_km: f64,
    /// Only rank events that originate inside the requested window
    #[arg(long, env = "TRENDING_GEO_FILTER", default_value_t = false)]
    trending_geo_filter: bool,
    #[command(subcommand)]
    command: Commands,
}

impl fmt::Debug for Cli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cli")
            .field("storage", &self.storage)
            .field("database_url", &self.database_url)
            .field("llm_provider", &self.llm_provider)
            .field("llm_token", &self.llm_token.as_deref().map(|_| "<redacted>"))
            .field("llm_endpoint", &self.llm_endpoint)
            .field("llm_model", &self.llm_model)
            .field("geocoder", &self.geocoder)
            .field("geocoder_url", &self.geocoder_url)
            .field("summary_concurrency", &self.summary_concurrency)
            .field("nearby_radius_km", &self.nearby_radius_km)
            .field("trending_geo_filter", &self.trending_geo_filter)
            .field("command", &self.command)
            .finish()
    }
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "SERVER_ADDRESS", default_value = "127.0.0.1")]
        address: String,
        #[arg(long, env = "SERVER_PORT", default_value_t = 8080)]
        port: u16,
        /// Per-request deadline in seconds
        #[arg(long, env = "HANDLER_TIMEOUT_DURATION", default_value_t = 10)]
        timeout: u64,
        /// JSON file of articles loaded before serving
        #[arg(long)]
        seed: Option<PathBuf>,
    },
    /// Load a JSON array of articles into the store
    Seed {
        file: PathBuf,
        /// Keep existing articles instead of clearing the collection first
        #[arg(long)]
        keep: bool,
    },
    /// Record a user interaction event
    Simulate {
        user_id: String,
        article_id: String,
        /// view, click or share
        event_type: EventKind,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
    },
    /// Print the most interacted-with articles
    Trending {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        #[arg(long, default_value_t = 1.0)]
        radius: f64,
        #[arg(long, default_value_t = 5, allow_hyphen_values = true)]
        limit: i64,
    },
}

impl Cli {
    fn service(&self, storage: &Storage) -> anyhow::Result<NewsService> {
        let config = cn_inference::Config {
            provider: self.llm_provider.clone(),
            api_key: self.llm_token.clone(),
            endpoint: self.llm_endpoint.clone(),
            model_name: self.llm_model.clone(),
            ..cn_inference::Config::default()
        };
        let model = cn_inference::create_model(&config)?;
        let geocoder = create_geocoder(&self.geocoder, Some(&self.geocoder_url))?;

        let options = ServiceOptions {
            nearby_radius_km: self.nearby_radius_km,
            summary_concurrency: self.summary_concurrency,
            trending_geo_filter: self.trending_geo_filter,
        };
        Ok(NewsService::new(
            storage.articles.clone(),
            storage.events.clone(),
            model,
            geocoder,
            options,
        ))
    }
}

async fn seed(storage: &Storage, file: &Path, replace: bool) -> anyhow::Result<usize> {
    let articles = load_articles(file)
        .await
        .with_context(|| format!("Failed to read articles from {}", file.display()))?;
    let inserted = seed_articles(&*storage.articles, &articles, replace).await?;
    info!("📰 Seeded {} articles from {}", inserted, file.display());
    Ok(inserted)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::debug!(config = ?cli, "Parsed configuration");

    let storage = cn_storage::create_storage(&cli.storage, Some(&cli.database_url)).await?;

    match &cli.command {
        Commands::Serve {
            address,
            port,
            timeout,
            seed: seed_file,
        } => {
            if let Some(file) = seed_file {
                seed(&storage, file, true).await?;
            }
            let service = cli.service(&storage)?;
            let state = AppState::new(Arc::new(service))
                .with_request_timeout(Duration::from_secs(*timeout));
            let app = create_app(state);

            let bind = format!("{}:{}", address, port);
            let listener = tokio::net::TcpListener::bind(&bind)
                .await
                .with_context(|| format!("Failed to bind {}", bind))?;
            info!("🚀 Server listening on http://{}", bind);
            axum::serve(listener, app).await?;
        }
        Commands::Seed { file, keep } => {
            seed(&storage, file, !keep).await?;
        }
        Commands::Simulate {
            user_id,
            article_id,
            event_type,
            lat,
            lon,
        } => {
            let service = cli.service(&storage)?;
            let event = service
                .simulate_event(user_id, article_id, *event_type, *lat, *lon)
                .await?;
            println!("{}", serde_json::to_string_pretty(&event)?);
        }
        Commands::Trending {
            lat,
            lon,
            radius,
            limit,
        } => {
            let service = cli.service(&storage)?;
            let articles = service
                .trending_news(Limit::new(*limit), *lat, *lon, *radius)
                .await?;
            info!("🔥 {} trending articles", articles.len());
            println!("{}", serde_json::to_string_pretty(&articles)?);
        }
    }

    Ok(())
}

use std::fs::{self, File};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wabbabot::commands::CommandHandler;
use wabbabot::config::BotConfig;
use wabbabot::db::pool::{create_pool, run_migrations};
use wabbabot::engine::herald::Herald;
use wabbabot::engine::metadata::ManifestMetadataSource;
use wabbabot::platform::RestClient;
use wabbabot::web::app_state::AppState;
use wabbabot::web::router::build_router;

#[derive(Parser)]
#[command(name = "wabbabot", version, about = "Modlist release announcements for chat servers")]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "wabbabot.toml")]
    config: String,

    /// Prefix to use for bot commands (overrides the config file)
    #[arg(short, long)]
    prefix: Option<String>,

    /// Enable production mode (keep a logfile)
    #[arg(short = 'P', long)]
    production: bool,
}

fn init_logging(config: &BotConfig, production: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if production {
        fs::create_dir_all(&config.storage.data_dir)
            .with_context(|| format!("failed to create {}", config.storage.data_dir.display()))?;
        let path = config.logfile_path();
        let file = File::create(&path)
            .with_context(|| format!("failed to open logfile {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = BotConfig::load(&cli.config)?;
    if let Some(prefix) = cli.prefix {
        config.bot.prefix = prefix;
    }
    init_logging(&config, cli.production)?;

    // Initialize database
    let pool = create_pool(&config.database.url)
        .await
        .context("failed to connect to database")?;
    run_migrations(&pool)
        .await
        .context("failed to run database migrations")?;

    // Collaborators
    let metadata = ManifestMetadataSource::new(
        reqwest::Client::new(),
        config.metadata.manifest_url.clone(),
        config.metadata_timeout(),
    );
    let platform = Arc::new(
        RestClient::new(
            &config.platform.api_base,
            &config.bot.token,
            config.platform_timeout(),
        )
        .context("failed to build platform client")?,
    );

    let herald = Arc::new(Herald::new(
        Arc::new(metadata),
        platform.clone(),
        config.bot.admins.clone(),
        Some(pool),
    ));
    herald
        .load_from_db()
        .await
        .context("failed to load state from database")?;

    let handler = CommandHandler::new(
        herald,
        platform,
        config.bot.prefix.clone(),
        config.bot.client_id.clone(),
    );
    let app_state = Arc::new(AppState {
        handler,
        ingest_secret: config.server.ingest_secret.clone(),
    });
    let app = build_router(app_state);

    info!(
        "WabbaBot starting on {} with prefix {}",
        config.server.web_address, config.bot.prefix
    );

    let listener = tokio::net::TcpListener::bind(&config.server.web_address)
        .await
        .with_context(|| format!("failed to bind {}", config.server.web_address))?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            signal.cancel();
        }
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("server error")?;
    info!("WabbaBot stopped");
    Ok(())
}

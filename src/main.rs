// ABOUTME: Entry point for the pagewright binary.
// ABOUTME: Parses CLI arguments, initializes tracing, and either serves HTTP or creates a site on disk.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use pagewright_core::SiteSettings;
use pagewright_server::{AppState, PagewrightConfig, create_router};

#[derive(Debug, Parser)]
#[command(name = "pagewright", version, about = "Multi-tenant page builder CMS")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP server (the default).
    Serve {
        /// Address to listen on; overrides PAGEWRIGHT_BIND.
        #[arg(long)]
        bind: Option<SocketAddr>,
        /// Data directory; overrides PAGEWRIGHT_HOME.
        #[arg(long)]
        home: Option<PathBuf>,
    },
    /// Create a new site under the data directory.
    InitSite {
        slug: String,
        /// Display name; defaults to the slug.
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        home: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("pagewright=debug,tower_http=debug")
                }),
        )
        .init();

    let cli = Cli::parse();
    let mut config = PagewrightConfig::from_env().context("invalid configuration")?;

    match cli.command.unwrap_or(Command::Serve {
        bind: None,
        home: None,
    }) {
        Command::Serve { bind, home } => {
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if let Some(home) = home {
                config.home = home;
            }
            serve(config).await
        }
        Command::InitSite { slug, name, home } => {
            if let Some(home) = home {
                config.home = home;
            }
            init_site(config, slug, name).await
        }
    }
}

async fn serve(config: PagewrightConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)
        .with_context(|| format!("cannot open data directory {}", config.home.display()))?;
    let count = state.load_sites().await?;
    tracing::info!(
        home = %config.home.display(),
        sites = count,
        history_capacity = config.history_capacity,
        "pagewright starting up"
    );

    let app = create_router(Arc::new(state));
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("cannot bind {}", config.bind))?;
    tracing::info!("listening on http://{}", config.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("pagewright stopped");
    Ok(())
}

async fn init_site(
    config: PagewrightConfig,
    slug: String,
    name: Option<String>,
) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;
    let settings = SiteSettings::new(name.unwrap_or_else(|| slug.clone()));
    state
        .create_site(&slug, &settings)
        .await
        .with_context(|| format!("cannot create site {}", slug))?;
    println!("created site {} in {}", slug, config.home.display());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}

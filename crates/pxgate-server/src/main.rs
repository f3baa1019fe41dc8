use std::sync::Arc;

use anyhow::Context;
use pxgate_core::{Blacklist, Pipeline, PipelineConfig};
use pxgate_server::{config::Config, create_app, AppState};
use pxgate_store::FsStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,pxgate=debug")),
        )
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    info!(?config, "starting pxgate");

    let uploads = Arc::new(FsStore::open(&config.uploads_dir).await?);
    let proxied = Arc::new(FsStore::open(&config.proxied_dir).await?);

    let blacklist = match &config.blacklist_file {
        Some(path) => {
            let list = Blacklist::from_file(path)
                .await
                .with_context(|| format!("failed to load blacklist from {}", path.display()))?;
            info!(entries = list.len(), "loaded blacklist");
            list
        }
        None => Blacklist::default(),
    };

    let pipeline = Pipeline::new(
        PipelineConfig {
            service_url: config.service_url.clone(),
            max_image_size: config.max_image_size,
        },
        uploads,
        proxied,
        blacklist,
    )
    .context("failed to build the origin fetcher")?;

    let app = create_app(AppState { pipeline: Arc::new(pipeline) });

    info!(addr = %config.listen_addr, "pxgate listening");
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use std::sync::Arc;
use std::time::Duration;

use eyre::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use goodshelf_api::config::Backend;
use goodshelf_api::{AppConfig, AppState, SessionStore, router};
use goodshelf_domain::Services;
use goodshelf_storage::{MemoryStorage, PostgresStorage, Store};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;

    let store: Arc<dyn Store> = match config.storage.backend {
        Backend::Memory => {
            info!("using in-memory storage");
            Arc::new(MemoryStorage::new())
        }
        Backend::Postgres => {
            let url = config.storage.database_url.as_deref().ok_or_else(|| {
                eyre::eyre!("storage.database_url is required for the postgres backend")
            })?;
            let storage = PostgresStorage::connect(url).await?;
            storage.initialize().await?;
            info!("using postgres storage");
            Arc::new(storage)
        }
    };

    let sessions = Arc::new(SessionStore::new(Duration::from_secs(
        config.session.ttl_minutes * 60,
    )));
    let state = AppState::new(Services::new(store), sessions);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listening on http://{addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

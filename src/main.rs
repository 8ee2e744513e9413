use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, SharedRepository};
use mediq_core::collaborators::DirectoryUploader;
use mediq_core::config::{
    flag_from_env_value, namespace_from_env_value, status_transitions_from_env_value,
};
use mediq_core::constants::DOCUMENTS_DIR;
use mediq_core::{
    CoreConfig, DEFAULT_DATA_DIR, FileStore, KeyValueStore, Repository, SlotState,
};

/// Main entry point for the MedIQ application
///
/// Opens the file-backed record store, seeds sample data when enabled, and serves the REST API.
///
/// # Environment Variables
/// - `MEDIQ_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `MEDIQ_DATA_DIR`: Directory holding the JSON collections (default: "mediq_data")
/// - `MEDIQ_NAMESPACE`: Storage key prefix (default: "mediq")
/// - `MEDIQ_ENABLE_SAMPLE_DATA`: Seed demo records into an empty store
/// - `MEDIQ_ENFORCE_TRANSITIONS`: Reject event status changes outside the transition table
/// - `MEDIQ_DOCUMENTS_DIR`: Where uploaded documents are written (default: `<data dir>/documents`)
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, storage or server startup fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mediq=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr: SocketAddr = std::env::var("MEDIQ_REST_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:3000".into())
        .parse()?;

    let cfg = Arc::new(config_from_env()?);
    let store = FileStore::open(cfg.data_dir())?;
    tracing::info!(
        "++ Using data directory {} (namespace '{}')",
        store.root().display(),
        cfg.storage_namespace()
    );

    let store: Arc<dyn KeyValueStore> = Arc::new(store);
    let repo: SharedRepository = Repository::new(Arc::clone(&cfg), store);
    repo.initialise_sample_data()?;

    for health in repo.inspect_collections() {
        if let SlotState::Recovered(reason) = &health.state {
            tracing::warn!("collection {} is unreadable and reads as empty: {}", health.key, reason);
        }
    }

    let documents_dir = std::env::var("MEDIQ_DOCUMENTS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| cfg.data_dir().join(DOCUMENTS_DIR));
    tracing::info!("++ Storing uploaded documents in {}", documents_dir.display());
    let uploader = Arc::new(DirectoryUploader::new(documents_dir));

    tracing::info!("++ Starting MedIQ REST on {}", rest_addr);

    let app = api_rest::router(AppState::new(repo).with_uploader(uploader));
    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn config_from_env() -> anyhow::Result<CoreConfig> {
    let data_dir = std::env::var("MEDIQ_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
    let namespace = namespace_from_env_value(std::env::var("MEDIQ_NAMESPACE").ok());

    let cfg = CoreConfig::new(PathBuf::from(data_dir), namespace)?
        .with_sample_data(flag_from_env_value(
            std::env::var("MEDIQ_ENABLE_SAMPLE_DATA").ok(),
        ))
        .with_status_transitions(status_transitions_from_env_value(
            std::env::var("MEDIQ_ENFORCE_TRANSITIONS").ok(),
        ));
    Ok(cfg)
}

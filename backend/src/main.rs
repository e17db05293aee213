use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use muslimsdeen::api::router;
use muslimsdeen::config::{AppConfig, DataBackendKind};
use muslimsdeen::db::{self, SqliteBackend};
use muslimsdeen::repository::DataBackend;
use muslimsdeen::state::AppState;
use muslimsdeen::storage::LocalStorage;
use muslimsdeen::supabase::{SupabaseAuth, SupabaseBackend, SupabaseClient, SupabaseConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "muslimsdeen=debug,tower_http=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::new_from_env()?;
    if config.is_placeholder() {
        warn!("running without backend credentials; sign-in and data calls will fail");
    }

    let client = SupabaseClient::new(&SupabaseConfig::from_app(&config))?;
    let auth = Arc::new(SupabaseAuth::new(client.clone()));

    let backend: Arc<dyn DataBackend> = match config.data_backend {
        DataBackendKind::Supabase => Arc::new(SupabaseBackend::new(client)),
        DataBackendKind::Sqlite => {
            let pool = db::connect(&config.database_url).await?;
            let storage = Arc::new(LocalStorage::new(&config.storage_dir, &config.site_url));
            Arc::new(SqliteBackend::new(pool, storage))
        }
    };

    let addr = config.bind_addr;
    let state = AppState::new(config, backend, auth);
    let app = router(state);

    info!("listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

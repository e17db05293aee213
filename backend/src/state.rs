use std::sync::Arc;

use crate::auth::{AuthProvider, SessionStore};
use crate::config::AppConfig;
use crate::repository::DataBackend;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub backend: Arc<dyn DataBackend>,
    pub auth: Arc<dyn AuthProvider>,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: AppConfig, backend: Arc<dyn DataBackend>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            auth,
            sessions: SessionStore::default(),
        }
    }
}

use std::sync::Arc;

use crate::config::AppConfig;
use crate::session::Sessions;
use crate::store::{ChangeFeed, EntityStore};

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn EntityStore>,
    pub feed: Arc<dyn ChangeFeed>,
    pub sessions: Sessions,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn EntityStore>, feed: Arc<dyn ChangeFeed>) -> Self {
        let sessions = Sessions::new(config.session_ttl);
        AppState {
            config,
            store,
            feed,
            sessions,
        }
    }
}

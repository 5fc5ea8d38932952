//! Shared handler state.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::store::MarketStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MarketStore>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<AppConfig>,
    /// Client for the sensor prediction backend.
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(store: Arc<dyn MarketStore>, config: AppConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    pub fn with_clock(store: Arc<dyn MarketStore>, clock: Arc<dyn Clock>, config: AppConfig) -> Self {
        Self {
            store,
            clock,
            config: Arc::new(config),
            http: reqwest::Client::new(),
        }
    }
}

//! Application state shared across handlers.

use crate::auth::AuthService;
use crate::config::Config;
use crate::db::Database;
use crate::marketplace::MarketplaceService;
use crate::reading::ReadingService;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<Config>,
    /// Database connection.
    pub db: Database,
    /// Authentication service.
    pub auth: Arc<AuthService>,
    /// Offer negotiation.
    pub marketplace: Arc<MarketplaceService>,
    /// Reading progress.
    pub reading: Arc<ReadingService>,
}

impl AppState {
    /// Build every service over one database handle.
    pub fn new(config: Config, db: Database) -> Self {
        let auth = AuthService::new(
            db.clone(),
            config.auth.session_days,
            config.auth.registration_enabled(),
        );
        let marketplace = MarketplaceService::new(db.clone(), &config.marketplace);
        let reading = ReadingService::new(db.clone(), &config.reading);

        Self {
            config: Arc::new(config),
            db,
            auth: Arc::new(auth),
            marketplace: Arc::new(marketplace),
            reading: Arc::new(reading),
        }
    }
}

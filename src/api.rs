//! HTTP API: chat webhook plus status endpoints

mod handlers;
mod types;

pub use handlers::create_router;

use crate::config::Config;
use crate::db::Database;
use crate::runtime::ProductionRouter;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// `None` while no bot token is configured
    pub router: Option<Arc<ProductionRouter>>,
    pub db: Database,
    pub config: Arc<Config>,
}

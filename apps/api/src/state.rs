use std::sync::Arc;

use crate::auth::identity::IdentityProvider;
use crate::config::Config;
use crate::llm_client::LanguageModel;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Interviews, feedback, users and sessions. `PgStore` in production.
    pub store: Arc<dyn Store>,
    pub llm: Arc<dyn LanguageModel>,
    pub identity: Arc<dyn IdentityProvider>,
    pub config: Config,
}

use std::sync::Arc;

use crate::context::CoreContext;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub core: Arc<CoreContext>,
}

impl AppState {
    pub fn new(core: CoreContext) -> Self {
        Self {
            core: Arc::new(core),
        }
    }
}

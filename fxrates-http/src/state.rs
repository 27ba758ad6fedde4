use std::sync::Arc;

use fxrates_core::QueryEngine;
use fxrates_engine::{CatalogService, ImportEngine};

/// Shared application state injected into every handler via `axum::State`.
/// Built explicitly by the composition root; no process-wide singleton.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub query_engine: Arc<dyn QueryEngine>,
    pub import_engine: Arc<ImportEngine>,
}

impl AppState {
    #[must_use]
    pub const fn new(
        catalog: Arc<CatalogService>,
        query_engine: Arc<dyn QueryEngine>,
        import_engine: Arc<ImportEngine>,
    ) -> Self {
        Self {
            catalog,
            query_engine,
            import_engine,
        }
    }
}

use std::sync::Arc;

use crate::application::sessions::FormSessions;
use crate::backend::JobBoardBackend;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// REST backend client. Default: `HttpBackend`; tests swap in an in-memory double.
    pub backend: Arc<dyn JobBoardBackend>,
    /// Open application forms, keyed by session id.
    pub sessions: FormSessions,
}

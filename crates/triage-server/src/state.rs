use triage_core::TriageDesk;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub desk: TriageDesk,
    /// API key protecting queue-mutating endpoints (None = open access).
    pub api_key: Option<String>,
}

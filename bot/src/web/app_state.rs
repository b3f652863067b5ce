use crate::commands::CommandHandler;

/// Shared state for the HTTP surface.
pub struct AppState {
    pub handler: CommandHandler,
    /// Bearer secret required on /api/events. Empty disables ingest.
    pub ingest_secret: String,
}

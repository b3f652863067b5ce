use thiserror::Error;

/// Failure kinds of every core operation. The command layer turns these into
/// a user-visible reply; none of them is fatal to the process.
#[derive(Debug, Error)]
pub enum HeraldError {
    /// Modlist, server, channel, role or member absent.
    #[error("{0}")]
    NotFound(String),

    #[error("Modlist with id {0} already exists")]
    DuplicateModlist(String),

    #[error("There are no servers listening to modlist {0}")]
    NoSubscribers(String),

    #[error("Could not edit last message for {0} - was there one?")]
    NoPriorRelease(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Failed to release modlist {0} in any servers")]
    BroadcastFailed(String),

    /// Malformed command arguments.
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Could not fetch modlist metadata: {0}")]
    Metadata(#[from] crate::engine::metadata::MetadataError),

    #[error("Could not look up {0}")]
    Directory(#[from] crate::commands::directory::DirectoryError),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl HeraldError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn modlist_not_found(modlist_id: &str) -> Self {
        Self::NotFound(format!("Modlist with id {modlist_id} not found"))
    }
}

pub type HeraldResult<T> = Result<T, HeraldError>;

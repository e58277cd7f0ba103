/// Error types shared by the descriptor registry and the definition manager
///
/// Configuration errors are fatal and surface at descriptor-build time.
/// Conflicts are never merged; the caller decides whether to retry.

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by registry, provider, and definition operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A provider's metadata table is misconfigured (e.g. missing webhook metadata)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Two descriptors in one snapshot share the same type name and version
    #[error("duplicate activity descriptor: {type_name} v{version}")]
    DuplicateDescriptor { type_name: String, version: u32 },

    /// An alias is already bound to a different type
    #[error("alias '{alias}' is already registered for {existing}")]
    DuplicateAlias { alias: String, existing: String },

    /// Optimistic concurrency failure: another writer advanced the definition
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The definition was rejected before anything was written
    #[error("invalid definition: {0}")]
    Validation(String),

    /// A cancellable operation stopped before completing
    #[error("operation cancelled")]
    Cancelled,

    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<sqlx::Error> for Error {
    /// Unique-constraint violations mean a concurrent writer got there first
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Error::Conflict(db_err.message().to_string());
            }
        }
        Error::Database(err)
    }
}

impl Error {
    /// Whether retrying with fresh base state may succeed
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}

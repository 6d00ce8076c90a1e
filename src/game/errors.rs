use thiserror::Error;

/// Errors that can arise while applying game rules or touching the guild store.
#[derive(Debug, Error)]
pub enum GameError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A referenced task, user, quest or guild does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A business rule was violated (duplicate membership, taken username, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed input, typically a missing required field.
    #[error("validation error: {0}")]
    Validation(String),

    /// Email/password pair did not match a stored account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Argon2 hashing or a corrupt stored hash.
    #[error("password hash error: {0}")]
    PasswordHash(String),
}

impl GameError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        GameError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// HTTP-equivalent status an API layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            GameError::NotFound { .. } => 404,
            GameError::Validation(_) => 400,
            GameError::Conflict(_) => 409,
            GameError::InvalidCredentials => 401,
            _ => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GameError::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, GameError::Conflict(_))
    }
}

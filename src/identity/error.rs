use thiserror::Error;

/// Failures raised by a [`CredentialStore`](super::store::CredentialStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("identifier already registered: {0}")]
    Duplicate(String),
    #[error("store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
}

/// Failures raised by a [`PasswordHasher`](super::hasher::PasswordHasher).
#[derive(Debug, Error)]
pub enum HashError {
    #[error("password hashing failed: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("password hashing task aborted")]
    Aborted,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("identifier is not a valid student address")]
    InvalidIdentifier,
    #[error("identifier and password are required")]
    MissingCredentials,
    #[error("identifier is required")]
    MissingIdentifier,
    #[error("identifier was registered or claimed concurrently")]
    DuplicateIdentifier,
    #[error(transparent)]
    StoreUnavailable(StoreError),
    #[error(transparent)]
    Hashing(#[from] HashError),
}

impl From<StoreError> for RegistryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(_) => Self::DuplicateIdentifier,
            StoreError::Unavailable(_) => Self::StoreUnavailable(err),
        }
    }
}

impl RegistryError {
    /// Validation failures detected before any store access.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifier | Self::MissingCredentials | Self::MissingIdentifier
        )
    }
}

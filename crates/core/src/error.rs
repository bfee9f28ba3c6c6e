#[allow(clippy::single_component_path_imports)]
use serde_yaml;

#[derive(Debug, thiserror::Error)]
pub enum YbocsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid login or password")]
    InvalidCredentials,
    #[error("login already exists: {0}")]
    DuplicateLogin(String),
    #[error("unknown account: {0}")]
    UnknownAccount(String),
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password cannot be empty")]
    EmptyPassword,
    #[error("password must be changed before continuing")]
    PasswordResetRequired,
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("failed to hash password: {0}")]
    PasswordHash(String),

    #[error("invalid symptom key '{key}': {reason}")]
    InvalidSymptomKey { key: String, reason: String },
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("failed to create storage directory: {0}")]
    DirCreation(std::io::Error),
    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize JSON: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize JSON: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("results ledger error: {0}")]
    Csv(#[from] csv::Error),
}

impl YbocsError {
    /// True when the failure came from the backing files rather than the caller's input.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            YbocsError::DirCreation(_)
                | YbocsError::FileRead(_)
                | YbocsError::FileWrite(_)
                | YbocsError::Serialization(_)
                | YbocsError::Deserialization(_)
                | YbocsError::YamlSerialization(_)
                | YbocsError::YamlDeserialization(_)
                | YbocsError::Csv(_)
        )
    }
}

impl From<ybocs_types::TextError> for YbocsError {
    fn from(e: ybocs_types::TextError) -> Self {
        YbocsError::InvalidInput(e.to_string())
    }
}

pub type YbocsResult<T> = std::result::Result<T, YbocsError>;

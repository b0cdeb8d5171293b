use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] tickwatch_core::ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}

impl From<tickwatch_core::CoreError> for CliError {
    fn from(error: tickwatch_core::CoreError) -> Self {
        match error {
            tickwatch_core::CoreError::Validation(inner) => Self::Validation(inner),
            tickwatch_core::CoreError::Serialization(inner) => Self::Serialization(inner),
            other => Self::Command(other.to_string()),
        }
    }
}

impl From<tickwatch_warehouse::WarehouseError> for CliError {
    fn from(error: tickwatch_warehouse::WarehouseError) -> Self {
        match error {
            tickwatch_warehouse::WarehouseError::Io(inner) => Self::Io(inner),
            other => Self::Command(other.to_string()),
        }
    }
}

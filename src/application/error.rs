use thiserror::Error;

use crate::{application::repos::StoreError, artifacts::ArtifactError, infra::error::InfraError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Process exit code reported by the binary for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Validation(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_failures_exit_non_zero() {
        let error = AppError::from(StoreError::unavailable("connection refused"));
        assert_eq!(error.exit_code(), 1);
        assert_eq!(
            error.to_string(),
            "content store unavailable: connection refused"
        );
    }

    #[test]
    fn validation_errors_use_usage_exit_code() {
        assert_eq!(AppError::validation("missing --key").exit_code(), 2);
    }
}

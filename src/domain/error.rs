use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{field} {message}")]
    Validation {
        field: &'static str,
        message: &'static str,
    },
    #[error("domain invariant violated: {message}")]
    Invariant { message: String },
}

impl DomainError {
    pub fn validation(field: &'static str, message: &'static str) -> Self {
        Self::Validation { field, message }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }
}

use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::{
        composer::ComposeError,
        feed::FeedError,
        repos::{AuthError, RepoError},
        session::SessionError,
    },
    domain::error::DomainError,
    infra::error::InfraError,
};

/// Diagnostic attached to error responses and picked up by the
/// response-logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

/// Status used when a backend call fails.
pub fn repo_status(error: &RepoError) -> StatusCode {
    match error {
        RepoError::Transport(_) | RepoError::Rejected { .. } => StatusCode::SERVICE_UNAVAILABLE,
        RepoError::Decode(_) | RepoError::Integrity { .. } => StatusCode::BAD_GATEWAY,
    }
}

pub fn auth_status(error: &AuthError) -> StatusCode {
    match error {
        AuthError::InvalidCredentials(_) | AuthError::SessionExpired => StatusCode::UNAUTHORIZED,
        AuthError::UserAlreadyExists(_) => StatusCode::CONFLICT,
        AuthError::Rejected { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
        }
        AuthError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Decode(_) => StatusCode::BAD_GATEWAY,
    }
}

impl From<&FeedError> for ErrorReport {
    fn from(error: &FeedError) -> Self {
        ErrorReport::from_error(
            "application::feed::FeedService",
            StatusCode::SERVICE_UNAVAILABLE,
            error,
        )
    }
}

impl From<&ComposeError> for ErrorReport {
    fn from(error: &ComposeError) -> Self {
        let status = match error {
            ComposeError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ComposeError::Repo(err) => repo_status(err),
        };
        ErrorReport::from_error("application::composer::ComposerService", status, error)
    }
}

impl From<&SessionError> for ErrorReport {
    fn from(error: &SessionError) -> Self {
        let status = match error {
            SessionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SessionError::Auth(err) => auth_status(err),
            SessionError::ProfileCreation { source, .. } => repo_status(source),
        };
        ErrorReport::from_error("application::session::SessionService", status, error)
    }
}

/// Failures that abort the process before or while serving.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

//! Traits describing the remote auth service and table API.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{
    AuthSession, AuthUser, NewPost, NewProfile, PostSummary, PostVisibility, PostWithAuthor,
    Profile,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("backend unreachable: {0}")]
    Transport(String),
    #[error("{message}")]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("unexpected response from backend: {0}")]
    Decode(String),
    #[error("integrity error: {message}")]
    Integrity { message: String },
}

impl RepoError {
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("{0}")]
    UserAlreadyExists(String),
    #[error("session expired")]
    SessionExpired,
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("auth service unreachable: {0}")]
    Transport(String),
    #[error("unexpected response from auth service: {0}")]
    Decode(String),
}

/// Result of a successful sign-up call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The account is active and a session was issued.
    Session(AuthSession),
    /// The account exists but must be confirmed before signing in.
    PendingConfirmation(AuthUser),
}

impl SignUpOutcome {
    pub fn user(&self) -> &AuthUser {
        match self {
            SignUpOutcome::Session(session) => &session.user,
            SignUpOutcome::PendingConfirmation(user) => user,
        }
    }
}

#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError>;
}

/// Reads and writes against the `posts` table.
///
/// `bearer` is the caller's access token; `None` queries as the anonymous
/// role, so row-level policies on the backend still apply.
#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn list_published(&self) -> Result<Vec<PostWithAuthor>, RepoError>;

    async fn find_with_author(
        &self,
        id: Uuid,
        bearer: Option<&str>,
    ) -> Result<Option<PostWithAuthor>, RepoError>;

    async fn list_by_author(
        &self,
        author_id: Uuid,
        visibility: PostVisibility,
        bearer: Option<&str>,
    ) -> Result<Vec<PostSummary>, RepoError>;

    async fn create_post(&self, post: NewPost, bearer: &str) -> Result<(), RepoError>;
}

#[async_trait]
pub trait ProfilesRepo: Send + Sync {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, RepoError>;

    async fn create_profile(
        &self,
        profile: NewProfile,
        bearer: Option<&str>,
    ) -> Result<(), RepoError>;
}

#[async_trait]
pub trait BackendHealth: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}

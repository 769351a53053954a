//! Session provider over the hosted auth service.
//!
//! The provider is stateless per request: the caller hands in the tokens it
//! holds (cookies, in the HTTP layer) and gets back the resolved identity plus
//! any rotated tokens. Lifecycle changes are published as [`AuthEvent`]s.

use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::repos::{AuthError, AuthGateway, ProfilesRepo, RepoError, SignUpOutcome};
use crate::domain::entities::{AuthSession, AuthUser, NewProfile};
use crate::domain::error::DomainError;

const EVENT_CAPACITY: usize = 64;

/// Tokens presented by the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// A signed-in user together with the token that authorizes their requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user: AuthUser,
    pub access_token: String,
}

impl From<&AuthSession> for Viewer {
    fn from(session: &AuthSession) -> Self {
        Self {
            user: session.user.clone(),
            access_token: session.access_token.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSession {
    /// No tokens were presented.
    Anonymous,
    /// The access token is still valid.
    Active(Viewer),
    /// The access token had expired and was exchanged for a new pair.
    Refreshed(AuthSession),
    /// The tokens are no longer usable and should be discarded.
    Expired,
}

impl ResolvedSession {
    pub fn viewer(&self) -> Option<Viewer> {
        match self {
            ResolvedSession::Active(viewer) => Some(viewer.clone()),
            ResolvedSession::Refreshed(session) => Some(Viewer::from(session)),
            ResolvedSession::Anonymous | ResolvedSession::Expired => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { user_id: Uuid },
    SignedUp { user_id: Uuid, confirmed: bool },
    SignedOut { user_id: Option<Uuid> },
    TokenRefreshed { user_id: Uuid },
}

impl AuthEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthEvent::SignedIn { .. } => "signed_in",
            AuthEvent::SignedUp { .. } => "signed_up",
            AuthEvent::SignedOut { .. } => "signed_out",
            AuthEvent::TokenRefreshed { .. } => "token_refreshed",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    pub full_name: String,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("Your account was created but the profile could not be saved: {source}")]
    ProfileCreation {
        user_id: Uuid,
        #[source]
        source: RepoError,
    },
}

#[derive(Clone)]
pub struct SessionService {
    auth: Arc<dyn AuthGateway>,
    profiles: Arc<dyn ProfilesRepo>,
    events: broadcast::Sender<AuthEvent>,
}

impl SessionService {
    pub fn new(auth: Arc<dyn AuthGateway>, profiles: Arc<dyn ProfilesRepo>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            auth,
            profiles,
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: AuthEvent) {
        counter!("modernblog_auth_events_total", "event" => event.kind()).increment(1);
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    /// Resolve the current user from the presented tokens, refreshing once
    /// when the access token has expired.
    pub async fn current_user(
        &self,
        tokens: Option<&SessionTokens>,
    ) -> Result<ResolvedSession, AuthError> {
        let Some(tokens) = tokens else {
            return Ok(ResolvedSession::Anonymous);
        };

        match self.auth.get_user(&tokens.access_token).await {
            Ok(user) => Ok(ResolvedSession::Active(Viewer {
                user,
                access_token: tokens.access_token.clone(),
            })),
            Err(AuthError::SessionExpired) => {
                let Some(refresh_token) = tokens.refresh_token.as_deref() else {
                    return Ok(ResolvedSession::Expired);
                };
                match self.auth.refresh_session(refresh_token).await {
                    Ok(session) => {
                        debug!(
                            target = "modernblog::session",
                            user_id = %session.user.id,
                            "access token refreshed"
                        );
                        self.emit(AuthEvent::TokenRefreshed {
                            user_id: session.user.id,
                        });
                        Ok(ResolvedSession::Refreshed(session))
                    }
                    Err(AuthError::SessionExpired | AuthError::Rejected { .. }) => {
                        Ok(ResolvedSession::Expired)
                    }
                    Err(err) => Err(err),
                }
            }
            Err(err) => Err(err),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, SessionError> {
        let email = required("Email", email)?;
        if password.is_empty() {
            return Err(DomainError::validation("Password", "is required").into());
        }

        let session = self.auth.sign_in_with_password(email, password).await?;
        self.emit(AuthEvent::SignedIn {
            user_id: session.user.id,
        });
        Ok(session)
    }

    /// Create the auth identity, then its profile row.
    ///
    /// The two writes are not atomic: when the profile insert fails the
    /// identity stays behind without a profile and the error says so.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpOutcome, SessionError> {
        let email = required("Email", &request.email)?;
        if request.password.is_empty() {
            return Err(DomainError::validation("Password", "is required").into());
        }
        let username = required("Username", &request.username)?;
        let full_name = required("Full name", &request.full_name)?;

        let outcome = self.auth.sign_up(email, &request.password).await?;
        let user_id = outcome.user().id;
        let bearer = match &outcome {
            SignUpOutcome::Session(session) => Some(session.access_token.as_str()),
            SignUpOutcome::PendingConfirmation(_) => None,
        };

        let profile = NewProfile {
            id: user_id,
            username: username.to_string(),
            full_name: full_name.to_string(),
        };
        if let Err(source) = self.profiles.create_profile(profile, bearer).await {
            warn!(
                target = "modernblog::session",
                user_id = %user_id,
                error = %source,
                "profile insert failed after sign-up; auth identity left without profile"
            );
            return Err(SessionError::ProfileCreation { user_id, source });
        }

        self.emit(AuthEvent::SignedUp {
            user_id,
            confirmed: matches!(outcome, SignUpOutcome::Session(_)),
        });
        Ok(outcome)
    }

    /// Revoke the session remotely. Failures are logged and swallowed; the
    /// caller discards its tokens either way.
    pub async fn sign_out(&self, viewer: Option<&Viewer>, tokens: Option<&SessionTokens>) {
        if let Some(tokens) = tokens {
            if let Err(err) = self.auth.sign_out(&tokens.access_token).await {
                warn!(
                    target = "modernblog::session",
                    error = %err,
                    "remote sign-out failed"
                );
            }
        }
        self.emit(AuthEvent::SignedOut {
            user_id: viewer.map(|viewer| viewer.user.id),
        });
    }
}

fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(DomainError::validation(field, "is required"))
    } else {
        Ok(trimmed)
    }
}

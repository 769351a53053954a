use async_trait::async_trait;
use modernblog_types::{
    AuthErrorPayload, AuthSessionPayload, AuthUserPayload, CredentialsPayload, RefreshPayload,
    SignUpPayload,
};
use reqwest::{Response, StatusCode};

use crate::application::repos::{AuthError, AuthGateway, SignUpOutcome};
use crate::domain::entities::{AuthSession, AuthUser};

use super::{BackendClient, BackendError, Service, decode_json};

const USER_ALREADY_EXISTS: &str = "user_already_exists";

impl From<BackendError> for AuthError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Transport(err) => AuthError::Transport(err.to_string()),
            BackendError::Url(err) => AuthError::Transport(err.to_string()),
            BackendError::Decode(err) => AuthError::Decode(err.to_string()),
            BackendError::Remote {
                status, message, ..
            } => AuthError::Rejected {
                status: status.as_u16(),
                message,
            },
        }
    }
}

fn user_from_payload(payload: AuthUserPayload) -> AuthUser {
    AuthUser {
        id: payload.id,
        email: payload.email,
    }
}

fn session_from_payload(payload: AuthSessionPayload) -> AuthSession {
    AuthSession {
        access_token: payload.access_token,
        refresh_token: payload.refresh_token,
        user: user_from_payload(payload.user),
    }
}

/// Read a non-success auth response into a [`BackendError::Remote`].
async fn auth_failure(response: Response) -> BackendError {
    let status = response.status();
    let payload = match response.bytes().await {
        Ok(bytes) => serde_json::from_slice::<AuthErrorPayload>(&bytes).unwrap_or_default(),
        Err(err) => return BackendError::Transport(err),
    };
    let message = payload
        .description()
        .map(str::to_string)
        .unwrap_or_else(|| format!("auth service returned {status}"));
    BackendError::Remote {
        status,
        code: payload.error_code,
        message,
    }
}

fn is_duplicate_account(code: Option<&str>, message: &str) -> bool {
    code == Some(USER_ALREADY_EXISTS) || message.to_ascii_lowercase().contains("already registered")
}

#[async_trait]
impl AuthGateway for BackendClient {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let mut url = self.auth_url("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let request = self
            .authorize(self.http.post(url), None)
            .json(&CredentialsPayload { email, password });
        let response = self.send(Service::Auth, request).await?;

        if !response.status().is_success() {
            return Err(match auth_failure(response).await {
                BackendError::Remote {
                    status: StatusCode::BAD_REQUEST,
                    message,
                    ..
                } => AuthError::InvalidCredentials(message),
                other => other.into(),
            });
        }

        let payload: AuthSessionPayload = decode_json(response).await?;
        Ok(session_from_payload(payload))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let url = self.auth_url("signup")?;
        let request = self
            .authorize(self.http.post(url), None)
            .json(&CredentialsPayload { email, password });
        let response = self.send(Service::Auth, request).await?;

        if !response.status().is_success() {
            return Err(match auth_failure(response).await {
                BackendError::Remote {
                    status,
                    code,
                    message,
                } if matches!(
                    status,
                    StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY
                ) && is_duplicate_account(code.as_deref(), &message) =>
                {
                    AuthError::UserAlreadyExists(message)
                }
                other => other.into(),
            });
        }

        let payload: SignUpPayload = decode_json(response).await?;
        Ok(match payload {
            SignUpPayload::Session(session) => SignUpOutcome::Session(session_from_payload(session)),
            SignUpPayload::User(user) => SignUpOutcome::PendingConfirmation(user_from_payload(user)),
        })
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let url = self.auth_url("logout")?;
        let request = self.authorize(self.http.post(url), Some(access_token));
        let response = self.send(Service::Auth, request).await?;
        let status = response.status();

        // An already-invalid token means there is nothing left to revoke.
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Err(auth_failure(response).await.into())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let url = self.auth_url("user")?;
        let request = self.authorize(self.http.get(url), Some(access_token));
        let response = self.send(Service::Auth, request).await?;

        match response.status() {
            status if status.is_success() => {
                let payload: AuthUserPayload = decode_json(response).await?;
                Ok(user_from_payload(payload))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::SessionExpired),
            _ => Err(auth_failure(response).await.into()),
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let mut url = self.auth_url("token")?;
        url.query_pairs_mut()
            .append_pair("grant_type", "refresh_token");
        let request = self
            .authorize(self.http.post(url), None)
            .json(&RefreshPayload { refresh_token });
        let response = self.send(Service::Auth, request).await?;

        if response.status().is_client_error() {
            return Err(AuthError::SessionExpired);
        }
        if !response.status().is_success() {
            return Err(auth_failure(response).await.into());
        }

        let payload: AuthSessionPayload = decode_json(response).await?;
        Ok(session_from_payload(payload))
    }
}

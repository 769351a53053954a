//! Session cookies and the per-request current-user extractor.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::warn;

use crate::application::session::{ResolvedSession, SessionTokens, Viewer};
use crate::config::SessionSettings;
use crate::domain::entities::AuthSession;

use super::HttpState;

/// Names and attributes of the two token cookies.
#[derive(Clone, Debug)]
pub struct SessionCookies {
    access_name: String,
    refresh_name: String,
    secure: bool,
    max_age: time::Duration,
}

impl SessionCookies {
    pub fn new(settings: &SessionSettings) -> Self {
        let max_age = time::Duration::try_from(settings.max_age).unwrap_or(time::Duration::WEEK);
        Self {
            access_name: format!("{}-access-token", settings.cookie_prefix),
            refresh_name: format!("{}-refresh-token", settings.cookie_prefix),
            secure: settings.secure_cookies,
            max_age,
        }
    }

    pub fn access_name(&self) -> &str {
        &self.access_name
    }

    pub fn refresh_name(&self) -> &str {
        &self.refresh_name
    }

    pub fn tokens(&self, jar: &CookieJar) -> Option<SessionTokens> {
        let access_token = jar
            .get(&self.access_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())?;
        let refresh_token = jar
            .get(&self.refresh_name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty());
        Some(SessionTokens {
            access_token,
            refresh_token,
        })
    }

    pub fn store(&self, jar: CookieJar, session: &AuthSession) -> CookieJar {
        jar.add(self.cookie(&self.access_name, session.access_token.clone()))
            .add(self.cookie(&self.refresh_name, session.refresh_token.clone()))
    }

    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(self.access_name.clone()).path("/"))
            .remove(Cookie::build(self.refresh_name.clone()).path("/"))
    }

    fn cookie(&self, name: &str, value: String) -> Cookie<'static> {
        Cookie::build((name.to_string(), value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(self.max_age)
            .build()
    }
}

/// The signed-in viewer, if any, plus the cookie jar to send back.
///
/// The jar carries rotated cookies after a token refresh and removal cookies
/// once the session is gone; handlers return it with their response.
pub struct CurrentUser {
    pub viewer: Option<Viewer>,
    pub jar: CookieJar,
}

impl CurrentUser {
    pub fn tokens(&self, cookies: &SessionCookies) -> Option<SessionTokens> {
        cookies.tokens(&self.jar)
    }
}

impl FromRequestParts<HttpState> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &HttpState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let tokens = state.cookies.tokens(&jar);

        match state.session.current_user(tokens.as_ref()).await {
            Ok(ResolvedSession::Anonymous) => Ok(Self { viewer: None, jar }),
            Ok(ResolvedSession::Active(viewer)) => Ok(Self {
                viewer: Some(viewer),
                jar,
            }),
            Ok(ResolvedSession::Refreshed(session)) => Ok(Self {
                viewer: Some(Viewer::from(&session)),
                jar: state.cookies.store(jar, &session),
            }),
            Ok(ResolvedSession::Expired) => Ok(Self {
                viewer: None,
                jar: state.cookies.clear(jar),
            }),
            Err(err) => {
                // Keep the cookies; the session may still be valid once the
                // auth service is reachable again.
                warn!(
                    target = "modernblog::http::session",
                    error = %err,
                    "could not resolve session; serving as anonymous"
                );
                Ok(Self { viewer: None, jar })
            }
        }
    }
}

//! In-memory backend and router wiring shared by the HTTP tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use modernblog::application::{
    chrome::ChromeService,
    composer::ComposerService,
    feed::FeedService,
    repos::{
        AuthError, AuthGateway, BackendHealth, PostsRepo, ProfilesRepo, RepoError, SignUpOutcome,
    },
    session::SessionService,
};
use modernblog::config::SessionSettings;
use modernblog::domain::entities::{
    Author, AuthSession, AuthUser, NewPost, NewProfile, PostSummary, PostVisibility,
    PostWithAuthor, Profile,
};
use modernblog::infra::http::{HttpState, SessionCookies, build_router};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryBackend {
    users: Mutex<HashMap<String, (AuthUser, String)>>,
    access: Mutex<HashMap<String, Uuid>>,
    refresh: Mutex<HashMap<String, Uuid>>,
    profiles: Mutex<HashMap<Uuid, Profile>>,
    posts: Mutex<Vec<PostWithAuthor>>,
    created_posts: Mutex<Vec<(NewPost, String)>>,
    created_profiles: Mutex<Vec<NewProfile>>,
    counter: AtomicU64,
    failure: Mutex<Option<String>>,
    profile_insert_failure: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every table query fail with a transport error.
    pub fn fail_queries(&self, message: &str) {
        *self.failure.lock().expect("failure lock") = Some(message.to_string());
    }

    pub fn fail_profile_inserts(&self, message: &str) {
        *self
            .profile_insert_failure
            .lock()
            .expect("failure lock") = Some(message.to_string());
    }

    pub fn add_user(&self, email: &str, password: &str, username: &str) -> Profile {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
        };
        self.users
            .lock()
            .expect("users lock")
            .insert(email.to_string(), (user.clone(), password.to_string()));
        let profile = Profile {
            id: user.id,
            username: username.to_string(),
            full_name: format!("{username} tester"),
            avatar_url: None,
            created_at: OffsetDateTime::now_utc(),
        };
        self.profiles
            .lock()
            .expect("profiles lock")
            .insert(profile.id, profile.clone());
        profile
    }

    pub fn add_post(
        &self,
        author: &Profile,
        title: &str,
        content: &str,
        created_at: OffsetDateTime,
        published: bool,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.posts.lock().expect("posts lock").push(PostWithAuthor {
            id,
            title: title.to_string(),
            content: content.to_string(),
            author: Author {
                id: author.id,
                username: author.username.clone(),
                avatar_url: author.avatar_url.clone(),
            },
            created_at,
            published,
        });
        id
    }

    /// Issue a session for an existing user, as a successful sign-in would.
    pub fn session_for(&self, email: &str) -> AuthSession {
        let user = self
            .users
            .lock()
            .expect("users lock")
            .get(email)
            .map(|(user, _)| user.clone())
            .expect("known user");
        self.issue(&user)
    }

    pub fn expire(&self, access_token: &str) {
        self.access.lock().expect("access lock").remove(access_token);
    }

    pub fn created_posts(&self) -> Vec<(NewPost, String)> {
        self.created_posts.lock().expect("created lock").clone()
    }

    pub fn post_id_titled(&self, title: &str) -> Option<Uuid> {
        self.posts
            .lock()
            .expect("posts lock")
            .iter()
            .find(|post| post.title == title)
            .map(|post| post.id)
    }

    pub fn created_profiles(&self) -> Vec<NewProfile> {
        self.created_profiles.lock().expect("created lock").clone()
    }

    pub fn user_count(&self) -> usize {
        self.users.lock().expect("users lock").len()
    }

    fn issue(&self, user: &AuthUser) -> AuthSession {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let session = AuthSession {
            access_token: format!("access-{n}"),
            refresh_token: format!("refresh-{n}"),
            user: user.clone(),
        };
        self.access
            .lock()
            .expect("access lock")
            .insert(session.access_token.clone(), user.id);
        self.refresh
            .lock()
            .expect("refresh lock")
            .insert(session.refresh_token.clone(), user.id);
        session
    }

    fn user_by_id(&self, id: Uuid) -> Option<AuthUser> {
        self.users
            .lock()
            .expect("users lock")
            .values()
            .find(|(user, _)| user.id == id)
            .map(|(user, _)| user.clone())
    }

    fn check(&self) -> Result<(), RepoError> {
        match self.failure.lock().expect("failure lock").clone() {
            Some(message) => Err(RepoError::Transport(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AuthGateway for MemoryBackend {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let user = match self.users.lock().expect("users lock").get(email) {
            Some((user, stored)) if stored == password => user.clone(),
            _ => {
                return Err(AuthError::InvalidCredentials(
                    "Invalid login credentials".into(),
                ));
            }
        };
        Ok(self.issue(&user))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let user = {
            let mut users = self.users.lock().expect("users lock");
            if users.contains_key(email) {
                return Err(AuthError::UserAlreadyExists(
                    "User already registered".into(),
                ));
            }
            let user = AuthUser {
                id: Uuid::new_v4(),
                email: Some(email.to_string()),
            };
            users.insert(email.to_string(), (user.clone(), password.to_string()));
            user
        };
        Ok(SignUpOutcome::Session(self.issue(&user)))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let user_id = self.access.lock().expect("access lock").remove(access_token);
        if let Some(user_id) = user_id {
            self.refresh
                .lock()
                .expect("refresh lock")
                .retain(|_, owner| *owner != user_id);
        }
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let user_id = self
            .access
            .lock()
            .expect("access lock")
            .get(access_token)
            .copied()
            .ok_or(AuthError::SessionExpired)?;
        self.user_by_id(user_id).ok_or(AuthError::SessionExpired)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let user_id = self
            .refresh
            .lock()
            .expect("refresh lock")
            .remove(refresh_token)
            .ok_or(AuthError::SessionExpired)?;
        let user = self.user_by_id(user_id).ok_or(AuthError::SessionExpired)?;
        Ok(self.issue(&user))
    }
}

#[async_trait]
impl PostsRepo for MemoryBackend {
    async fn list_published(&self) -> Result<Vec<PostWithAuthor>, RepoError> {
        self.check()?;
        Ok(self
            .posts
            .lock()
            .expect("posts lock")
            .iter()
            .filter(|post| post.published)
            .cloned()
            .collect())
    }

    async fn find_with_author(
        &self,
        id: Uuid,
        _bearer: Option<&str>,
    ) -> Result<Option<PostWithAuthor>, RepoError> {
        self.check()?;
        Ok(self
            .posts
            .lock()
            .expect("posts lock")
            .iter()
            .find(|post| post.id == id)
            .cloned())
    }

    async fn list_by_author(
        &self,
        author_id: Uuid,
        visibility: PostVisibility,
        _bearer: Option<&str>,
    ) -> Result<Vec<PostSummary>, RepoError> {
        self.check()?;
        Ok(self
            .posts
            .lock()
            .expect("posts lock")
            .iter()
            .filter(|post| post.author.id == author_id && visibility.admits(post.published))
            .map(|post| PostSummary {
                id: post.id,
                title: post.title.clone(),
                created_at: post.created_at,
                published: post.published,
            })
            .collect())
    }

    async fn create_post(&self, post: NewPost, bearer: &str) -> Result<(), RepoError> {
        self.check()?;
        let author = self
            .profiles
            .lock()
            .expect("profiles lock")
            .get(&post.author_id)
            .cloned()
            .ok_or_else(|| RepoError::Rejected {
                status: 409,
                code: Some("23503".into()),
                message: "author profile does not exist".into(),
            })?;
        self.posts.lock().expect("posts lock").push(PostWithAuthor {
            id: Uuid::new_v4(),
            title: post.title.clone(),
            content: post.content.clone(),
            author: Author {
                id: author.id,
                username: author.username,
                avatar_url: author.avatar_url,
            },
            created_at: OffsetDateTime::now_utc(),
            published: true,
        });
        self.created_posts
            .lock()
            .expect("created lock")
            .push((post, bearer.to_string()));
        Ok(())
    }
}

#[async_trait]
impl ProfilesRepo for MemoryBackend {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, RepoError> {
        self.check()?;
        Ok(self
            .profiles
            .lock()
            .expect("profiles lock")
            .get(&id)
            .cloned())
    }

    async fn create_profile(
        &self,
        profile: NewProfile,
        _bearer: Option<&str>,
    ) -> Result<(), RepoError> {
        if let Some(message) = self
            .profile_insert_failure
            .lock()
            .expect("failure lock")
            .clone()
        {
            return Err(RepoError::Rejected {
                status: 409,
                code: Some("23505".into()),
                message,
            });
        }
        self.created_profiles
            .lock()
            .expect("created lock")
            .push(profile);
        Ok(())
    }
}

#[async_trait]
impl BackendHealth for MemoryBackend {
    async fn health_check(&self) -> Result<(), RepoError> {
        self.check()
    }
}

pub fn router(backend: &Arc<MemoryBackend>) -> Router {
    let session = Arc::new(SessionService::new(backend.clone(), backend.clone()));
    let state = HttpState {
        feed: Arc::new(FeedService::new(backend.clone(), backend.clone(), 240)),
        composer: Arc::new(ComposerService::new(backend.clone())),
        chrome: Arc::new(ChromeService::new("ModernBlog")),
        session,
        cookies: SessionCookies::new(&SessionSettings {
            cookie_prefix: "mb".into(),
            secure_cookies: false,
            max_age: Duration::from_secs(7 * 24 * 60 * 60),
        }),
        health: backend.clone(),
    };
    build_router(state)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub fn get_with_session(uri: &str, session: &AuthSession) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookie_header(session))
        .body(Body::empty())
        .expect("request")
}

pub fn post_form(uri: &str, body: &str, session: Option<&AuthSession>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(session) = session {
        builder = builder.header(header::COOKIE, cookie_header(session));
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

pub fn cookie_header(session: &AuthSession) -> String {
    format!(
        "mb-access-token={}; mb-refresh-token={}",
        session.access_token, session.refresh_token
    )
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok().map(str::to_string))
        .collect()
}

pub fn location(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

//! In-memory stand-ins for the backend used by service tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    AuthError, AuthGateway, PostsRepo, ProfilesRepo, RepoError, SignUpOutcome,
};
use crate::domain::entities::{
    Author, AuthSession, AuthUser, NewPost, NewProfile, PostSummary, PostVisibility,
    PostWithAuthor, Profile,
};

#[derive(Default)]
pub struct FakeAuth {
    users: Mutex<HashMap<String, (AuthUser, String)>>,
    access: Mutex<HashMap<String, Uuid>>,
    refresh: Mutex<HashMap<String, Uuid>>,
    counter: AtomicU64,
}

impl FakeAuth {
    pub fn register(&self, email: &str, password: &str) -> AuthUser {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
        };
        self.users
            .lock()
            .expect("users lock")
            .insert(email.to_string(), (user.clone(), password.to_string()));
        user
    }

    pub fn expire_access_token(&self, token: &str) {
        self.access.lock().expect("access lock").remove(token);
    }

    pub fn has_user(&self, id: Uuid) -> bool {
        self.users
            .lock()
            .expect("users lock")
            .values()
            .any(|(user, _)| user.id == id)
    }

    pub fn has_email(&self, email: &str) -> bool {
        self.users.lock().expect("users lock").contains_key(email)
    }

    fn issue(&self, user: &AuthUser) -> AuthSession {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let access_token = format!("access-{n}");
        let refresh_token = format!("refresh-{n}");
        self.access
            .lock()
            .expect("access lock")
            .insert(access_token.clone(), user.id);
        self.refresh
            .lock()
            .expect("refresh lock")
            .insert(refresh_token.clone(), user.id);
        AuthSession {
            access_token,
            refresh_token,
            user: user.clone(),
        }
    }

    fn user_by_id(&self, id: Uuid) -> Option<AuthUser> {
        self.users
            .lock()
            .expect("users lock")
            .values()
            .find(|(user, _)| user.id == id)
            .map(|(user, _)| user.clone())
    }
}

#[async_trait]
impl AuthGateway for FakeAuth {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthSession, AuthError> {
        let user = {
            let users = self.users.lock().expect("users lock");
            match users.get(email) {
                Some((user, stored)) if stored == password => user.clone(),
                _ => {
                    return Err(AuthError::InvalidCredentials(
                        "Invalid login credentials".into(),
                    ));
                }
            }
        };
        Ok(self.issue(&user))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        if self.has_email(email) {
            return Err(AuthError::UserAlreadyExists(
                "User already registered".into(),
            ));
        }
        let user = self.register(email, password);
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

#[derive(Default)]
pub struct FakeProfiles {
    profiles: Mutex<HashMap<Uuid, Profile>>,
    created: Mutex<Vec<NewProfile>>,
    failure: Option<String>,
    lookup_failure: Option<String>,
}

impl FakeProfiles {
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn unreachable(message: &str) -> Self {
        Self {
            lookup_failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn insert(&self, profile: Profile) {
        self.profiles
            .lock()
            .expect("profiles lock")
            .insert(profile.id, profile);
    }

    pub fn created(&self) -> Vec<NewProfile> {
        self.created.lock().expect("created lock").clone()
    }
}

#[async_trait]
impl ProfilesRepo for FakeProfiles {
    async fn find_profile(&self, id: Uuid) -> Result<Option<Profile>, RepoError> {
        if let Some(message) = &self.lookup_failure {
            return Err(RepoError::Transport(message.clone()));
        }
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
        if let Some(message) = &self.failure {
            return Err(RepoError::Rejected {
                status: 409,
                code: Some("23505".into()),
                message: message.clone(),
            });
        }
        self.insert(Profile {
            id: profile.id,
            username: profile.username.clone(),
            full_name: profile.full_name.clone(),
            avatar_url: None,
            created_at: OffsetDateTime::now_utc(),
        });
        self.created.lock().expect("created lock").push(profile);
        Ok(())
    }
}

#[derive(Default)]
pub struct FakePosts {
    posts: Mutex<Vec<PostWithAuthor>>,
    created: Mutex<Vec<(NewPost, String)>>,
    failure: Option<String>,
}

impl FakePosts {
    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn insert(&self, post: PostWithAuthor) {
        self.posts.lock().expect("posts lock").push(post);
    }

    pub fn created(&self) -> Vec<(NewPost, String)> {
        self.created.lock().expect("created lock").clone()
    }

    fn check(&self) -> Result<(), RepoError> {
        match &self.failure {
            Some(message) => Err(RepoError::Transport(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl PostsRepo for FakePosts {
    async fn list_published(&self) -> Result<Vec<PostWithAuthor>, RepoError> {
        self.check()?;
        Ok(self.posts.lock().expect("posts lock").clone())
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
        self.created
            .lock()
            .expect("created lock")
            .push((post, bearer.to_string()));
        Ok(())
    }
}

pub fn profile(username: &str, full_name: &str) -> Profile {
    Profile {
        id: Uuid::new_v4(),
        username: username.to_string(),
        full_name: full_name.to_string(),
        avatar_url: None,
        created_at: OffsetDateTime::now_utc(),
    }
}

pub fn post_by(
    author: &Profile,
    title: &str,
    content: &str,
    created_at: OffsetDateTime,
    published: bool,
) -> PostWithAuthor {
    PostWithAuthor {
        id: Uuid::new_v4(),
        title: title.to_string(),
        content: content.to_string(),
        author: Author {
            id: author.id,
            username: author.username.clone(),
            avatar_url: author.avatar_url.clone(),
        },
        created_at,
        published,
    }
}

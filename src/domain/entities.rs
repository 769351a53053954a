//! Domain entities mirrored from the remote store and auth service.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Identity of a signed-in user as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Token pair issued by the auth service for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub user: AuthUser,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Author {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}

/// A post joined with the profile that owns it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostWithAuthor {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author: Author,
    pub created_at: OffsetDateTime,
    pub published: bool,
}

/// Post listing entry on a profile page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostSummary {
    pub id: Uuid,
    pub title: String,
    pub created_at: OffsetDateTime,
    pub published: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
}

/// Which of an author's posts a viewer may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostVisibility {
    PublishedOnly,
    IncludeDrafts,
}

impl PostVisibility {
    /// Drafts are only visible to the profile owner.
    pub fn for_viewer(owner: Uuid, viewer: Option<&AuthUser>) -> Self {
        match viewer {
            Some(user) if user.id == owner => Self::IncludeDrafts,
            _ => Self::PublishedOnly,
        }
    }

    pub fn admits(self, published: bool) -> bool {
        published || self == Self::IncludeDrafts
    }
}

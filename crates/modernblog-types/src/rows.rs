use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Column list used when embedding the author into a post query.
pub const AUTHOR_EMBED_SELECT: &str = "profiles(username,avatar_url)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ProfileRow {
    pub const SELECT: &'static str = "id,username,full_name,avatar_url,created_at";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProfileRow {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
}

/// Post row used by the profile page: no content, no author embed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostListRow {
    pub id: Uuid,
    pub title: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub published: bool,
}

impl PostListRow {
    pub const SELECT: &'static str = "id,title,created_at,published";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorEmbed {
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// A post joined with its author through the `author_id` foreign key.
///
/// The embed is optional on the wire: the REST layer returns `null` when the
/// referenced profile is not readable by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostWithAuthorRow {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub published: bool,
    #[serde(default)]
    pub profiles: Option<AuthorEmbed>,
}

impl PostWithAuthorRow {
    pub fn select() -> String {
        format!("id,title,content,author_id,created_at,published,{AUTHOR_EMBED_SELECT}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPostRow {
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    pub published: bool,
}

/// Error body returned by the REST layer for rejected queries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RestErrorPayload {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

/// Error code the REST layer uses when a single-object request matched no row.
pub const NO_ROWS_CODE: &str = "PGRST116";

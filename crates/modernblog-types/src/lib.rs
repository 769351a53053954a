//! Wire schemas shared by the ModernBlog server and its tests.
//!
//! Rows mirror the `profiles` and `posts` tables exposed by the REST layer;
//! the `auth` module mirrors the hosted auth service payloads.

pub mod auth;
pub mod rows;

pub use auth::{
    AuthErrorPayload, AuthSessionPayload, AuthUserPayload, CredentialsPayload, RefreshPayload,
    SignUpPayload,
};
pub use rows::{
    AuthorEmbed, NewPostRow, NewProfileRow, PostListRow, PostWithAuthorRow, ProfileRow,
    NO_ROWS_CODE, RestErrorPayload,
};

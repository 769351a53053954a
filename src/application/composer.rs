use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::repos::{PostsRepo, RepoError};
use crate::application::session::Viewer;
use crate::domain::entities::NewPost;
use crate::domain::error::DomainError;
use crate::domain::posts::validate_title;

#[derive(Debug, Error)]
pub enum ComposeError {
    #[error(transparent)]
    Validation(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct ComposerService {
    posts: Arc<dyn PostsRepo>,
}

impl ComposerService {
    pub fn new(posts: Arc<dyn PostsRepo>) -> Self {
        Self { posts }
    }

    /// Publish a post authored by `viewer`. Content is stored exactly as the
    /// editor serialized it.
    pub async fn publish(
        &self,
        viewer: &Viewer,
        title: &str,
        content: &str,
    ) -> Result<(), ComposeError> {
        let title = validate_title(title)?;
        let post = NewPost {
            title,
            content: content.to_string(),
            author_id: viewer.user.id,
        };

        self.posts.create_post(post, &viewer.access_token).await?;
        info!(
            target = "modernblog::composer",
            author_id = %viewer.user.id,
            "post published"
        );
        Ok(())
    }
}

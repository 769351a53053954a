use std::sync::Arc;

use thiserror::Error;
use tokio::try_join;
use uuid::Uuid;

use crate::application::repos::{PostsRepo, ProfilesRepo, RepoError};
use crate::application::session::Viewer;
use crate::domain::content::sanitize_post_html;
use crate::domain::entities::{PostVisibility, PostWithAuthor};
use crate::domain::posts::{self, format_human_date, iso_date};
use crate::presentation::views::{
    HomeView, PostCard, PostDetailView, ProfilePostItem, ProfileView, post_href, profile_href,
};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    profiles: Arc<dyn ProfilesRepo>,
    preview_chars: usize,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        profiles: Arc<dyn ProfilesRepo>,
        preview_chars: usize,
    ) -> Self {
        Self {
            posts,
            profiles,
            preview_chars,
        }
    }

    /// Published posts, newest first.
    pub async fn home(&self) -> Result<HomeView, FeedError> {
        let mut posts = self.posts.list_published().await?;
        posts.retain(|post| post.published);
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let posts = posts
            .iter()
            .map(|post| post_to_card(post, self.preview_chars))
            .collect();
        Ok(HomeView { posts })
    }

    /// `Ok(None)` covers unknown ids, malformed ids and drafts the viewer
    /// does not own.
    pub async fn post_detail(
        &self,
        raw_id: &str,
        viewer: Option<&Viewer>,
    ) -> Result<Option<PostDetailView>, FeedError> {
        let Ok(id) = Uuid::parse_str(raw_id) else {
            return Ok(None);
        };
        let bearer = viewer.map(|viewer| viewer.access_token.as_str());

        let Some(post) = self.posts.find_with_author(id, bearer).await? else {
            return Ok(None);
        };

        let visibility = PostVisibility::for_viewer(post.author.id, viewer.map(|v| &v.user));
        if !visibility.admits(post.published) {
            return Ok(None);
        }

        Ok(Some(PostDetailView {
            title: post.title,
            author_href: profile_href(post.author.id),
            author_username: post.author.username,
            author_avatar_url: post.author.avatar_url,
            date: format_human_date(post.created_at),
            datetime: iso_date(post.created_at),
            content_html: sanitize_post_html(&post.content),
            draft: !post.published,
        }))
    }

    /// Profile header plus the author's posts; both queries run concurrently.
    pub async fn profile_page(
        &self,
        raw_id: &str,
        viewer: Option<&Viewer>,
    ) -> Result<Option<ProfileView>, FeedError> {
        let Ok(id) = Uuid::parse_str(raw_id) else {
            return Ok(None);
        };
        let visibility = PostVisibility::for_viewer(id, viewer.map(|v| &v.user));
        let bearer = viewer.map(|viewer| viewer.access_token.as_str());

        let (profile, mut posts) = try_join!(
            self.profiles.find_profile(id),
            self.posts.list_by_author(id, visibility, bearer),
        )?;

        let Some(profile) = profile else {
            return Ok(None);
        };

        posts.retain(|post| visibility.admits(post.published));
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(Some(ProfileView {
            full_name: profile.full_name,
            username: profile.username,
            avatar_url: profile.avatar_url,
            joined: format_human_date(profile.created_at),
            posts: posts
                .into_iter()
                .map(|post| ProfilePostItem {
                    href: post_href(post.id),
                    title: post.title,
                    date: format_human_date(post.created_at),
                    datetime: iso_date(post.created_at),
                    draft: !post.published,
                })
                .collect(),
            is_owner: visibility == PostVisibility::IncludeDrafts,
        }))
    }
}

fn post_to_card(post: &PostWithAuthor, preview_chars: usize) -> PostCard {
    PostCard {
        title: post.title.clone(),
        href: post_href(post.id),
        author_username: post.author.username.clone(),
        author_href: profile_href(post.author.id),
        author_avatar_url: post.author.avatar_url.clone(),
        date: format_human_date(post.created_at),
        datetime: iso_date(post.created_at),
        preview: posts::plain_text_preview(&post.content, preview_chars),
    }
}

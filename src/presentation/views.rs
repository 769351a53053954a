use crate::application::error::{ErrorReport, HttpError};
use crate::domain::content::sanitize_post_html;
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome, content: ErrorPageView) -> Response {
    let view = LayoutContext::new(chrome.with_page_title(&content.title), content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Render the error page and attach `report` for the response logger.
pub fn render_error_response(
    chrome: LayoutChrome,
    content: ErrorPageView,
    report: ErrorReport,
) -> Response {
    let status = report.status;
    let view = LayoutContext::new(chrome.with_page_title(&content.title), content);
    let mut response = render_template_response(ErrorTemplate { view }, status);
    report.attach(&mut response);
    response
}

/// Header links for the signed-in user.
#[derive(Clone, Debug)]
pub struct AccountNavView {
    pub profile_href: String,
    pub email: String,
}

#[derive(Clone, Debug)]
pub struct NavigationView {
    pub account: Option<AccountNavView>,
}

#[derive(Clone, Debug)]
pub struct LayoutChrome {
    pub site_title: String,
    pub page_title: String,
    pub navigation: NavigationView,
}

impl LayoutChrome {
    pub fn with_page_title(mut self, title: &str) -> Self {
        self.page_title = format!("{title} · {}", self.site_title);
        self
    }
}

pub struct LayoutContext<T> {
    pub site_title: String,
    pub page_title: String,
    pub navigation: NavigationView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            site_title: chrome.site_title,
            page_title: chrome.page_title,
            navigation: chrome.navigation,
            content,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PostCard {
    pub title: String,
    pub href: String,
    pub author_username: String,
    pub author_href: String,
    pub author_avatar_url: Option<String>,
    pub date: String,
    pub datetime: String,
    pub preview: String,
}

#[derive(Debug)]
pub struct HomeView {
    pub posts: Vec<PostCard>,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<HomeView>,
}

#[derive(Debug)]
pub struct PostDetailView {
    pub title: String,
    pub author_username: String,
    pub author_href: String,
    pub author_avatar_url: Option<String>,
    pub date: String,
    pub datetime: String,
    /// Sanitized rich-text body.
    pub content_html: String,
    pub draft: bool,
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailView>,
}

#[derive(Debug)]
pub struct ProfilePostItem {
    pub title: String,
    pub href: String,
    pub date: String,
    pub datetime: String,
    pub draft: bool,
}

#[derive(Debug)]
pub struct ProfileView {
    pub full_name: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub joined: String,
    pub posts: Vec<ProfilePostItem>,
    pub is_owner: bool,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileView>,
}

#[derive(Debug, Default)]
pub struct ComposerView {
    pub title: String,
    /// Submitted content, echoed back into the hidden form field.
    pub content: String,
    /// Sanitized copy of `content` shown in the editor surface.
    pub editor_html: String,
    pub error: Option<String>,
}

impl ComposerView {
    /// Form re-rendered after a failed submission, keeping what was typed.
    pub fn retry(title: String, content: String, error: String) -> Self {
        Self {
            title,
            editor_html: sanitize_post_html(&content),
            content,
            error: Some(error),
        }
    }
}

#[derive(Template)]
#[template(path = "new_post.html")]
pub struct NewPostTemplate {
    pub view: LayoutContext<ComposerView>,
}

#[derive(Debug, Default)]
pub struct LoginView {
    pub email: String,
    pub error: Option<String>,
    pub notice: Option<String>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginView>,
}

#[derive(Debug, Default)]
pub struct RegisterView {
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub view: LayoutContext<RegisterView>,
}

#[derive(Debug)]
pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page not found".to_string(),
            message: "The page you requested does not exist.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }

    pub fn post_not_found() -> Self {
        Self {
            title: "Post not found".to_string(),
            message: "This post does not exist or is not available.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }

    pub fn profile_not_found() -> Self {
        Self {
            title: "Profile not found".to_string(),
            message: "No author with this id exists.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }

    /// Failure page that shows the underlying message as-is.
    pub fn failure(title: &str, message: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            message: message.into(),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

#[derive(Debug)]
pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/".to_string(),
            label: "Back to home".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

pub fn post_href(id: impl std::fmt::Display) -> String {
    format!("/post/{id}")
}

pub fn profile_href(id: impl std::fmt::Display) -> String {
    format!("/profile/{id}")
}

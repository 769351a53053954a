use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    application::error::ErrorReport,
    presentation::views::{
        ErrorPageView, IndexTemplate, LayoutContext, PostTemplate, ProfileTemplate,
        render_error_response, render_not_found_response, render_template_response,
    },
};

use super::{CurrentUser, HttpState};

pub(super) async fn index(State(state): State<HttpState>, current: CurrentUser) -> Response {
    let CurrentUser { viewer, jar } = current;
    let chrome = state.chrome.for_viewer(viewer.as_ref());

    let response = match state.feed.home().await {
        Ok(content) => {
            let view = LayoutContext::new(chrome, content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => render_error_response(
            chrome,
            ErrorPageView::failure("Could not load posts", err.to_string()),
            ErrorReport::from(&err),
        ),
    };
    (jar, response).into_response()
}

pub(super) async fn post_detail(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    current: CurrentUser,
) -> Response {
    let CurrentUser { viewer, jar } = current;
    let chrome = state.chrome.for_viewer(viewer.as_ref());

    let response = match state.feed.post_detail(&id, viewer.as_ref()).await {
        Ok(Some(content)) => {
            let chrome = chrome.with_page_title(&content.title);
            let view = LayoutContext::new(chrome, content);
            render_template_response(PostTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(chrome, ErrorPageView::post_not_found()),
        Err(err) => render_error_response(
            chrome,
            ErrorPageView::failure("Could not load post", err.to_string()),
            ErrorReport::from(&err),
        ),
    };
    (jar, response).into_response()
}

pub(super) async fn profile(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    current: CurrentUser,
) -> Response {
    let CurrentUser { viewer, jar } = current;
    let chrome = state.chrome.for_viewer(viewer.as_ref());

    let response = match state.feed.profile_page(&id, viewer.as_ref()).await {
        Ok(Some(content)) => {
            let chrome = chrome.with_page_title(&format!("@{}", content.username));
            let view = LayoutContext::new(chrome, content);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(chrome, ErrorPageView::profile_not_found()),
        Err(err) => render_error_response(
            chrome,
            ErrorPageView::failure("Could not load profile", err.to_string()),
            ErrorReport::from(&err),
        ),
    };
    (jar, response).into_response()
}

pub(super) async fn fallback(State(state): State<HttpState>, current: CurrentUser) -> Response {
    let CurrentUser { viewer, jar } = current;
    let chrome = state.chrome.for_viewer(viewer.as_ref());
    (
        jar,
        render_not_found_response(chrome, ErrorPageView::not_found()),
    )
        .into_response()
}

pub(super) async fn health(State(state): State<HttpState>) -> Response {
    match state.health.health_check().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::public::health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

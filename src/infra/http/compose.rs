use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::{
    application::error::ErrorReport,
    presentation::views::{
        ComposerView, LayoutChrome, LayoutContext, NewPostTemplate, render_template_response,
    },
};

use super::{CurrentUser, HttpState};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ComposeForm {
    title: String,
    content: String,
}

fn render_composer(chrome: LayoutChrome, content: ComposerView, status: StatusCode) -> Response {
    let view = LayoutContext::new(chrome.with_page_title("New post"), content);
    render_template_response(NewPostTemplate { view }, status)
}

pub(super) async fn new_post_form(
    State(state): State<HttpState>,
    current: CurrentUser,
) -> Response {
    let CurrentUser { viewer, jar } = current;
    let Some(viewer) = viewer else {
        return (jar, Redirect::to("/login")).into_response();
    };

    let chrome = state.chrome.for_viewer(Some(&viewer));
    (
        jar,
        render_composer(chrome, ComposerView::default(), StatusCode::OK),
    )
        .into_response()
}

pub(super) async fn create_post(
    State(state): State<HttpState>,
    current: CurrentUser,
    Form(form): Form<ComposeForm>,
) -> Response {
    let CurrentUser { viewer, jar } = current;
    let Some(viewer) = viewer else {
        return (jar, Redirect::to("/login")).into_response();
    };

    match state
        .composer
        .publish(&viewer, &form.title, &form.content)
        .await
    {
        Ok(()) => (jar, Redirect::to("/")).into_response(),
        Err(err) => {
            let report = ErrorReport::from(&err);
            let chrome = state.chrome.for_viewer(Some(&viewer));
            let content = ComposerView::retry(form.title, form.content, err.to_string());
            let mut response = render_composer(chrome, content, report.status);
            report.attach(&mut response);
            (jar, response).into_response()
        }
    }
}

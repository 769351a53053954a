use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::{
    application::{
        error::ErrorReport,
        repos::SignUpOutcome,
        session::{SessionError, SignUpRequest},
    },
    presentation::views::{
        LayoutChrome, LayoutContext, LoginTemplate, LoginView, RegisterTemplate, RegisterView,
        render_template_response,
    },
};

use super::{CurrentUser, HttpState};

const CONFIRM_EMAIL_NOTICE: &str =
    "Check your email to confirm your account, then sign in with your new password.";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct LoginForm {
    email: String,
    password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct RegisterForm {
    email: String,
    password: String,
    username: String,
    full_name: String,
}

fn render_login(chrome: LayoutChrome, content: LoginView, status: StatusCode) -> Response {
    let view = LayoutContext::new(chrome.with_page_title("Sign in"), content);
    render_template_response(LoginTemplate { view }, status)
}

fn render_register(chrome: LayoutChrome, content: RegisterView, status: StatusCode) -> Response {
    let view = LayoutContext::new(chrome.with_page_title("Sign up"), content);
    render_template_response(RegisterTemplate { view }, status)
}

fn with_report(mut response: Response, error: &SessionError) -> Response {
    ErrorReport::from(error).attach(&mut response);
    response
}

pub(super) async fn login_form(State(state): State<HttpState>, current: CurrentUser) -> Response {
    let CurrentUser { viewer, jar } = current;
    let chrome = state.chrome.for_viewer(viewer.as_ref());
    (
        jar,
        render_login(chrome, LoginView::default(), StatusCode::OK),
    )
        .into_response()
}

pub(super) async fn login(
    State(state): State<HttpState>,
    current: CurrentUser,
    Form(form): Form<LoginForm>,
) -> Response {
    let CurrentUser { viewer, jar } = current;

    match state.session.sign_in(&form.email, &form.password).await {
        Ok(session) => {
            let jar = state.cookies.store(jar, &session);
            (jar, Redirect::to("/")).into_response()
        }
        Err(err) => {
            let status = ErrorReport::from(&err).status;
            let chrome = state.chrome.for_viewer(viewer.as_ref());
            let content = LoginView {
                email: form.email,
                error: Some(err.to_string()),
                notice: None,
            };
            (jar, with_report(render_login(chrome, content, status), &err)).into_response()
        }
    }
}

pub(super) async fn register_form(
    State(state): State<HttpState>,
    current: CurrentUser,
) -> Response {
    let CurrentUser { viewer, jar } = current;
    let chrome = state.chrome.for_viewer(viewer.as_ref());
    (
        jar,
        render_register(chrome, RegisterView::default(), StatusCode::OK),
    )
        .into_response()
}

pub(super) async fn register(
    State(state): State<HttpState>,
    current: CurrentUser,
    Form(form): Form<RegisterForm>,
) -> Response {
    let CurrentUser { viewer, jar } = current;
    let request = SignUpRequest {
        email: form.email.clone(),
        password: form.password,
        username: form.username.clone(),
        full_name: form.full_name.clone(),
    };

    match state.session.sign_up(request).await {
        Ok(SignUpOutcome::Session(session)) => {
            let jar = state.cookies.store(jar, &session);
            (jar, Redirect::to("/")).into_response()
        }
        Ok(SignUpOutcome::PendingConfirmation(_)) => {
            let chrome = state.chrome.for_viewer(viewer.as_ref());
            let content = LoginView {
                email: form.email,
                error: None,
                notice: Some(CONFIRM_EMAIL_NOTICE.to_string()),
            };
            (jar, render_login(chrome, content, StatusCode::OK)).into_response()
        }
        Err(err) => {
            let status = ErrorReport::from(&err).status;
            let chrome = state.chrome.for_viewer(viewer.as_ref());
            let content = RegisterView {
                email: form.email,
                username: form.username,
                full_name: form.full_name,
                error: Some(err.to_string()),
            };
            (
                jar,
                with_report(render_register(chrome, content, status), &err),
            )
                .into_response()
        }
    }
}

/// Sign out remotely (best effort) and drop the session cookies.
pub(super) async fn logout(State(state): State<HttpState>, current: CurrentUser) -> Response {
    let tokens = current.tokens(&state.cookies);
    let CurrentUser { viewer, jar } = current;

    state
        .session
        .sign_out(viewer.as_ref(), tokens.as_ref())
        .await;

    let jar = state.cookies.clear(jar);
    (jar, Redirect::to("/")).into_response()
}

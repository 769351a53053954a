mod account;
mod compose;
mod middleware;
mod public;
mod session;

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

pub use middleware::REQUEST_ID_HEADER;
pub use session::{CurrentUser, SessionCookies};

use crate::application::{
    chrome::ChromeService, composer::ComposerService, feed::FeedService, repos::BackendHealth,
    session::SessionService,
};

use self::middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub composer: Arc<ComposerService>,
    pub chrome: Arc<ChromeService>,
    pub session: Arc<SessionService>,
    pub cookies: SessionCookies,
    pub health: Arc<dyn BackendHealth>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(public::index))
        .route("/post/{id}", get(public::post_detail))
        .route("/profile/{id}", get(public::profile))
        .route("/login", get(account::login_form).post(account::login))
        .route(
            "/register",
            get(account::register_form).post(account::register),
        )
        .route("/logout", post(account::logout))
        .route("/new", get(compose::new_post_form).post(compose::create_post))
        .route("/_health", get(public::health))
        .route("/static/{*path}", get(crate::infra::assets::serve_static))
        .fallback(public::fallback)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

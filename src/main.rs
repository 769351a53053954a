use std::{process, sync::Arc};

use modernblog::{
    application::{
        chrome::ChromeService,
        composer::ComposerService,
        error::AppError,
        feed::FeedService,
        repos::BackendHealth,
        session::{AuthEvent, SessionService},
    },
    config,
    infra::{
        backend::BackendClient,
        error::InfraError,
        http::{self, HttpState, SessionCookies},
        telemetry,
    },
};
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::CheckBackend(_) => run_check_backend(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let backend = Arc::new(BackendClient::new(&settings.backend)?);
    let session = Arc::new(SessionService::new(backend.clone(), backend.clone()));
    let events = spawn_auth_event_logger(session.subscribe());

    let state = HttpState {
        feed: Arc::new(FeedService::new(
            backend.clone(),
            backend.clone(),
            settings.site.preview_chars,
        )),
        composer: Arc::new(ComposerService::new(backend.clone())),
        chrome: Arc::new(ChromeService::new(settings.site.title.clone())),
        session,
        cookies: SessionCookies::new(&settings.session),
        health: backend,
    };

    let result = serve_http(&settings, state).await;

    events.abort();
    let _ = events.await;

    result
}

async fn run_check_backend(settings: config::Settings) -> Result<(), AppError> {
    let backend = BackendClient::new(&settings.backend)?;
    backend.health_check().await.map_err(|err| {
        AppError::from(InfraError::backend(format!(
            "{} is not reachable: {err}",
            settings.backend.url
        )))
    })?;
    info!(
        target = "modernblog::check_backend",
        url = %settings.backend.url,
        "backend reachable"
    );
    Ok(())
}

/// Log session lifecycle events for the lifetime of the process.
fn spawn_auth_event_logger(mut events: broadcast::Receiver<AuthEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match event {
                    AuthEvent::SignedIn { user_id } => {
                        info!(target = "modernblog::auth", %user_id, "user signed in");
                    }
                    AuthEvent::SignedUp { user_id, confirmed } => {
                        info!(target = "modernblog::auth", %user_id, confirmed, "user signed up");
                    }
                    AuthEvent::SignedOut { user_id } => {
                        info!(target = "modernblog::auth", user_id = ?user_id, "user signed out");
                    }
                    AuthEvent::TokenRefreshed { user_id } => {
                        info!(target = "modernblog::auth", %user_id, "session refreshed");
                    }
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(target = "modernblog::auth", skipped, "auth event log lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "modernblog::server",
        addr = %settings.server.addr,
        "listening"
    );

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            let _ = shutdown_rx.changed().await;
        },
    );
    let mut server = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut server => {
            return joined
                .map_err(|err| AppError::unexpected(format!("server task failed: {err}")))?
                .map_err(|err| AppError::from(InfraError::from(err)));
        }
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|err| AppError::from(InfraError::from(err)))?;
            info!(target = "modernblog::server", "shutdown requested; draining connections");
        }
    }

    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
        Ok(joined) => joined
            .map_err(|err| AppError::unexpected(format!("server task failed: {err}")))?
            .map_err(|err| AppError::from(InfraError::from(err))),
        Err(_) => {
            warn!(
                target = "modernblog::server",
                timeout_secs = settings.server.graceful_shutdown.as_secs(),
                "graceful shutdown timed out; aborting open connections"
            );
            server.abort();
            Ok(())
        }
    }
}

//! HTTP client for the hosted backend: auth service and REST table API.

mod auth;
mod rest;

use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::application::repos::{BackendHealth, RepoError};
use crate::config::BackendSettings;
use crate::infra::error::InfraError;

const API_KEY_HEADER: &str = "apikey";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to backend failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("backend rejected request ({status}): {message}")]
    Remote {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },
    #[error("failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid backend URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<BackendError> for RepoError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Transport(err) => RepoError::Transport(err.to_string()),
            BackendError::Remote {
                status,
                code,
                message,
            } => RepoError::Rejected {
                status: status.as_u16(),
                code,
                message,
            },
            BackendError::Decode(err) => RepoError::Decode(err.to_string()),
            BackendError::Url(err) => RepoError::Transport(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Service {
    Auth,
    Rest,
}

impl Service {
    fn as_str(self) -> &'static str {
        match self {
            Service::Auth => "auth",
            Service::Rest => "rest",
        }
    }
}

/// Handle to one backend project. Cheap to clone.
#[derive(Clone, Debug)]
pub struct BackendClient {
    http: Client,
    auth_base: Url,
    rest_base: Url,
    anon_key: String,
}

impl BackendClient {
    pub fn new(settings: &BackendSettings) -> Result<Self, InfraError> {
        let http = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::configuration(format!("http client: {err}")))?;

        let root = directory_url(&settings.url);
        let auth_base = root
            .join("auth/v1/")
            .map_err(|err| InfraError::configuration(format!("backend.url: {err}")))?;
        let rest_base = root
            .join("rest/v1/")
            .map_err(|err| InfraError::configuration(format!("backend.url: {err}")))?;

        Ok(Self {
            http,
            auth_base,
            rest_base,
            anon_key: settings.anon_key.clone(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("modernblog/", env!("CARGO_PKG_VERSION"))
    }

    fn auth_url(&self, path: &str) -> Result<Url, BackendError> {
        self.auth_base.join(path).map_err(BackendError::Url)
    }

    fn rest_url(&self, table: &str, query: &[(&str, String)]) -> Result<Url, BackendError> {
        let mut url = self.rest_base.join(table)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    /// Attach the project key and the caller's bearer token (the anon key
    /// when the caller is not signed in).
    fn authorize(&self, request: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
        let token = bearer.unwrap_or(&self.anon_key);
        request
            .header(API_KEY_HEADER, &self.anon_key)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
    }

    async fn send(&self, service: Service, request: RequestBuilder) -> Result<Response, BackendError> {
        let start = Instant::now();
        let label = service.as_str();
        counter!("modernblog_backend_requests_total", "service" => label).increment(1);

        let result = request.send().await;
        let elapsed = start.elapsed();
        histogram!("modernblog_backend_request_ms", "service" => label)
            .record(elapsed.as_secs_f64() * 1000.0);

        match result {
            Ok(response) => {
                debug!(
                    target = "modernblog::backend",
                    service = label,
                    path = %response.url().path(),
                    status = response.status().as_u16(),
                    elapsed_ms = elapsed.as_millis(),
                    "backend request"
                );
                if !response.status().is_success() {
                    counter!("modernblog_backend_failures_total", "service" => label)
                        .increment(1);
                }
                Ok(response)
            }
            Err(err) => {
                counter!("modernblog_backend_failures_total", "service" => label).increment(1);
                warn!(
                    target = "modernblog::backend",
                    service = label,
                    error = %err,
                    elapsed_ms = elapsed.as_millis(),
                    "backend request failed"
                );
                Err(BackendError::Transport(err))
            }
        }
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(BackendError::Decode)
}

/// Treat the configured URL as a directory so relative joins keep its path.
fn directory_url(url: &Url) -> Url {
    let mut root = url.clone();
    if !root.path().ends_with('/') {
        let path = format!("{}/", root.path());
        root.set_path(&path);
    }
    root.set_query(None);
    root.set_fragment(None);
    root
}

#[async_trait]
impl BackendHealth for BackendClient {
    async fn health_check(&self) -> Result<(), RepoError> {
        let url = self.rest_base.clone();
        let request = self.authorize(self.http.get(url), None);
        let response = self.send(Service::Rest, request).await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(RepoError::Rejected {
                status: status.as_u16(),
                code: None,
                message: format!("backend health probe returned {status}"),
            })
        }
    }
}

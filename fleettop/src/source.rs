//! Fetching config and fleet metrics from the dashboard service.

use std::future::Future;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::types::{EnvironmentConfig, FleetSnapshot};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Why a request produced no payload.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    /// The request never completed (connect, TLS, timeout, reset).
    #[error("{0}")]
    Transport(String),
    /// The service answered with a non-success status.
    #[error("{0}")]
    Status(String),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("fetch task ended unexpectedly: {0}")]
    Aborted(String),
}

impl From<tokio::task::JoinError> for FetchError {
    fn from(e: tokio::task::JoinError) -> Self {
        FetchError::Aborted(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid dashboard URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("unsupported URL scheme '{0}' (expected http or https)")]
    Scheme(String),
    #[error("reading TLS CA {path}: {source}")]
    CaRead {
        path: String,
        source: std::io::Error,
    },
    #[error("building HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// The fetch-JSON capability the session polls through. `scope` is the
/// selected environment; `None` asks for the service default.
pub trait MetricsSource: Send + Sync + 'static {
    fn fetch_config(
        &self,
        scope: Option<String>,
    ) -> impl Future<Output = Result<EnvironmentConfig, FetchError>> + Send;

    fn fetch_metrics(
        &self,
        scope: Option<String>,
    ) -> impl Future<Output = Result<FleetSnapshot, FetchError>> + Send;
}

/// `GET {base}/api/config` and `GET {base}/api/metrics` over reqwest.
pub struct HttpSource {
    client: reqwest::Client,
    config_url: Url,
    metrics_url: Url,
}

impl HttpSource {
    pub fn new(base_url: &str, tls_ca: Option<&str>) -> Result<Self, SourceError> {
        Self::with_timeout(base_url, tls_ca, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: &str,
        tls_ca: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, SourceError> {
        let mut base = Url::parse(base_url)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(SourceError::Scheme(base.scheme().to_string()));
        }
        // keep any path prefix the service is mounted under
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fleettop/", env!("CARGO_PKG_VERSION")));
        if let Some(path) = tls_ca {
            let pem = std::fs::read(path).map_err(|source| SourceError::CaRead {
                path: path.to_string(),
                source,
            })?;
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
        }

        Ok(Self {
            client: builder.build()?,
            config_url: base.join("api/config")?,
            metrics_url: base.join("api/metrics")?,
        })
    }

    pub fn metrics_url(&self, scope: Option<&str>) -> Url {
        scoped(&self.metrics_url, scope)
    }

    pub fn config_url(&self, scope: Option<&str>) -> Url {
        scoped(&self.config_url, scope)
    }
}

impl MetricsSource for HttpSource {
    fn fetch_config(
        &self,
        scope: Option<String>,
    ) -> impl Future<Output = Result<EnvironmentConfig, FetchError>> + Send {
        get_json(self.client.clone(), self.config_url(scope.as_deref()))
    }

    fn fetch_metrics(
        &self,
        scope: Option<String>,
    ) -> impl Future<Output = Result<FleetSnapshot, FetchError>> + Send {
        get_json(self.client.clone(), self.metrics_url(scope.as_deref()))
    }
}

fn scoped(url: &Url, scope: Option<&str>) -> Url {
    let mut url = url.clone();
    if let Some(env) = scope.filter(|s| !s.is_empty()) {
        url.query_pairs_mut().append_pair("env", env);
    }
    url
}

async fn get_json<T: DeserializeOwned>(client: reqwest::Client, url: Url) -> Result<T, FetchError> {
    tracing::debug!(%url, "GET");
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let reason = status.canonical_reason().unwrap_or("Request failed");
        let body = resp.text().await.unwrap_or_default();
        return Err(FetchError::Status(describe_status(reason, &body)));
    }

    let body = resp
        .bytes()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?;
    serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
}

/// The collector answers failed collections with `500 {"error": "..."}`;
/// surface that text next to the status reason.
pub fn describe_status(reason: &str, body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<String>,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error: Some(e) }) if !e.is_empty() => format!("{reason}: {e}"),
        _ => reason.to_string(),
    }
}

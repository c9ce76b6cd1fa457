//! HTTP client for the controller REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

use crate::config::ControllerConfig;
use crate::models::{Instance, Job, MemoryLog};

use super::ReportSink;

/// Controller collections the agent posts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Instances,
    Jobs,
    MemoryLogs,
}

impl Endpoint {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Instances => "instances",
            Self::Jobs => "jobs",
            Self::MemoryLogs => "memorylogs",
        }
    }
}

/// Errors from controller operations.
#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("Failed to build controller HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Invalid controller URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Request to /{} failed: {source}", .endpoint.path())]
    Request {
        endpoint: Endpoint,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to /{} timed out", .endpoint.path())]
    Timeout { endpoint: Endpoint },

    #[error("Controller returned HTTP {status} for /{}: {body}", .endpoint.path())]
    Status {
        endpoint: Endpoint,
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Controller API client.
#[derive(Debug, Clone)]
pub struct ControllerClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ControllerClient {
    /// Create a new client for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn new(
        base_url: &str,
        token: impl Into<String>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, ControllerError> {
        url::Url::parse(base_url).map_err(|e| ControllerError::InvalidUrl {
            url: base_url.to_string(),
            source: e,
        })?;

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()
            .map_err(ControllerError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Create a client from configuration.
    ///
    /// Unset URL and token are passed through as empty strings; call
    /// `AgentConfig::validate` first to reject them with a clearer error.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be
    /// built.
    pub fn from_config(config: &ControllerConfig) -> Result<Self, ControllerError> {
        Self::new(
            config.url.as_deref().unwrap_or_default(),
            config.token.clone().unwrap_or_default(),
            Duration::from_secs(config.timeout_secs),
            Duration::from_secs(config.connect_timeout_secs),
        )
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}", self.base_url, endpoint.path())
    }

    async fn post<T: Serialize + Sync>(
        &self,
        endpoint: Endpoint,
        body: &T,
    ) -> Result<(), ControllerError> {
        let response = self
            .client
            .post(self.url(endpoint))
            .header("Authorization", format!("Token {}", self.token))
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ControllerError::Timeout { endpoint }
                } else {
                    ControllerError::Request {
                        endpoint,
                        source: e,
                    }
                }
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(endpoint = endpoint.path(), %status, "Controller accepted record");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ControllerError::Status {
            endpoint,
            status,
            body,
        })
    }
}

#[async_trait]
impl ReportSink for ControllerClient {
    async fn report_instance(&self, instance: &Instance) -> Result<(), ControllerError> {
        self.post(Endpoint::Instances, instance).await
    }

    async fn report_job(&self, job: &Job) -> Result<(), ControllerError> {
        self.post(Endpoint::Jobs, job).await
    }

    async fn report_memory_log(&self, log: &MemoryLog) -> Result<(), ControllerError> {
        self.post(Endpoint::MemoryLogs, log).await
    }
}

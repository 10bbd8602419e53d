//! Client for the external agent runtime

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("agent runtime URL is not configured")]
    NotConfigured,

    #[error("invalid runtime URL: {0}")]
    InvalidUrl(String),

    /// The runtime answered with a non-success status
    #[error("HTTP {0}")]
    Status(u16),

    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

/// Starts agent runs on the runtime service
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    async fn trigger_run(&self, agent_id: &str) -> Result<(), RuntimeError>;
}

/// HTTP client for `POST {base}/run/{agent_id}`. Single attempt, no retry.
#[derive(Clone)]
pub struct HttpAgentRuntime {
    client: reqwest::Client,
    base_url: Option<Url>,
}

impl HttpAgentRuntime {
    pub fn new(base_url: Option<&str>) -> Result<Self, RuntimeError> {
        let base_url = base_url
            .map(|raw| Url::parse(raw).map_err(|e| RuntimeError::InvalidUrl(format!("{}: {}", raw, e))))
            .transpose()?;

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
        })
    }

    fn run_url(&self, agent_id: &str) -> Result<Url, RuntimeError> {
        let base = self.base_url.as_ref().ok_or(RuntimeError::NotConfigured)?;
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| RuntimeError::InvalidUrl(base.to_string()))?
            .pop_if_empty()
            .push("run")
            .push(agent_id);
        Ok(url)
    }
}

#[async_trait]
impl AgentRuntime for HttpAgentRuntime {
    async fn trigger_run(&self, agent_id: &str) -> Result<(), RuntimeError> {
        let url = self.run_url(agent_id)?;
        debug!(url = %url, "Triggering agent run");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RuntimeError::Status(status.as_u16()));
        }

        info!(agent_id, "Agent run triggered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_url_appends_segments() {
        let runtime = HttpAgentRuntime::new(Some("http://runtime.internal:8000")).unwrap();
        assert_eq!(
            runtime.run_url("digest").unwrap().as_str(),
            "http://runtime.internal:8000/run/digest"
        );
    }

    #[test]
    fn test_run_url_keeps_base_path() {
        let runtime = HttpAgentRuntime::new(Some("https://example.com/api/")).unwrap();
        assert_eq!(
            runtime.run_url("a1").unwrap().as_str(),
            "https://example.com/api/run/a1"
        );
    }

    #[test]
    fn test_run_url_escapes_agent_id() {
        let runtime = HttpAgentRuntime::new(Some("http://rt")).unwrap();
        assert_eq!(
            runtime.run_url("../admin").unwrap().as_str(),
            "http://rt/run/..%2Fadmin"
        );
    }

    #[test]
    fn test_missing_base_url() {
        let runtime = HttpAgentRuntime::new(None).unwrap();
        assert!(matches!(runtime.run_url("x"), Err(RuntimeError::NotConfigured)));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            HttpAgentRuntime::new(Some("not a url")),
            Err(RuntimeError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_status_error_display() {
        assert_eq!(RuntimeError::Status(502).to_string(), "HTTP 502");
    }

    #[tokio::test]
    async fn test_trigger_without_base_url_fails_fast() {
        let runtime = HttpAgentRuntime::new(None).unwrap();
        let err = runtime.trigger_run("digest").await.unwrap_err();
        assert!(matches!(err, RuntimeError::NotConfigured));
    }
}

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use mockall::automock;
use reqwest::{Client, Url};

use super::common::{
    http_client_factory,
    transport::{CreateSessionPayload, CreateSessionResponse, StatusResponse},
    BackendResponseError,
};

#[cfg(test)]
mod tests;

/// The two backend endpoints this client depends on
#[automock]
#[async_trait]
pub trait VerificationBackend: Send + Sync {
    async fn create_session(
        &self,
    ) -> Result<CreateSessionResponse, Box<dyn std::error::Error + Send + Sync>>;
    async fn verification_status(
        &self,
        session_id: String,
    ) -> Result<StatusResponse, Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Clone)]
pub struct HttpBackend {
    base_url: Url,
    client: Client,
}

impl HttpBackend {
    pub fn new(
        backend_url: &str,
        timeout: Duration,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let base_url = Url::parse(backend_url)?;

        if base_url.cannot_be_a_base() {
            return Err(Box::new(BackendResponseError::new(format!(
                "backend url cannot be used as a base: {backend_url}"
            ))));
        }

        Ok(Self {
            base_url,
            client: http_client_factory(timeout)?,
        })
    }

    /// Appends path segments to the base url, each segment being percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();

        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }

        url
    }
}

#[async_trait]
impl VerificationBackend for HttpBackend {
    async fn create_session(
        &self,
    ) -> Result<CreateSessionResponse, Box<dyn std::error::Error + Send + Sync>> {
        let url = self.endpoint(&["create-session"]);

        debug!("requesting verification session from {url}");

        let resp = self
            .client
            .post(url)
            .json(&CreateSessionPayload::default())
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            debug!("create-session answered {status}: {body}");
        }

        // the payload is inspected even on error statuses, missing fields are decided by the caller
        let res = serde_json::from_str::<CreateSessionResponse>(&body)?;

        Ok(res)
    }

    async fn verification_status(
        &self,
        session_id: String,
    ) -> Result<StatusResponse, Box<dyn std::error::Error + Send + Sync>> {
        let url = self.endpoint(&["verification-status", session_id.as_str()]);

        debug!("fetching verification status from {url}");

        let resp = self.client.get(url).send().await?;

        if !resp.status().is_success() {
            return Err(Box::new(BackendResponseError::with_status(
                format!("verification-status/{session_id} request failed"),
                resp.status(),
            )));
        }

        let res = resp.json::<StatusResponse>().await?;

        Ok(res)
    }
}

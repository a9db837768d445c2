use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::domain::{EntitySubmission, RequestId};

/// Everything a provider needs to run a screening and deliver the result
/// back: the submission itself plus the callback URL carrying the request id.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub endpoint: String,
    pub request_id: RequestId,
    pub callback_url: String,
    pub submission: EntitySubmission,
}

/// Outbound transport seam so the service can be tested without a network.
#[async_trait]
pub trait ScreeningClient: Send + Sync {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<(), DispatchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider rejected submission with status {status}")]
    Rejected { status: u16 },
}

/// HTTP dispatch client posting submissions to the configured provider
/// endpoint as JSON.
pub struct HttpScreeningClient {
    http: reqwest::Client,
}

impl HttpScreeningClient {
    pub fn new(timeout: Duration) -> Result<Self, DispatchError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ScreeningClient for HttpScreeningClient {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<(), DispatchError> {
        let body = json!({
            "entityName": request.submission.entity_name,
            "dateOfBirth": request.submission.date_of_birth,
            "country": request.submission.country,
            "requestId": request.request_id,
            "callbackUrl": request.callback_url,
        });

        let response = self.http.post(&request.endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::config::{PollMode, ProviderDirectory, ScreeningConfig};

use super::client::{DispatchError, DispatchRequest, ScreeningClient};
use super::domain::{EntitySubmission, PendingResult, RequestId, SlotKey, SubmissionReceipt};
use super::store::{ResultStore, StoreError};

/// Service composing the result store, the outbound dispatch client, and the
/// provider directory.
pub struct ScreeningService<S, C> {
    store: Arc<S>,
    client: Arc<C>,
    providers: ProviderDirectory,
    callback_base_url: String,
    poll_mode: PollMode,
}

impl<S, C> ScreeningService<S, C>
where
    S: ResultStore + 'static,
    C: ScreeningClient + 'static,
{
    pub fn new(store: Arc<S>, client: Arc<C>, config: ScreeningConfig) -> Self {
        Self {
            store,
            client,
            providers: config.providers,
            callback_base_url: config.callback_base_url,
            poll_mode: config.poll_mode,
        }
    }

    pub fn poll_mode(&self) -> PollMode {
        self.poll_mode
    }

    /// Callback URL handed to providers, embedding the request id so the
    /// delivery lands in the matching slot.
    pub fn callback_url_for(&self, request_id: &RequestId) -> String {
        format!(
            "{}/api/listen/{}",
            self.callback_base_url.trim_end_matches('/'),
            request_id
        )
    }

    /// Submit an entity for screening: validate, resolve the provider
    /// endpoint, mint a request id, and dispatch. A provider with no
    /// configured endpoint fails here, before any network call.
    pub async fn submit(
        &self,
        provider: &str,
        submission: EntitySubmission,
    ) -> Result<SubmissionReceipt, ScreeningServiceError> {
        if submission.entity_name.trim().is_empty() {
            return Err(ScreeningServiceError::MissingEntityName);
        }

        let endpoint = self.providers.endpoint_for(provider).ok_or_else(|| {
            ScreeningServiceError::ProviderNotConfigured {
                provider: provider.trim().to_string(),
            }
        })?;

        let request_id = RequestId::generate();
        let callback_url = self.callback_url_for(&request_id);
        let request = DispatchRequest {
            endpoint: endpoint.to_string(),
            request_id: request_id.clone(),
            callback_url: callback_url.clone(),
            submission,
        };

        self.client.dispatch(&request).await?;
        info!(%request_id, provider, "screening request dispatched");

        Ok(SubmissionReceipt {
            request_id,
            provider: provider.trim().to_string(),
            endpoint: request.endpoint,
            callback_url,
        })
    }

    /// Buffer a provider callback, overwriting any earlier delivery for the
    /// same slot.
    pub fn record_callback(
        &self,
        key: SlotKey,
        payload: Value,
    ) -> Result<PendingResult, ScreeningServiceError> {
        let record = self.store.put(key, payload)?;
        Ok(record)
    }

    /// Return the buffered result for a slot, if any. In consume mode the
    /// read removes the entry, so the next poll observes absence.
    pub fn poll(&self, key: &SlotKey) -> Result<Option<PendingResult>, ScreeningServiceError> {
        let result = self.store.get(key, self.poll_mode.consumes())?;
        Ok(result)
    }

    /// Drop a slot. Idempotent; used when a client gives up or navigates
    /// away.
    pub fn clear(&self, key: &SlotKey) -> Result<(), ScreeningServiceError> {
        self.store.delete(key)?;
        Ok(())
    }
}

/// Error raised by the screening service.
#[derive(Debug, thiserror::Error)]
pub enum ScreeningServiceError {
    #[error("entity name must not be empty")]
    MissingEntityName,
    #[error("no screening endpoint configured for provider '{provider}'")]
    ProviderNotConfigured { provider: String },
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

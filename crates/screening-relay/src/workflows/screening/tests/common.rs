use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use axum::Router;
use serde_json::Value;

use crate::config::{PollMode, ProviderDirectory, ScreeningConfig};
use crate::workflows::screening::client::{DispatchError, DispatchRequest, ScreeningClient};
use crate::workflows::screening::domain::{EntitySubmission, PendingResult, SlotKey};
use crate::workflows::screening::router::listen_router;
use crate::workflows::screening::service::ScreeningService;
use crate::workflows::screening::store::{InMemoryResultStore, ResultStore, StoreError};

pub(super) fn submission() -> EntitySubmission {
    EntitySubmission {
        entity_name: "Acme Corp".to_string(),
        date_of_birth: Some("1984-06-01".to_string()),
        country: Some("Panama".to_string()),
    }
}

pub(super) fn screening_config(poll_mode: PollMode) -> ScreeningConfig {
    ScreeningConfig {
        providers: ProviderDirectory::from_entries([
            ("openai", "https://screen.example/openai/submit"),
            ("deepseek", "https://screen.example/deepseek/submit"),
        ]),
        callback_base_url: "https://relay.example".to_string(),
        poll_mode,
        poll_interval_secs: 2,
    }
}

/// Client fake capturing every dispatch so tests can assert the outbound
/// contract without a network.
#[derive(Default)]
pub(super) struct RecordingClient {
    dispatches: Mutex<Vec<DispatchRequest>>,
}

#[async_trait]
impl ScreeningClient for RecordingClient {
    async fn dispatch(&self, request: &DispatchRequest) -> Result<(), DispatchError> {
        self.dispatches
            .lock()
            .expect("dispatch mutex poisoned")
            .push(request.clone());
        Ok(())
    }
}

impl RecordingClient {
    pub(super) fn dispatches(&self) -> Vec<DispatchRequest> {
        self.dispatches
            .lock()
            .expect("dispatch mutex poisoned")
            .clone()
    }
}

/// Client fake standing in for a provider that refuses the submission.
pub(super) struct RejectingClient;

#[async_trait]
impl ScreeningClient for RejectingClient {
    async fn dispatch(&self, _request: &DispatchRequest) -> Result<(), DispatchError> {
        Err(DispatchError::Rejected { status: 503 })
    }
}

/// Store fake standing in for an unreachable backend.
pub(super) struct FailingStore;

impl ResultStore for FailingStore {
    fn put(&self, _key: SlotKey, _payload: Value) -> Result<PendingResult, StoreError> {
        Err(StoreError::Unavailable("backing store offline".to_string()))
    }

    fn get(&self, _key: &SlotKey, _consume: bool) -> Result<Option<PendingResult>, StoreError> {
        Err(StoreError::Unavailable("backing store offline".to_string()))
    }

    fn delete(&self, _key: &SlotKey) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("backing store offline".to_string()))
    }
}

pub(super) type TestService = ScreeningService<InMemoryResultStore, RecordingClient>;

pub(super) fn build_service(
    poll_mode: PollMode,
) -> (Arc<TestService>, Arc<InMemoryResultStore>, Arc<RecordingClient>) {
    let store = Arc::new(InMemoryResultStore::default());
    let client = Arc::new(RecordingClient::default());
    let service = Arc::new(ScreeningService::new(
        store.clone(),
        client.clone(),
        screening_config(poll_mode),
    ));
    (service, store, client)
}

pub(super) fn build_router(poll_mode: PollMode) -> (Router, Arc<InMemoryResultStore>) {
    let (service, store, _) = build_service(poll_mode);
    (listen_router(service), store)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("body reads");
    serde_json::from_slice(&body).expect("body is JSON")
}

//! Integration specifications for the screening submission and callback
//! polling workflow, driven through the public service facade and HTTP router.

mod common {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use screening_relay::config::{PollMode, ProviderDirectory, ScreeningConfig};
    use screening_relay::workflows::screening::{
        DispatchError, DispatchRequest, EntitySubmission, InMemoryResultStore, ScreeningClient,
        ScreeningService,
    };

    #[derive(Default)]
    pub struct RecordingClient {
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
        pub fn dispatches(&self) -> Vec<DispatchRequest> {
            self.dispatches
                .lock()
                .expect("dispatch mutex poisoned")
                .clone()
        }
    }

    pub fn submission() -> EntitySubmission {
        EntitySubmission {
            entity_name: "Acme Corp".to_string(),
            date_of_birth: None,
            country: Some("Panama".to_string()),
        }
    }

    pub fn config(poll_mode: PollMode) -> ScreeningConfig {
        ScreeningConfig {
            providers: ProviderDirectory::from_entries([(
                "openai",
                "https://screen.example/openai/submit",
            )]),
            callback_base_url: "http://127.0.0.1:3000".to_string(),
            poll_mode,
            poll_interval_secs: 2,
        }
    }

    pub fn build_service(
        poll_mode: PollMode,
    ) -> (
        Arc<ScreeningService<InMemoryResultStore, RecordingClient>>,
        Arc<RecordingClient>,
    ) {
        let store = Arc::new(InMemoryResultStore::default());
        let client = Arc::new(RecordingClient::default());
        let service = Arc::new(ScreeningService::new(store, client.clone(), config(poll_mode)));
        (service, client)
    }
}

mod workflow {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use screening_relay::config::PollMode;
    use screening_relay::workflows::screening::{listen_router, ScreeningServiceError};

    use super::common::{build_service, submission};

    async fn read_json_body(response: axum::response::Response) -> Value {
        let body = to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("body reads");
        serde_json::from_slice(&body).expect("body is JSON")
    }

    #[tokio::test]
    async fn submission_callback_and_poll_complete_the_cycle() {
        let (service, client) = build_service(PollMode::Consume);
        let router = listen_router(service.clone());

        let receipt = service
            .submit("openai", submission())
            .await
            .expect("submission dispatches");

        let dispatches = client.dispatches();
        assert_eq!(dispatches.len(), 1);
        assert!(dispatches[0]
            .callback_url
            .ends_with(&format!("/api/listen/{}", receipt.request_id)));

        // The provider finishes screening and calls back with its findings.
        let provider_payload = json!({
            "output": {
                "entity_summary": { "name": "Acme Corp" },
                "risk_score": 87,
            }
        });
        let response = router
            .clone()
            .oneshot(
                Request::post(format!("/api/listen/{}", receipt.request_id))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        serde_json::to_vec(&provider_payload).expect("serializes"),
                    ))
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);

        // The client's next poll picks up exactly that payload.
        let response = router
            .clone()
            .oneshot(
                Request::get(format!("/api/listen/{}", receipt.request_id))
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["success"], true);
        assert_eq!(payload["data"]["payload"], provider_payload);

        // Single delivery: the read consumed the slot.
        let response = router
            .oneshot(
                Request::get(format!("/api/listen/{}", receipt.request_id))
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        let payload = read_json_body(response).await;
        assert_eq!(payload["success"], true);
        assert!(payload["data"].is_null());
    }

    #[tokio::test]
    async fn unconfigured_provider_fails_before_any_dispatch() {
        let (service, client) = build_service(PollMode::Retain);

        let error = service
            .submit("llama", submission())
            .await
            .expect_err("unconfigured provider rejected");

        assert!(matches!(
            error,
            ScreeningServiceError::ProviderNotConfigured { .. }
        ));
        assert!(client.dispatches().is_empty());
    }

    #[tokio::test]
    async fn malformed_callback_leaves_earlier_delivery_intact() {
        let (service, _) = build_service(PollMode::Retain);
        let router = listen_router(service.clone());

        router
            .clone()
            .oneshot(
                Request::post("/api/listen/abc123")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"status":"clean"}"#))
                    .expect("request builds"),
            )
            .await
            .expect("route executes");

        let response = router
            .clone()
            .oneshot(
                Request::post("/api/listen/abc123")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{truncated"))
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = router
            .oneshot(
                Request::get("/api/listen/abc123")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        let payload = read_json_body(response).await;
        assert_eq!(payload["data"]["payload"], json!({ "status": "clean" }));
    }
}

use std::sync::Arc;

use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::client::ScreeningClient;
use super::domain::SlotKey;
use super::service::ScreeningService;
use super::store::ResultStore;

/// Router builder exposing the callback-listening endpoints: the
/// request-keyed variant under `/api/listen/:request_id` and the singleton
/// variant under `/api/listen`.
pub fn listen_router<S, C>(service: Arc<ScreeningService<S, C>>) -> Router
where
    S: ResultStore + 'static,
    C: ScreeningClient + 'static,
{
    Router::new()
        .route(
            "/api/listen",
            get(poll_singleton::<S, C>)
                .post(receive_singleton::<S, C>)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/listen/:request_id",
            get(poll_keyed::<S, C>)
                .post(receive_keyed::<S, C>)
                .delete(clear_keyed::<S, C>)
                .fallback(method_not_allowed),
        )
        .layer(middleware::from_fn(cors_headers))
        .with_state(service)
}

/// External callers are browsers and third-party screening services, so every
/// listen response carries permissive CORS headers and OPTIONS preflights
/// short-circuit to an empty 200.
pub(crate) async fn cors_headers(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::OK.into_response();
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET,OPTIONS,PATCH,DELETE,POST,PUT"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(
            "X-CSRF-Token, X-Requested-With, Accept, Accept-Version, Content-Length, \
             Content-MD5, Content-Type, Date, X-Api-Version",
        ),
    );
}

pub(crate) async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "success": false, "error": "Method not allowed" })),
    )
        .into_response()
}

pub(crate) async fn receive_keyed<S, C>(
    State(service): State<Arc<ScreeningService<S, C>>>,
    Path(request_id): Path<String>,
    request: Request,
) -> Response
where
    S: ResultStore + 'static,
    C: ScreeningClient + 'static,
{
    let payload = match decode_callback_body(request).await {
        Ok(payload) => payload,
        Err(err) => return malformed_body_response(&err),
    };

    // The slot key comes from the path only; a forged body field must not be
    // able to overwrite an unrelated pending slot.
    let key = SlotKey::request(request_id.clone());
    match service.record_callback(key, payload) {
        Ok(_) => {
            info!(%request_id, "callback payload received");
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": "Data received successfully",
                    "id": request_id,
                })),
            )
                .into_response()
        }
        Err(err) => store_failure_response(&err),
    }
}

pub(crate) async fn receive_singleton<S, C>(
    State(service): State<Arc<ScreeningService<S, C>>>,
    request: Request,
) -> Response
where
    S: ResultStore + 'static,
    C: ScreeningClient + 'static,
{
    let payload = match decode_callback_body(request).await {
        Ok(payload) => payload,
        Err(err) => return malformed_body_response(&err),
    };

    match service.record_callback(SlotKey::Singleton, payload) {
        Ok(_) => {
            info!("callback payload received");
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": "Data received successfully",
                })),
            )
                .into_response()
        }
        Err(err) => store_failure_response(&err),
    }
}

pub(crate) async fn poll_keyed<S, C>(
    State(service): State<Arc<ScreeningService<S, C>>>,
    Path(request_id): Path<String>,
) -> Response
where
    S: ResultStore + 'static,
    C: ScreeningClient + 'static,
{
    let key = SlotKey::request(request_id.clone());
    match service.poll(&key) {
        // Absence is a normal transient state while the provider works.
        Ok(result) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": result,
                "id": request_id,
            })),
        )
            .into_response(),
        Err(err) => store_failure_response(&err),
    }
}

pub(crate) async fn poll_singleton<S, C>(
    State(service): State<Arc<ScreeningService<S, C>>>,
) -> Response
where
    S: ResultStore + 'static,
    C: ScreeningClient + 'static,
{
    match service.poll(&SlotKey::Singleton) {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": result,
            })),
        )
            .into_response(),
        Err(err) => store_failure_response(&err),
    }
}

pub(crate) async fn clear_keyed<S, C>(
    State(service): State<Arc<ScreeningService<S, C>>>,
    Path(request_id): Path<String>,
) -> Response
where
    S: ResultStore + 'static,
    C: ScreeningClient + 'static,
{
    let key = SlotKey::request(request_id.clone());
    match service.clear(&key) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Data cleared",
                "id": request_id,
            })),
        )
            .into_response(),
        Err(err) => store_failure_response(&err),
    }
}

#[derive(Debug, Deserialize)]
struct CallbackForm {
    html: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum CallbackBodyError {
    #[error("unreadable form payload: {0}")]
    Form(String),
    #[error("malformed JSON payload: {0}")]
    Json(String),
}

/// Providers deliver either a JSON document or a form upload whose `html`
/// field carries rendered result markup. Form uploads are normalized to an
/// `{"html": ...}` payload; a missing field stores an empty string.
async fn decode_callback_body(request: Request) -> Result<Value, CallbackBodyError> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|err| CallbackBodyError::Form(err.to_string()))?;
        let mut html = String::new();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| CallbackBodyError::Form(err.to_string()))?
        {
            if field.name() == Some("html") {
                html = field
                    .text()
                    .await
                    .map_err(|err| CallbackBodyError::Form(err.to_string()))?;
            }
        }
        return Ok(json!({ "html": html }));
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(form) = Form::<CallbackForm>::from_request(request, &())
            .await
            .map_err(|err| CallbackBodyError::Form(err.to_string()))?;
        return Ok(json!({ "html": form.html.unwrap_or_default() }));
    }

    let Json(value) = Json::<Value>::from_request(request, &())
        .await
        .map_err(|err| CallbackBodyError::Json(err.to_string()))?;
    Ok(value)
}

fn malformed_body_response(err: &CallbackBodyError) -> Response {
    warn!(error = %err, "rejected unparseable callback body");
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "success": false, "error": err.to_string() })),
    )
        .into_response()
}

fn store_failure_response(err: &impl std::fmt::Display) -> Response {
    error!(error = %err, "result store operation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": "Internal server error" })),
    )
        .into_response()
}

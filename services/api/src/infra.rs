use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusHandle;
use screening_relay::config::AppConfig;
use screening_relay::error::AppError;
use screening_relay::workflows::screening::{
    HttpScreeningClient, InMemoryResultStore, ScreeningService, ScreeningServiceError,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type RelayService = ScreeningService<InMemoryResultStore, HttpScreeningClient>;

const DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Assemble the screening service over the process-lifetime in-memory store.
/// The store is created here and dropped with the process; nothing persists
/// across restarts.
pub(crate) fn build_screening_service(config: &AppConfig) -> Result<Arc<RelayService>, AppError> {
    let store = Arc::new(InMemoryResultStore::default());
    let client = Arc::new(
        HttpScreeningClient::new(DISPATCH_TIMEOUT).map_err(ScreeningServiceError::Dispatch)?,
    );
    Ok(Arc::new(ScreeningService::new(
        store,
        client,
        config.screening.clone(),
    )))
}

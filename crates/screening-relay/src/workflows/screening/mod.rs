//! Entity screening workflow: submission dispatch to external providers,
//! buffering of their asynchronous callbacks, and the polling handoff that
//! delivers buffered results to clients.

pub mod client;
pub mod domain;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use client::{DispatchError, DispatchRequest, HttpScreeningClient, ScreeningClient};
pub use domain::{EntitySubmission, PendingResult, RequestId, SlotKey, SubmissionReceipt};
pub use router::listen_router;
pub use service::{ScreeningService, ScreeningServiceError};
pub use store::{InMemoryResultStore, ResultStore, StoreError};

//! Core library for the screening relay: configuration, telemetry, and the
//! entity screening workflow (submission dispatch, callback buffering, and
//! polling handoff).

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;

//! Bulk capture of process parties from labour-court systems.
//!
//! A [`CaptureRequest`](request::CaptureRequest) selects work items; the
//! [`CaptureOrchestrator`](orchestrator::CaptureOrchestrator) groups them by
//! tribunal and grau, opens one session per group, locks and audits every
//! item, and finalizes a job with an aggregate [`JobSummary`](domain::JobSummary).

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod demo;
pub mod domain;
pub mod error;
pub mod executor;
pub mod lock;
pub mod logging;
pub mod orchestrator;
pub mod planner;
pub mod ports;
pub mod request;
pub mod response;
pub mod store;
pub mod ui;

#[cfg(test)]
mod testing;

pub use error::CapturaError;
pub use orchestrator::{CaptureOrchestrator, OrchestratorSettings};
pub use request::CaptureRequest;

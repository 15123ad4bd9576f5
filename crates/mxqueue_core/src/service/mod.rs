//! Queue use-case services.
//!
//! # Responsibility
//! - Orchestrate tree and registry mutations into queue operations.
//! - Map tasks to and from the external services' records.

pub mod collect_request;
pub mod queue_service;
pub mod strategy_ingest;

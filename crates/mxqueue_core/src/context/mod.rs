//! Session context: identity, directory layout and file naming.
//!
//! # Responsibility
//! - Load start-up configuration.
//! - Answer every "where does this file go" question for the queue.

pub mod collect_context;
pub mod config;

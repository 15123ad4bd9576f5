//! Core model for the experiment queue of a crystallography beamline.
//! Owns the task tree, output path naming and run number allocation.

pub mod context;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use context::collect_context::{CollectContext, ContextError};
pub use context::config::{ConfigError, ContextConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::path_template::PathTemplate;
pub use model::strategy_result::StrategyResult;
pub use model::task::{DataCollection, TaskKind, TaskNodeId};
pub use repo::path_registry::PathTemplateRegistry;
pub use repo::task_tree::{TaskNode, TaskTree, TreeError, TreeResult};
pub use service::collect_request::{to_collect_request, CollectRequest};
pub use service::queue_service::{
    next_available_run_number, QueueResult, QueueService, QueueServiceError,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

//! In-memory stores of the queue.
//!
//! # Responsibility
//! - Own the task tree arena and its link invariants.
//! - Track live path templates for run number allocation.
//!
//! # Invariants
//! - Stores only check structural contracts; naming rules live in `context`.

pub mod path_registry;
pub mod task_tree;

//! Queue domain model.
//!
//! # Responsibility
//! - Define the entities carried by queue tasks and the task variants.
//! - Keep naming rules (prefix composition) next to the data they use.
//!
//! # Invariants
//! - Entities deliberately shared between tasks use the `Shared` handle;
//!   plain fields are always owned.

use std::cell::RefCell;
use std::rc::Rc;

pub mod parameters;
pub mod path_template;
pub mod sample;
pub mod strategy_result;
pub mod task;

/// Single-actor shared ownership handle.
pub type Shared<T> = Rc<RefCell<T>>;

/// Wraps a value into a fresh `Shared` handle.
pub fn shared<T>(value: T) -> Shared<T> {
    Rc::new(RefCell::new(value))
}

//! Errors reported at the control boundary.
//!
//! The audio path itself never fails: a saturated grain pool simply drops the
//! spawn. Everything here is raised on the control thread, before a message
//! reaches the engine.

use thiserror::Error;

/// Reasons a parameter update can be refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("parameter `{field}` must be a finite number")]
    NonFinite { field: &'static str },
    #[error("parameter queue is full ({capacity} pending updates)")]
    QueueFull { capacity: usize },
}

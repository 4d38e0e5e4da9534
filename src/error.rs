//! Error handling module for the layout planner
//!
//! Domain failures use typed errors via thiserror. File and CLI glue wraps
//! these in `anyhow` with context, the same split the rest of the crate uses.

use thiserror::Error;

/// Errors raised by planning and by the explicit validation passes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// The requested disk/slice is missing from the inventory or its size is unusable.
    ///
    /// This is the only failure the planner itself can produce.
    #[error("Unresolved target '{target}': {reason}")]
    UnresolvedTarget { target: String, reason: String },

    /// A (user-edited) layout breaks one of the plan invariants
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// Wizard settings that cannot be turned into a usable config
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type alias for planner operations
pub type Result<T> = std::result::Result<T, PlanError>;

impl PlanError {
    /// Create an unresolved target error
    pub fn unresolved(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnresolvedTarget {
            target: target.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid layout error
    pub fn layout(msg: impl Into<String>) -> Self {
        Self::InvalidLayout(msg.into())
    }

    /// Create an invalid settings error
    pub fn settings(msg: impl Into<String>) -> Self {
        Self::InvalidSettings(msg.into())
    }
}

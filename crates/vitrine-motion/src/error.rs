//! Error types for the motion primitives.
//!
//! None of these ever reach the page: every component recovers locally,
//! either by failing open (content stays visible) or by falling back to a
//! documented default.

use thiserror::Error;

/// Result type for motion operations.
pub type Result<T> = std::result::Result<T, MotionError>;

/// Errors that can occur while configuring or attaching a motion primitive.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    /// A host capability (visibility observation, frame scheduling, ...) is missing.
    #[error("{0} is not available in this environment")]
    EnvironmentUnavailable(&'static str),

    /// A configuration value could not be understood.
    #[error("invalid {field}: {reason}")]
    InvalidConfiguration {
        /// Which option was rejected.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },
}

impl MotionError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field,
            reason: reason.into(),
        }
    }
}

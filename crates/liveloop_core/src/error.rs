//! # Drawing Error Types
//!
//! Everything a drawable can report back to the render loop.

use thiserror::Error;

/// Errors raised while updating or rendering a drawable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DrawError {
    /// A public field holds a value that cannot be drawn.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// A color string could not be parsed.
    #[error("invalid color: {0:?}")]
    InvalidColor(String),

    /// The drawable panicked; the payload message is kept.
    #[error("drawable panicked: {0}")]
    Panicked(String),
}

impl DrawError {
    /// Shorthand for [`DrawError::InvalidField`].
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Rejects NaN and infinities.
    ///
    /// # Errors
    ///
    /// Returns [`DrawError::InvalidField`] naming `field`.
    pub fn check_finite(field: &'static str, value: f64) -> DrawResult<f64> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Self::invalid_field(field, format!("{value} is not finite")))
        }
    }
}

/// Result type for drawing operations.
pub type DrawResult<T> = Result<T, DrawError>;

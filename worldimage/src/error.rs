// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Construction and pixel-access errors.

use thiserror::Error;

/// Errors reported by image constructors and pixel accessors.
///
/// Geometry, traversal, and equality never fail on a well-formed tree; only
/// building a node or touching a pixel buffer can produce one of these.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ImageError {
    /// A numeric or structural argument is outside its documented range.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Name of the offending parameter.
        name: &'static str,
        /// Human readable description of the violated constraint.
        reason: String,
    },
    /// A pixel coordinate lies outside `[0, width) x [0, height)`.
    #[error("pixel ({x}, {y}) is outside the valid range [0, {width}) x [0, {height})")]
    OutOfBounds {
        /// Requested column.
        x: i32,
        /// Requested row.
        y: i32,
        /// Buffer width.
        width: u32,
        /// Buffer height.
        height: u32,
    },
    /// A required value was not supplied.
    #[error("missing required value `{0}`")]
    Missing(&'static str),
}

/// Result alias used throughout the crate.
pub type Result<T, E = ImageError> = core::result::Result<T, E>;

impl ImageError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }
}

/// Require `value` to be finite.
pub(crate) fn finite(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ImageError::invalid(name, format!("must be finite, got {value}")))
    }
}

/// Require `value` to be finite and `>= 0`.
pub(crate) fn non_negative(name: &'static str, value: f64) -> Result<f64> {
    let value = finite(name, value)?;
    if value >= 0.0 {
        Ok(value)
    } else {
        Err(ImageError::invalid(
            name,
            format!("must be non-negative, got {value}"),
        ))
    }
}

/// Require `value` to be finite and `> 0`.
pub(crate) fn positive(name: &'static str, value: f64) -> Result<f64> {
    let value = finite(name, value)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ImageError::invalid(
            name,
            format!("must be positive, got {value}"),
        ))
    }
}

//! Error handling for the tessera library
//!
//! One error enum covers every fallible operation in the crate. Checked
//! accessors (`at`, `front`, cursor dereference) report logic errors;
//! capacity growth past the cell id space reports a runtime error.

use thiserror::Error;

/// Main error type for the tessera library
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TesseraError {
    /// Keyed access (`at`) on a key the container does not hold
    #[error("key not found")]
    KeyNotFound,

    /// Positional access outside the valid range
    #[error("out of range: index {index}, size {size}")]
    OutOfRange {
        /// The invalid index
        index: usize,
        /// The valid size/length
        size: usize,
    },

    /// A cursor or range the operation cannot accept
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// What made the argument invalid
        message: String,
    },

    /// Container size would exceed the addressable cell space
    #[error("capacity exceeded: requested {requested}, max {max}")]
    CapacityExceeded {
        /// Number of cells requested
        requested: usize,
        /// Maximum number of addressable cells
        max: usize,
    },
}

impl TesseraError {
    /// Create a key-not-found error
    pub fn key_not_found() -> Self {
        Self::KeyNotFound
    }

    /// Create an out-of-range error
    pub fn out_of_range(index: usize, size: usize) -> Self {
        Self::OutOfRange { index, size }
    }

    /// Create an invalid-argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    /// Create a capacity-exceeded error
    pub fn capacity_exceeded(requested: usize, max: usize) -> Self {
        Self::CapacityExceeded { requested, max }
    }

    /// Get the error category for logging/metrics
    ///
    /// Range, key, and argument errors are logic errors (the caller broke a
    /// precondition); capacity exhaustion is a runtime error.
    pub fn category(&self) -> &'static str {
        match self {
            Self::KeyNotFound => "logic",
            Self::OutOfRange { .. } => "logic",
            Self::InvalidArgument { .. } => "logic",
            Self::CapacityExceeded { .. } => "runtime",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TesseraError>;

/// Assert that an index is within bounds
#[inline]
pub fn check_bounds(index: usize, size: usize) -> Result<()> {
    if index >= size {
        Err(TesseraError::out_of_range(index, size))
    } else {
        Ok(())
    }
}

/// Assert that a half-open index range is within bounds
#[inline]
pub fn check_range(start: usize, end: usize, size: usize) -> Result<()> {
    if start > end {
        return Err(TesseraError::invalid_argument(format!(
            "inverted range: start {} > end {}",
            start, end
        )));
    }
    if end > size {
        return Err(TesseraError::out_of_range(end, size));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = TesseraError::key_not_found();
        assert_eq!(err.category(), "logic");

        let err = TesseraError::out_of_range(10, 5);
        assert_eq!(err.category(), "logic");

        let err = TesseraError::capacity_exceeded(1 << 40, u32::MAX as usize);
        assert_eq!(err.category(), "runtime");
    }

    #[test]
    fn test_error_display() {
        let display = format!("{}", TesseraError::out_of_range(10, 5));
        assert!(display.contains("10"));
        assert!(display.contains("5"));

        let display =
            format!("{}", TesseraError::invalid_argument("cursor from another container"));
        assert!(display.contains("another container"));
    }

    #[test]
    fn test_bounds_checking() {
        assert!(check_bounds(5, 10).is_ok());
        assert!(check_bounds(10, 10).is_err());
        assert!(check_bounds(15, 10).is_err());
        assert!(check_bounds(0, 0).is_err());
    }

    #[test]
    fn test_range_checking() {
        assert!(check_range(2, 8, 10).is_ok());
        assert!(check_range(5, 5, 5).is_ok());
        assert!(check_range(8, 2, 10).is_err()); // inverted
        assert!(check_range(2, 15, 10).is_err()); // end > size
    }
}

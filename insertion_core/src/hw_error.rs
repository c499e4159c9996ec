//! Maps `Box<dyn Error>` from trait boundaries to typed `InsertionError`.
//!
//! The traits in `insertion_traits` use `Box<dyn Error + Send + Sync>`; this
//! module converts those to our typed error enum, with an optional
//! feature-gated path for `insertion_hardware::HwError` downcasting.

use crate::error::InsertionError;

/// Map a trait-boundary error to a typed `InsertionError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> InsertionError {
    #[cfg(feature = "hardware-errors")]
    {
        use insertion_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Timeout => InsertionError::Timeout("hardware read timed out".into()),
                other => InsertionError::Hardware(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("timeout") || s.to_lowercase().contains("timed out") {
        InsertionError::Timeout(s)
    } else {
        InsertionError::Hardware(s)
    }
}

/// Convenience for `map_err` on boxed boundary errors.
pub(crate) fn boxed(e: insertion_traits::BoxError) -> InsertionError {
    map_hw_error(&*e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_fallback_detects_timeouts() {
        let e = std::io::Error::other("read timeout on /dev/ft0");
        assert!(matches!(map_hw_error(&e), InsertionError::Timeout(_)));
        let e = std::io::Error::other("bus fault");
        assert_eq!(
            map_hw_error(&e),
            InsertionError::Hardware("bus fault".into())
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn downcasts_hw_error() {
        use insertion_hardware::error::HwError;
        let b: insertion_traits::BoxError = Box::new(HwError::Timeout);
        assert!(matches!(boxed(b), InsertionError::Timeout(_)));
        let b: insertion_traits::BoxError = Box::new(HwError::UnknownController("x".into()));
        assert!(matches!(boxed(b), InsertionError::Hardware(_)));
    }
}

//! Maps `Box<dyn Error>` from trait boundaries to typed `CtrlError`.
//!
//! The traits in `hydro_traits` use `Box<dyn Error + Send + Sync>` for maximum
//! flexibility; this module converts those to our typed error enum, with an
//! optional feature-gated path for `hydro_hardware::HwError` downcasting.

use crate::error::CtrlError;

/// Map a trait-boundary error to a typed `CtrlError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> CtrlError {
    // Feature-gated: try to downcast to HwError for precise mapping
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<hydro_hardware::error::HwError>() {
            return match hw {
                hydro_hardware::error::HwError::Timeout => CtrlError::Timeout,
                other => CtrlError::BridgeFault(other.to_string()),
            };
        }
    }

    // Fallback: string-based detection
    let s = e.to_string();
    if s.to_lowercase().contains("timeout") {
        CtrlError::Timeout
    } else {
        CtrlError::Bridge(s)
    }
}

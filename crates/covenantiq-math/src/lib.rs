//! # CovenantIQ Math
//!
//! Closed-form numeric routines used by the CovenantIQ analytics crates.
//!
//! - **Regression**: ordinary least squares line fit with slope, intercept and R²
//!
//! The routines are deliberately small and explicit so results are auditable
//! and reproducible across platforms.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]

pub mod error;
pub mod regression;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MathError, MathResult};
    pub use crate::regression::LinearFit;
}

pub use error::{MathError, MathResult};
pub use regression::LinearFit;

#[cfg(test)]
mod tests {
    #[test]
    fn test_fit_reachable_from_crate_root() {
        let fit = crate::LinearFit::fit(&[0.0, 1.0, 2.0], &[1.0, 3.0, 5.0]).unwrap();
        assert!((fit.slope - 2.0).abs() < 1e-12);
        assert!(matches!(
            crate::LinearFit::fit(&[1.0, 1.0], &[2.0, 3.0]),
            Err(crate::MathError::ZeroVariance)
        ));
    }
}

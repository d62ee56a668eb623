//! Ordinary least squares line fitting.
//!
//! Fits `y = intercept + slope * x` using the closed-form normal equations:
//!
//! ```text
//! slope     = Σ(x - x̄)(y - ȳ) / Σ(x - x̄)²
//! intercept = ȳ - slope * x̄
//! R²        = 1 - SS_res / SS_tot
//! ```
//!
//! Sums are taken over centred values for numerical stability.

use crate::error::{MathError, MathResult};

/// Below this magnitude a slope or variance is treated as zero.
const EPSILON: f64 = 1e-12;

/// Result of a least squares line fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    /// Change in y per unit of x.
    pub slope: f64,
    /// Fitted y at x = 0.
    pub intercept: f64,
    /// Coefficient of determination in [0, 1].
    pub r_squared: f64,
    /// Number of points fitted.
    pub n: usize,
}

impl LinearFit {
    /// Fits a line through the `(x, y)` pairs.
    ///
    /// Needs at least two points with distinct x values. When all y values are
    /// equal the fit is exact and `r_squared` is reported as 1.
    pub fn fit(xs: &[f64], ys: &[f64]) -> MathResult<Self> {
        if xs.len() != ys.len() {
            return Err(MathError::LengthMismatch {
                xs: xs.len(),
                ys: ys.len(),
            });
        }
        let n = xs.len();
        if n < 2 {
            return Err(MathError::insufficient_data(2, n));
        }
        if xs.iter().chain(ys).any(|v| !v.is_finite()) {
            return Err(MathError::invalid_input("non-finite value in sample"));
        }

        let nf = n as f64;
        let x_mean = xs.iter().sum::<f64>() / nf;
        let y_mean = ys.iter().sum::<f64>() / nf;

        let mut sxx = 0.0;
        let mut sxy = 0.0;
        let mut syy = 0.0;
        for (x, y) in xs.iter().zip(ys) {
            let dx = x - x_mean;
            let dy = y - y_mean;
            sxx += dx * dx;
            sxy += dx * dy;
            syy += dy * dy;
        }

        if sxx.abs() < EPSILON {
            return Err(MathError::ZeroVariance);
        }

        let slope = sxy / sxx;
        let intercept = y_mean - slope * x_mean;

        let r_squared = if syy.abs() < EPSILON {
            1.0
        } else {
            let ss_res: f64 = xs
                .iter()
                .zip(ys)
                .map(|(x, y)| {
                    let e = y - (intercept + slope * x);
                    e * e
                })
                .sum();
            (1.0 - ss_res / syy).clamp(0.0, 1.0)
        };

        log::trace!("linear fit n={n} slope={slope:.6e} intercept={intercept:.6} r2={r_squared:.4}");

        Ok(Self {
            slope,
            intercept,
            r_squared,
            n,
        })
    }

    /// Fitted y at `x`.
    #[must_use]
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }

    /// The x at which the fitted line reaches `y`.
    ///
    /// # Errors
    ///
    /// Returns `MathError::DivisionByZero` when the line is flat.
    pub fn solve_for(&self, y: f64) -> MathResult<f64> {
        if self.slope.abs() < EPSILON {
            return Err(MathError::DivisionByZero { value: self.slope });
        }
        Ok((y - self.intercept) / self.slope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_exact_line() {
        let xs = [0.0, 30.0, 60.0];
        let ys = [1.0, 1.1, 1.2];
        let fit = LinearFit::fit(&xs, &ys).unwrap();

        assert_relative_eq!(fit.slope, 0.1 / 30.0, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 1.0, epsilon = 1e-12);
        assert_relative_eq!(fit.r_squared, 1.0, epsilon = 1e-9);
        assert_relative_eq!(fit.solve_for(2.0).unwrap(), 300.0, epsilon = 1e-6);
        assert_relative_eq!(fit.predict(90.0), 1.3, epsilon = 1e-12);
    }

    #[test]
    fn test_noisy_fit() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0];
        let ys = [1.0, 3.0, 2.0, 5.0, 4.0];
        let fit = LinearFit::fit(&xs, &ys).unwrap();

        assert_relative_eq!(fit.slope, 0.8, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 1.4, epsilon = 1e-12);
        assert_relative_eq!(fit.r_squared, 0.64, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_series() {
        let fit = LinearFit::fit(&[0.0, 1.0, 2.0], &[5.0, 5.0, 5.0]).unwrap();
        assert_relative_eq!(fit.slope, 0.0);
        assert_relative_eq!(fit.r_squared, 1.0);
        assert!(matches!(
            fit.solve_for(6.0),
            Err(MathError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(
            LinearFit::fit(&[1.0], &[1.0]),
            Err(MathError::insufficient_data(2, 1))
        );
        assert_eq!(
            LinearFit::fit(&[1.0, 1.0], &[1.0, 2.0]),
            Err(MathError::ZeroVariance)
        );
        assert!(matches!(
            LinearFit::fit(&[1.0, 2.0], &[1.0]),
            Err(MathError::LengthMismatch { .. })
        ));
        assert!(LinearFit::fit(&[0.0, f64::NAN], &[1.0, 2.0]).is_err());
    }

    proptest! {
        #[test]
        fn prop_r_squared_bounded(
            ys in proptest::collection::vec(-1.0e3f64..1.0e3, 3..20)
        ) {
            let xs: Vec<f64> = (0..ys.len()).map(|i| i as f64 * 30.0).collect();
            let fit = LinearFit::fit(&xs, &ys).unwrap();
            prop_assert!((0.0..=1.0).contains(&fit.r_squared));
        }
    }
}

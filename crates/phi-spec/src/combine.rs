use phi_core::errors::{ErrorInfo, PhiError};
use serde::{Deserialize, Serialize};

/// Rule for merging a statistical and a systematic uncertainty.
///
/// Implementations must satisfy `combine(stat, sys) >= max(stat, sys)` for
/// non-negative inputs.
pub trait ErrorCombination {
    /// Merges two non-negative uncertainties.
    fn combine(&self, stat: f64, sys: f64) -> f64;

    /// Applies [`ErrorCombination::combine`] bin by bin.
    fn combine_bins(&self, stat: &[f64], sys: &[f64]) -> Vec<f64> {
        stat.iter()
            .zip(sys)
            .map(|(&s, &y)| self.combine(s, y))
            .collect()
    }
}

/// Built-in combination policies.
///
/// `Quadrature` treats the two sources as independent. It ignores any
/// correlated structure between statistical and systematic errors; `Linear`
/// and `Correlated` bracket that limitation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CombinationPolicy {
    /// `sqrt(stat² + sys²)`.
    #[default]
    Quadrature,
    /// `stat + sys`, the fully correlated upper bound.
    Linear,
    /// `sqrt(stat² + sys² + 2ρ·stat·sys)` with `0 <= ρ <= 1`.
    Correlated {
        /// Correlation coefficient between the two sources.
        rho: f64,
    },
}

impl CombinationPolicy {
    /// Rejects correlation coefficients outside `[0, 1]`.
    pub fn validate(&self) -> Result<(), PhiError> {
        if let CombinationPolicy::Correlated { rho } = self {
            if !(0.0..=1.0).contains(rho) {
                return Err(PhiError::InvalidRange(
                    ErrorInfo::new("invalid-correlation", "rho must lie in [0, 1]")
                        .with_context("rho", rho),
                ));
            }
        }
        Ok(())
    }
}

impl ErrorCombination for CombinationPolicy {
    fn combine(&self, stat: f64, sys: f64) -> f64 {
        match *self {
            CombinationPolicy::Quadrature => (stat * stat + sys * sys).sqrt(),
            CombinationPolicy::Linear => stat + sys,
            CombinationPolicy::Correlated { rho } => {
                (stat * stat + sys * sys + 2.0 * rho * stat * sys).sqrt()
            }
        }
    }
}

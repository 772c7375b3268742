use serde::{Deserialize, Serialize};

use crate::errors::{ensure_same_len, ErrorInfo, PhiError};

/// Power spectrum sampled on an ordered wavenumber grid.
///
/// `k` is in h/Mpc, strictly positive and strictly increasing; `P(k)` is in
/// (Mpc/h)³. A spectrum is never edited in place: transformations return a new
/// value on the same grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    k: Vec<f64>,
    pk: Vec<f64>,
}

impl Spectrum {
    /// Validates and wraps a `(k, P)` table.
    pub fn new(k: Vec<f64>, pk: Vec<f64>) -> Result<Self, PhiError> {
        ensure_same_len("spectrum-shape", "k", k.len(), "pk", pk.len())?;
        if k.is_empty() {
            return Err(PhiError::invalid_input(
                "empty-spectrum",
                "spectrum requires at least one sample",
            ));
        }
        for (idx, &value) in k.iter().enumerate() {
            if !(value.is_finite() && value > 0.0) {
                return Err(PhiError::InvalidInput(
                    ErrorInfo::new("non-positive-k", "wavenumbers must be positive and finite")
                        .with_context("index", idx)
                        .with_context("k", value),
                ));
            }
        }
        if let Some(idx) = k.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(PhiError::InvalidInput(
                ErrorInfo::new("unordered-k", "wavenumbers must be strictly increasing")
                    .with_context("index", idx + 1)
                    .with_context("k_prev", k[idx])
                    .with_context("k", k[idx + 1]),
            ));
        }
        if let Some(idx) = pk.iter().position(|value| !value.is_finite()) {
            return Err(PhiError::InvalidInput(
                ErrorInfo::new("non-finite-pk", "power values must be finite")
                    .with_context("index", idx)
                    .with_context("pk", pk[idx]),
            ));
        }
        Ok(Self { k, pk })
    }

    /// Returns a spectrum on the same grid carrying new power values.
    pub fn with_power(&self, pk: Vec<f64>) -> Result<Self, PhiError> {
        Self::new(self.k.clone(), pk)
    }

    /// Wavenumbers in h/Mpc.
    pub fn k(&self) -> &[f64] {
        &self.k
    }

    /// Power values in (Mpc/h)³.
    pub fn pk(&self) -> &[f64] {
        &self.pk
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.k.len()
    }

    /// Always false for a validated spectrum.
    pub fn is_empty(&self) -> bool {
        self.k.is_empty()
    }

    /// Smallest and largest wavenumber.
    pub fn k_range(&self) -> (f64, f64) {
        (self.k[0], self.k[self.k.len() - 1])
    }

    /// Splits the spectrum into its owned arrays.
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>) {
        (self.k, self.pk)
    }
}

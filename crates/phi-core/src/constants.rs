//! Process-wide read-only constants.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Speed of light in km/s.
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

/// Golden-ratio constants table.
///
/// Computed once per process and handed to every component by reference; no
/// component recomputes `φ` or `ln φ` locally.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhiConstants {
    /// The golden ratio `(1 + √5) / 2`.
    pub phi: f64,
    /// Natural logarithm of the golden ratio, the log-period of the modulation.
    pub ln_phi: f64,
    /// Conjugate `φ - 1 = 1 / φ`.
    pub conjugate: f64,
}

static CONSTANTS: OnceLock<PhiConstants> = OnceLock::new();

impl PhiConstants {
    fn compute() -> Self {
        let phi = (1.0 + 5.0_f64.sqrt()) / 2.0;
        Self {
            phi,
            ln_phi: phi.ln(),
            conjugate: phi - 1.0,
        }
    }

    /// Returns the shared constants table, initialising it on first use.
    pub fn get() -> &'static PhiConstants {
        CONSTANTS.get_or_init(Self::compute)
    }

    /// Angular frequency of the modulation in `ln k`, `2π / ln φ`.
    pub fn log_frequency(&self) -> f64 {
        2.0 * std::f64::consts::PI / self.ln_phi
    }
}

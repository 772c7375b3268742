use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, PhiError};

fn default_h0() -> f64 {
    67.36
}

fn default_omega_b() -> f64 {
    0.02237
}

fn default_omega_c() -> f64 {
    0.1200
}

fn default_a_s() -> f64 {
    2.1e-9
}

fn default_n_s() -> f64 {
    0.9649
}

fn default_tau() -> f64 {
    0.0544
}

/// Cosmological parameters handed to the baseline spectrum provider.
///
/// No cross-field constraint is enforced here; physical validation belongs to
/// the provider. Defaults follow Planck 2018.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CosmologicalParameters {
    /// Hubble constant in km/s/Mpc.
    #[serde(default = "default_h0")]
    pub h0: f64,
    /// Physical baryon density `ω_b = Ω_b h²`.
    #[serde(default = "default_omega_b")]
    pub omega_b: f64,
    /// Physical cold dark matter density `ω_c = Ω_c h²`.
    #[serde(default = "default_omega_c")]
    pub omega_c: f64,
    /// Primordial scalar amplitude `A_s`.
    #[serde(default = "default_a_s")]
    pub a_s: f64,
    /// Scalar spectral index `n_s`.
    #[serde(default = "default_n_s")]
    pub n_s: f64,
    /// Optical depth to reionisation `τ`.
    #[serde(default = "default_tau")]
    pub tau: f64,
}

impl Default for CosmologicalParameters {
    fn default() -> Self {
        Self {
            h0: default_h0(),
            omega_b: default_omega_b(),
            omega_c: default_omega_c(),
            a_s: default_a_s(),
            n_s: default_n_s(),
            tau: default_tau(),
        }
    }
}

impl CosmologicalParameters {
    /// Checks that all six parameters are finite.
    pub fn validate(&self) -> Result<(), PhiError> {
        let fields = [
            ("h0", self.h0),
            ("omega_b", self.omega_b),
            ("omega_c", self.omega_c),
            ("a_s", self.a_s),
            ("n_s", self.n_s),
            ("tau", self.tau),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(PhiError::InvalidInput(
                    ErrorInfo::new(
                        "non-finite-cosmology",
                        "cosmological parameters must be finite",
                    )
                    .with_context(name, value),
                ));
            }
        }
        Ok(())
    }

    /// Dimensionless Hubble parameter `h = H0 / 100`.
    pub fn h(&self) -> f64 {
        self.h0 / 100.0
    }

    /// Total matter density parameter `Ω_m = (ω_b + ω_c) / h²`.
    pub fn omega_m(&self) -> f64 {
        let h = self.h();
        (self.omega_b + self.omega_c) / (h * h)
    }

    /// Baryon density parameter `Ω_b = ω_b / h²`.
    pub fn omega_baryon(&self) -> f64 {
        let h = self.h();
        self.omega_b / (h * h)
    }
}

fn default_amplitude() -> f64 {
    0.01
}

fn default_k_pivot() -> f64 {
    0.05
}

/// Parameters of the log-periodic modulation.
///
/// No bounds are imposed on amplitude or phase at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModulationParameters {
    /// Dimensionless amplitude `A_φ`, expected `≪ 1`.
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
    /// Phase offset `φ₀` in radians.
    #[serde(default)]
    pub phase: f64,
    /// Pivot scale `k_pivot` in h/Mpc.
    #[serde(default = "default_k_pivot")]
    pub k_pivot: f64,
}

impl Default for ModulationParameters {
    fn default() -> Self {
        Self {
            amplitude: default_amplitude(),
            phase: 0.0,
            k_pivot: default_k_pivot(),
        }
    }
}

impl ModulationParameters {
    /// Creates a parameter set from amplitude, phase and pivot.
    pub fn new(amplitude: f64, phase: f64, k_pivot: f64) -> Self {
        Self {
            amplitude,
            phase,
            k_pivot,
        }
    }

    /// Rejects non-positive or non-finite pivots.
    pub fn validate(&self) -> Result<(), PhiError> {
        if !(self.k_pivot.is_finite() && self.k_pivot > 0.0) {
            return Err(PhiError::InvalidInput(
                ErrorInfo::new("invalid-pivot", "k_pivot must be positive and finite")
                    .with_context("k_pivot", self.k_pivot),
            ));
        }
        Ok(())
    }
}

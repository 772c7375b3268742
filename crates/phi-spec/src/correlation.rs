use std::f64::consts::PI;

use phi_core::errors::{ErrorInfo, PhiError};
use phi_core::floors::SEPARATION_FLOOR;
use phi_core::{CosmologicalParameters, ModulationParameters, PhiConstants, Spectrum};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::baseline::BaselineSpectrumProvider;
use crate::grid::{linspace, trapezoid};
use crate::modulation::modulate_spectrum;

fn default_redshift() -> f64 {
    0.5
}

fn default_r_min() -> f64 {
    80.0
}

fn default_r_max() -> f64 {
    120.0
}

fn default_r_points() -> usize {
    200
}

fn default_k_min() -> f64 {
    1e-4
}

fn default_k_max() -> f64 {
    2.0
}

fn default_k_points() -> usize {
    1000
}

/// Configuration of the BAO-scale correlation function comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaoSpec {
    /// Redshift of the baseline spectrum.
    #[serde(default = "default_redshift")]
    pub z: f64,
    /// Modulation applied to the baseline.
    #[serde(default)]
    pub modulation: ModulationParameters,
    /// Smallest separation in Mpc/h.
    #[serde(default = "default_r_min")]
    pub r_min: f64,
    /// Largest separation in Mpc/h.
    #[serde(default = "default_r_max")]
    pub r_max: f64,
    /// Number of separations.
    #[serde(default = "default_r_points")]
    pub r_points: usize,
    /// Lower integration limit in h/Mpc.
    #[serde(default = "default_k_min")]
    pub k_min: f64,
    /// Upper integration limit in h/Mpc.
    #[serde(default = "default_k_max")]
    pub k_max: f64,
    /// Number of integration nodes requested from the provider.
    #[serde(default = "default_k_points")]
    pub k_points: usize,
}

impl Default for BaoSpec {
    fn default() -> Self {
        Self {
            z: default_redshift(),
            modulation: ModulationParameters::default(),
            r_min: default_r_min(),
            r_max: default_r_max(),
            r_points: default_r_points(),
            k_min: default_k_min(),
            k_max: default_k_max(),
            k_points: default_k_points(),
        }
    }
}

/// Correlation functions of the baseline and modulated spectra.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaoSignature {
    /// Separations in Mpc/h.
    pub r: Vec<f64>,
    /// `ξ(r)` of the baseline spectrum.
    pub xi_base: Vec<f64>,
    /// `ξ(r)` of the modulated spectrum.
    pub xi_modulated: Vec<f64>,
}

/// Two-point correlation function
/// `ξ(r) = 1/(2π²) ∫ P(k) sin(kr)/(kr) k² dk`, trapezoid rule over the
/// spectrum's own grid. `kr` is floored with [`SEPARATION_FLOOR`].
pub fn correlation_function(spectrum: &Spectrum, r: &[f64]) -> Vec<f64> {
    let k = spectrum.k();
    let pk = spectrum.pk();
    let mut integrand = vec![0.0; k.len()];
    r.iter()
        .map(|&separation| {
            for (slot, (&kv, &p)) in integrand.iter_mut().zip(k.iter().zip(pk)) {
                let x = kv * separation;
                *slot = p * x.sin() / (x + SEPARATION_FLOOR) * kv * kv;
            }
            trapezoid(k, &integrand) / (2.0 * PI * PI)
        })
        .collect()
}

/// Compares `ξ(r)` with and without the modulation around the BAO scale.
pub fn bao_signature(
    provider: &dyn BaselineSpectrumProvider,
    params: &CosmologicalParameters,
    spec: &BaoSpec,
    constants: &PhiConstants,
) -> Result<BaoSignature, PhiError> {
    if !(spec.r_min > 0.0 && spec.r_min < spec.r_max && spec.r_max.is_finite()) || spec.r_points < 2
    {
        return Err(PhiError::InvalidRange(
            ErrorInfo::new(
                "invalid-separation-range",
                "separations need 0 < r_min < r_max and two or more points",
            )
            .with_context("r_min", spec.r_min)
            .with_context("r_max", spec.r_max)
            .with_context("r_points", spec.r_points),
        ));
    }
    let base = provider.get_power_spectrum(params, spec.k_min, spec.k_max, spec.k_points, spec.z)?;
    let (modulated, _) = modulate_spectrum(&base, &spec.modulation, constants)?;
    let r = linspace(spec.r_min, spec.r_max, spec.r_points);
    let xi_base = correlation_function(&base, &r);
    let xi_modulated = correlation_function(&modulated, &r);
    debug!(points = r.len(), provider = provider.name(), "bao signature computed");
    Ok(BaoSignature {
        r,
        xi_base,
        xi_modulated,
    })
}

//! Fisher-matrix forecast of the modulation amplitude uncertainty.

use std::f64::consts::PI;

use phi_core::errors::{ensure_same_len, ErrorInfo, PhiError};
use phi_core::floors::{AMPLITUDE_FLOOR, DENSITY_FLOOR, MODE_COUNT_FLOOR, VARIANCE_FLOOR};
use phi_core::{CosmologicalParameters, ModulationParameters, PhiConstants};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::baseline::BaselineSpectrumProvider;
use crate::grid::{interp_linear, logspace, validate_log_range};
use crate::modulation::{apply_modulation, Modulated};

fn default_amplitude_true() -> f64 {
    0.01
}

fn default_k_min() -> f64 {
    0.01
}

fn default_k_max() -> f64 {
    0.3
}

fn default_n_k() -> usize {
    50
}

fn default_survey_volume() -> f64 {
    100.0
}

fn default_z_eff() -> f64 {
    0.8
}

fn default_galaxy_density() -> f64 {
    3e-4
}

fn default_k_pivot() -> f64 {
    0.05
}

fn default_low_factor() -> f64 {
    0.5
}

fn default_high_factor() -> f64 {
    2.0
}

fn default_padding_points() -> usize {
    500
}

/// Widening applied to the forecast range before calling the provider, so the
/// interpolation onto the target grid never sits on a provider edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProviderPadding {
    /// Multiplier applied to `k_min` (≤ 1).
    #[serde(default = "default_low_factor")]
    pub low_factor: f64,
    /// Multiplier applied to `k_max` (≥ 1).
    #[serde(default = "default_high_factor")]
    pub high_factor: f64,
    /// Number of samples requested from the provider.
    #[serde(default = "default_padding_points")]
    pub points: usize,
}

impl Default for ProviderPadding {
    fn default() -> Self {
        Self {
            low_factor: default_low_factor(),
            high_factor: default_high_factor(),
            points: default_padding_points(),
        }
    }
}

/// Survey and model configuration for a single forecast.
///
/// Defaults describe a DESI Year-5-like survey.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastSpec {
    /// True modulation amplitude `A_φ` injected into the model.
    #[serde(default = "default_amplitude_true")]
    pub amplitude_true: f64,
    /// Lower edge of the analysis range in h/Mpc.
    #[serde(default = "default_k_min")]
    pub k_min: f64,
    /// Upper edge of the analysis range in h/Mpc.
    #[serde(default = "default_k_max")]
    pub k_max: f64,
    /// Number of logarithmic k-bins.
    #[serde(default = "default_n_k")]
    pub n_k: usize,
    /// Survey volume, in the units of the mode-count formula (nominally (Gpc/h)³).
    #[serde(default = "default_survey_volume")]
    pub survey_volume: f64,
    /// Effective redshift of the sample.
    #[serde(default = "default_z_eff")]
    pub z_eff: f64,
    /// Galaxy number density in (h/Mpc)³.
    #[serde(default = "default_galaxy_density")]
    pub galaxy_density: f64,
    /// Pivot scale of the modulation in h/Mpc (0.05 by convention).
    #[serde(default = "default_k_pivot")]
    pub k_pivot: f64,
    /// Phase offset of the modulation in radians (0 by convention).
    #[serde(default)]
    pub phase: f64,
    /// Provider grid widening.
    #[serde(default)]
    pub padding: ProviderPadding,
}

impl Default for ForecastSpec {
    fn default() -> Self {
        Self {
            amplitude_true: default_amplitude_true(),
            k_min: default_k_min(),
            k_max: default_k_max(),
            n_k: default_n_k(),
            survey_volume: default_survey_volume(),
            z_eff: default_z_eff(),
            galaxy_density: default_galaxy_density(),
            k_pivot: default_k_pivot(),
            phase: 0.0,
            padding: ProviderPadding::default(),
        }
    }
}

impl ForecastSpec {
    /// Modulation parameters injected by this forecast.
    pub fn modulation(&self) -> ModulationParameters {
        ModulationParameters::new(self.amplitude_true, self.phase, self.k_pivot)
    }

    /// Copy with a different injected amplitude.
    pub fn with_amplitude(&self, amplitude_true: f64) -> Self {
        Self {
            amplitude_true,
            ..*self
        }
    }

    /// Range checks run before any computation.
    pub fn validate(&self) -> Result<(), PhiError> {
        validate_log_range(self.k_min, self.k_max, self.n_k)?;
        if !(self.survey_volume.is_finite() && self.survey_volume > 0.0) {
            return Err(PhiError::InvalidInput(
                ErrorInfo::new("invalid-volume", "survey volume must be positive")
                    .with_context("survey_volume", self.survey_volume),
            ));
        }
        if !(self.galaxy_density.is_finite() && self.galaxy_density >= 0.0) {
            return Err(PhiError::InvalidInput(
                ErrorInfo::new("invalid-density", "galaxy density must be non-negative")
                    .with_context("galaxy_density", self.galaxy_density),
            ));
        }
        if !self.amplitude_true.is_finite() || !self.phase.is_finite() {
            return Err(PhiError::InvalidInput(
                ErrorInfo::new("non-finite-modulation", "amplitude and phase must be finite")
                    .with_context("amplitude_true", self.amplitude_true)
                    .with_context("phase", self.phase),
            ));
        }
        self.modulation().validate()?;
        let padding = &self.padding;
        if !(padding.low_factor > 0.0 && padding.low_factor <= 1.0)
            || !(padding.high_factor >= 1.0 && padding.high_factor.is_finite())
            || padding.points < 2
        {
            return Err(PhiError::InvalidRange(
                ErrorInfo::new(
                    "invalid-padding",
                    "padding must satisfy 0 < low <= 1 <= high with two or more points",
                )
                .with_context("low_factor", padding.low_factor)
                .with_context("high_factor", padding.high_factor)
                .with_context("points", padding.points),
            ));
        }
        Ok(())
    }
}

/// Outcome of reducing a one-parameter Fisher matrix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FisherReduction {
    /// `F = Σ (dP/dA_φ)² / σ_P²`.
    pub information: f64,
    /// `σ(A_φ) = 1 / √F`.
    pub sigma: f64,
}

/// Reduces per-bin derivatives and errors to an amplitude uncertainty.
///
/// Both the variance in each bin and the Fisher sum are floored with
/// [`VARIANCE_FLOOR`], so vanishing errors or derivatives give large finite
/// values instead of infinities.
pub fn fisher_reduce(derivative: &[f64], sigma: &[f64]) -> Result<FisherReduction, PhiError> {
    ensure_same_len(
        "fisher-shape",
        "derivative",
        derivative.len(),
        "sigma",
        sigma.len(),
    )?;
    let information: f64 = derivative
        .iter()
        .zip(sigma)
        .map(|(d, s)| d * d / (s * s + VARIANCE_FLOOR))
        .sum();
    Ok(FisherReduction {
        information,
        sigma: 1.0 / (information + VARIANCE_FLOOR).sqrt(),
    })
}

/// Full forecast output; every intermediate array is kept for downstream use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Configuration that produced the forecast.
    pub spec: ForecastSpec,
    /// Name of the baseline provider that supplied the spectrum.
    pub provider: String,
    /// Logarithmic k-grid in h/Mpc.
    pub k: Vec<f64>,
    /// Baseline power spectrum on `k`.
    pub pk_base: Vec<f64>,
    /// Modulated power spectrum on `k`.
    pub pk_modulated: Vec<f64>,
    /// Modulation factor on `k`.
    pub modulation_factor: Vec<f64>,
    /// Per-bin width `Δk`.
    pub delta_k: Vec<f64>,
    /// Per-bin independent mode count.
    pub n_modes: Vec<f64>,
    /// Per-bin statistical error (cosmic variance and shot noise in quadrature).
    pub sigma_pk: Vec<f64>,
    /// Per-bin derivative `dP/dA_φ`.
    pub d_pk_d_amplitude: Vec<f64>,
    /// Shot-noise power `1 / n_gal`.
    pub shot_noise: f64,
    /// Fisher information on the amplitude.
    pub fisher_information: f64,
    /// Statistical uncertainty `σ(A_φ)`.
    pub sigma_amplitude: f64,
    /// Signal to noise `A_φ_true / σ(A_φ)`.
    pub snr: f64,
}

/// Runs the statistical forecast for the modulation amplitude.
///
/// Range problems are reported as [`PhiError::InvalidRange`] before the
/// provider is called; provider failures propagate unchanged.
pub fn forecast(
    provider: &dyn BaselineSpectrumProvider,
    params: &CosmologicalParameters,
    spec: &ForecastSpec,
    constants: &PhiConstants,
) -> Result<ForecastResult, PhiError> {
    spec.validate()?;

    let k = logspace(spec.k_min, spec.k_max, spec.n_k)?;
    let padded_min = spec.k_min * spec.padding.low_factor;
    let padded_max = spec.k_max * spec.padding.high_factor;
    debug!(
        provider = provider.name(),
        padded_min,
        padded_max,
        points = spec.padding.points,
        z = spec.z_eff,
        "requesting baseline spectrum"
    );
    let (baseline, answered_by) = provider.resolve_power_spectrum(
        params,
        padded_min,
        padded_max,
        spec.padding.points,
        spec.z_eff,
    )?;
    let pk_base = interp_linear(baseline.k(), baseline.pk(), &k)?;

    let Modulated {
        pk: pk_modulated,
        factor: modulation_factor,
    } = apply_modulation(&k, &pk_base, &spec.modulation(), constants)?;

    let log_width = spec.k_max.log10() - spec.k_min.log10();
    let delta_k: Vec<f64> = k
        .iter()
        .map(|kv| kv * log_width / spec.n_k as f64)
        .collect();
    let n_modes: Vec<f64> = k
        .iter()
        .zip(&delta_k)
        .map(|(kv, dk)| spec.survey_volume * kv * kv * dk / (2.0 * PI * PI))
        .collect();

    if spec.galaxy_density == 0.0 {
        warn!(
            floor = DENSITY_FLOOR,
            "zero galaxy density floored; shot noise dominates every bin"
        );
    }
    let shot_noise = 1.0 / spec.galaxy_density.max(DENSITY_FLOOR);

    let sigma_pk: Vec<f64> = pk_base
        .iter()
        .zip(&n_modes)
        .map(|(p, modes)| {
            let modes = modes + MODE_COUNT_FLOOR;
            let cosmic = p * (2.0 / modes).sqrt();
            let shot = shot_noise / modes.sqrt();
            (cosmic * cosmic + shot * shot).sqrt()
        })
        .collect();

    if spec.amplitude_true == 0.0 {
        warn!(
            floor = AMPLITUDE_FLOOR,
            "zero injected amplitude; derivative vanishes and sigma is floor-limited"
        );
    }
    // Floor the magnitude, keeping the sign, so a negative amplitude never
    // cancels the floor.
    let amplitude_denominator =
        spec.amplitude_true + AMPLITUDE_FLOOR.copysign(spec.amplitude_true);
    let d_pk_d_amplitude: Vec<f64> = pk_base
        .iter()
        .zip(&modulation_factor)
        .map(|(p, f)| p * (f - 1.0) / amplitude_denominator)
        .collect();

    let fisher = fisher_reduce(&d_pk_d_amplitude, &sigma_pk)?;
    let snr = spec.amplitude_true / (fisher.sigma + VARIANCE_FLOOR);
    debug!(
        fisher = fisher.information,
        sigma_amplitude = fisher.sigma,
        snr,
        "forecast complete"
    );

    Ok(ForecastResult {
        spec: *spec,
        provider: answered_by,
        k,
        pk_base,
        pk_modulated,
        modulation_factor,
        delta_k,
        n_modes,
        sigma_pk,
        d_pk_d_amplitude,
        shot_noise,
        fisher_information: fisher.information,
        sigma_amplitude: fisher.sigma,
        snr,
    })
}

/// One point of an amplitude sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    /// Injected amplitude.
    pub amplitude: f64,
    /// Statistical amplitude uncertainty.
    pub sigma_amplitude: f64,
    /// Signal to noise.
    pub snr: f64,
}

/// Repeats the forecast for each injected amplitude, holding the survey fixed.
pub fn amplitude_sweep(
    provider: &dyn BaselineSpectrumProvider,
    params: &CosmologicalParameters,
    spec: &ForecastSpec,
    amplitudes: &[f64],
    constants: &PhiConstants,
) -> Result<Vec<SweepPoint>, PhiError> {
    amplitudes
        .iter()
        .map(|&amplitude| {
            let result = forecast(provider, params, &spec.with_amplitude(amplitude), constants)?;
            Ok(SweepPoint {
                amplitude,
                sigma_amplitude: result.sigma_amplitude,
                snr: result.snr,
            })
        })
        .collect()
}

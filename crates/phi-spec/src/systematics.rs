//! Systematic error budget for the power spectrum and its propagation to the
//! modulation amplitude.
//!
//! Three independent sources are modelled (photometric redshift scatter,
//! galaxy bias uncertainty, survey geometry), each as an absolute error per
//! k-bin proportional to the baseline power. Sources are combined in
//! quadrature as uncorrelated contributions; that independence is an
//! assumption of the model.

use std::f64::consts::PI;

use phi_core::errors::{ensure_same_len, ErrorInfo, PhiError};
use phi_core::floors::{FRACTION_FLOOR, VOLUME_FLOOR};
use phi_core::SPEED_OF_LIGHT_KM_S;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::combine::{CombinationPolicy, ErrorCombination};
use crate::forecast::fisher_reduce;

/// Photo-z scatter per unit `(1 + z)` used when no explicit `sigma_z` is set.
pub const PHOTO_Z_SCATTER: f64 = 0.02;

/// Ceiling on the photo-z relative error; keeps the quadratic model from
/// running away at high k.
pub const PHOTO_Z_RELATIVE_CEILING: f64 = 0.1;

/// Relative geometry error on the largest scales.
pub const GEOMETRY_AMPLITUDE: f64 = 0.15;

/// Redshift of a budget built without a forecast to inherit from.
pub const DEFAULT_Z_EFF: f64 = 0.8;

/// Largest difference at which two effective redshifts count as the same.
const REDSHIFT_TOLERANCE: f64 = 1e-9;

fn default_sigma_bias() -> f64 {
    0.05
}

fn default_survey_volume() -> f64 {
    100.0
}

fn default_true() -> bool {
    true
}

fn default_photo_z_h0() -> f64 {
    70.0
}

fn default_photo_z_omega_m() -> f64 {
    0.3
}

fn default_photo_z_omega_lambda() -> f64 {
    0.7
}

/// Cosmology used only to convert redshift scatter into comoving distance.
///
/// This is intentionally separate from the [`phi_core::CosmologicalParameters`]
/// driving the forecast: the nuisance model stays fixed while the primary
/// cosmology varies. The two are never reconciled automatically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhotoZCosmology {
    /// Hubble constant in km/s/Mpc.
    #[serde(default = "default_photo_z_h0")]
    pub h0: f64,
    /// Matter density parameter.
    #[serde(default = "default_photo_z_omega_m")]
    pub omega_m: f64,
    /// Dark energy density parameter.
    #[serde(default = "default_photo_z_omega_lambda")]
    pub omega_lambda: f64,
}

impl Default for PhotoZCosmology {
    fn default() -> Self {
        Self {
            h0: default_photo_z_h0(),
            omega_m: default_photo_z_omega_m(),
            omega_lambda: default_photo_z_omega_lambda(),
        }
    }
}

impl PhotoZCosmology {
    /// `H(z) = H0 √(Ω_m (1+z)³ + Ω_Λ)` in km/s/Mpc.
    pub fn hubble(&self, z: f64) -> f64 {
        self.h0 * (self.omega_m * (1.0 + z).powi(3) + self.omega_lambda).sqrt()
    }

    /// `dr/dz ≈ c / H(z)`.
    pub fn distance_per_redshift(&self, z: f64) -> f64 {
        SPEED_OF_LIGHT_KM_S / self.hubble(z)
    }
}

/// Per-source switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceToggles {
    /// Include photometric redshift errors.
    #[serde(default = "default_true")]
    pub photo_z: bool,
    /// Include galaxy bias uncertainty.
    #[serde(default = "default_true")]
    pub bias: bool,
    /// Include survey geometry effects.
    #[serde(default = "default_true")]
    pub geometry: bool,
}

impl Default for SourceToggles {
    fn default() -> Self {
        Self::all()
    }
}

impl SourceToggles {
    /// Every source enabled.
    pub const fn all() -> Self {
        Self {
            photo_z: true,
            bias: true,
            geometry: true,
        }
    }

    /// Every source disabled.
    pub const fn none() -> Self {
        Self {
            photo_z: false,
            bias: false,
            geometry: false,
        }
    }

    /// True when at least one source is enabled.
    pub fn any(&self) -> bool {
        self.photo_z || self.bias || self.geometry
    }
}

/// Construction-time configuration of a [`SystematicErrorBudget`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SystematicConfig {
    /// Effective redshift of the sample; `None` inherits the forecast redshift
    /// and falls back to [`DEFAULT_Z_EFF`] for a standalone budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_eff: Option<f64>,
    /// Photo-z scatter; `None` means `0.02 (1 + z_eff)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sigma_z: Option<f64>,
    /// Relative galaxy bias uncertainty `σ_b / b`.
    #[serde(default = "default_sigma_bias")]
    pub sigma_bias: f64,
    /// Survey volume entering the geometry model.
    #[serde(default = "default_survey_volume")]
    pub survey_volume: f64,
    /// Distance cosmology for the photo-z model.
    #[serde(default)]
    pub photo_z_cosmology: PhotoZCosmology,
    /// Enabled sources.
    #[serde(default)]
    pub sources: SourceToggles,
    /// Rule for merging statistical and systematic errors.
    #[serde(default)]
    pub policy: CombinationPolicy,
}

impl Default for SystematicConfig {
    fn default() -> Self {
        Self {
            z_eff: None,
            sigma_z: None,
            sigma_bias: default_sigma_bias(),
            survey_volume: default_survey_volume(),
            photo_z_cosmology: PhotoZCosmology::default(),
            sources: SourceToggles::all(),
            policy: CombinationPolicy::Quadrature,
        }
    }
}

impl SystematicConfig {
    /// Default nuisance configuration pinned to the given effective redshift.
    pub fn for_redshift(z_eff: f64) -> Self {
        Self {
            z_eff: Some(z_eff),
            sigma_z: None,
            sigma_bias: default_sigma_bias(),
            survey_volume: default_survey_volume(),
            photo_z_cosmology: PhotoZCosmology::default(),
            sources: SourceToggles::all(),
            policy: CombinationPolicy::Quadrature,
        }
    }
}

impl SystematicConfig {
    /// Binds the configuration to the redshift of the forecast it accompanies.
    ///
    /// An unset `z_eff` takes `z_forecast`; an explicit one must agree with it.
    pub fn for_forecast(&self, z_forecast: f64) -> Result<Self, PhiError> {
        match self.z_eff {
            Some(z_eff) if (z_eff - z_forecast).abs() > REDSHIFT_TOLERANCE => {
                Err(PhiError::InvalidInput(
                    ErrorInfo::new(
                        "redshift-mismatch",
                        "systematics and forecast disagree on z_eff",
                    )
                    .with_context("z_eff_systematics", z_eff)
                    .with_context("z_eff_forecast", z_forecast)
                    .with_hint("leave systematics.z_eff unset to inherit the forecast value"),
                ))
            }
            _ => Ok(Self {
                z_eff: Some(z_forecast),
                ..*self
            }),
        }
    }
}

/// Per-bin systematic error breakdown over one k-grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystematicBudget {
    /// Wavenumbers in h/Mpc.
    pub k: Vec<f64>,
    /// Photo-z error (zero when disabled).
    pub sigma_photo_z: Vec<f64>,
    /// Bias error (zero when disabled).
    pub sigma_bias: Vec<f64>,
    /// Geometry error (zero when disabled).
    pub sigma_geometry: Vec<f64>,
    /// Quadrature sum of the enabled sources.
    pub sigma_sys: Vec<f64>,
    /// Statistical and systematic errors merged with the configured policy.
    pub sigma_total: Vec<f64>,
    /// `σ_sys / (σ_total + ε)`.
    pub fraction_sys: Vec<f64>,
    /// Sources that contributed.
    pub sources: SourceToggles,
}

/// Systematic error calculator with configuration fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct SystematicErrorBudget {
    config: SystematicConfig,
    z_eff: f64,
    sigma_z: f64,
}

fn config_error(code: &str, message: &str, key: &str, value: f64) -> PhiError {
    PhiError::InvalidInput(ErrorInfo::new(code, message).with_context(key, value))
}

impl SystematicErrorBudget {
    /// Validates the configuration and resolves the photo-z scatter.
    ///
    /// Zero or negative survey volumes are accepted and floored in the
    /// geometry model.
    pub fn new(config: SystematicConfig) -> Result<Self, PhiError> {
        let z_eff = config.z_eff.unwrap_or(DEFAULT_Z_EFF);
        if !(z_eff.is_finite() && z_eff > -1.0) {
            return Err(config_error(
                "invalid-redshift",
                "z_eff must be finite and exceed -1",
                "z_eff",
                z_eff,
            ));
        }
        let sigma_z = config.sigma_z.unwrap_or(PHOTO_Z_SCATTER * (1.0 + z_eff));
        if !(sigma_z.is_finite() && sigma_z >= 0.0) {
            return Err(config_error(
                "invalid-sigma-z",
                "photo-z scatter must be non-negative",
                "sigma_z",
                sigma_z,
            ));
        }
        if !(config.sigma_bias.is_finite() && config.sigma_bias >= 0.0) {
            return Err(config_error(
                "invalid-sigma-bias",
                "bias uncertainty must be non-negative",
                "sigma_bias",
                config.sigma_bias,
            ));
        }
        if config.survey_volume.is_nan() {
            return Err(config_error(
                "invalid-volume",
                "survey volume must be a number",
                "survey_volume",
                config.survey_volume,
            ));
        }
        let hubble = config.photo_z_cosmology.hubble(z_eff);
        if !(hubble.is_finite() && hubble > 0.0) {
            return Err(PhiError::InvalidInput(
                ErrorInfo::new(
                    "invalid-photo-z-cosmology",
                    "photo-z cosmology must give a positive H(z_eff)",
                )
                .with_context("h0", config.photo_z_cosmology.h0)
                .with_context("omega_m", config.photo_z_cosmology.omega_m)
                .with_context("omega_lambda", config.photo_z_cosmology.omega_lambda)
                .with_context("z_eff", z_eff),
            ));
        }
        config.policy.validate()?;
        Ok(Self {
            config,
            z_eff,
            sigma_z,
        })
    }

    /// Configuration the budget was built with.
    pub fn config(&self) -> &SystematicConfig {
        &self.config
    }

    /// Redshift the budget is evaluated at.
    pub fn z_eff(&self) -> f64 {
        self.z_eff
    }

    /// Resolved photo-z scatter.
    pub fn sigma_z(&self) -> f64 {
        self.sigma_z
    }

    /// Comoving distance error `σ_r = σ_z · c / H(z_eff)`.
    pub fn sigma_r(&self) -> f64 {
        self.sigma_z
            * self
                .config
                .photo_z_cosmology
                .distance_per_redshift(self.z_eff)
    }

    /// Photo-z error: relative error `clip((k σ_r)² / 2, 0, 0.1)`.
    pub fn photo_z_error(&self, k: &[f64], pk: &[f64]) -> Result<Vec<f64>, PhiError> {
        ensure_same_len("photo-z-shape", "k", k.len(), "pk", pk.len())?;
        let sigma_r = self.sigma_r();
        Ok(k.iter()
            .zip(pk)
            .map(|(kv, p)| {
                let relative = ((kv * sigma_r).powi(2) / 2.0).clamp(0.0, PHOTO_Z_RELATIVE_CEILING);
                p * relative
            })
            .collect())
    }

    /// Bias error: `P ∝ b²`, so the relative error is `2 σ_b` at every k.
    pub fn bias_uncertainty(&self, k: &[f64], pk: &[f64]) -> Result<Vec<f64>, PhiError> {
        ensure_same_len("bias-shape", "k", k.len(), "pk", pk.len())?;
        let relative = 2.0 * self.config.sigma_bias;
        Ok(pk.iter().map(|p| p * relative).collect())
    }

    /// Fundamental mode of the survey, `2π / V^(1/3)`.
    ///
    /// The cube root is floored with [`VOLUME_FLOOR`], so a zero volume gives a
    /// very large but finite scale.
    pub fn k_min_survey(&self) -> f64 {
        2.0 * PI / (self.config.survey_volume.max(0.0).cbrt() + VOLUME_FLOOR)
    }

    /// Geometry error: `0.15 / (1 + (k / k_min_survey)²)`, largest at low k.
    pub fn survey_geometry_error(&self, k: &[f64], pk: &[f64]) -> Result<Vec<f64>, PhiError> {
        ensure_same_len("geometry-shape", "k", k.len(), "pk", pk.len())?;
        let k_survey = self.k_min_survey();
        Ok(k.iter()
            .zip(pk)
            .map(|(kv, p)| {
                let suppression = 1.0 / (1.0 + (kv / k_survey).powi(2));
                p * GEOMETRY_AMPLITUDE * suppression
            })
            .collect())
    }

    /// Builds the per-bin breakdown for the enabled sources.
    pub fn compute_budget(
        &self,
        k: &[f64],
        pk: &[f64],
        sigma_stat: &[f64],
    ) -> Result<SystematicBudget, PhiError> {
        ensure_same_len("budget-shape", "k", k.len(), "pk", pk.len())?;
        ensure_same_len(
            "budget-shape",
            "k",
            k.len(),
            "sigma_stat",
            sigma_stat.len(),
        )?;
        let sources = self.config.sources;
        let zeros = || vec![0.0; k.len()];
        let sigma_photo_z = if sources.photo_z {
            self.photo_z_error(k, pk)?
        } else {
            zeros()
        };
        let sigma_bias = if sources.bias {
            self.bias_uncertainty(k, pk)?
        } else {
            zeros()
        };
        let sigma_geometry = if sources.geometry {
            self.survey_geometry_error(k, pk)?
        } else {
            zeros()
        };

        let sigma_sys: Vec<f64> = sigma_photo_z
            .iter()
            .zip(&sigma_bias)
            .zip(&sigma_geometry)
            .map(|((a, b), c)| (a * a + b * b + c * c).sqrt())
            .collect();
        let sigma_total = self.config.policy.combine_bins(sigma_stat, &sigma_sys);
        let fraction_sys = sigma_sys
            .iter()
            .zip(&sigma_total)
            .map(|(sys, total)| sys / (total + FRACTION_FLOOR))
            .collect();
        debug!(
            photo_z = sources.photo_z,
            bias = sources.bias,
            geometry = sources.geometry,
            bins = k.len(),
            "systematic budget computed"
        );

        Ok(SystematicBudget {
            k: k.to_vec(),
            sigma_photo_z,
            sigma_bias,
            sigma_geometry,
            sigma_sys,
            sigma_total,
            fraction_sys,
            sources,
        })
    }

    /// Converts per-bin systematic errors into an amplitude uncertainty with the
    /// same Fisher reduction as the statistical forecast.
    pub fn propagate_to_amplitude(
        &self,
        d_pk_d_amplitude: &[f64],
        sigma_sys: &[f64],
    ) -> Result<f64, PhiError> {
        Ok(fisher_reduce(d_pk_d_amplitude, sigma_sys)?.sigma)
    }

    /// Merges statistical and systematic amplitude errors with the configured
    /// policy.
    pub fn total_amplitude_error(&self, sigma_stat: f64, sigma_sys: f64) -> f64 {
        total_amplitude_error(sigma_stat, sigma_sys, &self.config.policy)
    }
}

/// Merges statistical and systematic amplitude errors with any combination rule.
pub fn total_amplitude_error(
    sigma_stat: f64,
    sigma_sys: f64,
    rule: &dyn ErrorCombination,
) -> f64 {
    rule.combine(sigma_stat, sigma_sys)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(sources: SourceToggles) -> SystematicErrorBudget {
        SystematicErrorBudget::new(SystematicConfig {
            sources,
            ..SystematicConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn default_photo_z_scatter_scales_with_redshift() {
        let b = budget(SourceToggles::all());
        assert!((b.sigma_z() - 0.036).abs() < 1e-12);
        let hubble = b.config().photo_z_cosmology.hubble(0.8);
        assert!((hubble - 70.0 * (0.3 * 1.8f64.powi(3) + 0.7).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn photo_z_error_is_capped() {
        let b = budget(SourceToggles::all());
        let out = b.photo_z_error(&[1e-4, 0.05, 0.3], &[1.0, 1.0, 1.0]).unwrap();
        assert!(out[0] < PHOTO_Z_RELATIVE_CEILING);
        assert_eq!(out[1], PHOTO_Z_RELATIVE_CEILING);
        assert_eq!(out[2], PHOTO_Z_RELATIVE_CEILING);
    }

    #[test]
    fn geometry_error_decays_with_k() {
        let b = budget(SourceToggles::all());
        let out = b
            .survey_geometry_error(&[0.01, 1.0, 10.0], &[1.0, 1.0, 1.0])
            .unwrap();
        assert!(out[0] > out[1] && out[1] > out[2]);
        assert!(out[0] <= GEOMETRY_AMPLITUDE);
    }

    #[test]
    fn zero_volume_is_floored_not_rejected() {
        let b = SystematicErrorBudget::new(SystematicConfig {
            survey_volume: 0.0,
            ..SystematicConfig::default()
        })
        .unwrap();
        let out = b.survey_geometry_error(&[0.1], &[2.0]).unwrap();
        assert!(out[0].is_finite());
        assert!((out[0] - 2.0 * GEOMETRY_AMPLITUDE).abs() < 1e-9);
    }

    #[test]
    fn disabled_sources_are_zero() {
        let b = budget(SourceToggles::none());
        let result = b
            .compute_budget(&[0.1, 0.2], &[100.0, 50.0], &[1.0, 1.0])
            .unwrap();
        assert_eq!(result.sigma_sys, vec![0.0, 0.0]);
        assert_eq!(result.fraction_sys, vec![0.0, 0.0]);
        assert_eq!(result.sigma_total, vec![1.0, 1.0]);
    }

    #[test]
    fn shape_mismatch_is_invalid_input() {
        let b = budget(SourceToggles::all());
        assert!(matches!(
            b.bias_uncertainty(&[0.1, 0.2], &[1.0]),
            Err(PhiError::InvalidInput(_))
        ));
        assert!(matches!(
            b.compute_budget(&[0.1], &[1.0], &[1.0, 2.0]),
            Err(PhiError::InvalidInput(_))
        ));
    }
}

use phi_core::floors::VARIANCE_FLOOR;
use phi_core::{commit_string, CosmologicalParameters, PhiConstants, PhiError, SchemaVersion};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::baseline::BaselineSpectrumProvider;
use crate::combine::CombinationPolicy;
use crate::forecast::{forecast, ForecastResult, ForecastSpec};
use crate::canonical::content_hash;
use crate::systematics::{SystematicBudget, SystematicConfig, SystematicErrorBudget};

/// Schema version of [`ForecastReport`].
pub const REPORT_SCHEMA: SchemaVersion = SchemaVersion::new(1, 0, 0);

/// Amplitude uncertainties before and after systematics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmplitudeErrors {
    /// Statistical `σ(A_φ)`.
    pub sigma_stat: f64,
    /// Systematic `σ(A_φ)`; zero when no source is enabled.
    pub sigma_sys: f64,
    /// Combined `σ(A_φ)`.
    pub sigma_total: f64,
    /// `A_φ_true / σ_stat`.
    pub snr_stat: f64,
    /// `A_φ_true / σ_total`.
    pub snr_total: f64,
    /// Rule used for `sigma_total`.
    pub policy: CombinationPolicy,
}

/// Provenance block bundled with a [`ForecastReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportProvenance {
    /// Payload schema.
    pub schema_version: SchemaVersion,
    /// Source commit or package version.
    pub commit: String,
    /// Baseline provider that produced the spectrum.
    pub provider: String,
    /// Cosmology handed to the provider.
    pub cosmology: CosmologicalParameters,
    /// Golden-ratio constants in effect.
    pub constants: PhiConstants,
}

/// Forecast with the systematic error budget folded in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    /// SHA-256 of the canonical JSON of every other field.
    pub analysis_hash: String,
    /// Statistical forecast.
    pub forecast: ForecastResult,
    /// Systematic breakdown, absent for statistical-only runs.
    pub budget: Option<SystematicBudget>,
    /// Amplitude error summary.
    pub amplitude: AmplitudeErrors,
    /// Provenance information.
    pub provenance: ReportProvenance,
}

impl ForecastReport {
    /// Recomputes the content hash and compares it with the stored one.
    pub fn verify_hash(&self) -> Result<bool, PhiError> {
        Ok(self.computed_hash()? == self.analysis_hash)
    }

    fn computed_hash(&self) -> Result<String, PhiError> {
        content_hash(&(
            &self.forecast,
            &self.budget,
            &self.amplitude,
            &self.provenance,
        ))
    }
}

/// Runs the forecast and, when `systematics` is given, the systematic budget;
/// the amplitude error is then the policy combination of both.
pub fn forecast_with_systematics(
    provider: &dyn BaselineSpectrumProvider,
    params: &CosmologicalParameters,
    spec: &ForecastSpec,
    systematics: Option<&SystematicConfig>,
    constants: &PhiConstants,
) -> Result<ForecastReport, PhiError> {
    let calculator = systematics
        .map(|config| config.for_forecast(spec.z_eff))
        .transpose()?
        .map(SystematicErrorBudget::new)
        .transpose()?;
    let result = forecast(provider, params, spec, constants)?;
    let sigma_stat = result.sigma_amplitude;

    let (budget, amplitude) = match calculator {
        Some(calculator) => {
            let budget = calculator.compute_budget(&result.k, &result.pk_base, &result.sigma_pk)?;
            let sigma_sys = if budget.sources.any() {
                calculator.propagate_to_amplitude(&result.d_pk_d_amplitude, &budget.sigma_sys)?
            } else {
                0.0
            };
            let sigma_total = calculator.total_amplitude_error(sigma_stat, sigma_sys);
            let amplitude = AmplitudeErrors {
                sigma_stat,
                sigma_sys,
                sigma_total,
                snr_stat: result.snr,
                snr_total: spec.amplitude_true / (sigma_total + VARIANCE_FLOOR),
                policy: calculator.config().policy,
            };
            (Some(budget), amplitude)
        }
        None => (
            None,
            AmplitudeErrors {
                sigma_stat,
                sigma_sys: 0.0,
                sigma_total: sigma_stat,
                snr_stat: result.snr,
                snr_total: result.snr,
                policy: CombinationPolicy::Quadrature,
            },
        ),
    };

    info!(
        provider = %result.provider,
        sigma_stat = amplitude.sigma_stat,
        sigma_sys = amplitude.sigma_sys,
        sigma_total = amplitude.sigma_total,
        snr = amplitude.snr_total,
        "forecast report assembled"
    );

    let mut report = ForecastReport {
        analysis_hash: String::new(),
        provenance: ReportProvenance {
            schema_version: REPORT_SCHEMA,
            commit: commit_string(),
            provider: result.provider.clone(),
            cosmology: *params,
            constants: *constants,
        },
        forecast: result,
        budget,
        amplitude,
    };
    report.analysis_hash = report.computed_hash()?;
    Ok(report)
}

//! Baseline (unmodulated) power spectrum providers.
//!
//! The forecast engine treats the baseline as an external collaborator behind
//! [`BaselineSpectrumProvider`]. Two concrete providers ship with the crate: a
//! closed-form BBKS model for self-contained runs and a tabulated provider for
//! spectra computed elsewhere. [`FallbackChain`] strings providers together
//! with an explicit priority order.

use phi_core::errors::{ErrorInfo, PhiError};
use phi_core::{CosmologicalParameters, Spectrum};
use tracing::{debug, warn};

use crate::grid::{interp_linear, logspace, validate_log_range};

/// Source of baseline matter power spectra.
pub trait BaselineSpectrumProvider: Send + Sync {
    /// Short identifier recorded in report provenance.
    fn name(&self) -> &str;

    /// Returns `n_points` samples of `P(k)` on a logarithmic grid spanning
    /// `[k_min, k_max]` (h/Mpc) at redshift `z`.
    ///
    /// Fails with [`PhiError::DataUnavailable`] when no spectrum can be
    /// produced for the given parameters.
    fn get_power_spectrum(
        &self,
        params: &CosmologicalParameters,
        k_min: f64,
        k_max: f64,
        n_points: usize,
        z: f64,
    ) -> Result<Spectrum, PhiError>;

    /// Like [`get_power_spectrum`](Self::get_power_spectrum), paired with the
    /// name of the provider that produced the spectrum.
    ///
    /// Composite providers override this to report the member that answered.
    fn resolve_power_spectrum(
        &self,
        params: &CosmologicalParameters,
        k_min: f64,
        k_max: f64,
        n_points: usize,
        z: f64,
    ) -> Result<(Spectrum, String), PhiError> {
        let spectrum = self.get_power_spectrum(params, k_min, k_max, n_points, z)?;
        Ok((spectrum, self.name().to_string()))
    }
}

/// Amplitude of the analytic model at `A_s = 2.1e-9`, in (Mpc/h)³, chosen so
/// that `P(0.1 h/Mpc, z = 0) ≈ 6×10³ (Mpc/h)³` for Planck 2018 parameters.
pub const BBKS_NORMALIZATION: f64 = 2.8e6;

/// Reference scalar amplitude for [`BBKS_NORMALIZATION`].
pub const REFERENCE_A_S: f64 = 2.1e-9;

/// Closed-form linear matter spectrum.
///
/// BBKS transfer function with the Sugiyama baryon-corrected shape parameter,
/// primordial tilt `n_s`, amplitude proportional to `A_s`, and the
/// Carroll–Press–Turner growth factor for flat ΛCDM. No acoustic features are
/// modelled and `τ` is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticProvider;

fn unavailable(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
}

fn cpt_growth(omega_m: f64, omega_lambda: f64) -> f64 {
    2.5 * omega_m
        / (omega_m.powf(4.0 / 7.0) - omega_lambda + (1.0 + omega_m / 2.0) * (1.0 + omega_lambda / 70.0))
}

/// Linear growth factor normalised to `D(0) = 1` for flat ΛCDM.
pub fn growth_factor(omega_m: f64, z: f64) -> f64 {
    let omega_lambda = 1.0 - omega_m;
    let a3 = (1.0 + z).powi(3);
    let e2 = omega_m * a3 + omega_lambda;
    let g_z = cpt_growth(omega_m * a3 / e2, omega_lambda / e2);
    let g_0 = cpt_growth(omega_m, omega_lambda);
    g_z / (g_0 * (1.0 + z))
}

/// BBKS transfer function at `q = k / Γ`.
pub fn bbks_transfer(q: f64) -> f64 {
    if q <= 0.0 {
        return 1.0;
    }
    let x = 2.34 * q;
    let poly = 1.0 + 3.89 * q + (16.1 * q).powi(2) + (5.46 * q).powi(3) + (6.71 * q).powi(4);
    (1.0 + x).ln() / x * poly.powf(-0.25)
}

impl AnalyticProvider {
    fn check_physical(params: &CosmologicalParameters, z: f64) -> Result<(), PhiError> {
        params.validate().map_err(|err| PhiError::DataUnavailable(err.info().clone()))?;
        let h = params.h();
        let omega_m = params.omega_m();
        if h <= 0.0 {
            return Err(PhiError::DataUnavailable(
                unavailable("unphysical-h0", "analytic spectrum requires H0 > 0")
                    .with_context("h0", params.h0),
            ));
        }
        if !(omega_m > 0.0 && omega_m <= 1.0) || params.omega_b < 0.0 {
            return Err(PhiError::DataUnavailable(
                unavailable(
                    "unphysical-density",
                    "analytic spectrum requires 0 < omega_m <= 1 and omega_b >= 0",
                )
                .with_context("omega_m", omega_m)
                .with_context("omega_b", params.omega_b)
                .with_context("omega_c", params.omega_c),
            ));
        }
        if params.a_s <= 0.0 {
            return Err(PhiError::DataUnavailable(
                unavailable("unphysical-amplitude", "analytic spectrum requires A_s > 0")
                    .with_context("a_s", params.a_s),
            ));
        }
        if !(z.is_finite() && z > -1.0) {
            return Err(PhiError::DataUnavailable(
                unavailable("unphysical-redshift", "redshift must exceed -1")
                    .with_context("z", z),
            ));
        }
        Ok(())
    }

    /// Evaluates the model at a single wavenumber in h/Mpc.
    pub fn evaluate(params: &CosmologicalParameters, k: f64, z: f64) -> f64 {
        let h = params.h();
        let omega_m = params.omega_m();
        let omega_b = params.omega_baryon();
        let shape = omega_m * h * (-omega_b - (2.0 * h).sqrt() * omega_b / omega_m).exp();
        let transfer = bbks_transfer(k / shape);
        let growth = growth_factor(omega_m, z);
        BBKS_NORMALIZATION * (params.a_s / REFERENCE_A_S)
            * k.powf(params.n_s)
            * transfer
            * transfer
            * growth
            * growth
    }
}

impl BaselineSpectrumProvider for AnalyticProvider {
    fn name(&self) -> &str {
        "analytic-bbks"
    }

    fn get_power_spectrum(
        &self,
        params: &CosmologicalParameters,
        k_min: f64,
        k_max: f64,
        n_points: usize,
        z: f64,
    ) -> Result<Spectrum, PhiError> {
        let k = logspace(k_min, k_max, n_points)?;
        Self::check_physical(params, z)?;
        let pk = k.iter().map(|&value| Self::evaluate(params, value, z)).collect();
        Spectrum::new(k, pk)
    }
}

/// Provider backed by a precomputed or measured spectrum.
///
/// The table is resampled log-log onto the requested grid (linearly when any
/// power value is non-positive). The redshift argument is not applied: the
/// table is assumed to already describe the requested epoch.
#[derive(Debug, Clone)]
pub struct TabulatedProvider {
    label: String,
    table: Spectrum,
    allow_extrapolation: bool,
}

impl TabulatedProvider {
    /// Wraps a table; requests outside its k-range fail unless extrapolation
    /// is enabled.
    pub fn new(label: impl Into<String>, table: Spectrum, allow_extrapolation: bool) -> Self {
        Self {
            label: label.into(),
            table,
            allow_extrapolation,
        }
    }

    /// Underlying table.
    pub fn table(&self) -> &Spectrum {
        &self.table
    }
}

impl BaselineSpectrumProvider for TabulatedProvider {
    fn name(&self) -> &str {
        &self.label
    }

    fn get_power_spectrum(
        &self,
        _params: &CosmologicalParameters,
        k_min: f64,
        k_max: f64,
        n_points: usize,
        _z: f64,
    ) -> Result<Spectrum, PhiError> {
        validate_log_range(k_min, k_max, n_points)?;
        if self.table.len() < 2 {
            return Err(PhiError::DataUnavailable(
                unavailable("table-too-short", "tabulated spectrum needs two or more rows")
                    .with_context("table", &self.label)
                    .with_context("rows", self.table.len()),
            ));
        }
        let (lo, hi) = self.table.k_range();
        if !self.allow_extrapolation && (k_min < lo || k_max > hi) {
            return Err(PhiError::DataUnavailable(
                unavailable("table-range", "requested k-range exceeds the tabulated range")
                    .with_context("table", &self.label)
                    .with_context("table_k_min", lo)
                    .with_context("table_k_max", hi)
                    .with_context("k_min", k_min)
                    .with_context("k_max", k_max),
            ));
        }

        let k = logspace(k_min, k_max, n_points)?;
        let pk = if self.table.pk().iter().all(|&p| p > 0.0) {
            let log_k: Vec<f64> = self.table.k().iter().map(|v| v.ln()).collect();
            let log_p: Vec<f64> = self.table.pk().iter().map(|v| v.ln()).collect();
            let targets: Vec<f64> = k.iter().map(|v| v.ln()).collect();
            interp_linear(&log_k, &log_p, &targets)?
                .into_iter()
                .map(f64::exp)
                .collect()
        } else {
            interp_linear(self.table.k(), self.table.pk(), &k)?
        };
        Spectrum::new(k, pk)
    }
}

/// Prioritised list of providers.
///
/// Providers are tried in order. A [`PhiError::DataUnavailable`] moves on to
/// the next provider; any other error is a caller mistake and is returned
/// immediately. When every provider is unavailable the returned error lists
/// each failure under the provider's name.
#[derive(Default)]
pub struct FallbackChain {
    providers: Vec<Box<dyn BaselineSpectrumProvider>>,
}

impl std::fmt::Debug for FallbackChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|provider| provider.name()))
            .finish()
    }
}

impl FallbackChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider with lower priority than those already present.
    pub fn with(mut self, provider: impl BaselineSpectrumProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Number of providers in the chain.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// True when no provider has been added.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl BaselineSpectrumProvider for FallbackChain {
    fn name(&self) -> &str {
        "fallback-chain"
    }

    fn get_power_spectrum(
        &self,
        params: &CosmologicalParameters,
        k_min: f64,
        k_max: f64,
        n_points: usize,
        z: f64,
    ) -> Result<Spectrum, PhiError> {
        self.resolve_power_spectrum(params, k_min, k_max, n_points, z)
            .map(|(spectrum, _)| spectrum)
    }

    fn resolve_power_spectrum(
        &self,
        params: &CosmologicalParameters,
        k_min: f64,
        k_max: f64,
        n_points: usize,
        z: f64,
    ) -> Result<(Spectrum, String), PhiError> {
        let mut failures = ErrorInfo::new(
            "all-providers-unavailable",
            "no baseline provider produced a spectrum",
        )
        .with_context("providers", self.providers.len());
        for provider in &self.providers {
            match provider.resolve_power_spectrum(params, k_min, k_max, n_points, z) {
                Ok((spectrum, answered)) => {
                    debug!(provider = %answered, "baseline spectrum resolved");
                    return Ok((spectrum, answered));
                }
                Err(PhiError::DataUnavailable(info)) => {
                    warn!(provider = provider.name(), error = %info, "baseline provider unavailable");
                    failures = failures.with_context(provider.name(), info);
                }
                Err(other) => return Err(other),
            }
        }
        Err(PhiError::DataUnavailable(failures))
    }
}

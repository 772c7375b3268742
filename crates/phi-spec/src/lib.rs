#![deny(missing_docs)]
//! Phi-modulated power spectrum forecasting.
//!
//! Data flows one way: a [`BaselineSpectrumProvider`] supplies `P(k)`, the
//! modulation engine applies the log-periodic golden-ratio correction, the
//! forecast engine reduces cosmic variance and shot noise to `σ(A_φ)` through a
//! Fisher matrix, and the systematic budget adds photo-z, bias and geometry
//! errors on top. Every stage returns new arrays.

pub mod baseline;
pub mod canonical;
/// Statistical and systematic error combination rules.
pub mod combine;
/// BAO-scale correlation function of baseline and modulated spectra.
pub mod correlation;
pub mod fit;
pub mod forecast;
/// Logarithmic grids, interpolation and quadrature.
pub mod grid;
/// Log-periodic modulation engine.
pub mod modulation;
/// Combined forecast report.
pub mod report;
pub mod systematics;

pub use baseline::{AnalyticProvider, BaselineSpectrumProvider, FallbackChain, TabulatedProvider};
pub use canonical::{canonical_json, content_hash, decode_json};
pub use combine::{CombinationPolicy, ErrorCombination};
pub use correlation::{bao_signature, correlation_function, BaoSignature, BaoSpec};
pub use fit::{extract_modulation, fit_log_periodic, OscillationFit};
pub use forecast::{
    amplitude_sweep, fisher_reduce, forecast, FisherReduction, ForecastResult, ForecastSpec,
    ProviderPadding, SweepPoint,
};
pub use modulation::{apply_modulation, modulate_spectrum, modulation_factor, Modulated};
pub use report::{forecast_with_systematics, AmplitudeErrors, ForecastReport, ReportProvenance};
pub use systematics::{
    total_amplitude_error, PhotoZCosmology, SourceToggles, SystematicBudget, SystematicConfig,
    SystematicErrorBudget,
};

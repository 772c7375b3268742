use phi_core::{CosmologicalParameters, ErrorInfo, PhiConstants, PhiError, Spectrum};
use phi_spec::{
    forecast, forecast_with_systematics, AnalyticProvider, BaselineSpectrumProvider,
    FallbackChain, ForecastReport, ForecastSpec, SystematicConfig, TabulatedProvider,
};

struct Offline;

impl BaselineSpectrumProvider for Offline {
    fn name(&self) -> &str {
        "offline-solver"
    }

    fn get_power_spectrum(
        &self,
        _params: &CosmologicalParameters,
        _k_min: f64,
        _k_max: f64,
        _n_points: usize,
        _z: f64,
    ) -> Result<Spectrum, PhiError> {
        Err(PhiError::data_unavailable("offline", "solver not installed"))
    }
}

struct Strict;

impl BaselineSpectrumProvider for Strict {
    fn name(&self) -> &str {
        "strict"
    }

    fn get_power_spectrum(
        &self,
        _params: &CosmologicalParameters,
        k_min: f64,
        _k_max: f64,
        _n_points: usize,
        _z: f64,
    ) -> Result<Spectrum, PhiError> {
        Err(PhiError::InvalidRange(
            ErrorInfo::new("strict-range", "refused").with_context("k_min", k_min),
        ))
    }
}

fn analytic_table(k_min: f64, k_max: f64) -> Spectrum {
    AnalyticProvider
        .get_power_spectrum(&CosmologicalParameters::default(), k_min, k_max, 400, 0.8)
        .expect("table")
}

#[test]
fn report_hash_verifies_and_detects_tampering() {
    let report = forecast_with_systematics(
        &AnalyticProvider,
        &CosmologicalParameters::default(),
        &ForecastSpec::default(),
        Some(&SystematicConfig::default()),
        PhiConstants::get(),
    )
    .expect("report");
    assert_eq!(report.analysis_hash.len(), 64);
    assert!(report.verify_hash().expect("hash"));

    let mut tampered = report.clone();
    tampered.amplitude.sigma_sys *= 2.0;
    assert!(!tampered.verify_hash().expect("hash"));

    let json = serde_json::to_string(&report).expect("encode");
    let decoded: ForecastReport = serde_json::from_str(&json).expect("decode");
    assert_eq!(decoded.provenance.provider, "analytic-bbks");
    assert_eq!(decoded.analysis_hash, report.analysis_hash);
}

#[test]
fn report_hash_is_reproducible() {
    let build = || {
        forecast_with_systematics(
            &AnalyticProvider,
            &CosmologicalParameters::default(),
            &ForecastSpec::default(),
            None,
            PhiConstants::get(),
        )
        .expect("report")
    };
    let first = build();
    let second = build();
    assert_eq!(first.analysis_hash, second.analysis_hash);
    assert!(first.budget.is_none());
    assert_eq!(first.amplitude.sigma_total, first.amplitude.sigma_stat);
}

#[test]
fn fallback_skips_unavailable_providers() {
    let chain = FallbackChain::new().with(Offline).with(AnalyticProvider);
    assert_eq!(chain.len(), 2);
    let via_chain = forecast(
        &chain,
        &CosmologicalParameters::default(),
        &ForecastSpec::default(),
        PhiConstants::get(),
    )
    .expect("forecast");
    let direct = forecast(
        &AnalyticProvider,
        &CosmologicalParameters::default(),
        &ForecastSpec::default(),
        PhiConstants::get(),
    )
    .expect("forecast");
    assert_eq!(via_chain.pk_base, direct.pk_base);
    assert_eq!(via_chain.sigma_amplitude, direct.sigma_amplitude);
}

#[test]
fn fallback_returns_caller_errors_immediately() {
    let chain = FallbackChain::new().with(Strict).with(AnalyticProvider);
    let err = chain
        .get_power_spectrum(&CosmologicalParameters::default(), 0.01, 0.3, 10, 0.0)
        .unwrap_err();
    assert!(matches!(err, PhiError::InvalidRange(_)));
    assert_eq!(err.info().code, "strict-range");
}

#[test]
fn exhausted_chain_reports_every_failure() {
    let chain = FallbackChain::new().with(Offline);
    let err = chain
        .get_power_spectrum(&CosmologicalParameters::default(), 0.01, 0.3, 10, 0.0)
        .unwrap_err();
    match err {
        PhiError::DataUnavailable(info) => {
            assert_eq!(info.code, "all-providers-unavailable");
            assert!(info.context.contains_key("offline-solver"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn narrow_table_falls_back_to_analytic() {
    let table = TabulatedProvider::new("narrow", analytic_table(0.02, 0.2), false);
    let chain = FallbackChain::new().with(table).with(AnalyticProvider);
    let result = forecast(
        &chain,
        &CosmologicalParameters::default(),
        &ForecastSpec::default(),
        PhiConstants::get(),
    )
    .expect("forecast");
    assert!(result.sigma_amplitude.is_finite());
    assert_eq!(result.provider, "analytic-bbks");
}

#[test]
fn report_provenance_names_the_answering_provider() {
    let table = TabulatedProvider::new("wide", analytic_table(1e-3, 1.0), false);
    let chain = FallbackChain::new().with(table).with(AnalyticProvider);
    let report = forecast_with_systematics(
        &chain,
        &CosmologicalParameters::default(),
        &ForecastSpec::default(),
        None,
        PhiConstants::get(),
    )
    .expect("report");
    assert_eq!(report.forecast.provider, "wide");
    assert_eq!(report.provenance.provider, "wide");
}

#[test]
fn tabulated_forecast_tracks_analytic_forecast() {
    let table = TabulatedProvider::new("wide", analytic_table(1e-3, 1.0), false);
    let params = CosmologicalParameters::default();
    let spec = ForecastSpec::default();
    let from_table = forecast(&table, &params, &spec, PhiConstants::get()).expect("forecast");
    let analytic = forecast(&AnalyticProvider, &params, &spec, PhiConstants::get()).expect("forecast");
    let relative = (from_table.sigma_amplitude - analytic.sigma_amplitude).abs()
        / analytic.sigma_amplitude;
    assert!(relative < 1e-2, "relative difference {relative}");
    assert_eq!(from_table.provider, "wide");
}

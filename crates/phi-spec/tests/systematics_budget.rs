use phi_core::{CosmologicalParameters, PhiConstants, PhiError};
use phi_spec::{
    forecast, forecast_with_systematics, total_amplitude_error, AnalyticProvider,
    CombinationPolicy, ForecastResult, ForecastSpec, SourceToggles, SystematicConfig,
    SystematicErrorBudget,
};
use proptest::prelude::*;

fn baseline_forecast() -> ForecastResult {
    forecast(
        &AnalyticProvider,
        &CosmologicalParameters::default(),
        &ForecastSpec::default(),
        PhiConstants::get(),
    )
    .expect("forecast")
}

fn toggle_combinations() -> Vec<SourceToggles> {
    (0..8u8)
        .map(|bits| SourceToggles {
            photo_z: bits & 1 != 0,
            bias: bits & 2 != 0,
            geometry: bits & 4 != 0,
        })
        .collect()
}

#[test]
fn fraction_is_bounded_for_every_toggle_combination() {
    let result = baseline_forecast();
    for policy in [
        CombinationPolicy::Quadrature,
        CombinationPolicy::Linear,
        CombinationPolicy::Correlated { rho: 0.3 },
    ] {
        for sources in toggle_combinations() {
            let calculator = SystematicErrorBudget::new(SystematicConfig {
                sources,
                policy,
                ..SystematicConfig::default()
            })
            .expect("config");
            let budget = calculator
                .compute_budget(&result.k, &result.pk_base, &result.sigma_pk)
                .expect("budget");
            assert_eq!(budget.fraction_sys.len(), result.k.len());
            for (idx, fraction) in budget.fraction_sys.iter().enumerate() {
                assert!(
                    (0.0..=1.0).contains(fraction),
                    "fraction {fraction} at bin {idx} for {sources:?} / {policy:?}"
                );
                assert!(budget.sigma_total[idx] >= result.sigma_pk[idx]);
                assert!(budget.sigma_total[idx] >= budget.sigma_sys[idx]);
            }
            if !sources.any() {
                assert!(budget.sigma_sys.iter().all(|s| *s == 0.0));
                assert!(budget.fraction_sys.iter().all(|f| *f == 0.0));
            }
        }
    }
}

#[test]
fn bias_only_budget_is_ten_percent_of_power() {
    let spec = ForecastSpec::default();
    let config = SystematicConfig {
        sources: SourceToggles {
            photo_z: false,
            bias: true,
            geometry: false,
        },
        ..SystematicConfig::default()
    };
    let report = forecast_with_systematics(
        &AnalyticProvider,
        &CosmologicalParameters::default(),
        &spec,
        Some(&config),
        PhiConstants::get(),
    )
    .expect("report");
    let budget = report.budget.expect("budget present");
    for ((bias, sys), pk) in budget
        .sigma_bias
        .iter()
        .zip(&budget.sigma_sys)
        .zip(&report.forecast.pk_base)
    {
        assert!((bias / pk - 0.10).abs() < 1e-12);
        assert!((sys - bias).abs() <= 1e-12 * bias);
    }
    assert!(budget.sigma_photo_z.iter().all(|v| *v == 0.0));
    assert!(budget.sigma_geometry.iter().all(|v| *v == 0.0));
}

#[test]
fn photo_z_error_saturates_at_ceiling() {
    let calculator = SystematicErrorBudget::new(SystematicConfig::default()).expect("config");
    // k = 10 is deep in the clipped regime
    let errors = calculator
        .photo_z_error(&[1e-4, 10.0], &[1.0, 1.0])
        .expect("photo-z");
    assert!(errors[0] < 1e-4);
    assert_eq!(errors[1], 0.1);
    assert!((calculator.sigma_z() - 0.036).abs() < 1e-15);
}

#[test]
fn geometry_error_peaks_at_large_scales() {
    let calculator = SystematicErrorBudget::new(SystematicConfig::default()).expect("config");
    let k = [1e-3, 1e-2, 1e-1, 1.0];
    let errors = calculator
        .survey_geometry_error(&k, &[1.0; 4])
        .expect("geometry");
    assert!(errors.windows(2).all(|pair| pair[0] > pair[1]));
    assert!(errors[0] <= 0.15);
}

#[test]
fn zero_volume_is_floored_not_rejected() {
    let calculator = SystematicErrorBudget::new(SystematicConfig {
        survey_volume: 0.0,
        ..SystematicConfig::default()
    })
    .expect("config");
    assert!(calculator.k_min_survey().is_finite());
    let errors = calculator
        .survey_geometry_error(&[0.01, 0.1], &[1.0, 1.0])
        .expect("geometry");
    assert!(errors.iter().all(|e| e.is_finite()));
}

#[test]
fn budget_rejects_mismatched_lengths() {
    let calculator = SystematicErrorBudget::new(SystematicConfig::default()).expect("config");
    let err = calculator
        .compute_budget(&[0.1, 0.2], &[1.0], &[1.0, 1.0])
        .unwrap_err();
    assert!(matches!(err, PhiError::InvalidInput(_)));
}

#[test]
fn systematics_never_shrink_the_amplitude_error() {
    let spec = ForecastSpec::default();
    for policy in [
        CombinationPolicy::Quadrature,
        CombinationPolicy::Linear,
        CombinationPolicy::Correlated { rho: 0.7 },
    ] {
        let config = SystematicConfig {
            policy,
            ..SystematicConfig::default()
        };
        let report = forecast_with_systematics(
            &AnalyticProvider,
            &CosmologicalParameters::default(),
            &spec,
            Some(&config),
            PhiConstants::get(),
        )
        .expect("report");
        let amplitude = report.amplitude;
        assert!(amplitude.sigma_sys > 0.0);
        assert!(amplitude.sigma_total >= amplitude.sigma_stat);
        assert!(amplitude.sigma_total >= amplitude.sigma_sys);
        assert!(amplitude.snr_total <= amplitude.snr_stat);
        assert_eq!(amplitude.policy, policy);
    }
}

#[test]
fn disabled_sources_leave_statistical_error() {
    let config = SystematicConfig {
        sources: SourceToggles::none(),
        ..SystematicConfig::default()
    };
    let report = forecast_with_systematics(
        &AnalyticProvider,
        &CosmologicalParameters::default(),
        &ForecastSpec::default(),
        Some(&config),
        PhiConstants::get(),
    )
    .expect("report");
    assert_eq!(report.amplitude.sigma_sys, 0.0);
    assert_eq!(report.amplitude.sigma_total, report.amplitude.sigma_stat);
}

#[test]
fn out_of_range_correlation_is_rejected() {
    let err = SystematicErrorBudget::new(SystematicConfig {
        policy: CombinationPolicy::Correlated { rho: -0.2 },
        ..SystematicConfig::default()
    })
    .unwrap_err();
    assert!(matches!(err, PhiError::InvalidRange(_)));
}

proptest! {
    #[test]
    fn total_dominates_both_inputs(
        stat in 0.0f64..1e3,
        sys in 0.0f64..1e3,
        rho in 0.0f64..=1.0,
    ) {
        for policy in [
            CombinationPolicy::Quadrature,
            CombinationPolicy::Linear,
            CombinationPolicy::Correlated { rho },
        ] {
            let total = total_amplitude_error(stat, sys, &policy);
            prop_assert!(total >= stat.max(sys) * (1.0 - 1e-15));
        }
    }
}

#[test]
fn unset_redshift_follows_the_forecast() {
    let spec = ForecastSpec {
        z_eff: 1.5,
        ..ForecastSpec::default()
    };
    let bound = SystematicConfig::default().for_forecast(spec.z_eff).expect("bind");
    let calculator = SystematicErrorBudget::new(bound).expect("config");
    assert_eq!(calculator.z_eff(), 1.5);
    assert!((calculator.sigma_z() - 0.05).abs() < 1e-12);

    let report = forecast_with_systematics(
        &AnalyticProvider,
        &CosmologicalParameters::default(),
        &spec,
        Some(&SystematicConfig::default()),
        PhiConstants::get(),
    )
    .expect("report");
    let budget = report.budget.expect("budget");
    let expected = calculator
        .photo_z_error(&report.forecast.k, &report.forecast.pk_base)
        .expect("photo-z");
    assert_eq!(budget.sigma_photo_z, expected);
}

#[test]
fn standalone_budget_uses_default_redshift() {
    let calculator = SystematicErrorBudget::new(SystematicConfig::default()).expect("config");
    assert_eq!(calculator.z_eff(), 0.8);
    assert!((calculator.sigma_z() - 0.036).abs() < 1e-12);
}

#[test]
fn conflicting_redshifts_are_rejected() {
    let spec = ForecastSpec {
        z_eff: 1.5,
        ..ForecastSpec::default()
    };
    let err = forecast_with_systematics(
        &AnalyticProvider,
        &CosmologicalParameters::default(),
        &spec,
        Some(&SystematicConfig::for_redshift(0.8)),
        PhiConstants::get(),
    )
    .unwrap_err();
    assert!(matches!(err, PhiError::InvalidInput(_)));
    assert_eq!(err.info().code, "redshift-mismatch");
    assert_eq!(err.info().context["z_eff_forecast"], "1.5");

    let agreeing = SystematicConfig::for_redshift(1.5)
        .for_forecast(1.5)
        .expect("agreeing redshifts");
    assert_eq!(agreeing.z_eff, Some(1.5));
}

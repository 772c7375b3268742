use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use phi_core::PhiConstants;
use phi_spec::{canonical_json, forecast_with_systematics, ForecastReport};
use serde::Serialize;
use tracing::info;

use crate::config::RunConfig;
use crate::io::write_csv;
use crate::write_json;

#[derive(Args, Debug)]
pub struct ForecastArgs {
    /// YAML run configuration.
    #[arg(long)]
    pub config: PathBuf,
    /// Output directory for `report.json` and `forecast.csv`.
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Debug, Serialize)]
struct ForecastRow {
    k: f64,
    #[serde(rename = "Pk")]
    pk: f64,
    #[serde(rename = "Pk_mod")]
    pk_mod: f64,
    #[serde(rename = "sigma_Pk")]
    sigma_pk: f64,
    sigma_sys: f64,
    sigma_total: f64,
    fraction_sys: f64,
}

pub fn run(args: &ForecastArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let config = RunConfig::load(&args.config)?;
    let provider = config.provider()?;
    let report = forecast_with_systematics(
        provider.as_ref(),
        &config.cosmology,
        &config.forecast,
        config.systematics.as_ref(),
        PhiConstants::get(),
    )?;

    write_json(args.out.join("report.json"), &canonical_json(&report)?)?;
    write_csv(args.out.join("forecast.csv"), rows(&report))?;
    info!(
        out = %args.out.display(),
        sigma_total = report.amplitude.sigma_total,
        snr = report.amplitude.snr_total,
        hash = %report.analysis_hash,
        "forecast written"
    );
    Ok(())
}

fn rows(report: &ForecastReport) -> Vec<ForecastRow> {
    let forecast = &report.forecast;
    (0..forecast.k.len())
        .map(|idx| {
            let sigma_pk = forecast.sigma_pk[idx];
            let (sigma_sys, sigma_total, fraction_sys) = match &report.budget {
                Some(budget) => (
                    budget.sigma_sys[idx],
                    budget.sigma_total[idx],
                    budget.fraction_sys[idx],
                ),
                None => (0.0, sigma_pk, 0.0),
            };
            ForecastRow {
                k: forecast.k[idx],
                pk: forecast.pk_base[idx],
                pk_mod: forecast.pk_modulated[idx],
                sigma_pk,
                sigma_sys,
                sigma_total,
                fraction_sys,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_report_and_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = dir.path().join("run.yaml");
        fs::write(&config, "forecast:\n  n_k: 12\nsystematics: {}\n").expect("config");
        let out = dir.path().join("out");
        run(&ForecastArgs {
            config,
            out: out.clone(),
        })
        .expect("forecast");

        let bytes = fs::read(out.join("report.json")).expect("report");
        let report: ForecastReport = phi_spec::decode_json(&bytes).expect("decode");
        assert!(report.budget.is_some());
        assert_eq!(report.forecast.k.len(), 12);

        let table = fs::read_to_string(out.join("forecast.csv")).expect("table");
        let mut lines = table.lines();
        assert_eq!(
            lines.next(),
            Some("k,Pk,Pk_mod,sigma_Pk,sigma_sys,sigma_total,fraction_sys")
        );
        assert_eq!(lines.count(), 12);
    }

    #[test]
    fn invalid_range_surfaces_as_phi_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = dir.path().join("run.yaml");
        fs::write(&config, "forecast:\n  k_min: 0.3\n  k_max: 0.01\n").expect("config");
        let err = run(&ForecastArgs {
            config,
            out: dir.path().join("out"),
        })
        .unwrap_err();
        let phi = err.downcast_ref::<phi_core::PhiError>().expect("phi error");
        assert_eq!(phi.kind(), "InvalidRange");
    }
}

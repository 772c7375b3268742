use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use phi_core::{ErrorInfo, PhiConstants, PhiError};
use phi_spec::{canonical_json, extract_modulation, fit_log_periodic};
use tracing::info;

use crate::io::read_spectrum_csv;
use crate::write_json;

#[derive(Args, Debug)]
pub struct FitArgs {
    /// Baseline spectrum CSV.
    #[arg(long)]
    pub base: PathBuf,
    /// Modulated spectrum CSV on the same k-grid.
    #[arg(long)]
    pub modulated: PathBuf,
    /// Pivot the fitted phase is referred to.
    #[arg(long = "k-pivot", default_value_t = 0.05)]
    pub k_pivot: f64,
    /// Output JSON path.
    #[arg(long)]
    pub out: PathBuf,
}

pub fn run(args: &FitArgs) -> Result<(), Box<dyn Error>> {
    let (base, _) = read_spectrum_csv(&args.base)?;
    let (modulated, sigma) = read_spectrum_csv(&args.modulated)?;
    if let Some(idx) = base
        .k()
        .iter()
        .zip(modulated.k())
        .position(|(a, b)| (a - b).abs() > 1e-12 * a.abs())
    {
        return Err(PhiError::InvalidInput(
            ErrorInfo::new("grid-mismatch", "spectra must share one k-grid")
                .with_context("index", idx)
                .with_context("k_base", base.k()[idx])
                .with_context("k_modulated", modulated.k()[idx]),
        )
        .into());
    }

    let residual = extract_modulation(base.pk(), modulated.pk())?;
    let residual_sigma: Option<Vec<f64>> = sigma.map(|s| {
        s.iter()
            .zip(base.pk())
            .map(|(err, p)| (err / p).abs())
            .collect()
    });
    let fit = fit_log_periodic(
        base.k(),
        &residual,
        residual_sigma.as_deref(),
        args.k_pivot,
        PhiConstants::get(),
    )?;
    info!(
        amplitude = fit.amplitude,
        phase = fit.phase,
        significance = fit.significance,
        "oscillation fit"
    );
    write_json(&args.out, &canonical_json(&fit)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use phi_core::ModulationParameters;
    use phi_spec::grid::logspace;
    use phi_spec::{modulation_factor, OscillationFit};

    use super::*;

    fn write_table(path: &std::path::Path, k: &[f64], pk: &[f64]) {
        let mut text = String::from("k,Pk\n");
        for (kv, p) in k.iter().zip(pk) {
            text.push_str(&format!("{kv:e},{p:e}\n"));
        }
        fs::write(path, text).expect("write table");
    }

    #[test]
    fn recovers_amplitude_from_tables() {
        let dir = tempfile::tempdir().expect("tempdir");
        let k = logspace(0.01, 0.3, 40).expect("grid");
        let base: Vec<f64> = k.iter().map(|kv| 1e4 * kv.powf(-1.2)).collect();
        let params = ModulationParameters::new(0.03, 0.5, 0.05);
        let modulated: Vec<f64> = k
            .iter()
            .zip(&base)
            .map(|(&kv, p)| p * modulation_factor(kv, &params, PhiConstants::get()))
            .collect();
        write_table(&dir.path().join("base.csv"), &k, &base);
        write_table(&dir.path().join("mod.csv"), &k, &modulated);

        let out = dir.path().join("fit.json");
        run(&FitArgs {
            base: dir.path().join("base.csv"),
            modulated: dir.path().join("mod.csv"),
            k_pivot: 0.05,
            out: out.clone(),
        })
        .expect("fit");
        let fit: OscillationFit =
            phi_spec::decode_json(&fs::read(out).expect("read")).expect("decode");
        assert!((fit.amplitude - 0.03).abs() < 1e-6);
        assert!((fit.phase - 0.5).abs() < 1e-4);
    }

    #[test]
    fn mismatched_grids_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_table(&dir.path().join("base.csv"), &[0.01, 0.02, 0.03, 0.04], &[1.0; 4]);
        write_table(&dir.path().join("mod.csv"), &[0.01, 0.02, 0.035, 0.04], &[1.0; 4]);
        let err = run(&FitArgs {
            base: dir.path().join("base.csv"),
            modulated: dir.path().join("mod.csv"),
            k_pivot: 0.05,
            out: dir.path().join("fit.json"),
        })
        .unwrap_err();
        let phi = err.downcast_ref::<PhiError>().expect("phi error");
        assert_eq!(phi.info().code, "grid-mismatch");
    }
}

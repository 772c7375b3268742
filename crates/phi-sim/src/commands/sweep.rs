use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use phi_core::PhiConstants;
use phi_spec::amplitude_sweep;
use tracing::info;

use crate::config::RunConfig;
use crate::io::write_csv;

#[derive(Args, Debug)]
pub struct SweepArgs {
    /// YAML run configuration; its amplitude is replaced by each sweep value.
    #[arg(long)]
    pub config: PathBuf,
    /// Comma separated injected amplitudes.
    #[arg(long, value_delimiter = ',', num_args = 1.., default_values_t = [0.001, 0.01, 0.05])]
    pub amplitudes: Vec<f64>,
    /// Output directory for `sweep.csv`.
    #[arg(long)]
    pub out: PathBuf,
}

pub fn run(args: &SweepArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let config = RunConfig::load(&args.config)?;
    let provider = config.provider()?;
    let points = amplitude_sweep(
        provider.as_ref(),
        &config.cosmology,
        &config.forecast,
        &args.amplitudes,
        PhiConstants::get(),
    )?;
    for point in &points {
        info!(
            amplitude = point.amplitude,
            sigma = point.sigma_amplitude,
            snr = point.snr,
            "sweep point"
        );
    }
    write_csv(args.out.join("sweep.csv"), &points)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_table_has_one_row_per_amplitude() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = dir.path().join("run.yaml");
        fs::write(&config, "forecast:\n  n_k: 16\n").expect("config");
        run(&SweepArgs {
            config,
            amplitudes: vec![0.001, 0.01, 0.05],
            out: dir.path().to_path_buf(),
        })
        .expect("sweep");
        let table = fs::read_to_string(dir.path().join("sweep.csv")).expect("table");
        let mut lines = table.lines();
        assert_eq!(lines.next(), Some("amplitude,sigma_amplitude,snr"));
        assert_eq!(lines.count(), 3);
    }
}

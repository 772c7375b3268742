use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use phi_core::{ModulationParameters, PhiConstants};
use phi_spec::modulate_spectrum;
use tracing::info;

use crate::io::{read_spectrum_csv, write_csv, SpectrumRow};

#[derive(Args, Debug)]
pub struct ModulateArgs {
    /// Input CSV with `k,Pk[,sigma_Pk]` columns.
    #[arg(long)]
    pub input: PathBuf,
    /// Modulation amplitude `A_φ`.
    #[arg(long, default_value_t = 0.01)]
    pub amplitude: f64,
    /// Phase offset in radians.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub phase: f64,
    /// Pivot wavenumber in h/Mpc.
    #[arg(long = "k-pivot", default_value_t = 0.05)]
    pub k_pivot: f64,
    /// Output CSV path.
    #[arg(long)]
    pub out: PathBuf,
}

pub fn run(args: &ModulateArgs) -> Result<(), Box<dyn Error>> {
    let (spectrum, sigma) = read_spectrum_csv(&args.input)?;
    let params = ModulationParameters::new(args.amplitude, args.phase, args.k_pivot);
    let (modulated, factor) = modulate_spectrum(&spectrum, &params, PhiConstants::get())?;

    // errors scale with the power they describe
    let rows = modulated
        .k()
        .iter()
        .zip(modulated.pk())
        .zip(&factor)
        .enumerate()
        .map(|(idx, ((&k, &pk), &f))| SpectrumRow {
            k,
            pk,
            sigma_pk: sigma.as_ref().map(|s| s[idx] * f),
        });
    write_csv(&args.out, rows)?;
    info!(
        rows = modulated.len(),
        amplitude = args.amplitude,
        out = %args.out.display(),
        "modulated spectrum written"
    );
    Ok(())
}

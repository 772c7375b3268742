use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use phi_core::PhiConstants;
use phi_spec::bao_signature;
use serde::Serialize;
use tracing::info;

use crate::config::RunConfig;
use crate::io::write_csv;

#[derive(Args, Debug)]
pub struct BaoArgs {
    /// YAML run configuration; the `bao` block selects separations and modulation.
    #[arg(long)]
    pub config: PathBuf,
    /// Output CSV path.
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Debug, Serialize)]
struct BaoRow {
    r: f64,
    xi_base: f64,
    xi_mod: f64,
}

pub fn run(args: &BaoArgs) -> Result<(), Box<dyn Error>> {
    let config = RunConfig::load(&args.config)?;
    let provider = config.provider()?;
    let signature = bao_signature(
        provider.as_ref(),
        &config.cosmology,
        &config.bao,
        PhiConstants::get(),
    )?;
    let rows = signature
        .r
        .iter()
        .zip(&signature.xi_base)
        .zip(&signature.xi_modulated)
        .map(|((&r, &xi_base), &xi_mod)| BaoRow { r, xi_base, xi_mod });
    write_csv(&args.out, rows)?;
    info!(points = signature.r.len(), out = %args.out.display(), "bao signature written");
    Ok(())
}

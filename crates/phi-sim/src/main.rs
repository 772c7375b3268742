use std::error::Error;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::{
    bao::{self, BaoArgs},
    fit::{self, FitArgs},
    forecast::{self, ForecastArgs},
    modulate::{self, ModulateArgs},
    sweep::{self, SweepArgs},
};
use phi_core::PhiError;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod io;

#[derive(Parser, Debug)]
#[command(name = "phi-sim", about = "Golden-ratio modulation forecasting CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Forecast the modulation amplitude with the systematic error budget.
    Forecast(ForecastArgs),
    /// Repeat the forecast over a list of injected amplitudes.
    Sweep(SweepArgs),
    /// Apply the log-periodic modulation to a tabulated spectrum.
    Modulate(ModulateArgs),
    /// Fit the oscillation between a baseline and a modulated spectrum.
    Fit(FitArgs),
    /// Compare the correlation function around the BAO scale.
    Bao(BaoArgs),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(LevelFilter::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Forecast(args) => forecast::run(&args),
        Command::Sweep(args) => sweep::run(&args),
        Command::Modulate(args) => modulate::run(&args),
        Command::Fit(args) => fit::run(&args),
        Command::Bao(args) => bao::run(&args),
    };
    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(err.as_ref());
            ExitCode::FAILURE
        }
    }
}

fn report_error(err: &(dyn Error + 'static)) {
    match err.downcast_ref::<PhiError>() {
        Some(phi) => eprintln!("error[{}]: {}", phi.kind(), phi.info()),
        None => eprintln!("error: {err}"),
    }
}

pub(crate) fn write_json<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes)?;
    Ok(())
}

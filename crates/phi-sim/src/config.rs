//! YAML run configuration shared by the `forecast`, `sweep` and `bao` commands.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use phi_core::{CosmologicalParameters, PhiError, Spectrum};
use phi_spec::{
    AnalyticProvider, BaoSpec, BaselineSpectrumProvider, FallbackChain, ForecastSpec,
    SystematicConfig, TabulatedProvider,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::io::read_spectrum_csv;

/// Where the baseline spectrum comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineSource {
    #[default]
    Analytic,
    Table,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BaselineConfig {
    #[serde(default)]
    pub source: BaselineSource,
    /// CSV with `k,Pk` columns, relative to the config file.
    #[serde(default)]
    pub table: Option<PathBuf>,
    /// Answer with the analytic provider when the table cannot.
    #[serde(default)]
    pub fallback: bool,
    #[serde(default)]
    pub allow_extrapolation: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub cosmology: CosmologicalParameters,
    #[serde(default)]
    pub forecast: ForecastSpec,
    /// Statistical-only run when absent.
    #[serde(default)]
    pub systematics: Option<SystematicConfig>,
    #[serde(default)]
    pub baseline: BaselineConfig,
    #[serde(default)]
    pub bao: BaoSpec,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let contents = fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, Box<dyn Error>> {
        let config: RunConfig = serde_yaml::from_str(contents)?;
        config.cosmology.validate()?;
        Ok(config)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Builds the provider described by the `baseline` block.
    pub fn provider(&self) -> Result<Box<dyn BaselineSpectrumProvider>, Box<dyn Error>> {
        let baseline = &self.baseline;
        match baseline.source {
            BaselineSource::Analytic => Ok(Box::new(AnalyticProvider)),
            BaselineSource::Table => {
                let path = baseline.table.as_deref().ok_or_else(|| {
                    PhiError::invalid_input(
                        "missing-table",
                        "baseline.source is `table` but baseline.table is not set",
                    )
                })?;
                let path = self.resolve(path);
                let (table, _) = read_spectrum_csv(&path)?;
                info!(
                    table = %path.display(),
                    rows = table.len(),
                    fallback = baseline.fallback,
                    "loaded tabulated baseline"
                );
                Ok(table_provider(
                    path.display().to_string(),
                    table,
                    baseline.allow_extrapolation,
                    baseline.fallback,
                ))
            }
        }
    }
}

fn table_provider(
    label: String,
    table: Spectrum,
    allow_extrapolation: bool,
    fallback: bool,
) -> Box<dyn BaselineSpectrumProvider> {
    let tabulated = TabulatedProvider::new(label, table, allow_extrapolation);
    if fallback {
        Box::new(FallbackChain::new().with(tabulated).with(AnalyticProvider))
    } else {
        Box::new(tabulated)
    }
}

use std::error::Error;
use std::fs;
use std::path::Path;

use phi_core::Spectrum;
use serde::{Deserialize, Serialize};

/// One row of a `k,Pk,sigma_Pk` table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumRow {
    pub k: f64,
    #[serde(rename = "Pk")]
    pub pk: f64,
    #[serde(rename = "sigma_Pk", default)]
    pub sigma_pk: Option<f64>,
}

/// Reads a spectrum table; the error column is returned only when every row
/// carries one.
pub fn read_spectrum_csv(path: &Path) -> Result<(Spectrum, Option<Vec<f64>>), Box<dyn Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)?;
    let mut k = Vec::new();
    let mut pk = Vec::new();
    let mut sigma = Vec::new();
    for row in reader.deserialize() {
        let row: SpectrumRow = row?;
        k.push(row.k);
        pk.push(row.pk);
        sigma.push(row.sigma_pk);
    }
    let sigma: Option<Vec<f64>> = sigma.into_iter().collect();
    let spectrum = Spectrum::new(k, pk)?;
    Ok((spectrum, sigma))
}

/// Serializes rows to CSV, the header taken from the row type.
pub fn write_csv<P, T, I>(path: P, rows: I) -> Result<(), Box<dyn Error>>
where
    P: AsRef<Path>,
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

use phi_core::errors::ensure_same_len;
use phi_core::floors::LOG_RATIO_SENTINEL;
use phi_core::{ModulationParameters, PhiConstants, PhiError, Spectrum};
use tracing::warn;

/// Output of [`apply_modulation`].
#[derive(Debug, Clone, PartialEq)]
pub struct Modulated {
    /// `P(k) · factor`, elementwise.
    pub pk: Vec<f64>,
    /// `1 + A_φ cos(2π ln(k/k_pivot) / ln φ + φ₀)`.
    pub factor: Vec<f64>,
}

/// Number of wavenumbers that take the sentinel ratio: non-positive or NaN.
fn sentinel_count(k: &[f64]) -> usize {
    k.iter().filter(|&&value| !(value > 0.0)).count()
}

fn log_ratio(k: f64, k_pivot: f64) -> f64 {
    if k > 0.0 {
        (k / k_pivot).ln()
    } else {
        LOG_RATIO_SENTINEL.ln()
    }
}

/// Modulation factor at a single wavenumber.
///
/// `k <= 0` and NaN are mapped to the sentinel ratio [`LOG_RATIO_SENTINEL`]; this keeps
/// the logarithm defined for array alignment and carries no physical meaning.
pub fn modulation_factor(k: f64, params: &ModulationParameters, constants: &PhiConstants) -> f64 {
    let phase = constants.log_frequency() * log_ratio(k, params.k_pivot) + params.phase;
    1.0 + params.amplitude * phase.cos()
}

/// Applies the log-periodic golden-ratio modulation to a power spectrum.
///
/// Fails with [`PhiError::InvalidInput`] when `k` and `pk` differ in length or
/// when the pivot is not positive.
pub fn apply_modulation(
    k: &[f64],
    pk: &[f64],
    params: &ModulationParameters,
    constants: &PhiConstants,
) -> Result<Modulated, PhiError> {
    ensure_same_len("modulation-shape", "k", k.len(), "pk", pk.len())?;
    params.validate()?;

    let invalid = sentinel_count(k);
    if invalid > 0 {
        warn!(
            invalid,
            sentinel = LOG_RATIO_SENTINEL,
            "non-positive or NaN wavenumbers mapped to sentinel log ratio"
        );
    }

    let factor: Vec<f64> = k
        .iter()
        .map(|&value| modulation_factor(value, params, constants))
        .collect();
    let modulated = pk.iter().zip(&factor).map(|(p, f)| p * f).collect();
    Ok(Modulated {
        pk: modulated,
        factor,
    })
}

/// Applies the modulation to a validated spectrum, returning a new spectrum on
/// the same grid together with the modulation factor.
pub fn modulate_spectrum(
    spectrum: &Spectrum,
    params: &ModulationParameters,
    constants: &PhiConstants,
) -> Result<(Spectrum, Vec<f64>), PhiError> {
    let Modulated { pk, factor } = apply_modulation(spectrum.k(), spectrum.pk(), params, constants)?;
    Ok((spectrum.with_power(pk)?, factor))
}

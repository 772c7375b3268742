//! Recovery of a log-periodic oscillation from spectrum residuals.
//!
//! The model `r(k) = c + a cos(ωx) + b sin(ωx)` with `x = ln(k / k_pivot)` and
//! `ω = 2π / ln φ` is linear in `(c, a, b)`, so it is solved exactly by
//! weighted least squares; amplitude and phase follow from
//! `A = √(a² + b²)`, `φ₀ = atan2(-b, a)`.

use nalgebra::{Matrix3, Vector3};
use phi_core::errors::{ensure_same_len, ErrorInfo, PhiError};
use phi_core::floors::VARIANCE_FLOOR;
use phi_core::{ModulationParameters, PhiConstants};
use serde::{Deserialize, Serialize};

const MIN_POINTS: usize = 4;

/// Best-fit log-periodic oscillation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillationFit {
    /// Pivot the phase is referred to, in h/Mpc.
    pub k_pivot: f64,
    /// Recovered amplitude `A_φ`.
    pub amplitude: f64,
    /// Recovered phase `φ₀` in `(-π, π]`.
    pub phase: f64,
    /// Constant offset of the residuals.
    pub offset: f64,
    /// One-sigma amplitude error.
    pub amplitude_error: f64,
    /// One-sigma phase error.
    pub phase_error: f64,
    /// One-sigma offset error.
    pub offset_error: f64,
    /// Weighted sum of squared residuals.
    pub chi2: f64,
    /// Degrees of freedom, `n - 3`.
    pub dof: usize,
    /// `amplitude / amplitude_error`.
    pub significance: f64,
}

impl OscillationFit {
    /// Modulation parameters corresponding to the fit.
    pub fn modulation(&self) -> ModulationParameters {
        ModulationParameters::new(self.amplitude, self.phase, self.k_pivot)
    }
}

/// Fractional residual `P_mod / P_base - 1` of two spectra on one grid.
pub fn extract_modulation(pk_base: &[f64], pk_modulated: &[f64]) -> Result<Vec<f64>, PhiError> {
    ensure_same_len(
        "residual-shape",
        "pk_base",
        pk_base.len(),
        "pk_modulated",
        pk_modulated.len(),
    )?;
    if let Some(idx) = pk_base.iter().position(|&p| p == 0.0) {
        return Err(PhiError::InvalidInput(
            ErrorInfo::new("zero-baseline", "baseline power must be non-zero")
                .with_context("index", idx),
        ));
    }
    Ok(pk_base
        .iter()
        .zip(pk_modulated)
        .map(|(base, modulated)| modulated / base - 1.0)
        .collect())
}

/// Fits the golden-ratio oscillation to `residual(k)`.
///
/// With `sigma` the errors are absolute; without it the parameter covariance
/// is rescaled by the reduced χ².
pub fn fit_log_periodic(
    k: &[f64],
    residual: &[f64],
    sigma: Option<&[f64]>,
    k_pivot: f64,
    constants: &PhiConstants,
) -> Result<OscillationFit, PhiError> {
    ensure_same_len("fit-shape", "k", k.len(), "residual", residual.len())?;
    if let Some(sigma) = sigma {
        ensure_same_len("fit-shape", "k", k.len(), "sigma", sigma.len())?;
        if let Some(idx) = sigma.iter().position(|&s| !(s.is_finite() && s > 0.0)) {
            return Err(PhiError::InvalidInput(
                ErrorInfo::new("invalid-sigma", "fit errors must be positive")
                    .with_context("index", idx)
                    .with_context("sigma", sigma[idx]),
            ));
        }
    }
    if k.len() < MIN_POINTS {
        return Err(PhiError::InvalidInput(
            ErrorInfo::new("too-few-points", "oscillation fit needs four or more points")
                .with_context("len", k.len()),
        ));
    }
    ModulationParameters::new(0.0, 0.0, k_pivot).validate()?;
    if let Some(idx) = k.iter().position(|&v| !(v.is_finite() && v > 0.0)) {
        return Err(PhiError::InvalidInput(
            ErrorInfo::new("non-positive-k", "fit wavenumbers must be positive")
                .with_context("index", idx)
                .with_context("k", k[idx]),
        ));
    }

    let omega = constants.log_frequency();
    let basis = |kv: f64| {
        let x = omega * (kv / k_pivot).ln();
        Vector3::new(1.0, x.cos(), x.sin())
    };
    let weight = |idx: usize| sigma.map(|s| 1.0 / (s[idx] * s[idx])).unwrap_or(1.0);

    let mut normal = Matrix3::<f64>::zeros();
    let mut rhs = Vector3::<f64>::zeros();
    for (idx, (&kv, &r)) in k.iter().zip(residual).enumerate() {
        let row = basis(kv);
        let w = weight(idx);
        normal += w * row * row.transpose();
        rhs += w * r * row;
    }
    let inverse = normal.try_inverse().ok_or_else(|| {
        PhiError::InvalidRange(
            ErrorInfo::new(
                "singular-fit",
                "k-grid does not sample the oscillation phase",
            )
            .with_context("len", k.len())
            .with_context("k_pivot", k_pivot),
        )
    })?;
    let coeffs = inverse * rhs;

    let chi2: f64 = k
        .iter()
        .zip(residual)
        .enumerate()
        .map(|(idx, (&kv, &r))| {
            let delta = r - coeffs.dot(&basis(kv));
            weight(idx) * delta * delta
        })
        .sum();
    let dof = k.len() - 3;
    let covariance = match sigma {
        Some(_) => inverse,
        None => inverse * (chi2 / dof as f64),
    };

    let (offset, a, b) = (coeffs[0], coeffs[1], coeffs[2]);
    let (var_a, var_b, cov_ab) = (covariance[(1, 1)], covariance[(2, 2)], covariance[(1, 2)]);
    let amplitude = a.hypot(b);
    let phase = (-b).atan2(a);
    let (amplitude_error, phase_error) = if amplitude > 0.0 {
        let a2 = amplitude * amplitude;
        let var_amp = (a * a * var_a + b * b * var_b + 2.0 * a * b * cov_ab) / a2;
        let var_phase = (b * b * var_a + a * a * var_b - 2.0 * a * b * cov_ab) / (a2 * a2);
        (var_amp.max(0.0).sqrt(), var_phase.max(0.0).sqrt())
    } else {
        (((var_a + var_b) / 2.0).max(0.0).sqrt(), std::f64::consts::PI)
    };

    Ok(OscillationFit {
        k_pivot,
        amplitude,
        phase,
        offset,
        amplitude_error,
        phase_error,
        offset_error: covariance[(0, 0)].max(0.0).sqrt(),
        chi2,
        dof,
        significance: amplitude / (amplitude_error + VARIANCE_FLOOR),
    })
}

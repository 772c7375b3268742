//! Numerical floors used to stabilise near-zero denominators.
//!
//! These are numerical stabilisation policies, not physical statements. A
//! floor that engages silently can mask a genuinely degenerate configuration,
//! so call sites emit a `tracing` warning when the guarded quantity is exactly
//! degenerate.

/// Ratio substituted for `k / k_pivot` when `k <= 0` or NaN, so the logarithm stays
/// defined. Such entries are invalid input kept only for array alignment.
pub const LOG_RATIO_SENTINEL: f64 = 1e-10;

/// Added to per-bin mode counts before dividing.
pub const MODE_COUNT_FLOOR: f64 = 1e-10;

/// Added to the true modulation amplitude when forming `dP/dA_φ`.
pub const AMPLITUDE_FLOOR: f64 = 1e-10;

/// Added to variances and Fisher sums before dividing or taking `1/√F`.
pub const VARIANCE_FLOOR: f64 = 1e-20;

/// Added to the grand total error when forming the systematic fraction.
pub const FRACTION_FLOOR: f64 = 1e-20;

/// Added to `k·r` in the spherical Bessel kernel `sin(kr)/kr`.
pub const SEPARATION_FLOOR: f64 = 1e-10;

/// Smallest galaxy number density used when forming the shot-noise term.
pub const DENSITY_FLOOR: f64 = 1e-20;

/// Added to the cube root of the survey volume in the geometry model.
pub const VOLUME_FLOOR: f64 = 1e-10;

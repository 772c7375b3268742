use phi_core::errors::{ensure_same_len, ErrorInfo, PhiError};

fn range_error(code: &str, message: &str, min: f64, max: f64, points: usize) -> PhiError {
    PhiError::InvalidRange(
        ErrorInfo::new(code, message)
            .with_context("k_min", min)
            .with_context("k_max", max)
            .with_context("n_points", points),
    )
}

/// Checks a logarithmic `(min, max, n)` grid request.
pub fn validate_log_range(min: f64, max: f64, points: usize) -> Result<(), PhiError> {
    if !(min.is_finite() && max.is_finite()) {
        return Err(range_error(
            "non-finite-range",
            "range bounds must be finite",
            min,
            max,
            points,
        ));
    }
    if min >= max {
        return Err(range_error(
            "inverted-range",
            "k_min must be smaller than k_max",
            min,
            max,
            points,
        ));
    }
    if min <= 0.0 {
        return Err(range_error(
            "non-positive-range",
            "logarithmic grids require k_min > 0",
            min,
            max,
            points,
        ));
    }
    if points < 2 {
        return Err(range_error(
            "too-few-points",
            "grids require at least two points",
            min,
            max,
            points,
        ));
    }
    Ok(())
}

/// Logarithmically spaced grid of `points` values in `[min, max]`.
///
/// Both endpoints are reproduced exactly.
pub fn logspace(min: f64, max: f64, points: usize) -> Result<Vec<f64>, PhiError> {
    validate_log_range(min, max, points)?;
    let log_min = min.log10();
    let step = (max.log10() - log_min) / (points - 1) as f64;
    let mut grid: Vec<f64> = (0..points)
        .map(|idx| 10f64.powf(log_min + step * idx as f64))
        .collect();
    grid[0] = min;
    grid[points - 1] = max;
    Ok(grid)
}

/// Linearly spaced grid of `points` values in `[min, max]`.
pub fn linspace(min: f64, max: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (points - 1) as f64;
            (0..points).map(|idx| min + step * idx as f64).collect()
        }
    }
}

/// Piecewise-linear interpolation of `(xs, ys)` at `targets`.
///
/// `xs` must be strictly increasing with at least two entries. Targets outside
/// the table are extrapolated from the outermost segment instead of failing.
pub fn interp_linear(xs: &[f64], ys: &[f64], targets: &[f64]) -> Result<Vec<f64>, PhiError> {
    ensure_same_len("interp-shape", "xs", xs.len(), "ys", ys.len())?;
    if xs.len() < 2 {
        return Err(PhiError::InvalidInput(
            ErrorInfo::new("interp-too-short", "interpolation needs two or more nodes")
                .with_context("len", xs.len()),
        ));
    }
    let last = xs.len() - 2;
    let values = targets
        .iter()
        .map(|&x| {
            let segment = match xs.partition_point(|&node| node <= x) {
                0 => 0,
                idx => (idx - 1).min(last),
            };
            let (x0, x1) = (xs[segment], xs[segment + 1]);
            let (y0, y1) = (ys[segment], ys[segment + 1]);
            y0 + (y1 - y0) * (x - x0) / (x1 - x0)
        })
        .collect();
    Ok(values)
}

/// Trapezoid-rule integral of `ys` over the abscissae `xs`.
pub fn trapezoid(xs: &[f64], ys: &[f64]) -> f64 {
    xs.windows(2)
        .zip(ys.windows(2))
        .map(|(x, y)| 0.5 * (x[1] - x[0]) * (y[0] + y[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logspace_hits_endpoints() {
        let grid = logspace(0.01, 0.3, 50).unwrap();
        assert_eq!(grid.len(), 50);
        assert_eq!(grid[0], 0.01);
        assert_eq!(grid[49], 0.3);
        let ratio = grid[1] / grid[0];
        assert!((grid[25] / grid[24] - ratio).abs() < 1e-12);
    }

    #[test]
    fn logspace_rejects_bad_ranges() {
        assert!(matches!(logspace(0.3, 0.01, 10), Err(PhiError::InvalidRange(_))));
        assert!(matches!(logspace(0.01, 0.3, 1), Err(PhiError::InvalidRange(_))));
        assert!(matches!(logspace(0.0, 0.3, 10), Err(PhiError::InvalidRange(_))));
    }

    #[test]
    fn interpolation_extrapolates_edges() {
        let xs = [1.0, 2.0, 3.0];
        let ys = [10.0, 20.0, 40.0];
        let out = interp_linear(&xs, &ys, &[0.5, 1.5, 2.0, 3.5]).unwrap();
        assert_eq!(out, vec![5.0, 15.0, 20.0, 50.0]);
    }

    #[test]
    fn trapezoid_integrates_linear_exactly() {
        let xs = linspace(0.0, 2.0, 5);
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 * x).collect();
        assert!((trapezoid(&xs, &ys) - 6.0).abs() < 1e-12);
    }
}

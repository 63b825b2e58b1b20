// src/processing/filters/savgol.rs
//! Savitzky-Golay polynomial smoothing

use crate::error::{TgError, TgResult};

/// Least-squares smoothing weights for the centre sample of a `window`-point fit
pub fn savgol_coefficients(window: usize, polynomial_order: usize) -> TgResult<Vec<f64>> {
    validate(window, polynomial_order)?;

    let half = (window / 2) as f64;
    let positions: Vec<f64> = (0..window).map(|i| i as f64 - half).collect();

    // Normal equations (A^T A) u = e0, weights c_j = sum_k u_k t_j^k
    let normal = normal_matrix(&positions, polynomial_order);
    let mut e0 = vec![0.0; polynomial_order + 1];
    e0[0] = 1.0;
    let u = solve(normal, e0)?;

    Ok(positions
        .iter()
        .map(|&t| u.iter().rev().fold(0.0, |acc, &uk| acc * t + uk))
        .collect())
}

/// Savitzky-Golay smoothing with polynomial interpolation at the edges.
///
/// Returns the input unchanged when it is not longer than the window.
pub fn savgol_smooth(x: &[f64], window: usize, polynomial_order: usize) -> TgResult<Vec<f64>> {
    validate(window, polynomial_order)?;
    let n = x.len();
    if n <= window {
        return Ok(x.to_vec());
    }

    let coeffs = savgol_coefficients(window, polynomial_order)?;
    let half = window / 2;
    let mut y = vec![0.0; n];

    for i in half..n - half {
        y[i] = coeffs
            .iter()
            .zip(&x[i - half..=i + half])
            .map(|(c, v)| c * v)
            .sum();
    }

    // Edges: evaluate one polynomial fitted to the first / last window
    let positions: Vec<f64> = (0..window).map(|i| i as f64 - half as f64).collect();
    let head = polyfit(&positions, &x[..window], polynomial_order)?;
    for (i, out) in y.iter_mut().enumerate().take(half) {
        *out = polyval(&head, positions[i]);
    }
    let tail = polyfit(&positions, &x[n - window..], polynomial_order)?;
    for i in 0..half {
        y[n - half + i] = polyval(&tail, positions[window - half + i]);
    }

    Ok(y)
}

fn validate(window: usize, polynomial_order: usize) -> TgResult<()> {
    if window < 3 || window % 2 == 0 {
        return Err(TgError::configuration("smoothing", "window must be odd and at least 3"));
    }
    if polynomial_order >= window {
        return Err(TgError::configuration(
            "smoothing",
            "polynomial order must be below the window length",
        ));
    }
    Ok(())
}

fn normal_matrix(positions: &[f64], order: usize) -> Vec<Vec<f64>> {
    let mut m = vec![vec![0.0; order + 1]; order + 1];
    for &t in positions {
        let powers: Vec<f64> = (0..=2 * order).map(|k| t.powi(k as i32)).collect();
        for (r, row) in m.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell += powers[r + c];
            }
        }
    }
    m
}

/// Polynomial coefficients, lowest degree first
fn polyfit(positions: &[f64], values: &[f64], order: usize) -> TgResult<Vec<f64>> {
    let normal = normal_matrix(positions, order);
    let rhs = (0..=order)
        .map(|k| {
            positions
                .iter()
                .zip(values)
                .map(|(t, v)| t.powi(k as i32) * v)
                .sum()
        })
        .collect();
    solve(normal, rhs)
}

fn polyval(coeffs: &[f64], t: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * t + c)
}

/// Gaussian elimination with partial pivoting
fn solve(mut m: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> TgResult<Vec<f64>> {
    let n = rhs.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))
            .unwrap_or(col);
        if m[pivot][col].abs() < 1e-12 {
            return Err(TgError::configuration("smoothing", "singular least-squares system"));
        }
        m.swap(col, pivot);
        rhs.swap(col, pivot);

        for row in col + 1..n {
            let factor = m[row][col] / m[col][col];
            for k in col..n {
                m[row][k] -= factor * m[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| m[row][k] * solution[k]).sum();
        solution[row] = (rhs[row] - tail) / m[row][row];
    }
    Ok(solution)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_coefficients() {
        // Classic 5-point quadratic weights: (-3, 12, 17, 12, -3) / 35
        let coeffs = savgol_coefficients(5, 2).unwrap();
        let expected = [-3.0, 12.0, 17.0, 12.0, -3.0].map(|v| v / 35.0);
        for (c, e) in coeffs.iter().zip(expected) {
            assert!((c - e).abs() < 1e-12);
        }
        assert!((coeffs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_polynomial_preserved() {
        // A cubic is reproduced exactly by a cubic fit, edges included
        let x: Vec<f64> = (0..60)
            .map(|i| {
                let t = i as f64 * 0.1;
                0.5 * t * t * t - 2.0 * t + 1.0
            })
            .collect();
        let y = savgol_smooth(&x, 21, 3).unwrap();
        for (a, b) in x.iter().zip(&y) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_short_input_unchanged() {
        let x = vec![1.0, -1.0, 1.0];
        assert_eq!(savgol_smooth(&x, 21, 3).unwrap(), x);
        let exact: Vec<f64> = (0..21).map(|v| v as f64).collect();
        assert_eq!(savgol_smooth(&exact, 21, 3).unwrap(), exact);
    }

    #[test]
    fn test_noise_reduced() {
        let x: Vec<f64> = (0..200).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let y = savgol_smooth(&x, 21, 3).unwrap();
        let energy: f64 = y[20..180].iter().map(|v| v * v).sum::<f64>() / 160.0;
        assert!(energy < 0.05);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(savgol_coefficients(4, 2).is_err());
        assert!(savgol_coefficients(5, 5).is_err());
        assert!(savgol_smooth(&[0.0; 50], 1, 0).is_err());
    }
}

//! Savitzky–Golay smoothing.
//!
//! Each output point is the value, at that point, of a degree-`order`
//! polynomial least-squares fitted to the `window` samples around it.
//!
//! With `A` the Vandermonde matrix of the window offsets, the fitted values of
//! a window are `H y` where `H = A A⁺` (the hat matrix). So:
//!
//! - interior points use the middle row of `H` as convolution weights
//! - the first/last `window / 2` points use the leading/trailing rows of `H`
//!   applied to the first/last full window (polynomial edge fit), which keeps
//!   the output the same length as the input without padding artifacts

use nalgebra::DMatrix;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct SavitzkyGolay {
    window: usize,
    order: usize,
    /// `window × window` hat matrix.
    hat: DMatrix<f64>,
}

impl SavitzkyGolay {
    pub fn new(window: usize, order: usize) -> Result<Self, AppError> {
        if window % 2 == 0 || window < 3 {
            return Err(AppError::input(format!(
                "Savitzky-Golay window must be odd and >= 3 (got {window})."
            )));
        }
        if order >= window {
            return Err(AppError::input(format!(
                "Savitzky-Golay order must be less than the window (order={order}, window={window})."
            )));
        }

        let half = (window / 2) as f64;
        let vander = DMatrix::from_fn(window, order + 1, |i, j| (i as f64 - half).powi(j as i32));
        let pinv = vander
            .clone()
            .pseudo_inverse(1e-12)
            .map_err(|e| AppError::runtime(format!("Savitzky-Golay pseudo-inverse failed: {e}")))?;
        let hat = &vander * pinv;

        Ok(Self { window, order, hat })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Convolution weights for the centre of the window.
    pub fn coefficients(&self) -> Vec<f64> {
        let mid = self.window / 2;
        self.hat.row(mid).iter().copied().collect()
    }

    /// Smooth `data`. Series shorter than the window are returned unchanged.
    pub fn apply(&self, data: &[f64]) -> Vec<f64> {
        let n = data.len();
        let w = self.window;
        if n < w {
            return data.to_vec();
        }
        let half = w / 2;
        let mut out = vec![0.0; n];

        for (i, slot) in out.iter_mut().enumerate().take(n - half).skip(half) {
            *slot = self.fitted(w / 2, &data[i - half..i + half + 1]);
        }

        let head = &data[..w];
        for (i, slot) in out.iter_mut().enumerate().take(half) {
            *slot = self.fitted(i, head);
        }
        let tail = &data[n - w..];
        for k in (half + 1)..w {
            out[n - w + k] = self.fitted(k, tail);
        }

        out
    }

    fn fitted(&self, row: usize, window: &[f64]) -> f64 {
        self.hat
            .row(row)
            .iter()
            .zip(window.iter())
            .map(|(h, y)| h * y)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_even_window_and_high_order() {
        assert!(SavitzkyGolay::new(6, 3).is_err());
        assert!(SavitzkyGolay::new(5, 5).is_err());
    }

    #[test]
    fn centre_coefficients_match_tabulated_values() {
        // Window 7, order 2/3: (-2, 3, 6, 7, 6, 3, -2) / 21.
        let sg = SavitzkyGolay::new(7, 3).unwrap();
        let expected = [-2.0, 3.0, 6.0, 7.0, 6.0, 3.0, -2.0].map(|v| v / 21.0);
        for (c, e) in sg.coefficients().iter().zip(expected.iter()) {
            assert!((c - e).abs() < 1e-12, "coefficient {c} != {e}");
        }
    }

    #[test]
    fn cubic_is_reproduced_including_edges() {
        let sg = SavitzkyGolay::new(7, 3).unwrap();
        let data: Vec<f64> = (0..20)
            .map(|x| {
                let x = x as f64;
                0.5 * x * x * x - 2.0 * x * x + x + 3.0
            })
            .collect();
        let out = sg.apply(&data);
        for (o, d) in out.iter().zip(data.iter()) {
            assert!((o - d).abs() < 1e-7 * d.abs().max(1.0), "{o} != {d}");
        }
    }

    #[test]
    fn short_series_is_unchanged() {
        let sg = SavitzkyGolay::new(7, 3).unwrap();
        let data = vec![1.0, 5.0, 2.0];
        assert_eq!(sg.apply(&data), data);
    }

    #[test]
    fn smoothing_reduces_alternating_noise() {
        let sg = SavitzkyGolay::new(7, 3).unwrap();
        let data: Vec<f64> = (0..30)
            .map(|i| 10.0 + if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let out = sg.apply(&data);
        let rough = |v: &[f64]| v.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f64>();
        assert!(rough(&out[3..27]) < rough(&data[3..27]));
    }
}

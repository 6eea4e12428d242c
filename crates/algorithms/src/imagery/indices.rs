//! Spectral indices
//!
//! NDVI is the normalized difference of the NIR and red bands. Inputs are
//! single-band rasters; masked cells (NaN) in either input stay masked in
//! the output.

use crate::maybe_rayon::*;
use fieldcheck_core::raster::Raster;
use fieldcheck_core::{Error, Result};
use ndarray::Array2;

// ---------------------------------------------------------------------------
// Generic normalized difference
// ---------------------------------------------------------------------------

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in the range [-1, 1]. Pixels where both bands sum to zero
/// or either is masked are set to NaN.
///
/// # Arguments
/// * `band_a` - Numerator positive band
/// * `band_b` - Numerator negative band
pub fn normalized_difference(band_a: &Raster, band_b: &Raster) -> Result<Raster> {
    band_a.check_same_shape(band_b)?;

    let (rows, cols) = band_a.shape();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };

                if a.is_nan() || b.is_nan() {
                    continue;
                }

                let sum = a + b;
                if sum.abs() < 1e-10 {
                    continue; // Avoid division by zero
                }

                row_data[col] = (a - b) / sum;
            }
            row_data
        })
        .collect();

    build_output(band_a, rows, cols, data)
}

pub(crate) fn build_output(
    template: &Raster,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
) -> Result<Raster> {
    let mut output = template.like(f64::NAN);
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use fieldcheck_core::GeoTransform;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster {
        Raster::filled(rows, cols, value)
            .with_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0))
    }

    fn make_gradient(rows: usize, cols: usize, start: f64, step: f64) -> Raster {
        let mut r = make_band(rows, cols, 0.0);
        for row in 0..rows {
            for col in 0..cols {
                r.set(row, col, start + (row * cols + col) as f64 * step)
                    .unwrap();
            }
        }
        r
    }

    #[test]
    fn test_normalized_difference_basic() {
        let a = make_band(5, 5, 0.8);
        let b = make_band(5, 5, 0.2);

        let result = normalized_difference(&a, &b).unwrap();
        let val = result.get(2, 2).unwrap();

        // (0.8 - 0.2) / (0.8 + 0.2) = 0.6
        assert!((val - 0.6).abs() < 1e-10, "Expected 0.6, got {}", val);
    }

    #[test]
    fn test_normalized_difference_range() {
        let a = make_gradient(10, 10, 0.1, 0.01);
        let b = make_gradient(10, 10, 0.5, -0.005);

        let result = normalized_difference(&a, &b).unwrap();

        for &val in result.data().iter().filter(|v| !v.is_nan()) {
            assert!((-1.0..=1.0).contains(&val), "ND out of range: {}", val);
        }
    }

    #[test]
    fn test_masked_and_zero_sum_cells() {
        let mut nir = make_band(3, 3, 0.5);
        let mut red = make_band(3, 3, 0.1);
        nir.set(0, 0, f64::NAN).unwrap();
        nir.set(1, 1, 0.0).unwrap();
        red.set(1, 1, 0.0).unwrap();

        let result = normalized_difference(&nir, &red).unwrap();
        assert!(result.get(0, 0).unwrap().is_nan());
        assert!(result.get(1, 1).unwrap().is_nan());
        assert!(!result.get(2, 2).unwrap().is_nan());
        assert_eq!(result.transform(), nir.transform());
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = make_band(5, 5, 0.8);
        let b = make_band(4, 5, 0.2);
        assert!(matches!(
            normalized_difference(&a, &b),
            Err(Error::SizeMismatch { .. })
        ));
    }
}

//! Quality-band masking
//!
//! Builds clear-sky masks from bit-packed quality bands and applies masks
//! to index rasters. A mask cell of `0` (or NaN) hides the pixel; any other
//! value keeps it.

use super::indices::build_output;
use crate::maybe_rayon::*;
use fieldcheck_core::raster::Raster;
use fieldcheck_core::{Error, Result};

/// Mask that keeps a pixel only if every listed bit of the quality value is unset.
///
/// Output cells are `1.0` (clear), `0.0` (flagged) or NaN where the quality
/// band itself is masked or holds something other than a non-negative
/// integer below 2^32. For Sentinel-2 `QA60`, bit 10 flags opaque clouds
/// and bit 11 flags cirrus.
pub fn bits_clear(quality: &Raster, bits: &[u8]) -> Result<Raster> {
    if let Some(&bit) = bits.iter().find(|&&b| b >= 32) {
        return Err(Error::InvalidParameter {
            name: "bits",
            value: bit.to_string(),
            reason: "quality bits must be below 32".into(),
        });
    }
    let flags = bits.iter().fold(0u32, |acc, &b| acc | (1 << b));

    let (rows, cols) = quality.shape();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let q = unsafe { quality.get_unchecked(row, col) };
                if !is_bit_field(q) {
                    continue;
                }
                row_data[col] = if (q as u32) & flags == 0 { 1.0 } else { 0.0 };
            }
            row_data
        })
        .collect();

    build_output(quality, rows, cols, data)
}

fn is_bit_field(q: f64) -> bool {
    (0.0..=u32::MAX as f64).contains(&q) && q.fract() == 0.0
}

/// Hide every pixel of `image` where `mask` is zero or masked.
pub fn update_mask(image: &Raster, mask: &Raster) -> Result<Raster> {
    image.check_same_shape(mask)?;

    let (rows, cols) = image.shape();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for col in 0..cols {
                let m = unsafe { mask.get_unchecked(row, col) };
                if m.is_nan() || m == 0.0 {
                    continue;
                }
                row_data[col] = unsafe { image.get_unchecked(row, col) };
            }
            row_data
        })
        .collect();

    build_output(image, rows, cols, data)
}

//! Main Raster type

use crate::error::{Error, Result};
use crate::raster::GeoTransform;
use ndarray::Array2;

/// A georeferenced 2D grid of `f64` cells.
///
/// Masked or missing cells are stored as NaN; every consumer treats NaN as
/// "no valid pixel" rather than as a number.
///
/// # Example
///
/// ```ignore
/// use fieldcheck_core::Raster;
///
/// let mut raster = Raster::filled(100, 100, 0.0);
/// raster.set(10, 20, 42.0)?;
/// let value = raster.get(10, 20)?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster {
    /// Raster data stored in row-major order (row, col)
    data: Array2<f64>,
    /// Affine transformation
    transform: GeoTransform,
}

impl Raster {
    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
            transform: GeoTransform::default(),
        }
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<f64>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let data = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            data,
            transform: GeoTransform::default(),
        })
    }

    /// Create a raster from nested rows; all rows must have the same length
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows.len(),
            });
        }
        Self::from_vec(rows.concat(), rows.len(), cols)
    }

    /// Create a raster with the same dimensions and transform, filled with a value
    pub fn like(&self, fill_value: f64) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
        }
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> f64 {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Sample the cell containing map coordinate `(x, y)`.
    ///
    /// Returns `None` outside the raster extent or on a masked cell.
    pub fn sample(&self, x: f64, y: f64) -> Option<f64> {
        let (col, row) = self.transform.geo_to_pixel(x, y);
        if !(col >= 0.0 && row >= 0.0) {
            return None;
        }
        let value = self.data.get((row.floor() as usize, col.floor() as usize))?;
        (!value.is_nan()).then_some(*value)
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<f64> {
        &mut self.data
    }

    // Metadata

    /// Get the geotransform
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Replace the geotransform
    pub fn with_transform(mut self, transform: GeoTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Map bounds (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.transform.bounds(self.cols(), self.rows())
    }

    /// Whether two rasters share dimensions, otherwise a [`Error::SizeMismatch`]
    pub fn check_same_shape(&self, other: &Raster) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(Error::SizeMismatch {
                er: self.rows(),
                ec: self.cols(),
                ar: other.rows(),
                ac: other.cols(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster = Raster::filled(100, 200, 0.0);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_raster_access() {
        let mut raster = Raster::filled(10, 10, 0.0);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.set(10, 0, 1.0).is_err());
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            Raster::from_rows(&rows),
            Err(Error::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_sample_map_coordinates() {
        let raster = Raster::from_rows(&[vec![1.0, 2.0], vec![3.0, f64::NAN]])
            .unwrap()
            .with_transform(GeoTransform::new(0.0, 20.0, 10.0, -10.0));

        assert_eq!(raster.sample(5.0, 15.0), Some(1.0));
        assert_eq!(raster.sample(15.0, 15.0), Some(2.0));
        assert_eq!(raster.sample(5.0, 5.0), Some(3.0));
        assert_eq!(raster.sample(15.0, 5.0), None);
        assert_eq!(raster.sample(-1.0, 5.0), None);
        assert_eq!(raster.sample(25.0, 5.0), None);
    }
}

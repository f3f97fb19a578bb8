//! Two-dimensional `f64` pixel grid addressed by `(x, y)`.

use ndarray::Array2;

use crate::error::{BinError, Result};

#[derive(Clone, PartialEq, Debug)]
pub struct Raster {
    data: Array2<f64>,
}

impl Raster {
    /// Zero-filled raster.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0.0)
    }

    pub fn filled(width: usize, height: usize, value: f64) -> Self {
        Raster {
            data: Array2::from_elem((height, width), value),
        }
    }

    /// Build from row-major pixels (`y` outer, `x` inner).
    pub fn from_vec(width: usize, height: usize, pixels: Vec<f64>) -> Result<Self> {
        let found = pixels.len();
        let data = Array2::from_shape_vec((height, width), pixels).map_err(|_| {
            BinError::InvalidArguments(format!(
                "{} pixels cannot fill a {}x{} raster",
                found, width, height
            ))
        })?;
        Ok(Raster { data })
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    pub fn same_shape(&self, other: &Raster) -> bool {
        self.dims() == other.dims()
    }

    /// Panics when `(x, y)` lies outside the raster.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[[y, x]]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f64) {
        self.data[[y, x]] = value;
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Change dimensions; every pixel is reset to `value`.
    pub fn resize(&mut self, width: usize, height: usize, value: f64) {
        self.data = Array2::from_elem((height, width), value);
    }

    /// Row-major view, `None` only if the backing array is not contiguous.
    pub fn as_slice(&self) -> Option<&[f64]> {
        self.data.as_slice()
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.data.iter().copied().collect()
    }
}

use crate::error::{BinError, Result};
use crate::raster::Raster;
use crate::types::{PixelSet, PositionCards};

use super::{guard_fraction, ErrorMode, SignificanceModel, ValueSpec};

/// Poisson counts from one image with a constant per-pixel background.
#[derive(Clone, Debug)]
pub struct CountModel {
    image: Raster,
    background: f64,
    position: PositionCards,
}

impl CountModel {
    pub fn new(image: Raster, background: f64) -> Self {
        CountModel {
            image,
            background,
            position: PositionCards::default(),
        }
    }

    pub fn with_position(mut self, position: PositionCards) -> Self {
        self.position = position;
        self
    }

    pub fn background(&self) -> f64 {
        self.background
    }

    pub fn image(&self) -> &Raster {
        &self.image
    }

    fn total(&self, pixels: &PixelSet) -> f64 {
        pixels.iter().map(|p| self.image.get(p.x, p.y)).sum()
    }
}

impl SignificanceModel for CountModel {
    fn value(&self, pixels: &PixelSet) -> f64 {
        debug_assert!(!pixels.is_empty());
        self.total(pixels) / pixels.len() as f64 - self.background
    }

    /// sqrt(total + bg) / (total - bg), with bg summed over the set.
    fn frac_error(&self, pixels: &PixelSet, _mode: ErrorMode) -> f64 {
        debug_assert!(!pixels.is_empty());
        let total = self.total(pixels);
        let bg = pixels.len() as f64 * self.background;
        guard_fraction((total + bg).sqrt(), total - bg)
    }

    fn select_value(&mut self, spec: ValueSpec) -> Result<()> {
        match spec {
            ValueSpec::Count(0) => Ok(()),
            other => Err(BinError::InvalidValueSelection(other.to_string())),
        }
    }

    fn value_spec(&self) -> ValueSpec {
        ValueSpec::Count(0)
    }

    fn width(&self) -> usize {
        self.image.width()
    }

    fn height(&self) -> usize {
        self.image.height()
    }

    fn position(&self) -> &PositionCards {
        &self.position
    }
}

use crate::error::{BinError, Result};
use crate::raster::Raster;
use crate::types::{PixelSet, PositionCards};

use super::{guard_fraction, ErrorMode, SignificanceModel, ValueSpec};

/// Data image with a caller-supplied per-pixel error image.
#[derive(Clone, Debug)]
pub struct ExternalModel {
    data: Raster,
    error: Raster,
    absolute: bool,
    position: PositionCards,
}

impl ExternalModel {
    /// Errors are taken as relative until `external_abs(0)` is selected.
    pub fn new(data: Raster, error: Raster) -> Result<Self> {
        if !data.same_shape(&error) {
            return Err(BinError::DimensionMismatch {
                what: "error image",
                expected: data.dims(),
                found: error.dims(),
            });
        }
        Ok(ExternalModel {
            data,
            error,
            absolute: false,
            position: PositionCards::default(),
        })
    }

    pub fn with_position(mut self, position: PositionCards) -> Self {
        self.position = position;
        self
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }
}

impl SignificanceModel for ExternalModel {
    fn value(&self, pixels: &PixelSet) -> f64 {
        debug_assert!(!pixels.is_empty());
        let total: f64 = pixels.iter().map(|p| self.data.get(p.x, p.y)).sum();
        total / pixels.len() as f64
    }

    fn frac_error(&self, pixels: &PixelSet, _mode: ErrorMode) -> f64 {
        debug_assert!(!pixels.is_empty());
        let n = pixels.len() as f64;
        let (total, err_sq) = pixels.iter().fold((0.0, 0.0), |(t, e2), p| {
            let e = self.error.get(p.x, p.y);
            (t + self.data.get(p.x, p.y), e2 + e * e)
        });

        let error_on_mean = err_sq.sqrt() / n;
        if self.absolute {
            guard_fraction(error_on_mean, (total / n).abs())
        } else {
            guard_fraction(error_on_mean, 1.0)
        }
    }

    fn select_value(&mut self, spec: ValueSpec) -> Result<()> {
        match spec {
            ValueSpec::External { absolute } => {
                self.absolute = absolute;
                Ok(())
            }
            other => Err(BinError::InvalidValueSelection(other.to_string())),
        }
    }

    fn value_spec(&self) -> ValueSpec {
        ValueSpec::External {
            absolute: self.absolute,
        }
    }

    fn width(&self) -> usize {
        self.data.width()
    }

    fn height(&self) -> usize {
        self.data.height()
    }

    fn position(&self) -> &PositionCards {
        &self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Pixel;

    fn pair() -> PixelSet {
        vec![Pixel::new(0, 0), Pixel::new(1, 0)].into()
    }

    fn model() -> ExternalModel {
        let data = Raster::from_vec(2, 1, vec![4.0, 6.0]).unwrap();
        let error = Raster::from_vec(2, 1, vec![0.3, 0.4]).unwrap();
        ExternalModel::new(data, error).unwrap()
    }

    #[test]
    fn test_relative_errors_not_normalised() {
        let m = model();
        assert!((m.value(&pair()) - 5.0).abs() < 1e-12);
        // sqrt(0.09 + 0.16) / 2
        assert!((m.frac_error(&pair(), ErrorMode::Final) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_absolute_errors_divided_by_mean() {
        let mut m = model();
        m.select_value(ValueSpec::External { absolute: true }).unwrap();
        assert!(m.is_absolute());
        assert!((m.frac_error(&pair(), ErrorMode::Final) - 0.05).abs() < 1e-12);
        assert_eq!(m.value_spec().to_string(), "external_abs(0)");
    }

    #[test]
    fn test_scoring_is_repeatable() {
        for absolute in [false, true] {
            let mut m = model();
            m.select_value(ValueSpec::External { absolute }).unwrap();
            assert_eq!(m.value(&pair()), m.value(&pair()));
            for mode in [ErrorMode::Binning, ErrorMode::Final] {
                assert_eq!(m.frac_error(&pair(), mode), m.frac_error(&pair(), mode));
            }
        }
    }

    #[test]
    fn test_mismatched_error_image_rejected() {
        let result = ExternalModel::new(Raster::new(2, 2), Raster::new(2, 3));
        assert!(matches!(result, Err(BinError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_count_selection_rejected() {
        let mut m = model();
        assert!(matches!(
            m.select_value(ValueSpec::Count(0)),
            Err(BinError::InvalidValueSelection(_))
        ));
    }
}

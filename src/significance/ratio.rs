use crate::error::{BinError, Result};
use crate::types::{PixelSet, PositionCards};

use super::{CountModel, ErrorMode, SignificanceModel, ValueSpec};

/// Several count images, reporting one of them or the ratio of two.
///
/// While binning, the error is the quadrature sum over every image so that a
/// bin is only accepted once all bands are significant.
#[derive(Clone, Debug)]
pub struct RatioModel {
    counts: Vec<CountModel>,
    selected: Selected,
}

#[derive(Copy, Clone, Debug)]
enum Selected {
    Count(usize),
    Ratio(usize, usize),
}

impl RatioModel {
    pub fn new(counts: Vec<CountModel>) -> Result<Self> {
        let first = counts.first().ok_or_else(|| {
            BinError::InvalidArguments("at least one count image is required".to_string())
        })?;
        let expected = (first.width(), first.height());
        for count in &counts[1..] {
            let found = (count.width(), count.height());
            if found != expected {
                return Err(BinError::DimensionMismatch {
                    what: "count image",
                    expected,
                    found,
                });
            }
        }
        Ok(RatioModel {
            counts,
            selected: Selected::Count(0),
        })
    }

    pub fn counts(&self) -> &[CountModel] {
        &self.counts
    }
}

impl SignificanceModel for RatioModel {
    fn value(&self, pixels: &PixelSet) -> f64 {
        match self.selected {
            Selected::Count(i) => self.counts[i].value(pixels),
            Selected::Ratio(a, b) => self.counts[a].value(pixels) / self.counts[b].value(pixels),
        }
    }

    fn frac_error(&self, pixels: &PixelSet, mode: ErrorMode) -> f64 {
        match (mode, self.selected) {
            (ErrorMode::Binning, _) => self
                .counts
                .iter()
                .map(|c| c.frac_error(pixels, mode).powi(2))
                .sum::<f64>()
                .sqrt(),
            (ErrorMode::Final, Selected::Count(i)) => self.counts[i].frac_error(pixels, mode),
            (ErrorMode::Final, Selected::Ratio(a, b)) => {
                let ea = self.counts[a].frac_error(pixels, mode);
                let eb = self.counts[b].frac_error(pixels, mode);
                (ea * ea + eb * eb).sqrt()
            }
        }
    }

    fn select_value(&mut self, spec: ValueSpec) -> Result<()> {
        let n = self.counts.len();
        self.selected = match spec {
            ValueSpec::Count(i) if i < n => Selected::Count(i),
            ValueSpec::Ratio(a, b) if a < n && b < n => Selected::Ratio(a, b),
            _ => {
                return Err(BinError::InvalidValueSelection(format!(
                    "{} with {} count image(s)",
                    spec, n
                )))
            }
        };
        Ok(())
    }

    fn value_spec(&self) -> ValueSpec {
        match self.selected {
            Selected::Count(i) => ValueSpec::Count(i),
            Selected::Ratio(a, b) => ValueSpec::Ratio(a, b),
        }
    }

    fn width(&self) -> usize {
        self.counts[0].width()
    }

    fn height(&self) -> usize {
        self.counts[0].height()
    }

    fn position(&self) -> &PositionCards {
        self.counts[0].position()
    }
}

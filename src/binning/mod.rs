//! Adaptive binning: grow bins over passes of doubling block size until each
//! reaches the fractional-error threshold.

mod connectivity;
mod map;
mod pass;

use tracing::{error, info, warn};

use crate::error::{BinError, Result};
use crate::raster::Raster;
use crate::significance::SignificanceModel;

pub use connectivity::ConnectivityAnalyzer;
pub use map::BinMap;
pub use pass::PassReport;

use pass::{BinRun, PassSettings};

/// Result of a completed run.
pub struct BinOutput {
    /// Bin value for every pixel, -1 where masked.
    pub value: Raster,
    /// Final fractional error for every pixel, -1 where masked.
    pub error: Raster,
    /// Bin index for every pixel, -1 where masked.
    pub binmap: Raster,
    /// Number of bins committed; indices run from 0 to `bins - 1`.
    pub bins: usize,
    pub map: BinMap,
}

/// Adaptive binner with builder configuration.
///
/// ```
/// use adaptbin::{Binner, CountModel, Raster};
///
/// let model = CountModel::new(Raster::filled(8, 8, 25.0), 0.0);
/// let output = Binner::new(&model, 0.1).with_sub_bin(2).bin();
/// assert!(output.bins > 0);
/// ```
pub struct Binner<'m> {
    model: &'m dyn SignificanceModel,
    threshold: f64,
    sub_bin: usize,
    contiguous: bool,
    mask: Option<(Raster, bool)>,
}

impl<'m> Binner<'m> {
    /// Bins stop growing once their fractional error is at most `threshold`.
    pub fn new(model: &'m dyn SignificanceModel, threshold: f64) -> Self {
        Binner {
            model,
            threshold,
            sub_bin: 1,
            contiguous: false,
            mask: None,
        }
    }

    /// Let bin origins fall on `1/divisor` of the block size (minimum 1).
    pub fn with_sub_bin(mut self, divisor: usize) -> Self {
        self.sub_bin = divisor.max(1);
        self
    }

    /// Split candidates into 8-connected chunks before accepting them.
    pub fn with_contiguous(mut self) -> Self {
        self.contiguous = true;
        self
    }

    /// Exclude pixels where the mask is positive (or zero, when `invert`).
    pub fn with_mask(mut self, mask: Raster, invert: bool) -> Result<Self> {
        let expected = (self.model.width(), self.model.height());
        if mask.dims() != expected {
            return Err(BinError::DimensionMismatch {
                what: "mask",
                expected,
                found: mask.dims(),
            });
        }
        self.mask = Some((mask, invert));
        Ok(self)
    }

    /// Fresh assignment map with the mask applied.
    pub fn initial_map(&self) -> BinMap {
        let mut map = BinMap::new(self.model.width(), self.model.height());
        if let Some((mask, invert)) = &self.mask {
            map.apply_mask(mask, *invert);
        }
        map
    }

    pub fn bin(&self) -> BinOutput {
        self.bin_with_observer(|_, _| {})
    }

    /// Run every pass, calling `observer` after each one.
    ///
    /// Passes use block sizes 1, 2, 4, ... while the size is below either
    /// image dimension; the terminal pass reuses the first size that is not
    /// and accepts every candidate.
    pub fn bin_with_observer<F>(&self, mut observer: F) -> BinOutput
    where
        F: FnMut(&PassReport, &BinMap),
    {
        let (w, h) = (self.model.width(), self.model.height());
        let settings = PassSettings {
            threshold: self.threshold,
            sub_bin: self.sub_bin,
        };
        let map = self.initial_map();
        if map.count_unassigned() == 0 {
            warn!("every pixel is masked, nothing to bin");
        }
        let mut run = BinRun::new(self.model, map, self.contiguous);

        let mut size = 1;
        while size < w || size < h {
            info!("Pass {}", size);
            let report = run.pass(size, false, &settings);
            observer(&report, &run.map);
            size *= 2;
        }
        info!("Pass {} (final)", size);
        let report = run.pass(size, true, &settings);
        observer(&report, &run.map);

        let unassigned = run.map.count_unassigned();
        if unassigned > 0 {
            error!(unassigned, "pixels left unbinned after the final pass");
        }
        debug_assert_eq!(unassigned, 0);

        info!("{} bins", run.next_bin);
        BinOutput {
            binmap: run.map.to_raster(),
            value: run.value,
            error: run.error,
            bins: run.next_bin,
            map: run.map,
        }
    }
}

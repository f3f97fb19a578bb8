use tracing::debug;

use crate::raster::Raster;
use crate::significance::{ErrorMode, SignificanceModel};
use crate::types::{Pixel, PixelSet, MASKED};

use super::connectivity::ConnectivityAnalyzer;
use super::map::BinMap;

/// Statistics of one pass over the image.
#[derive(Clone, PartialEq, Debug)]
pub struct PassReport {
    /// Edge length of the candidate blocks.
    pub grid_size: usize,
    /// The terminal pass accepts every candidate.
    pub final_pass: bool,
    /// Candidates accepted for commit consideration.
    pub candidates: usize,
    /// Candidates turned into bins.
    pub committed: usize,
    /// Candidates dropped because another bin already claimed one of their pixels.
    pub spoilt: usize,
    /// Largest binning-mode error among the committed candidates.
    pub worst_binning_error: Option<f64>,
}

struct Candidate {
    pixels: PixelSet,
    error: f64,
}

pub(crate) struct PassSettings {
    pub threshold: f64,
    pub sub_bin: usize,
}

/// Non-final passes only keep candidates at or below the threshold.
fn accepts(error: f64, threshold: f64, final_pass: bool) -> bool {
    final_pass || error <= threshold
}

/// Mutable state of one binning run.
pub(crate) struct BinRun<'m> {
    model: &'m dyn SignificanceModel,
    pub map: BinMap,
    pub value: Raster,
    pub error: Raster,
    pub next_bin: usize,
    analyzer: Option<ConnectivityAnalyzer>,
}

impl<'m> BinRun<'m> {
    pub fn new(model: &'m dyn SignificanceModel, map: BinMap, contiguous: bool) -> Self {
        let (w, h) = (model.width(), model.height());
        BinRun {
            model,
            map,
            value: Raster::filled(w, h, MASKED),
            error: Raster::filled(w, h, MASKED),
            next_bin: 0,
            analyzer: contiguous.then(|| ConnectivityAnalyzer::new(w, h)),
        }
    }

    /// Unassigned pixels of the `size` x `size` block at `(x0, y0)`, x-major.
    fn gather(&self, x0: usize, y0: usize, size: usize) -> PixelSet {
        let x_end = (x0 + size).min(self.map.width());
        let y_end = (y0 + size).min(self.map.height());
        let mut pixels = PixelSet::new();
        for x in x0..x_end {
            for y in y0..y_end {
                if self.map.is_unassigned(x, y) {
                    pixels.push(Pixel::new(x, y));
                }
            }
        }
        pixels
    }

    fn collect_candidates(
        &mut self,
        size: usize,
        final_pass: bool,
        settings: &PassSettings,
    ) -> Vec<Candidate> {
        let (w, h) = (self.map.width(), self.map.height());
        let (nx, ny, stride) = if size < settings.sub_bin {
            (w + 1, h + 1, 1)
        } else {
            let stride = size / settings.sub_bin;
            (w / stride + 1, h / stride + 1, stride)
        };

        let mut candidates = Vec::new();
        for ox in 0..nx {
            for oy in 0..ny {
                let pixels = self.gather(ox * stride, oy * stride, size);
                if pixels.is_empty() {
                    continue;
                }
                let error = self.model.frac_error(&pixels, ErrorMode::Binning);
                if !accepts(error, settings.threshold, final_pass) {
                    continue;
                }

                match self.analyzer.as_mut() {
                    Some(analyzer) => {
                        for chunk in analyzer.split(&pixels) {
                            let error = self.model.frac_error(&chunk, ErrorMode::Binning);
                            if accepts(error, settings.threshold, final_pass) {
                                candidates.push(Candidate {
                                    pixels: chunk,
                                    error,
                                });
                            }
                        }
                    }
                    None => candidates.push(Candidate { pixels, error }),
                }
            }
        }
        candidates
    }

    /// Run one pass at block edge `size`.
    pub fn pass(&mut self, size: usize, final_pass: bool, settings: &PassSettings) -> PassReport {
        let mut candidates = self.collect_candidates(size, final_pass, settings);

        // Offset origins overlap: lowest error claims pixels first, ties keep discovery order.
        if settings.sub_bin != 1 {
            candidates.sort_by(|a, b| a.error.total_cmp(&b.error));
        }

        let mut report = PassReport {
            grid_size: size,
            final_pass,
            candidates: candidates.len(),
            committed: 0,
            spoilt: 0,
            worst_binning_error: None,
        };

        for candidate in &candidates {
            let spoilt = candidate
                .pixels
                .iter()
                .any(|p| !self.map.is_unassigned(p.x, p.y));
            if spoilt {
                report.spoilt += 1;
                continue;
            }

            let value = self.model.value(&candidate.pixels);
            let error = self.model.frac_error(&candidate.pixels, ErrorMode::Final);
            for p in &candidate.pixels {
                self.map.commit(p.x, p.y, self.next_bin);
                self.value.set(p.x, p.y, value);
                self.error.set(p.x, p.y, error);
            }
            self.next_bin += 1;

            report.committed += 1;
            report.worst_binning_error = Some(
                report
                    .worst_binning_error
                    .map_or(candidate.error, |worst| worst.max(candidate.error)),
            );
        }

        debug!(
            size,
            final_pass,
            candidates = report.candidates,
            committed = report.committed,
            spoilt = report.spoilt,
            "pass finished"
        );
        report
    }
}

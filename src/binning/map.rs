use ndarray::Array2;

use crate::raster::Raster;
use crate::types::BinState;

const MASK_INVERT_LIMIT: f64 = 1e-10;

/// Per-pixel assignment state for one binning run.
#[derive(Clone, PartialEq, Debug)]
pub struct BinMap {
    states: Array2<BinState>,
}

impl BinMap {
    /// Every pixel starts unassigned.
    pub fn new(width: usize, height: usize) -> Self {
        BinMap {
            states: Array2::from_elem((height, width), BinState::Unassigned),
        }
    }

    pub fn width(&self) -> usize {
        self.states.ncols()
    }

    pub fn height(&self) -> usize {
        self.states.nrows()
    }

    /// Exclude pixels where `mask > 0`, or where `mask < 1e-10` when inverted.
    ///
    /// The mask must have the map's dimensions.
    pub fn apply_mask(&mut self, mask: &Raster, invert: bool) {
        debug_assert_eq!(mask.dims(), (self.width(), self.height()));
        for ((y, x), state) in self.states.indexed_iter_mut() {
            let v = mask.get(x, y);
            let excluded = if invert { v < MASK_INVERT_LIMIT } else { v > 0.0 };
            if excluded {
                *state = BinState::Masked;
            }
        }
    }

    #[inline]
    pub fn state(&self, x: usize, y: usize) -> BinState {
        self.states[[y, x]]
    }

    #[inline]
    pub fn is_unassigned(&self, x: usize, y: usize) -> bool {
        self.state(x, y) == BinState::Unassigned
    }

    pub(crate) fn commit(&mut self, x: usize, y: usize, bin: usize) {
        let state = &mut self.states[[y, x]];
        debug_assert_eq!(*state, BinState::Unassigned, "pixel ({}, {}) claimed twice", x, y);
        *state = BinState::Committed(bin);
    }

    pub fn count_unassigned(&self) -> usize {
        self.states
            .iter()
            .filter(|s| **s == BinState::Unassigned)
            .count()
    }

    /// Encode as -2 (unassigned), -1 (masked) or the bin index.
    pub fn to_raster(&self) -> Raster {
        let mut out = Raster::new(self.width(), self.height());
        for ((y, x), state) in self.states.indexed_iter() {
            out.set(x, y, state.to_sentinel());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_marks_positive_pixels() {
        let mask = Raster::from_vec(2, 2, vec![1.0, 0.0, 0.0, 0.5]).unwrap();
        let mut map = BinMap::new(2, 2);
        map.apply_mask(&mask, false);
        assert_eq!(map.state(0, 0), BinState::Masked);
        assert_eq!(map.state(1, 1), BinState::Masked);
        assert!(map.is_unassigned(1, 0));
        assert_eq!(map.count_unassigned(), 2);
        assert_eq!(map.to_raster().to_vec(), vec![-1.0, -2.0, -2.0, -1.0]);
    }

    #[test]
    fn test_inverted_mask() {
        let mask = Raster::from_vec(2, 1, vec![1.0, 0.0]).unwrap();
        let mut map = BinMap::new(2, 1);
        map.apply_mask(&mask, true);
        assert!(map.is_unassigned(0, 0));
        assert_eq!(map.state(1, 0), BinState::Masked);
    }

    #[test]
    fn test_commit_encodes_index() {
        let mut map = BinMap::new(2, 1);
        map.commit(1, 0, 4);
        assert_eq!(map.state(1, 0), BinState::Committed(4));
        assert_eq!(map.to_raster().to_vec(), vec![-2.0, 4.0]);
    }
}

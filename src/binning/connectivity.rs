use crate::types::{Pixel, PixelSet};

/// Splits pixel sets into 8-connected chunks.
///
/// Holds one occupancy buffer sized to the image, reused for every chunk.
pub struct ConnectivityAnalyzer {
    width: usize,
    height: usize,
    occupied: Vec<bool>,
}

impl ConnectivityAnalyzer {
    pub fn new(width: usize, height: usize) -> Self {
        ConnectivityAnalyzer {
            width,
            height,
            occupied: vec![false; width * height],
        }
    }

    fn touches_chunk(&self, p: &Pixel) -> bool {
        let x_lo = p.x.saturating_sub(1);
        let y_lo = p.y.saturating_sub(1);
        let x_hi = (p.x + 1).min(self.width - 1);
        let y_hi = (p.y + 1).min(self.height - 1);
        (y_lo..=y_hi).any(|y| (x_lo..=x_hi).any(|x| self.occupied[y * self.width + x]))
    }

    fn mark(&mut self, p: &Pixel) {
        self.occupied[p.y * self.width + p.x] = true;
    }

    /// Partition `pixels` into maximal connected chunks.
    ///
    /// Each chunk is seeded by the first unused pixel in insertion order and
    /// grown by rescanning the unused pixels until a full scan adds nothing.
    /// Chunks come out in seed order; pixels within a chunk in the order
    /// they were reached.
    pub fn split(&mut self, pixels: &PixelSet) -> Vec<PixelSet> {
        let list = pixels.as_slice();
        let mut used = vec![false; list.len()];
        let mut chunks = Vec::new();

        while let Some(seed) = used.iter().position(|u| !u) {
            let mut chunk = PixelSet::new();
            used[seed] = true;
            chunk.push(list[seed]);
            self.mark(&list[seed]);

            loop {
                let mut added_any = false;
                for (i, p) in list.iter().enumerate() {
                    if !used[i] && self.touches_chunk(p) {
                        used[i] = true;
                        chunk.push(*p);
                        self.mark(p);
                        added_any = true;
                    }
                }
                if !added_any {
                    break;
                }
            }

            for p in &chunk {
                self.occupied[p.y * self.width + p.x] = false;
            }
            chunks.push(chunk);
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(coords: &[(usize, usize)]) -> PixelSet {
        coords.iter().map(|&(x, y)| Pixel::new(x, y)).collect()
    }

    fn coords(chunk: &PixelSet) -> Vec<(usize, usize)> {
        chunk.iter().map(|p| (p.x, p.y)).collect()
    }

    #[test]
    fn test_single_connected_block() {
        let mut analyzer = ConnectivityAnalyzer::new(4, 4);
        let chunks = analyzer.split(&set(&[(0, 0), (0, 1), (1, 0), (1, 1)]));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 4);
    }

    #[test]
    fn test_diagonal_contact_connects() {
        let mut analyzer = ConnectivityAnalyzer::new(3, 3);
        let chunks = analyzer.split(&set(&[(0, 0), (1, 1), (2, 2)]));
        assert_eq!(chunks.len(), 1);
        assert_eq!(coords(&chunks[0]), vec![(0, 0), (1, 1), (2, 2)]);
    }

    #[test]
    fn test_separated_groups_split_in_seed_order() {
        let mut analyzer = ConnectivityAnalyzer::new(5, 3);
        let pixels = set(&[(4, 0), (0, 0), (4, 1), (0, 2), (0, 1)]);
        let chunks = analyzer.split(&pixels);
        assert_eq!(chunks.len(), 2);
        assert_eq!(coords(&chunks[0]), vec![(4, 0), (4, 1)]);
        assert_eq!(coords(&chunks[1]), vec![(0, 0), (0, 1), (0, 2)]);
    }

    #[test]
    fn test_chain_reached_over_several_scans() {
        // (3,0) only becomes reachable after (2,0), which follows it in the list.
        let mut analyzer = ConnectivityAnalyzer::new(4, 1);
        let chunks = analyzer.split(&set(&[(0, 0), (3, 0), (2, 0), (1, 0)]));
        assert_eq!(chunks.len(), 1);
        assert_eq!(coords(&chunks[0]), vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
    }

    #[test]
    fn test_buffer_is_cleared_between_calls() {
        let mut analyzer = ConnectivityAnalyzer::new(3, 1);
        analyzer.split(&set(&[(0, 0), (1, 0)]));
        let chunks = analyzer.split(&set(&[(2, 0)]));
        assert_eq!(chunks.len(), 1);
        assert!(analyzer.occupied.iter().all(|o| !o));
    }
}

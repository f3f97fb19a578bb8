/// Bin-map value of a pixel not yet claimed by any bin.
pub const UNASSIGNED: f64 = -2.0;

/// Bin-map value of a masked pixel; also the value/error raster fill before assignment.
pub const MASKED: f64 = -1.0;

/// Integer pixel coordinate.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Pixel {
    pub x: usize,
    pub y: usize,
}

impl Pixel {
    pub fn new(x: usize, y: usize) -> Self {
        Pixel { x, y }
    }

    /// 8-connected neighbours: Chebyshev distance of at most one.
    pub fn touches(&self, other: &Pixel) -> bool {
        self.x.abs_diff(other.x) <= 1 && self.y.abs_diff(other.y) <= 1
    }
}

/// Ordered pixel list of one candidate or committed bin.
///
/// Insertion order is preserved; the binner relies on it for reproducible
/// chunking and commit order.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct PixelSet {
    pixels: Vec<Pixel>,
}

impl PixelSet {
    pub fn new() -> Self {
        PixelSet { pixels: Vec::new() }
    }

    pub fn with_capacity(n: usize) -> Self {
        PixelSet {
            pixels: Vec::with_capacity(n),
        }
    }

    pub fn push(&mut self, pixel: Pixel) {
        self.pixels.push(pixel);
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Pixel> {
        self.pixels.iter()
    }

    pub fn as_slice(&self) -> &[Pixel] {
        &self.pixels
    }
}

impl FromIterator<Pixel> for PixelSet {
    fn from_iter<I: IntoIterator<Item = Pixel>>(iter: I) -> Self {
        PixelSet {
            pixels: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<Pixel>> for PixelSet {
    fn from(pixels: Vec<Pixel>) -> Self {
        PixelSet { pixels }
    }
}

impl<'a> IntoIterator for &'a PixelSet {
    type Item = &'a Pixel;
    type IntoIter = std::slice::Iter<'a, Pixel>;

    fn into_iter(self) -> Self::IntoIter {
        self.pixels.iter()
    }
}

/// Assignment state of one output pixel.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub enum BinState {
    #[default]
    Unassigned,
    Masked,
    Committed(usize),
}

impl BinState {
    /// Sentinel encoding written to the bin-map raster.
    pub fn to_sentinel(self) -> f64 {
        match self {
            BinState::Unassigned => UNASSIGNED,
            BinState::Masked => MASKED,
            BinState::Committed(id) => id as f64,
        }
    }
}

/// Header cards describing sky position, carried from input to output unchanged.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct PositionCards {
    cards: Vec<String>,
}

impl PositionCards {
    pub fn new(cards: Vec<String>) -> Self {
        PositionCards { cards }
    }

    pub fn cards(&self) -> &[String] {
        &self.cards
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touches_includes_diagonals() {
        let p = Pixel::new(3, 3);
        assert!(p.touches(&Pixel::new(4, 4)));
        assert!(p.touches(&Pixel::new(2, 3)));
        assert!(p.touches(&p));
        assert!(!p.touches(&Pixel::new(5, 3)));
        assert!(!p.touches(&Pixel::new(3, 1)));
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(BinState::Unassigned.to_sentinel(), -2.0);
        assert_eq!(BinState::Masked.to_sentinel(), -1.0);
        assert_eq!(BinState::Committed(7).to_sentinel(), 7.0);
    }

    #[test]
    fn test_pixel_set_preserves_order() {
        let set: PixelSet = [Pixel::new(2, 0), Pixel::new(0, 1), Pixel::new(1, 1)]
            .into_iter()
            .collect();
        let xs: Vec<usize> = set.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![2, 0, 1]);
        assert_eq!(set.len(), 3);
    }
}

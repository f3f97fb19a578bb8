//! Adaptive binning of FITS images.
//!
//! Pixels are grouped into bins of growing size until each bin's fractional
//! error drops to a threshold. What is binned, and how its error is computed,
//! is decided by a [`SignificanceModel`]: raw counts, ratios of counts, or
//! data with an external error image.

pub mod binning;
pub mod error;
pub mod formats;
pub mod logger;
pub mod raster;
pub mod significance;
pub mod types;

pub use binning::{BinMap, BinOutput, Binner, ConnectivityAnalyzer, PassReport};
pub use error::BinError;
pub use formats::{read_image, FitsImage, FitsWriter};
pub use raster::Raster;
pub use significance::{
    open_model, parse_count_sources, CountModel, CountSource, ErrorMode, ExternalModel,
    RatioModel, SignificanceModel, ValueSpec, DEGENERATE_FRAC_ERROR,
};
pub use types::{BinState, Pixel, PixelSet, PositionCards, MASKED, UNASSIGNED};

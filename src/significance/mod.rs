//! Significance models: how a set of pixels is turned into a value and a
//! fractional error.

mod count;
mod external;
mod ratio;
mod value_spec;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::error::BinError;
use crate::formats;
use crate::types::{PixelSet, PositionCards};

pub use count::CountModel;
pub use external::ExternalModel;
pub use ratio::RatioModel;
pub use value_spec::ValueSpec;

/// Reported in place of a fractional error whose denominator vanishes.
pub const DEGENERATE_FRAC_ERROR: f64 = 1e5;

const DEGENERATE_DENOMINATOR: f64 = 1e-5;

/// Which error a model is asked for.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ErrorMode {
    /// Error used to accept or reject candidate bins during a pass.
    Binning,
    /// Error written to the output error map once a bin is committed.
    Final,
}

/// Scores pixel sets drawn from one or more read-only images.
///
/// Both scoring methods are pure functions of the pixel data; `pixels` is
/// never empty.
pub trait SignificanceModel {
    /// Representative value of the pixels.
    fn value(&self, pixels: &PixelSet) -> f64;

    /// Fractional error of [`value`](Self::value).
    fn frac_error(&self, pixels: &PixelSet, mode: ErrorMode) -> f64;

    /// Choose the reported quantity.
    fn select_value(&mut self, spec: ValueSpec) -> crate::error::Result<()>;

    /// The quantity currently reported.
    fn value_spec(&self) -> ValueSpec;

    fn width(&self) -> usize;

    fn height(&self) -> usize;

    /// Positional header cards of the primary input image.
    fn position(&self) -> &PositionCards;
}

pub(crate) fn guard_fraction(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < DEGENERATE_DENOMINATOR {
        return DEGENERATE_FRAC_ERROR;
    }
    let frac = numerator / denominator;
    if frac.is_finite() {
        frac
    } else {
        DEGENERATE_FRAC_ERROR
    }
}

/// One count image named on the command line.
#[derive(Clone, PartialEq, Debug)]
pub struct CountSource {
    pub path: PathBuf,
    pub background: f64,
}

/// Parse `file [bg=N] file [bg=N] ...`.
pub fn parse_count_sources<S: AsRef<str>>(args: &[S]) -> crate::error::Result<Vec<CountSource>> {
    let mut sources: Vec<CountSource> = Vec::new();
    let mut after_file = false;
    for arg in args {
        let arg = arg.as_ref();
        if let Some(bg) = arg.strip_prefix("bg=") {
            let background: f64 = bg
                .trim()
                .parse()
                .map_err(|_| BinError::InvalidArguments(format!("bad background '{}'", arg)))?;
            match sources.last_mut() {
                Some(last) if after_file => last.background = background,
                _ => {
                    return Err(BinError::InvalidArguments(format!(
                        "'{}' does not follow a file name",
                        arg
                    )))
                }
            }
            after_file = false;
        } else {
            sources.push(CountSource {
                path: PathBuf::from(arg),
                background: 0.0,
            });
            after_file = true;
        }
    }
    if sources.is_empty() {
        return Err(BinError::InvalidArguments("no input files".to_string()));
    }
    Ok(sources)
}

fn load(path: &Path) -> Result<formats::FitsImage> {
    if !path.exists() {
        return Err(BinError::InvalidArguments(format!("no such file {}", path.display())).into());
    }
    formats::read_image(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Open the model implied by `value` over the positional `args`, then select `value`.
///
/// `external...` values take exactly a data and an error image; everything
/// else is a list of count images with optional backgrounds.
pub fn open_model<S: AsRef<str>>(args: &[S], value: &str) -> Result<Box<dyn SignificanceModel>> {
    let spec: ValueSpec = value.parse()?;

    let mut model: Box<dyn SignificanceModel> = if value.trim_start().starts_with("external") {
        let [data, error] = args else {
            return Err(BinError::InvalidArguments(format!(
                "external values need a data and an error image, got {} argument(s)",
                args.len()
            ))
            .into());
        };
        let data = load(Path::new(data.as_ref()))?;
        let error = load(Path::new(error.as_ref()))?;
        Box::new(ExternalModel::new(data.raster, error.raster)?.with_position(data.position))
    } else {
        let counts = parse_count_sources(args)?
            .into_iter()
            .map(|source| {
                let image = load(&source.path)?;
                Ok(CountModel::new(image.raster, source.background).with_position(image.position))
            })
            .collect::<Result<Vec<_>>>()?;
        Box::new(RatioModel::new(counts)?)
    };

    model.select_value(spec)?;
    Ok(model)
}

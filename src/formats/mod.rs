pub mod fits;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{bail, Result};

pub use fits::{FitsImage, FitsWriter};

/// Load an image, refusing anything that is not FITS.
pub fn read_image(path: &Path) -> Result<FitsImage> {
    if !path.exists() {
        bail!("No such file: {}", path.display());
    }
    if is_fits(path) {
        fits::read_fits_image(path)
    } else {
        bail!("Not a FITS file: {}", path.display())
    }
}

fn is_fits(path: &Path) -> bool {
    // Magic bytes: "SIMPLE  ="
    if let Ok(mut f) = File::open(path) {
        let mut buf = [0u8; 9];
        if f.read_exact(&mut buf).is_ok() && &buf == b"SIMPLE  =" {
            return true;
        }
    }
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        return ["fits", "fit", "fts", "img"]
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known));
    }
    false
}

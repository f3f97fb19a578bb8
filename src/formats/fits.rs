use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;

use crate::raster::Raster;
use crate::types::PositionCards;

const FITS_BLOCK_SIZE: usize = 2880;
const FITS_CARD_SIZE: usize = 80;
const HISTORY_TEXT_WIDTH: usize = 72;

const CHUNK: usize = 65536;
const PAR_THRESHOLD: usize = CHUNK * 2;

/// Keywords copied verbatim from input to output headers.
const POSITION_KEYWORDS: &[&str] = &[
    "TELESCOP", "INSTRUME", "OBS_MODE", "RADECSYS", "EQUINOX", "BUNIT", "CRPIX1", "CRVAL1",
    "CDELT1", "CTYPE1", "CUNIT1", "CRPIX2", "CRVAL2", "CDELT2", "CTYPE2", "CUNIT2",
];

/// Primary image of a FITS file plus its positional header cards.
pub struct FitsImage {
    pub raster: Raster,
    pub position: PositionCards,
}

struct FitsHeader {
    bitpix: i32,
    naxis: i32,
    naxis1: usize,
    naxis2: usize,
    bzero: f64,
    bscale: f64,
    position: Vec<String>,
}

fn card_keyword(card: &str) -> &str {
    card.get(..8).unwrap_or(card).trim_end()
}

fn get_keyword_value<'a>(card: &'a str, keyword: &str) -> Option<&'a str> {
    if card_keyword(card) != keyword {
        return None;
    }
    let eq_pos = card.find('=')?;
    Some(card[eq_pos + 1..].trim_start())
}

fn parse_int_keyword(card: &str, keyword: &str) -> Option<i64> {
    let val = get_keyword_value(card, keyword)?;
    let num_str: String = val
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '-' || *c == '+')
        .collect();
    num_str.parse().ok()
}

fn parse_float_keyword(card: &str, keyword: &str) -> Option<f64> {
    let val = get_keyword_value(card, keyword)?;
    let num_str: String = val
        .chars()
        .take_while(|c| {
            c.is_ascii_digit() || matches!(*c, '-' | '+' | '.' | 'E' | 'e' | 'D' | 'd')
        })
        .map(|c| if c == 'D' || c == 'd' { 'E' } else { c })
        .collect();
    num_str.parse().ok()
}

fn read_fits_header<R: Read>(reader: &mut R) -> Result<FitsHeader> {
    let mut hdr = FitsHeader {
        bitpix: 0,
        naxis: 0,
        naxis1: 0,
        naxis2: 0,
        bzero: 0.0,
        bscale: 1.0,
        position: Vec::new(),
    };

    let mut block = [0u8; FITS_BLOCK_SIZE];
    let mut found_end = false;

    while !found_end {
        reader
            .read_exact(&mut block)
            .context("Failed to read FITS header block")?;

        for card_bytes in block.chunks_exact(FITS_CARD_SIZE) {
            let card = std::str::from_utf8(card_bytes).unwrap_or("");
            let keyword = card_keyword(card);

            if keyword == "END" {
                found_end = true;
                break;
            }

            if let Some(v) = parse_int_keyword(card, "BITPIX") {
                hdr.bitpix = v as i32;
            } else if let Some(v) = parse_int_keyword(card, "NAXIS") {
                hdr.naxis = v as i32;
            } else if let Some(v) = parse_int_keyword(card, "NAXIS1") {
                hdr.naxis1 = v.max(0) as usize;
            } else if let Some(v) = parse_int_keyword(card, "NAXIS2") {
                hdr.naxis2 = v.max(0) as usize;
            } else if let Some(v) = parse_float_keyword(card, "BZERO") {
                hdr.bzero = v;
            } else if let Some(v) = parse_float_keyword(card, "BSCALE") {
                hdr.bscale = v;
            } else if POSITION_KEYWORDS.contains(&keyword) {
                hdr.position.push(card.trim_end().to_string());
            }
        }
    }

    if hdr.bitpix == 0 {
        bail!("Missing BITPIX keyword in FITS header");
    }
    if hdr.naxis < 2 {
        bail!("FITS image must have at least 2 dimensions");
    }
    if hdr.naxis1 == 0 || hdr.naxis2 == 0 {
        bail!("Invalid FITS image dimensions");
    }

    Ok(hdr)
}

/// Decode big-endian samples of `N` bytes into scaled `f64` values.
fn decode<const N: usize>(
    raw: &[u8],
    out: &mut [f64],
    bzero: f64,
    bscale: f64,
    sample: fn([u8; N]) -> f64,
) {
    let convert = |s: &[u8], d: &mut [f64]| {
        for (bytes, dst) in s.chunks_exact(N).zip(d.iter_mut()) {
            let mut buf = [0u8; N];
            buf.copy_from_slice(bytes);
            *dst = bzero + bscale * sample(buf);
        }
    };
    if out.len() >= PAR_THRESHOLD {
        raw.par_chunks(CHUNK * N)
            .zip(out.par_chunks_mut(CHUNK))
            .for_each(|(s, d)| convert(s, d));
    } else {
        convert(raw, out);
    }
}

/// Read the primary image of a FITS file as `f64` pixels.
///
/// Only the first plane of a cube is used. BZERO/BSCALE are applied.
pub fn read_fits_image(path: &Path) -> Result<FitsImage> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open FITS file {}", path.display()))?;
    let file_len = file
        .metadata()
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    let mut reader = BufReader::new(file);

    let hdr = read_fits_header(&mut reader)
        .with_context(|| format!("Bad FITS header in {}", path.display()))?;

    let bytes_per_pixel = (hdr.bitpix.unsigned_abs() as usize) / 8;
    let (num_pixels, data_len) = match hdr
        .naxis1
        .checked_mul(hdr.naxis2)
        .and_then(|n| Some((n, n.checked_mul(bytes_per_pixel)?)))
    {
        Some(sizes) => sizes,
        None => bail!(
            "FITS image {}x{} is too large in {}",
            hdr.naxis1,
            hdr.naxis2,
            path.display()
        ),
    };
    if data_len as u64 > file_len {
        bail!(
            "FITS data of {} bytes does not fit in {} ({} bytes)",
            data_len,
            path.display(),
            file_len
        );
    }

    let mut raw_data = vec![0u8; data_len];
    reader
        .read_exact(&mut raw_data)
        .context("Failed to read FITS data")?;

    let mut pixels = vec![0f64; num_pixels];
    let (bzero, bscale) = (hdr.bzero, hdr.bscale);
    match hdr.bitpix {
        8 => decode::<1>(&raw_data, &mut pixels, bzero, bscale, |b| b[0] as f64),
        16 => decode::<2>(&raw_data, &mut pixels, bzero, bscale, |b| {
            i16::from_be_bytes(b) as f64
        }),
        32 => decode::<4>(&raw_data, &mut pixels, bzero, bscale, |b| {
            i32::from_be_bytes(b) as f64
        }),
        -32 => decode::<4>(&raw_data, &mut pixels, bzero, bscale, |b| {
            f32::from_be_bytes(b) as f64
        }),
        -64 => decode::<8>(&raw_data, &mut pixels, bzero, bscale, f64::from_be_bytes),
        other => bail!("Unsupported BITPIX value: {}", other),
    }

    let raster = Raster::from_vec(hdr.naxis1, hdr.naxis2, pixels)?;

    Ok(FitsImage {
        raster,
        position: PositionCards::new(hdr.position),
    })
}

fn pad_card(text: &str) -> [u8; FITS_CARD_SIZE] {
    let mut record = [b' '; FITS_CARD_SIZE];
    let bytes = text.as_bytes();
    let len = bytes.len().min(FITS_CARD_SIZE);
    record[..len].copy_from_slice(&bytes[..len]);
    record
}

fn value_card(keyword: &str, value: &str) -> [u8; FITS_CARD_SIZE] {
    // Fixed format: value right-justified to column 30.
    pad_card(&format!("{:<8}= {:>20}", keyword, value))
}

/// Split free text into HISTORY cards.
fn history_cards(line: &str) -> Vec<[u8; FITS_CARD_SIZE]> {
    let chars: Vec<char> = line.chars().filter(|c| c.is_ascii() && !c.is_control()).collect();
    if chars.is_empty() {
        return vec![pad_card("HISTORY")];
    }
    chars
        .chunks(HISTORY_TEXT_WIDTH)
        .map(|chunk| {
            let text: String = chunk.iter().collect();
            pad_card(&format!("HISTORY {}", text))
        })
        .collect()
}

/// Writes a raster as a BITPIX -64 primary image.
///
/// ```no_run
/// # use adaptbin::{FitsWriter, Raster};
/// let image = Raster::filled(4, 4, 1.0);
/// FitsWriter::new("out.fits")
///     .with_null(-1.0)
///     .with_history("made by hand")
///     .write(&image)?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct FitsWriter {
    path: PathBuf,
    position: Option<PositionCards>,
    null: Option<f64>,
    history: Vec<String>,
}

impl FitsWriter {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        FitsWriter {
            path: path.as_ref().to_path_buf(),
            position: None,
            null: None,
            history: Vec::new(),
        }
    }

    pub fn with_position(mut self, position: &PositionCards) -> Self {
        self.position = Some(position.clone());
        self
    }

    /// Pixels equal to `null` are stored as NaN.
    pub fn with_null(mut self, null: f64) -> Self {
        self.null = Some(null);
        self
    }

    pub fn with_history<S: Into<String>>(mut self, line: S) -> Self {
        self.history.push(line.into());
        self
    }

    pub fn with_history_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.history.extend(lines.into_iter().map(Into::into));
        self
    }

    fn header_cards(&self, raster: &Raster) -> Vec<[u8; FITS_CARD_SIZE]> {
        let mut cards = vec![
            value_card("SIMPLE", "T"),
            value_card("BITPIX", "-64"),
            value_card("NAXIS", "2"),
            value_card("NAXIS1", &raster.width().to_string()),
            value_card("NAXIS2", &raster.height().to_string()),
        ];
        if let Some(position) = &self.position {
            cards.extend(position.cards().iter().map(|c| pad_card(c)));
        }
        for line in &self.history {
            cards.extend(history_cards(line));
        }
        cards.push(pad_card("END"));
        cards
    }

    fn encode(&self, raster: &Raster) -> Vec<u8> {
        let pixels = raster.to_vec();
        let null = self.null;
        let mut out = vec![0u8; pixels.len() * 8];
        let convert = |s: &[f64], d: &mut [u8]| {
            for (v, dst) in s.iter().zip(d.chunks_exact_mut(8)) {
                let v = match null {
                    Some(n) if *v == n => f64::NAN,
                    _ => *v,
                };
                dst.copy_from_slice(&v.to_be_bytes());
            }
        };
        if pixels.len() >= PAR_THRESHOLD {
            pixels
                .par_chunks(CHUNK)
                .zip(out.par_chunks_mut(CHUNK * 8))
                .for_each(|(s, d)| convert(s, d));
        } else {
            convert(&pixels, &mut out);
        }
        out
    }

    pub fn write(&self, raster: &Raster) -> Result<()> {
        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);

        let cards = self.header_cards(raster);
        for card in &cards {
            writer.write_all(card)?;
        }
        let header_len = cards.len() * FITS_CARD_SIZE;
        let padding = (FITS_BLOCK_SIZE - header_len % FITS_BLOCK_SIZE) % FITS_BLOCK_SIZE;
        writer.write_all(&vec![b' '; padding])?;

        let data = self.encode(raster);
        writer.write_all(&data)?;
        let padding = (FITS_BLOCK_SIZE - data.len() % FITS_BLOCK_SIZE) % FITS_BLOCK_SIZE;
        writer.write_all(&vec![0u8; padding])?;

        writer
            .flush()
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        Ok(())
    }
}

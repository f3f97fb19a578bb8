use std::path::PathBuf;
use std::process;

use adaptbin::{logger, open_model, read_image, Binner, FitsWriter};
use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

const HISTORY_PREFIX: &str = "adbin: ";

/// Adaptively bins a set of images
#[derive(Parser, Debug)]
#[command(name = "adaptbin", version, about, long_about = None)]
struct Args {
    /// Input images: `file [bg=N] file [bg=N] ...`, or `data error` for external values
    #[arg(required = true, value_name = "FILE")]
    inputs: Vec<String>,

    /// Binned value output
    #[arg(short, long, value_name = "FILE", default_value = "adbin_out.fits")]
    out: PathBuf,

    /// Fractional error output
    #[arg(short, long, value_name = "FILE", default_value = "adbin_err.fits")]
    error: PathBuf,

    /// Bin index output
    #[arg(
        short = 'n',
        long,
        alias = "pixel",
        value_name = "FILE",
        default_value = "adbin_binmap.fits"
    )]
    binmap: PathBuf,

    /// Mask image, pixels above zero are excluded
    #[arg(short, long, value_name = "FILE")]
    mask: Option<PathBuf>,

    /// Fractional error each bin has to reach
    #[arg(short, long, value_name = "VAL", default_value_t = 0.1)]
    threshold: f64,

    /// Output value, e.g. count(0), ratio(1,2), external(0), external_abs(0)
    #[arg(short, long, value_name = "STR", default_value = "count(0)")]
    value: String,

    /// Sub-pixel positioning divisor
    #[arg(short, long, value_name = "INT", default_value_t = 1)]
    subpix: usize,

    /// Only allow contiguous regions
    #[arg(short, long)]
    contig: bool,

    /// Exclude mask pixels at zero instead of above it
    #[arg(long)]
    invertmask: bool,

    /// Display more information
    #[arg(long)]
    verbose: bool,
}

/// Audit lines written to every output file, without the prefix.
fn history_lines(args: &Args, value_descr: &str) -> Vec<String> {
    let mut lines = vec![format!(
        "file created by {} v. {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )];
    lines.extend(
        args.inputs
            .iter()
            .enumerate()
            .map(|(i, arg)| format!("arg {}: {}", i, arg)),
    );
    lines.push(format!("output image: {}", args.out.display()));
    lines.push(format!("error map: {}", args.error.display()));
    lines.push(format!("bin map: {}", args.binmap.display()));
    lines.push(format!(
        "mask: {}",
        args.mask.as_ref().map(|m| m.display().to_string()).unwrap_or_default()
    ));
    lines.push(format!("value: {}", value_descr));
    lines.push(format!("contig: {}", args.contig));
    lines.push(format!("threshold: {}", args.threshold));
    lines.push(format!("subpix: {}", args.subpix));
    lines
}

fn main() {
    let args = Args::parse();
    logger::init(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    if args.threshold <= 0.0 {
        bail!("Threshold must be positive, got {}", args.threshold);
    }
    if args.subpix == 0 {
        bail!("Sub-pixel divisor must be >= 1");
    }

    let model = open_model(args.inputs.as_slice(), &args.value).context("Cannot set up binning")?;
    let value_descr = model.value_spec().to_string();
    info!("Using value {}", value_descr);

    let history: Vec<String> = history_lines(args, &value_descr)
        .into_iter()
        .map(|line| format!("{}{}", HISTORY_PREFIX, line))
        .collect();
    if args.verbose {
        println!("\nHeader lines written to output files:");
        for line in &history {
            println!("{}", line);
        }
        println!();
    }

    let mut binner = Binner::new(model.as_ref(), args.threshold).with_sub_bin(args.subpix);
    if args.contig {
        binner = binner.with_contiguous();
    }
    if let Some(mask_path) = &args.mask {
        let mask = read_image(mask_path)
            .with_context(|| format!("Failed to load mask {}", mask_path.display()))?;
        binner = binner.with_mask(mask.raster, args.invertmask)?;
    } else if args.invertmask {
        warn!("--invertmask given without --mask, ignoring");
    }

    let output = binner.bin();
    let position = model.position();

    let outputs = [
        (&args.out, &output.value, "output image", Some(-1.0)),
        (&args.error, &output.error, "error map", Some(-1.0)),
        (&args.binmap, &output.binmap, "bin map", None),
    ];
    for (path, raster, kind, null) in outputs {
        let mut writer = FitsWriter::new(path)
            .with_position(position)
            .with_history(format!("{}file is {}", HISTORY_PREFIX, kind))
            .with_history_lines(history.iter().cloned());
        if let Some(null) = null {
            writer = writer.with_null(null);
        }
        writer
            .write(raster)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {} to {}", kind, path.display());
    }

    Ok(())
}

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use adaptbin::{open_model, read_image, BinError, Binner, FitsWriter, PositionCards, Raster};
use approx::assert_relative_eq;
use tempfile::TempDir;

fn write_image(dir: &TempDir, name: &str, image: &Raster) -> PathBuf {
    let path = dir.path().join(name);
    let position = PositionCards::new(vec!["CRVAL1  =                 83.6".to_string()]);
    FitsWriter::new(&path)
        .with_position(&position)
        .write(image)
        .unwrap();
    path
}

fn gradient(width: usize, height: usize) -> Raster {
    let mut r = Raster::new(width, height);
    for y in 0..height {
        for x in 0..width {
            r.set(x, y, (1 + x * 3 + y) as f64);
        }
    }
    r
}

fn bin_ids(binmap: &Raster) -> BTreeSet<i64> {
    binmap.to_vec().iter().map(|&v| v as i64).collect()
}

#[test]
fn test_count_run_from_files_subtracts_background() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_image(&dir, "flat.fits", &Raster::filled(4, 4, 11.0));
    let path = path.to_str().unwrap();

    let model = open_model(&[path, "bg=1"], "count(0)").unwrap();
    assert_eq!(model.value_spec().to_string(), "count(0)");
    assert_eq!(model.position().cards(), ["CRVAL1  =                 83.6"]);

    let output = Binner::new(model.as_ref(), 0.1).bin();
    assert_eq!(output.map.count_unassigned(), 0);
    for v in output.value.to_vec() {
        assert_relative_eq!(v, 10.0, epsilon = 1e-9);
    }
    let expected: BTreeSet<i64> = (0..output.bins as i64).collect();
    assert_eq!(bin_ids(&output.binmap), expected);
}

#[test]
fn test_ratio_and_external_models_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let soft = write_image(&dir, "soft.fits", &gradient(6, 5));
    let hard = write_image(&dir, "hard.fits", &Raster::filled(6, 5, 20.0));
    let errors = write_image(&dir, "err.fits", &Raster::filled(6, 5, 2.0));
    let (soft, hard, errors) = (
        soft.to_str().unwrap(),
        hard.to_str().unwrap(),
        errors.to_str().unwrap(),
    );

    let ratio = open_model(&[soft, hard], "ratio(0, 1)").unwrap();
    assert_eq!(ratio.value_spec().to_string(), "ratio(0, 1)");
    let output = Binner::new(ratio.as_ref(), 0.3).with_sub_bin(2).bin();
    assert_eq!(output.map.count_unassigned(), 0);
    assert!(output.value.to_vec().iter().all(|v| *v > 0.0));

    let external = open_model(&[hard, errors], "external_abs(0)").unwrap();
    let output = Binner::new(external.as_ref(), 0.05).bin();
    // A single pixel has 2/20 = 0.1; a 2x2 block reaches 0.05.
    assert_relative_eq!(output.error.get(0, 0), 0.05, epsilon = 1e-12);
    for v in output.value.to_vec() {
        assert_relative_eq!(v, 20.0, epsilon = 1e-9);
    }

    let err = open_model(&[soft, "bg=1"], "external(0)").err().unwrap();
    assert!(matches!(err.downcast_ref::<BinError>(), Some(BinError::InvalidArguments(_))));
}

#[test]
fn test_mismatched_ratio_inputs_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_image(&dir, "a.fits", &Raster::filled(4, 4, 5.0));
    let b = write_image(&dir, "b.fits", &Raster::filled(4, 3, 5.0));
    let err = open_model(&[a.to_str().unwrap(), b.to_str().unwrap()], "ratio(0,1)")
        .err()
        .unwrap();
    assert!(matches!(
        err.downcast_ref::<BinError>(),
        Some(BinError::DimensionMismatch { .. })
    ));
}

fn history_of(path: &Path) -> String {
    String::from_utf8_lossy(&fs::read(path).unwrap()).to_string()
}

#[test]
fn test_command_line_run_writes_three_maps() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_image(&dir, "counts.fits", &gradient(8, 6));
    let mut mask = Raster::new(8, 6);
    mask.set(0, 0, 1.0);
    let mask_path = write_image(&dir, "mask.fits", &mask);
    let out = dir.path().join("out.fits");
    let err = dir.path().join("err.fits");
    let binmap = dir.path().join("binmap.fits");

    let status = Command::new(env!("CARGO_BIN_EXE_adaptbin"))
        .arg(&input)
        .args(["bg=0", "-t", "0.15", "-s", "2", "-c"])
        .arg("-m")
        .arg(&mask_path)
        .arg("-o")
        .arg(&out)
        .arg("-e")
        .arg(&err)
        .arg("--binmap")
        .arg(&binmap)
        .status()
        .unwrap();
    assert!(status.success());

    let value = read_image(&out).unwrap();
    assert!(value.raster.get(0, 0).is_nan());
    assert_eq!(value.position.cards(), ["CRVAL1  =                 83.6"]);
    let error = read_image(&err).unwrap();
    assert!(error.raster.get(0, 0).is_nan());
    let bins = read_image(&binmap).unwrap();
    assert_eq!(bins.raster.get(0, 0), -1.0);
    assert!(bins.raster.to_vec()[1..].iter().all(|v| *v >= 0.0));

    let header = history_of(&out);
    assert!(header.contains("HISTORY adbin: file is output image"));
    assert!(header.contains("HISTORY adbin: value: count(0)"));
    assert!(header.contains("HISTORY adbin: contig: true"));
    assert!(history_of(&err).contains("HISTORY adbin: file is error map"));
    assert!(history_of(&binmap).contains("HISTORY adbin: file is bin map"));
}

#[test]
fn test_command_line_reports_bad_value() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_image(&dir, "counts.fits", &gradient(4, 4));
    let output = Command::new(env!("CARGO_BIN_EXE_adaptbin"))
        .arg(&input)
        .args(["-v", "median(3)"])
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

use std::fs::File;
use std::io::Write;

use rstest::rstest;
use tempfile::tempdir;
use vent_config::load_waveform_csv;

fn write_csv(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wave.csv");
    let mut f = File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    (dir, path)
}

#[rstest]
fn loads_samples_in_order() {
    let (_dir, path) = write_csv("drive\n0\n100\n 512 \n1023\n");
    let samples = load_waveform_csv(&path).unwrap();
    assert_eq!(samples, vec![0, 100, 512, 1023]);
}

#[rstest]
fn rejects_wrong_header() {
    let (_dir, path) = write_csv("raw,grams\n1,2\n3,4\n");
    let err = load_waveform_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("single header 'drive'"));
}

#[rstest]
fn reports_bad_row_by_line() {
    let (_dir, path) = write_csv("drive\n10\n70000\n");
    let err = load_waveform_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("invalid CSV row 3"));
}

#[rstest]
fn rejects_single_sample() {
    let (_dir, path) = write_csv("drive\n10\n");
    let err = load_waveform_csv(&path).unwrap_err();
    assert!(format!("{err}").contains("at least two samples"));
}

#[rstest]
fn missing_file_is_an_error() {
    let dir = tempdir().unwrap();
    let err = load_waveform_csv(&dir.path().join("nope.csv")).unwrap_err();
    assert!(format!("{err}").contains("open waveform CSV"));
}

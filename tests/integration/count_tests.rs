//! Nuclei counting integration tests.
//!
//! Tests verify:
//! - k separate nuclei in a tissue tile give a count of k
//! - A tile without nuclei still gets a row, with empty aggregates
//! - Re-running appends duplicate rows under a single header
//! - Hidden and broken files never produce rows

use std::path::Path;

use slide_sieve::nuclei::{analyze_tile, count_nuclei, FeatureTable, NucleiParams, COLUMNS};

use super::test_utils::{save_tile, tissue_tile};

fn read_rows(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect();
    (header, rows)
}

#[test]
fn test_counts_separate_nuclei() {
    let dir = tempfile::tempdir().unwrap();
    let spots = [(30, 30), (60, 40), (90, 90), (40, 95)];
    let path = save_tile(dir.path(), "s1_0_0.png", &tissue_tile(&spots));

    let features = analyze_tile(&path, &NucleiParams::default()).unwrap();
    assert_eq!(features.count, 4);
    let mean_area = features.mean_area.unwrap();
    assert!((mean_area - 36.0).abs() < 1e-9);
    assert!(features.mean_perimeter.unwrap() > 0.0);
    let solidity = features.mean_solidity.unwrap();
    assert!(solidity > 0.0 && solidity <= 1.0);
    assert!(features.median_eccentricity.unwrap().is_finite());
}

#[test]
fn test_table_rows_and_single_header() {
    let dir = tempfile::tempdir().unwrap();
    let tiles = dir.path().join("tiles");
    save_tile(&tiles, "s1/s1_0_0.png", &tissue_tile(&[(30, 30), (80, 60)]));
    save_tile(&tiles, "s1/s1_0_448.png", &tissue_tile(&[]));
    let table_path = dir.path().join("nuclei.csv");
    let params = NucleiParams::default();

    for _ in 0..2 {
        let mut table = FeatureTable::open(&table_path).unwrap();
        let summary = count_nuclei(&tiles, &mut table, &params).unwrap();
        assert_eq!(summary.seen, 2);
        assert_eq!(summary.written, 2);
        assert_eq!(summary.failures, 0);
    }

    let text = std::fs::read_to_string(&table_path).unwrap();
    assert_eq!(text.matches("filename,filepath").count(), 1);

    let (header, rows) = read_rows(&table_path);
    assert_eq!(header, COLUMNS);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0], rows[2]);
    assert_eq!(rows[1], rows[3]);

    assert_eq!(rows[0][0], "s1_0_0.png");
    assert!(rows[0][1].ends_with("s1_0_0.png"));
    assert_eq!(rows[0][2], "2");
    assert!(rows[0][3..].iter().all(|v| !v.is_empty()));

    assert_eq!(rows[1][0], "s1_0_448.png");
    assert_eq!(rows[1][2], "0");
    assert!(rows[1][3..].iter().all(|v| v.is_empty()));
}

#[test]
fn test_failures_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let tiles = dir.path().join("tiles");
    save_tile(&tiles, "s1_0_0.png", &tissue_tile(&[(50, 50)]));
    // All background: no tissue, so no contrast range
    save_tile(
        &tiles,
        "s1_0_448.png",
        &image::RgbImage::from_pixel(64, 64, image::Rgb([255, 255, 255])),
    );
    std::fs::write(tiles.join("s1_448_0.png"), b"truncated").unwrap();
    std::fs::write(tiles.join("._s1_0_0.png"), b"resource fork").unwrap();

    let table_path = dir.path().join("nuclei.csv");
    let mut table = FeatureTable::open(&table_path).unwrap();
    let summary = count_nuclei(&tiles, &mut table, &NucleiParams::default()).unwrap();

    assert_eq!(summary.seen, 3);
    assert_eq!(summary.written, 1);
    assert_eq!(summary.failures, 2);
    assert_eq!(summary.skipped_hidden, 1);
    // The counter never deletes
    assert!(tiles.join("._s1_0_0.png").exists());
    assert!(tiles.join("s1_448_0.png").exists());

    let (_, rows) = read_rows(&table_path);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][2], "1");
}

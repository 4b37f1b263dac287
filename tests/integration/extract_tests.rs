//! Tile extraction integration tests.
//!
//! Tests verify:
//! - Only the central half of the series is ever requested
//! - Background and pen-mark tiles are rejected and never written
//! - Accepted tiles are resized and named after their region origin

use image::{Rgb, RgbImage};

use slide_sieve::slide::{SeriesSelector, TiffSlide};
use slide_sieve::tile::{extract_tiles, ExtractorParams, TileFilterParams};

use super::test_utils::{half_tissue_slide, RecordingSlide, SeriesSpec, SlideBuilder};

fn small_params(region_size: u32, tile_size: u32) -> ExtractorParams {
    ExtractorParams {
        selector: SeriesSelector::Index(0),
        region_size,
        tile_size,
        filter: TileFilterParams::default(),
    }
}

fn write_slide(dir: &std::path::Path, name: &str, spec: SeriesSpec) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, SlideBuilder::new().add_series(spec).build()).unwrap();
    path
}

fn tile_names(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_extracts_tissue_and_rejects_glass() {
    let dir = tempfile::tempdir().unwrap();
    let slide_path = write_slide(
        dir.path(),
        "case-3.tif",
        SeriesSpec::raw(half_tissue_slide(512, 512), 64),
    );
    let output_root = dir.path().join("tiles");

    let slide = TiffSlide::open_path(&slide_path).await.unwrap();
    let summary = extract_tiles(&slide, "case-3", &output_root, &small_params(64, 32))
        .await
        .unwrap();

    // Central range is [128, 384) on both axes: 4 x 4 regions
    assert_eq!(summary.visited, 16);
    assert_eq!(summary.saved, 8);
    assert_eq!(summary.rejected_white, 8);
    assert_eq!(summary.rejected_color, 0);
    assert_eq!(summary.read_failures, 0);
    assert_eq!(summary.output_dir, output_root.join("case-3"));

    let names = tile_names(&summary.output_dir);
    assert_eq!(names.len(), 8);
    assert!(names.contains(&"case-3_128_128.tiff".to_string()));
    assert!(names.contains(&"case-3_192_320.tiff".to_string()));
    assert!(!names.iter().any(|n| n.starts_with("case-3_256_")));

    let tile = image::open(summary.output_dir.join("case-3_128_128.tiff")).unwrap();
    assert_eq!((tile.width(), tile.height()), (32, 32));
}

#[tokio::test]
async fn test_requests_stay_inside_central_half() {
    let dir = tempfile::tempdir().unwrap();
    let data = SlideBuilder::new()
        .add_series(SeriesSpec::raw(half_tissue_slide(300, 200), 64))
        .build();
    let slide = TiffSlide::open(slide_sieve::io::MemoryRangeReader::new(data, "odd.tif"))
        .await
        .unwrap();
    let slide = RecordingSlide::new(slide);

    extract_tiles(&slide, "odd", dir.path(), &small_params(64, 32))
        .await
        .unwrap();

    // x range [75, 225), y range [50, 150)
    let requests = slide.requests();
    assert!(!requests.is_empty());
    for (x, y, w, h) in requests {
        assert!(x >= 75 && x + w <= 225, "x span {}..{}", x, x + w);
        assert!(y >= 50 && y + h <= 150, "y span {}..{}", y, y + h);
    }
    // Trailing regions are clipped to the range end
    assert!(slide.requests().contains(&(203, 114, 22, 36)));
}

#[tokio::test]
async fn test_all_white_tile_is_never_written() {
    let dir = tempfile::tempdir().unwrap();
    let white = RgbImage::from_pixel(896, 896, Rgb([255, 255, 255]));
    let slide_path = write_slide(dir.path(), "blank.tif", SeriesSpec::raw(white, 256));

    let slide = TiffSlide::open_path(&slide_path).await.unwrap();
    let params = ExtractorParams {
        selector: SeriesSelector::Index(0),
        ..Default::default()
    };
    let summary = extract_tiles(&slide, "blank", &dir.path().join("tiles"), &params)
        .await
        .unwrap();

    assert_eq!(summary.visited, 1);
    assert_eq!(summary.rejected_white, 1);
    assert_eq!(summary.saved, 0);
    assert!(tile_names(&summary.output_dir).is_empty());
}

#[tokio::test]
async fn test_green_pen_mark_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    // Green ramp with black and white anchor pixels in every 32x32 cell so the
    // red and blue channels keep their range through the contrast stretch
    let image = RgbImage::from_fn(128, 128, |x, y| {
        let g = 120 + ((x + y) % 32) as u8 * 4;
        match (x % 32, y % 32) {
            (0, 0) => Rgb([255, g, 255]),
            (1, 0) => Rgb([0, g, 0]),
            _ => Rgb([10, g, 10]),
        }
    });
    let slide_path = write_slide(dir.path(), "pen.tif", SeriesSpec::raw(image, 32));

    let slide = TiffSlide::open_path(&slide_path).await.unwrap();
    let summary = extract_tiles(&slide, "pen", dir.path(), &small_params(32, 32))
        .await
        .unwrap();

    assert_eq!(summary.visited, 4);
    assert_eq!(summary.rejected_color, 4);
    assert_eq!(summary.saved, 0);
}

#[tokio::test]
async fn test_missing_series_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let slide_path = write_slide(
        dir.path(),
        "small.tif",
        SeriesSpec::raw(half_tissue_slide(64, 64), 32),
    );
    let slide = TiffSlide::open_path(&slide_path).await.unwrap();

    let params = ExtractorParams {
        selector: SeriesSelector::LargestWithin { max_dimension: 32 },
        ..small_params(32, 32)
    };
    let result = extract_tiles(&slide, "small", dir.path(), &params).await;
    assert!(result.is_err());
    assert!(!dir.path().join("small").exists());
}

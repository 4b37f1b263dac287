//! Slide reading integration tests.
//!
//! Tests verify:
//! - Little-endian, big-endian and BigTIFF containers read back exactly
//! - JPEG tiles decode, with and without shared JPEGTables
//! - Region reads spanning several tiles are stitched correctly
//! - Decoded tiles are cached between adjacent region reads

use slide_sieve::error::SlideError;
use slide_sieve::io::{BlockCache, MemoryRangeReader};
use slide_sieve::slide::{SeriesSelector, SlideReader, TiffSlide};

use super::test_utils::{
    gradient, mean_abs_diff, smooth_ramp, ByteOrderType, SeriesSpec, SlideBuilder,
    TileEncoding, TrackingReader,
};

async fn open(data: Vec<u8>) -> TiffSlide<MemoryRangeReader> {
    TiffSlide::open(MemoryRangeReader::new(data, "synthetic.tif"))
        .await
        .unwrap()
}

fn region_of(image: &image::RgbImage, x: u32, y: u32, w: u32, h: u32) -> Vec<u8> {
    image::imageops::crop_imm(image, x, y, w, h)
        .to_image()
        .into_raw()
}

// =============================================================================
// Container Variants
// =============================================================================

#[tokio::test]
async fn test_little_endian_raw_tiles() {
    let image = gradient(100, 70);
    let data = SlideBuilder::new()
        .add_series(SeriesSpec::raw(image.clone(), 32))
        .build();
    let slide = open(data).await;

    let info = slide.series_info(0).unwrap();
    assert_eq!((info.width, info.height), (100, 70));
    assert_eq!((info.tile_width, info.tile_height), (32, 32));
    assert_eq!(info.compression, "None");

    let bytes = slide.read_region(0, 20, 10, 50, 40).await.unwrap();
    assert_eq!(bytes.as_ref(), region_of(&image, 20, 10, 50, 40).as_slice());
}

#[tokio::test]
async fn test_big_endian_raw_tiles() {
    let image = gradient(64, 48);
    let data = SlideBuilder::new()
        .with_byte_order(ByteOrderType::BigEndian)
        .add_series(SeriesSpec::raw(image.clone(), 16))
        .build();
    assert_eq!(&data[..2], b"MM");
    let slide = open(data).await;

    let bytes = slide.read_region(0, 0, 0, 64, 48).await.unwrap();
    assert_eq!(bytes.as_ref(), image.as_raw().as_slice());
}

#[tokio::test]
async fn test_bigtiff_raw_tiles() {
    let image = gradient(80, 80);
    let data = SlideBuilder::new()
        .with_bigtiff(true)
        .add_series(SeriesSpec::raw(image.clone(), 32))
        .build();
    let slide = open(data).await;

    // Crosses the edge tiles, which are padded in the file
    let bytes = slide.read_region(0, 60, 60, 20, 20).await.unwrap();
    assert_eq!(bytes.as_ref(), region_of(&image, 60, 60, 20, 20).as_slice());
}

#[tokio::test]
async fn test_big_endian_bigtiff() {
    let image = gradient(40, 40);
    let data = SlideBuilder::new()
        .with_byte_order(ByteOrderType::BigEndian)
        .with_bigtiff(true)
        .add_series(SeriesSpec::raw(image.clone(), 16))
        .build();
    let slide = open(data).await;

    let bytes = slide.read_region(0, 5, 7, 30, 30).await.unwrap();
    assert_eq!(bytes.as_ref(), region_of(&image, 5, 7, 30, 30).as_slice());
}

// =============================================================================
// JPEG Tiles
// =============================================================================

#[tokio::test]
async fn test_jpeg_tiles() {
    let image = smooth_ramp(128, 128);
    let data = SlideBuilder::new()
        .add_series(
            SeriesSpec::raw(image.clone(), 64).with_encoding(TileEncoding::Jpeg { quality: 95 }),
        )
        .build();
    let slide = open(data).await;
    assert_eq!(slide.series_info(0).unwrap().compression, "JPEG");

    let bytes = slide.read_region(0, 32, 32, 64, 64).await.unwrap();
    let expected = region_of(&image, 32, 32, 64, 64);
    assert_eq!(bytes.len(), expected.len());
    assert!(mean_abs_diff(&bytes, &expected) < 4.0);
}

#[tokio::test]
async fn test_jpeg_tiles_with_shared_tables() {
    let image = smooth_ramp(128, 96);
    let data = SlideBuilder::new()
        .add_series(
            SeriesSpec::raw(image.clone(), 64)
                .with_encoding(TileEncoding::JpegSharedTables { quality: 95 })
                .with_description("Aperio Image Library v12.0.5\r\n128x96 [0,0 128x96]"),
        )
        .build();
    let slide = open(data).await;
    assert!(slide.description(0).unwrap().starts_with("Aperio"));
    assert_eq!(
        slide.series_info(0).unwrap().label.as_deref(),
        Some("Aperio Image Library v12.0.5")
    );

    let bytes = slide.read_region(0, 0, 0, 128, 96).await.unwrap();
    assert!(mean_abs_diff(&bytes, image.as_raw()) < 4.0);
}

// =============================================================================
// Series and Errors
// =============================================================================

#[tokio::test]
async fn test_pyramid_series_selection() {
    let data = SlideBuilder::new()
        .add_series(SeriesSpec::raw(gradient(256, 192), 64))
        .add_series(SeriesSpec::raw(gradient(128, 96), 64))
        .add_series(SeriesSpec::raw(gradient(64, 48), 64))
        .build();
    let slide = open(data).await;

    assert_eq!(slide.series_count(), 3);
    let within = |max_dimension| SeriesSelector::LargestWithin { max_dimension };
    assert_eq!(within(1000).resolve(&slide).unwrap(), 0);
    assert_eq!(within(200).resolve(&slide).unwrap(), 1);
    assert_eq!(within(64).resolve(&slide).unwrap(), 2);
    assert!(matches!(
        within(32).resolve(&slide),
        Err(SlideError::NoMatchingSeries { max_dimension: 32 })
    ));
    assert!(matches!(
        SeriesSelector::Index(3).resolve(&slide),
        Err(SlideError::SeriesOutOfRange { series: 3, count: 3 })
    ));
}

#[tokio::test]
async fn test_region_out_of_bounds() {
    let data = SlideBuilder::new()
        .add_series(SeriesSpec::raw(gradient(50, 50), 16))
        .build();
    let slide = open(data).await;

    assert!(matches!(
        slide.read_region(0, 40, 0, 20, 10).await,
        Err(SlideError::RegionOutOfBounds { .. })
    ));
    assert!(matches!(
        slide.read_region(1, 0, 0, 10, 10).await,
        Err(SlideError::SeriesOutOfRange { .. })
    ));
}

#[tokio::test]
async fn test_bad_magic_fails_to_open() {
    let mut data = SlideBuilder::new()
        .add_series(SeriesSpec::raw(gradient(64, 64), 32))
        .build();
    data[0] = b'X';
    let result = TiffSlide::open(MemoryRangeReader::new(data, "broken.tif")).await;
    assert!(result.is_err());
}

// =============================================================================
// Caching
// =============================================================================

#[tokio::test]
async fn test_adjacent_regions_reuse_decoded_tiles() {
    let data = SlideBuilder::new()
        .add_series(SeriesSpec::raw(gradient(128, 128), 64))
        .build();
    let reader = TrackingReader::new(data, "tracked.tif");
    let slide = TiffSlide::open(reader.clone()).await.unwrap();

    slide.read_region(0, 0, 0, 64, 64).await.unwrap();
    reader.reset_tracking();

    // Same tile again: served from the decoded tile cache
    slide.read_region(0, 10, 10, 40, 40).await.unwrap();
    assert_eq!(reader.request_count(), 0);

    // A new tile needs the file
    slide.read_region(0, 64, 64, 10, 10).await.unwrap();
    assert!(reader.request_count() > 0);
}

#[tokio::test]
async fn test_block_cache_coalesces_directory_reads() {
    let data = SlideBuilder::new()
        .add_series(SeriesSpec::raw(gradient(64, 64), 32))
        .add_series(SeriesSpec::raw(gradient(32, 32), 32))
        .build();

    let direct = TrackingReader::new(data.clone(), "direct.tif");
    TiffSlide::open(direct.clone()).await.unwrap();

    let cached = TrackingReader::new(data, "cached.tif");
    TiffSlide::open(BlockCache::new(cached.clone())).await.unwrap();

    assert!(cached.request_count() < direct.request_count());
}

mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::{init_logging, png_bytes, BrokenOracle, FixedOracle};
use image::{DynamicImage, RgbImage};
use pretty_assertions::assert_eq;
use shelfcrop_core::{BoundingBox, ContentHasher, GeometricFilter, RawRegion, Sha256Hasher};
use shelfcrop_engine::{
    discard_source, HarvestedImage, ImageOutcome, PersistOutcome, RegionOracle, RegionPersister,
    RegionPipeline, RegionProposer,
};
use tempfile::TempDir;

fn files_in(dir: &Path) -> Vec<String> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn harvested(dir: &Path, bytes: &[u8]) -> HarvestedImage {
    let fingerprint = Sha256Hasher.hash(bytes);
    let id = format!("fixture_{}", fingerprint.to_hex());
    let path = dir.join(format!("{id}.png"));
    fs::write(&path, bytes).unwrap();
    HarvestedImage {
        id,
        path,
        fingerprint,
    }
}

fn pipeline(oracle: Arc<dyn RegionOracle>, root: &Path) -> RegionPipeline {
    RegionPipeline::new(
        RegionProposer::new(oracle),
        GeometricFilter::default(),
        RegionPersister::new(root.join("crops"), root.join("meta"), "jpg").unwrap(),
    )
}

#[tokio::test]
async fn three_proposals_end_in_one_crop_and_one_row() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let image = harvested(temp.path(), &png_bytes(100, 200, 5));
    let oracle = Arc::new(FixedOracle {
        boxes: vec![
            [0.0, 0.0, 50.0, 50.0],
            [10.0, 10.0, 40.0, 120.0],
            [15.0, 20.0, 20.0, 60.0],
        ],
    });

    let outcome = pipeline(oracle, temp.path()).process(&image).await;
    assert_eq!(outcome, ImageOutcome::Persisted { regions: 1 });

    let crop_name = format!("{}_0.jpg", image.id);
    assert_eq!(files_in(&temp.path().join("crops")), vec![crop_name.clone()]);
    assert_eq!(
        files_in(&temp.path().join("meta")),
        vec![format!("{}.csv", image.id)]
    );

    let csv = fs::read_to_string(temp.path().join("meta").join(format!("{}.csv", image.id))).unwrap();
    assert_eq!(csv, format!("X,Y,W,H,FileName\n10,10,40,120,{crop_name}\n"));

    let crop = image::open(temp.path().join("crops").join(&crop_name)).unwrap();
    assert_eq!((crop.width(), crop.height()), (40, 120));
}

#[tokio::test]
async fn no_accepted_regions_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let image = harvested(temp.path(), &png_bytes(64, 64, 1));
    let oracle = Arc::new(FixedOracle {
        boxes: vec![[0.0, 0.0, 30.0, 30.0], [0.0, 0.0, 60.0, 10.0]],
    });

    let outcome = pipeline(oracle, temp.path()).process(&image).await;
    assert_eq!(outcome, ImageOutcome::NoRegions);
    assert!(files_in(&temp.path().join("crops")).is_empty());
    assert!(files_in(&temp.path().join("meta")).is_empty());

    discard_source(&image).unwrap();
    assert!(!image.path.exists());
    discard_source(&image).unwrap();
}

#[tokio::test]
async fn undecodable_image_fails_alone() {
    let temp = TempDir::new().unwrap();
    let image = harvested(temp.path(), b"definitely not an image");
    let oracle = Arc::new(FixedOracle {
        boxes: vec![[0.0, 0.0, 10.0, 30.0]],
    });

    let outcome = pipeline(oracle, temp.path()).process(&image).await;
    assert!(matches!(outcome, ImageOutcome::Failed(_)));
    assert!(!outcome.has_regions());
}

#[tokio::test]
async fn oracle_failure_is_reported_for_that_image() {
    let temp = TempDir::new().unwrap();
    let image = harvested(temp.path(), &png_bytes(16, 16, 2));

    let outcome = pipeline(Arc::new(BrokenOracle), temp.path()).process(&image).await;
    assert!(matches!(outcome, ImageOutcome::Failed(reason) if reason.starts_with("oracle")));
    assert!(files_in(&temp.path().join("crops")).is_empty());
}

#[test]
fn persisting_twice_gives_same_rows_and_crops() {
    let raster = DynamicImage::ImageRgb8(RgbImage::new(80, 160));
    let accepted = GeometricFilter::default().apply(vec![
        RawRegion::new(BoundingBox::new(0.0, 0.0, 20.0, 60.0)),
        RawRegion::new(BoundingBox::new(40.5, 10.9, 20.7, 80.2)),
    ]);
    assert_eq!(accepted.len(), 2);

    let mut results = Vec::new();
    for _ in 0..2 {
        let temp = TempDir::new().unwrap();
        let persister =
            RegionPersister::new(temp.path().join("c"), temp.path().join("m"), "png").unwrap();
        let outcome = persister.persist(&raster, &accepted, "parent").unwrap();
        let PersistOutcome::Written(record) = outcome else {
            panic!("expected written record");
        };
        let csv = fs::read_to_string(&record.metadata_path).unwrap();
        results.push((record.rows.clone(), files_in(&temp.path().join("c")), csv));
    }

    assert_eq!(results[0], results[1]);
    let (rows, crops, _) = &results[0];
    assert_eq!(rows.len(), 2);
    assert_eq!(crops, &vec!["parent_0.png".to_string(), "parent_1.png".to_string()]);
    assert_eq!((rows[1].x, rows[1].y, rows[1].width, rows[1].height), (40, 10, 20, 80));
}

#[test]
fn failed_sidecar_write_leaves_no_crops() {
    let temp = TempDir::new().unwrap();
    let crops = temp.path().join("c");
    let meta = temp.path().join("m");
    let persister = RegionPersister::new(&crops, &meta, "png").unwrap();
    fs::remove_dir(&meta).unwrap();
    fs::write(&meta, "not a directory").unwrap();

    let raster = DynamicImage::ImageRgb8(RgbImage::new(80, 160));
    let accepted = GeometricFilter::default().apply(vec![
        RawRegion::new(BoundingBox::new(0.0, 0.0, 20.0, 60.0)),
        RawRegion::new(BoundingBox::new(40.0, 10.0, 20.0, 80.0)),
    ]);
    assert_eq!(accepted.len(), 2);

    assert!(persister.persist(&raster, &accepted, "parent").is_err());
    assert!(files_in(&crops).is_empty());
}

#[test]
fn box_starting_left_of_the_image_is_cut_not_shifted() {
    let temp = TempDir::new().unwrap();
    let raster = DynamicImage::ImageRgb8(RgbImage::new(80, 160));
    let accepted = GeometricFilter::default().apply(vec![RawRegion::new(BoundingBox::new(
        -10.0, 0.0, 20.0, 60.0,
    ))]);
    let persister = RegionPersister::new(temp.path().join("c"), temp.path().join("m"), "png").unwrap();

    let PersistOutcome::Written(record) = persister.persist(&raster, &accepted, "edge").unwrap() else {
        panic!("expected written record");
    };
    let row = &record.rows[0];
    assert_eq!((row.x, row.y, row.width, row.height), (0, 0, 10, 60));
    let crop = image::open(&record.crop_paths[0]).unwrap();
    assert_eq!((crop.width(), crop.height()), (10, 60));
}

#[test]
fn persister_refuses_a_file_as_output_dir() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("m");
    fs::write(&blocker, "x").unwrap();
    assert!(RegionPersister::new(temp.path().join("c"), &blocker, "png").is_err());
}

#[test]
fn regions_outside_the_image_are_skipped() {
    let temp = TempDir::new().unwrap();
    let raster = DynamicImage::ImageRgb8(RgbImage::new(50, 50));
    let accepted = GeometricFilter::default().apply(vec![RawRegion::new(BoundingBox::new(
        500.0, 500.0, 10.0, 30.0,
    ))]);
    let persister = RegionPersister::new(temp.path().join("c"), temp.path().join("m"), "jpg").unwrap();

    let outcome = persister.persist(&raster, &accepted, "p").unwrap();
    assert_eq!(outcome, PersistOutcome::NoRegions);
    assert!(files_in(&temp.path().join("m")).is_empty());
}

#[test]
fn unknown_crop_format_is_rejected() {
    let temp = TempDir::new().unwrap();
    assert!(RegionPersister::new(temp.path(), temp.path(), "docx").is_err());
}

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use shelfcrop_core::AcceptedRegion;
use shelfcrop_logging::{pipeline_debug, pipeline_warn};

use crate::filename::{crop_filename, metadata_filename};
use crate::persist::{prepare_dir, PersistError, StagedFiles};

/// One metadata row; column order is `X, Y, W, H, FileName`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegionRow {
    #[serde(rename = "X")]
    pub x: u32,
    #[serde(rename = "Y")]
    pub y: u32,
    #[serde(rename = "W")]
    pub width: u32,
    #[serde(rename = "H")]
    pub height: u32,
    #[serde(rename = "FileName")]
    pub file_name: String,
}

/// Rows written for one parent image, named after the parent's base identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRegionRecord {
    pub name: String,
    pub rows: Vec<RegionRow>,
    pub metadata_path: PathBuf,
    pub crop_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Written(ImageRegionRecord),
    /// Nothing to crop; no files were written.
    NoRegions,
}

/// Writes one crop per accepted region plus a CSV record per parent image.
#[derive(Debug, Clone)]
pub struct RegionPersister {
    crop_dir: PathBuf,
    metadata_dir: PathBuf,
    crop_extension: String,
    crop_format: ImageFormat,
}

impl RegionPersister {
    pub fn new(
        crop_dir: impl Into<PathBuf>,
        metadata_dir: impl Into<PathBuf>,
        crop_extension: &str,
    ) -> Result<Self, PersistError> {
        let crop_extension = crop_extension.trim_start_matches('.').to_ascii_lowercase();
        let crop_format = ImageFormat::from_extension(&crop_extension)
            .filter(|format| format.can_write())
            .ok_or_else(|| PersistError::UnsupportedFormat(crop_extension.clone()))?;
        let crop_dir = crop_dir.into();
        let metadata_dir = metadata_dir.into();
        prepare_dir(&crop_dir)?;
        prepare_dir(&metadata_dir)?;
        Ok(Self {
            crop_dir,
            metadata_dir,
            crop_extension,
            crop_format,
        })
    }

    /// Crop every region out of `image` and record it under `parent`.
    ///
    /// Region boxes are truncated to integer pixels and clipped to the image; a region left
    /// with no pixels is skipped. Crop indices count written crops from zero.
    ///
    /// The crops and the sidecar are committed together: on error none of them is left behind.
    pub fn persist(
        &self,
        image: &DynamicImage,
        regions: &[AcceptedRegion],
        parent: &str,
    ) -> Result<PersistOutcome, PersistError> {
        let mut rows = Vec::with_capacity(regions.len());
        let mut crop_paths = Vec::with_capacity(regions.len());
        let mut staged = StagedFiles::new();

        for region in regions {
            let rect = region.bbox().to_pixel_rect();
            let crop = image.crop_imm(rect.x, rect.y, rect.width, rect.height);
            if crop.width() == 0 || crop.height() == 0 {
                pipeline_warn!("Region {:?} of {} lies outside the image", rect, parent);
                continue;
            }

            let file_name = crop_filename(parent, rows.len(), &self.crop_extension);
            let encoded = self.encode(crop)?;
            crop_paths.push(staged.stage(&self.crop_dir, &file_name, &encoded)?);
            rows.push(RegionRow {
                x: rect.x,
                y: rect.y,
                width: rect.width,
                height: rect.height,
                file_name,
            });
        }

        if rows.is_empty() {
            return Ok(PersistOutcome::NoRegions);
        }

        let metadata_path = staged.stage(
            &self.metadata_dir,
            &metadata_filename(parent),
            &render_rows(&rows)?,
        )?;
        staged.commit()?;
        pipeline_debug!("Wrote {} crops for {}", rows.len(), parent);

        Ok(PersistOutcome::Written(ImageRegionRecord {
            name: parent.to_string(),
            rows,
            metadata_path,
            crop_paths,
        }))
    }

    pub fn crop_dir(&self) -> &Path {
        &self.crop_dir
    }

    pub fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }

    fn encode(&self, crop: DynamicImage) -> Result<Vec<u8>, PersistError> {
        // JPEG has no alpha channel.
        let crop = match self.crop_format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(crop.to_rgb8()),
            _ => crop,
        };
        let mut buffer = Vec::new();
        crop.write_to(&mut Cursor::new(&mut buffer), self.crop_format)
            .map_err(|err| PersistError::Encode(err.to_string()))?;
        Ok(buffer)
    }
}

fn render_rows(rows: &[RegionRow]) -> Result<Vec<u8>, PersistError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|err| PersistError::Metadata(err.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|err| PersistError::Metadata(err.to_string()))
}

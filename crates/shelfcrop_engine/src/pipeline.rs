use std::fs;
use std::io;
use std::path::Path;

use image::{DynamicImage, ImageReader};
use shelfcrop_core::GeometricFilter;
use shelfcrop_logging::{pipeline_debug, pipeline_error, pipeline_info, pipeline_warn};

use crate::propose::RegionProposer;
use crate::regions::{PersistOutcome, RegionPersister};
use crate::HarvestedImage;

/// Result of running one harvested image through propose → filter → persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    Persisted { regions: usize },
    NoRegions,
    Failed(String),
}

impl ImageOutcome {
    pub fn has_regions(&self) -> bool {
        matches!(self, ImageOutcome::Persisted { .. })
    }
}

pub struct RegionPipeline {
    proposer: RegionProposer,
    filter: GeometricFilter,
    persister: RegionPersister,
}

impl RegionPipeline {
    pub fn new(proposer: RegionProposer, filter: GeometricFilter, persister: RegionPersister) -> Self {
        Self {
            proposer,
            filter,
            persister,
        }
    }

    pub fn filter(&self) -> &GeometricFilter {
        &self.filter
    }

    /// Never aborts on a bad image: decode, oracle and write failures all become
    /// [`ImageOutcome::Failed`] for this image only.
    pub async fn process(&self, image: &HarvestedImage) -> ImageOutcome {
        let raster = match load_image(&image.path) {
            Ok(raster) => raster,
            Err(err) => {
                pipeline_warn!("Cannot decode {:?}: {}", image.path, err);
                return ImageOutcome::Failed(format!("decode: {err}"));
            }
        };

        let proposals = match self.proposer.try_propose(&raster).await {
            Ok(proposals) => proposals,
            Err(err) => {
                pipeline_warn!("Oracle failed on {}: {}", image.id, err);
                return ImageOutcome::Failed(format!("oracle: {err}"));
            }
        };
        let proposed = proposals.len();
        let accepted = self.filter.apply(proposals);
        pipeline_debug!(
            "{}: {} proposals, {} accepted",
            image.id,
            proposed,
            accepted.len()
        );

        match self.persister.persist(&raster, &accepted, &image.id) {
            Ok(PersistOutcome::Written(record)) => {
                pipeline_info!("{}: persisted {} regions", image.id, record.rows.len());
                ImageOutcome::Persisted {
                    regions: record.rows.len(),
                }
            }
            Ok(PersistOutcome::NoRegions) => {
                pipeline_info!("{}: no regions found", image.id);
                ImageOutcome::NoRegions
            }
            Err(err) => {
                pipeline_error!("{}: failed to persist regions: {}", image.id, err);
                ImageOutcome::Failed(format!("persist: {err}"))
            }
        }
    }
}

/// Decode an image file, sniffing the format from its content.
pub fn load_image(path: &Path) -> Result<DynamicImage, image::ImageError> {
    ImageReader::open(path)?.with_guessed_format()?.decode()
}

/// Delete a harvested image whose processing produced nothing worth keeping.
pub fn discard_source(image: &HarvestedImage) -> io::Result<()> {
    match fs::remove_file(&image.path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}

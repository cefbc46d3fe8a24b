use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use shelfcrop_engine::{AtomicFileWriter, HarvestStats, ImageOutcome};

pub const SUMMARY_FILE: &str = "harvest_summary.json";

/// What one run did, written next to the harvested images when it ends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub query: String,
    pub started_utc: String,
    pub finished_utc: Option<String>,
    pub images_processed: usize,
    pub images_with_regions: usize,
    pub regions_persisted: usize,
    pub images_failed: usize,
    pub sources_discarded: usize,
    pub harvest: HarvestStats,
}

impl RunSummary {
    pub fn start(query: &str) -> Self {
        Self {
            query: query.to_string(),
            started_utc: Utc::now().to_rfc3339(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: &ImageOutcome) {
        self.images_processed += 1;
        match outcome {
            ImageOutcome::Persisted { regions } => {
                self.images_with_regions += 1;
                self.regions_persisted += regions;
            }
            ImageOutcome::NoRegions => {}
            ImageOutcome::Failed(_) => self.images_failed += 1,
        }
    }

    pub fn finish(&mut self, harvest: HarvestStats) {
        self.harvest = harvest;
        self.finished_utc = Some(Utc::now().to_rfc3339());
    }

    pub fn write(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        let json = serde_json::to_string_pretty(self)?;
        let path = AtomicFileWriter::new(dir.to_path_buf()).write(SUMMARY_FILE, &json)?;
        Ok(path)
    }
}

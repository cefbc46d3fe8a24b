use std::path::Path;

use shelfcrop_core::{is_fetchable_reference, ContentHasher, Fingerprint, Sha256Hasher};
use shelfcrop_logging::{pipeline_debug, pipeline_error};

use crate::fetch::Fetcher;
use crate::filename::{download_stem, image_extension};
use crate::persist::{AtomicFileWriter, PersistError};
use crate::store::FingerprintStore;
use crate::{FailureKind, FetchError, HarvestedImage};

/// What happened to one URL handed to the [`DeduplicatingFetcher`].
#[derive(Debug)]
pub enum DedupOutcome {
    Saved(HarvestedImage),
    Duplicate(Fingerprint),
    FetchFailed(FetchError),
    WriteFailed(PersistError),
}

impl DedupOutcome {
    pub fn into_image(self) -> Option<HarvestedImage> {
        match self {
            DedupOutcome::Saved(image) => Some(image),
            _ => None,
        }
    }
}

/// Fetches a URL, fingerprints the payload and saves it only if the content is new.
pub struct DeduplicatingFetcher {
    fetcher: Box<dyn Fetcher>,
    hasher: Box<dyn ContentHasher>,
}

impl DeduplicatingFetcher {
    pub fn new(fetcher: impl Fetcher + 'static) -> Self {
        Self {
            fetcher: Box::new(fetcher),
            hasher: Box::new(Sha256Hasher),
        }
    }

    pub fn with_hasher(mut self, hasher: impl ContentHasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    /// Returns the saved image, or `None` for failures and duplicates.
    pub async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        seen: &mut dyn FingerprintStore,
    ) -> Option<HarvestedImage> {
        self.fetch_outcome(url, destination, seen).await.into_image()
    }

    /// `seen` is only updated once the bytes are safely on disk; failures leave it untouched.
    pub async fn fetch_outcome(
        &self,
        url: &str,
        destination: &Path,
        seen: &mut dyn FingerprintStore,
    ) -> DedupOutcome {
        if !is_fetchable_reference(url) {
            return DedupOutcome::FetchFailed(FetchError::new(
                FailureKind::UnfetchableReference,
                "not an http(s) resource",
            ));
        }

        let output = match self.fetcher.fetch(url).await {
            Ok(output) => output,
            Err(err) => {
                pipeline_debug!("Fetch failed for {}: {}", url, err);
                return DedupOutcome::FetchFailed(err);
            }
        };

        let fingerprint = self.hasher.hash(&output.bytes);
        if seen.contains(&fingerprint) {
            pipeline_debug!("Duplicate content {} from {}", fingerprint, url);
            return DedupOutcome::Duplicate(fingerprint);
        }

        let id = download_stem(&fingerprint);
        let filename = format!("{id}.{}", image_extension(&output.bytes));
        let writer = AtomicFileWriter::new(destination.to_path_buf());
        match writer.write_bytes(&filename, &output.bytes) {
            Ok(path) => {
                seen.insert(fingerprint);
                pipeline_debug!("Saved {} ({} bytes) from {}", filename, output.bytes.len(), url);
                DedupOutcome::Saved(HarvestedImage {
                    id,
                    path,
                    fingerprint,
                })
            }
            Err(err) => {
                pipeline_error!("Failed to save {} from {}: {}", filename, url, err);
                DedupOutcome::WriteFailed(err)
            }
        }
    }
}

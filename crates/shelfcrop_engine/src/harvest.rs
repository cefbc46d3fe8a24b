use std::path::{Path, PathBuf};

use futures_util::Stream;
use serde::Serialize;
use shelfcrop_core::{is_fetchable_reference, BatchAccumulator, HarvestState};
use shelfcrop_logging::{pipeline_debug, pipeline_info, pipeline_warn};

use crate::dedup::{DedupOutcome, DeduplicatingFetcher};
use crate::source::UrlSource;
use crate::store::{FingerprintStore, MemoryFingerprintStore};
use crate::HarvestedImage;

/// Per-session state: where images go and which contents were already seen.
pub struct HarvestSession {
    destination: PathBuf,
    seen: Box<dyn FingerprintStore>,
}

impl HarvestSession {
    /// Session-only deduplication.
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self::with_store(destination, MemoryFingerprintStore::new())
    }

    pub fn with_store(
        destination: impl Into<PathBuf>,
        store: impl FingerprintStore + 'static,
    ) -> Self {
        Self {
            destination: destination.into(),
            seen: Box::new(store),
        }
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HarvestStats {
    pub candidates: usize,
    pub placeholders_skipped: usize,
    pub saved: usize,
    pub duplicates: usize,
    pub failures: usize,
    pub batches: usize,
}

/// Pull-based harvester over a [`UrlSource`], yielding saved images in fixed-size batches.
///
/// The source is closed exactly once: on exhaustion, on [`Harvester::close`], or when the
/// harvester is dropped mid-stream.
pub struct Harvester {
    query: String,
    source: Box<dyn UrlSource>,
    fetcher: DeduplicatingFetcher,
    session: HarvestSession,
    batches: BatchAccumulator<HarvestedImage>,
    stats: HarvestStats,
    closed: bool,
}

impl Harvester {
    pub fn new(
        query: impl Into<String>,
        source: impl UrlSource + 'static,
        fetcher: DeduplicatingFetcher,
        session: HarvestSession,
        batch_size: usize,
    ) -> Self {
        Self {
            query: query.into(),
            source: Box::new(source),
            fetcher,
            session,
            batches: BatchAccumulator::new(batch_size),
            stats: HarvestStats::default(),
            closed: false,
        }
    }

    pub fn state(&self) -> HarvestState {
        self.batches.state()
    }

    pub fn stats(&self) -> HarvestStats {
        self.stats
    }

    pub fn session(&self) -> &HarvestSession {
        &self.session
    }

    /// Next batch in discovery order, or `None` once the source is drained.
    ///
    /// Only a full batch or the final partial batch is returned. A drained pool triggers
    /// one `advance` on the source; if that yields nothing the harvest is over.
    pub async fn next_batch(&mut self) -> Option<Vec<HarvestedImage>> {
        if self.batches.is_exhausted() {
            return None;
        }
        self.batches.await_more();
        let mut advanced = false;

        loop {
            let candidate = match self.source.next_candidate().await {
                Some(candidate) => {
                    advanced = false;
                    candidate
                }
                None if !advanced => {
                    self.batches.await_more();
                    self.source.advance().await;
                    advanced = true;
                    continue;
                }
                None => return self.finish(),
            };

            if !is_fetchable_reference(&candidate) {
                self.stats.placeholders_skipped += 1;
                pipeline_debug!("Skipping placeholder reference {:.60}", candidate);
                continue;
            }
            self.stats.candidates += 1;

            let outcome = self
                .fetcher
                .fetch_outcome(&candidate, &self.session.destination, self.session.seen.as_mut())
                .await;
            match outcome {
                DedupOutcome::Saved(image) => {
                    self.stats.saved += 1;
                    if let Some(batch) = self.batches.push(image) {
                        self.stats.batches += 1;
                        pipeline_info!(
                            "Harvest {:?}: batch {} ready ({} images)",
                            self.query,
                            self.stats.batches,
                            batch.len()
                        );
                        return Some(batch);
                    }
                }
                DedupOutcome::Duplicate(_) => self.stats.duplicates += 1,
                DedupOutcome::FetchFailed(_) | DedupOutcome::WriteFailed(_) => {
                    self.stats.failures += 1
                }
            }
        }
    }

    /// The harvest as a stream of batches. Dropping the stream closes the source.
    pub fn into_stream(self) -> impl Stream<Item = Vec<HarvestedImage>> {
        futures_util::stream::unfold(self, |mut harvester| async move {
            let batch = harvester.next_batch().await?;
            Some((batch, harvester))
        })
    }

    /// Release the source and flush the fingerprint store. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.source.close();
        if let Err(err) = self.session.seen.flush() {
            pipeline_warn!("Failed to flush fingerprint store: {}", err);
        }
        pipeline_info!(
            "Harvest {:?} closed: {} saved, {} duplicates, {} failures, {} placeholders",
            self.query,
            self.stats.saved,
            self.stats.duplicates,
            self.stats.failures,
            self.stats.placeholders_skipped
        );
    }

    fn finish(&mut self) -> Option<Vec<HarvestedImage>> {
        let rest = self.batches.finish();
        if rest.is_some() {
            self.stats.batches += 1;
        }
        pipeline_info!(
            "Harvest {:?} exhausted after {} batches",
            self.query,
            self.stats.batches
        );
        self.close();
        rest
    }
}

impl Drop for Harvester {
    fn drop(&mut self) {
        self.close();
    }
}

use std::sync::Arc;

use anyhow::{bail, Context};
use shelfcrop_engine::{
    discard_source, prepare_dir, DeduplicatingFetcher, HarvestSession, Harvester,
    HttpRegionOracle, ListUrlSource, RegionPersister, RegionPipeline,
    RegionProposer, ReqwestFetcher, RonFingerprintStore, SearchPageSource,
};
use shelfcrop_logging::{pipeline_info, pipeline_warn};

use crate::config::HarvestConfig;
use crate::summary::RunSummary;

pub const FINGERPRINT_STORE: &str = ".fingerprints.ron";

/// Where candidate image references come from.
pub enum Candidates {
    Search,
    /// Newline-separated URLs, read from a file.
    List(String),
}

/// Harvest, then push every batch through the region pipeline before asking for the next.
pub async fn run(config: &HarvestConfig, candidates: Candidates) -> anyhow::Result<RunSummary> {
    for dir in [&config.output_dir, &config.crop_dir, &config.metadata_dir] {
        prepare_dir(dir).with_context(|| format!("preparing {}", dir.display()))?;
    }

    let session = if config.persist_fingerprints {
        let store = RonFingerprintStore::open(config.output_dir.join(FINGERPRINT_STORE))
            .context("opening fingerprint store")?;
        HarvestSession::with_store(&config.output_dir, store)
    } else {
        HarvestSession::new(&config.output_dir)
    };
    let fetcher = DeduplicatingFetcher::new(ReqwestFetcher::new(config.fetch_settings()));

    let mut harvester = match candidates {
        Candidates::List(text) => Harvester::new(
            &config.query,
            ListUrlSource::from_lines(&text, config.batch_size),
            fetcher,
            session,
            config.batch_size,
        ),
        Candidates::Search => {
            if config.query.trim().is_empty() {
                bail!("a search query is required when no URL list is given");
            }
            Harvester::new(
                &config.query,
                SearchPageSource::new(
                    &config.query,
                    config.search_settings(),
                    config.fetch_settings(),
                ),
                fetcher,
                session,
                config.batch_size,
            )
        }
    };

    let oracle = Arc::new(
        HttpRegionOracle::new(&config.oracle_endpoint).context("building oracle client")?,
    );
    let persister = RegionPersister::new(
        config.crop_dir.clone(),
        config.metadata_dir.clone(),
        &config.crop_extension,
    )
    .context("configuring crop output")?;
    let pipeline = RegionPipeline::new(
        RegionProposer::new(oracle),
        config.geometric_filter(),
        persister,
    );

    let mut summary = RunSummary::start(&config.query);
    while let Some(batch) = harvester.next_batch().await {
        pipeline_info!("Processing batch of {} images", batch.len());
        for image in &batch {
            let outcome = pipeline.process(image).await;
            summary.record(&outcome);
            if outcome.has_regions() || !config.discard_empty_sources {
                continue;
            }
            match discard_source(image) {
                Ok(()) => summary.sources_discarded += 1,
                Err(err) => pipeline_warn!("Could not discard {:?}: {}", image.path, err),
            }
        }
    }
    summary.finish(harvester.stats());
    Ok(summary)
}

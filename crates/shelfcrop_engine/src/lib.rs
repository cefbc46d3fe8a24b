//! Shelfcrop engine: fetching, harvesting, region proposal and persistence.
mod decode;
mod dedup;
mod fetch;
mod filename;
mod harvest;
mod oracle;
mod persist;
mod pipeline;
mod propose;
mod regions;
mod search;
mod source;
mod store;
mod types;

pub use decode::{decode_page, DecodeError, DecodedPage};
pub use dedup::{DedupOutcome, DeduplicatingFetcher};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use filename::{crop_filename, download_stem, image_extension, metadata_filename};
pub use harvest::{HarvestSession, HarvestStats, Harvester};
pub use oracle::{HttpRegionOracle, OracleError, OracleRegion, RegionOracle};
pub use persist::{prepare_dir, AtomicFileWriter, PersistError, StagedFiles};
pub use pipeline::{discard_source, load_image, ImageOutcome, RegionPipeline};
pub use propose::RegionProposer;
pub use regions::{ImageRegionRecord, PersistOutcome, RegionPersister, RegionRow};
pub use search::{extract_image_refs, SearchPageSource, SearchSettings};
pub use source::{ListUrlSource, UrlSource};
pub use store::{FingerprintStore, MemoryFingerprintStore, RonFingerprintStore, StoreError};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput, HarvestedImage};

//! Shelfcrop core: pure fingerprinting, region geometry, filtering and batch state.
mod batch;
mod filter;
mod fingerprint;
mod geometry;
mod reference;

pub use batch::{BatchAccumulator, HarvestState};
pub use filter::{
    retain_by_aspect, suppress_contained, AspectBounds, GeometricFilter,
    DEFAULT_CONTAINMENT_THRESHOLD,
};
pub use fingerprint::{ContentHasher, Fingerprint, Sha256Hasher};
pub use geometry::{AcceptedRegion, BoundingBox, PixelRect, RawRegion};
pub use reference::is_fetchable_reference;

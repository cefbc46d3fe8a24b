use std::cmp::Ordering;

use crate::geometry::{AcceptedRegion, RawRegion};

/// Fraction of the smaller box that must lie inside a larger one for the smaller to be dropped.
pub const DEFAULT_CONTAINMENT_THRESHOLD: f64 = 0.7;

/// Exclusive bounds on `height / width`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectBounds {
    pub low: f64,
    pub high: f64,
}

impl Default for AspectBounds {
    fn default() -> Self {
        Self { low: 1.5, high: 5.0 }
    }
}

impl AspectBounds {
    pub fn admits(&self, region: &RawRegion) -> bool {
        let bbox = &region.bbox;
        if !(bbox.width > 0.0 && bbox.height > 0.0) {
            return false;
        }
        let ratio = bbox.aspect_ratio();
        self.low < ratio && ratio < self.high
    }
}

/// Stage A: keep regions whose aspect ratio lies strictly inside `bounds`.
pub fn retain_by_aspect(regions: Vec<RawRegion>, bounds: AspectBounds) -> Vec<RawRegion> {
    regions
        .into_iter()
        .filter(|region| bounds.admits(region))
        .collect()
}

/// Stage B: drop every region that has at least `threshold` of its area inside a strictly
/// larger, still-kept region.
///
/// Pairs are visited once in index order against the current keep state; a dropped region
/// never suppresses anything afterwards. Equal-area pairs never suppress each other.
/// Survivors keep their relative input order.
pub fn suppress_contained(regions: Vec<RawRegion>, threshold: f64) -> Vec<RawRegion> {
    let areas: Vec<f64> = regions.iter().map(|r| r.bbox.area()).collect();
    let mut keep = vec![true; regions.len()];

    for i in 0..regions.len() {
        if !keep[i] {
            continue;
        }
        for j in (i + 1)..regions.len() {
            if !keep[j] {
                continue;
            }
            let (smaller, larger) = match areas[i].partial_cmp(&areas[j]) {
                Some(Ordering::Less) => (i, j),
                Some(Ordering::Greater) => (j, i),
                _ => continue,
            };
            if areas[smaller] <= 0.0 {
                continue;
            }
            let overlap = regions[smaller]
                .bbox
                .intersection_area(&regions[larger].bbox);
            if overlap <= 0.0 {
                continue;
            }
            if overlap / areas[smaller] >= threshold {
                keep[smaller] = false;
                if smaller == i {
                    break;
                }
            }
        }
    }

    regions
        .into_iter()
        .zip(keep)
        .filter_map(|(region, kept)| kept.then_some(region))
        .collect()
}

/// Aspect-ratio constraint followed by containment suppression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometricFilter {
    pub aspect: AspectBounds,
    pub containment_threshold: f64,
}

impl Default for GeometricFilter {
    fn default() -> Self {
        Self {
            aspect: AspectBounds::default(),
            containment_threshold: DEFAULT_CONTAINMENT_THRESHOLD,
        }
    }
}

impl GeometricFilter {
    pub fn new(aspect: AspectBounds, containment_threshold: f64) -> Self {
        Self {
            aspect,
            containment_threshold,
        }
    }

    pub fn apply(&self, regions: Vec<RawRegion>) -> Vec<AcceptedRegion> {
        let shaped = retain_by_aspect(regions, self.aspect);
        suppress_contained(shaped, self.containment_threshold)
            .into_iter()
            .map(|region| AcceptedRegion::new(region.bbox))
            .collect()
    }
}

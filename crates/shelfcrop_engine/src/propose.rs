use std::sync::Arc;

use image::DynamicImage;
use shelfcrop_core::RawRegion;
use shelfcrop_logging::pipeline_warn;

use crate::oracle::{OracleError, RegionOracle};

/// Thin adapter turning oracle output into raw regions.
#[derive(Clone)]
pub struct RegionProposer {
    oracle: Arc<dyn RegionOracle>,
}

impl RegionProposer {
    pub fn new(oracle: Arc<dyn RegionOracle>) -> Self {
        Self { oracle }
    }

    /// Raw regions for `image`; an oracle failure yields no regions.
    pub async fn propose(&self, image: &DynamicImage) -> Vec<RawRegion> {
        match self.try_propose(image).await {
            Ok(regions) => regions,
            Err(err) => {
                pipeline_warn!("Region oracle failed: {}", err);
                Vec::new()
            }
        }
    }

    pub async fn try_propose(&self, image: &DynamicImage) -> Result<Vec<RawRegion>, OracleError> {
        let proposals = self.oracle.generate(image).await?;
        Ok(proposals
            .iter()
            .map(|proposal| RawRegion::new(proposal.bounding_box()))
            .collect())
    }
}

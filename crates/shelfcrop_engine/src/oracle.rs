use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use shelfcrop_core::BoundingBox;

#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("failed to encode image for the oracle: {0}")]
    Encode(String),
    #[error("oracle unreachable: {0}")]
    Transport(String),
    #[error("oracle answered with status {0}")]
    HttpStatus(u16),
    #[error("oracle response not understood: {0}")]
    Decode(String),
}

/// One proposal from the segmentation oracle. Only the box is consumed; any other fields
/// in the oracle's answer are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct OracleRegion {
    /// `[x, y, width, height]` in pixels.
    pub bbox: [f64; 4],
}

impl OracleRegion {
    pub fn bounding_box(&self) -> BoundingBox {
        let [x, y, width, height] = self.bbox;
        BoundingBox::new(x, y, width, height)
    }
}

/// The external segmentation model: raster in, candidate regions out.
#[async_trait::async_trait]
pub trait RegionOracle: Send + Sync {
    async fn generate(&self, image: &DynamicImage) -> Result<Vec<OracleRegion>, OracleError>;
}

/// Oracle served over HTTP: the PNG-encoded raster is POSTed to `endpoint`, which answers
/// with a JSON array of `{"bbox": [x, y, w, h], ...}` objects.
///
/// No request timeout is applied; the oracle is expected to run locally.
#[derive(Debug, Clone)]
pub struct HttpRegionOracle {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpRegionOracle {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| OracleError::Transport(err.to_string()))?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl RegionOracle for HttpRegionOracle {
    async fn generate(&self, image: &DynamicImage) -> Result<Vec<OracleRegion>, OracleError> {
        let mut body = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut body), ImageFormat::Png)
            .map_err(|err| OracleError::Encode(err.to_string()))?;

        let response = self
            .client
            .post(self.endpoint.as_str())
            .header(CONTENT_TYPE, "image/png")
            .body(body)
            .send()
            .await
            .map_err(|err| OracleError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError::HttpStatus(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| OracleError::Transport(err.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|err| OracleError::Decode(err.to_string()))
    }
}

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use shelfcrop_engine::{
    FailureKind, FetchError, FetchMetadata, FetchOutput, Fetcher, ListUrlSource, OracleError,
    OracleRegion, RegionOracle, UrlSource,
};

pub fn init_logging() {
    shelfcrop_logging::initialize_for_tests();
}

/// Small PNG whose pixels depend on `seed`, so different seeds give different bytes.
pub fn png_bytes(width: u32, height: u32, seed: u8) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([seed, (x % 256) as u8, (y % 256) as u8])
    });
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

pub fn url(n: usize) -> String {
    format!("https://img.example.com/{n}.png")
}

/// Fetcher answering from a fixed table; unknown URLs are 404s.
#[derive(Default, Clone)]
pub struct MapFetcher {
    responses: Arc<Mutex<HashMap<String, Result<Vec<u8>, FailureKind>>>>,
    calls: Arc<AtomicUsize>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(self, url: &str, bytes: Vec<u8>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(bytes));
        self
    }

    pub fn failing(self, url: &str, kind: FailureKind) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(kind));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Fetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let entry = self.responses.lock().unwrap().get(url).cloned();
        match entry {
            Some(Ok(bytes)) => Ok(FetchOutput {
                metadata: FetchMetadata {
                    original_url: url.to_string(),
                    final_url: url.to_string(),
                    redirect_count: 0,
                    content_type: Some("image/png".to_string()),
                    byte_len: bytes.len() as u64,
                },
                bytes,
            }),
            Some(Err(kind)) => Err(FetchError::new(kind, "scripted failure")),
            None => Err(FetchError::new(FailureKind::HttpStatus(404), "not found")),
        }
    }
}

/// List source that counts `advance` and `close` calls.
pub struct TrackingSource {
    inner: ListUrlSource,
    pub advances: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl TrackingSource {
    pub fn new(pages: Vec<Vec<String>>) -> Self {
        Self {
            inner: ListUrlSource::new(pages),
            advances: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait::async_trait]
impl UrlSource for TrackingSource {
    async fn next_candidate(&mut self) -> Option<String> {
        self.inner.next_candidate().await
    }

    async fn advance(&mut self) {
        self.advances.fetch_add(1, Ordering::SeqCst);
        self.inner.advance().await;
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close();
    }
}

/// Oracle returning the same boxes for every image.
pub struct FixedOracle {
    pub boxes: Vec<[f64; 4]>,
}

#[async_trait::async_trait]
impl RegionOracle for FixedOracle {
    async fn generate(&self, _image: &DynamicImage) -> Result<Vec<OracleRegion>, OracleError> {
        Ok(self
            .boxes
            .iter()
            .map(|bbox| OracleRegion { bbox: *bbox })
            .collect())
    }
}

pub struct BrokenOracle;

#[async_trait::async_trait]
impl RegionOracle for BrokenOracle {
    async fn generate(&self, _image: &DynamicImage) -> Result<Vec<OracleRegion>, OracleError> {
        Err(OracleError::Transport("connection refused".to_string()))
    }
}

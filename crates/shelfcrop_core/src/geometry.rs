/// Axis-aligned box in pixel coordinates of its parent image: `(x, y)` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// `height / width`. Infinite or NaN for degenerate widths.
    pub fn aspect_ratio(&self) -> f64 {
        self.height / self.width
    }

    /// Area shared with `other`; zero unless the boxes overlap on both axes.
    pub fn intersection_area(&self, other: &BoundingBox) -> f64 {
        let overlap_w = (self.x + self.width).min(other.x + other.width) - self.x.max(other.x);
        let overlap_h = (self.y + self.height).min(other.y + other.height) - self.y.max(other.y);
        if overlap_w <= 0.0 || overlap_h <= 0.0 {
            return 0.0;
        }
        overlap_w * overlap_h
    }

    /// Integer pixel bounds. The part of the box left of or above the image origin is cut
    /// off first, then each component is truncated toward zero.
    pub fn to_pixel_rect(&self) -> PixelRect {
        let x = self.x.max(0.0);
        let y = self.y.max(0.0);
        let width = (self.x + self.width - x).max(0.0);
        let height = (self.y + self.height - y).max(0.0);
        PixelRect {
            x: x as u32,
            y: y as u32,
            width: width as u32,
            height: height as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Candidate region as emitted by the segmentation oracle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawRegion {
    pub bbox: BoundingBox,
}

impl RawRegion {
    pub fn new(bbox: BoundingBox) -> Self {
        Self { bbox }
    }
}

impl From<BoundingBox> for RawRegion {
    fn from(bbox: BoundingBox) -> Self {
        Self { bbox }
    }
}

/// Region that survived both geometric filter stages. Only produced by
/// [`GeometricFilter::apply`](crate::GeometricFilter::apply).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptedRegion {
    bbox: BoundingBox,
}

impl AcceptedRegion {
    pub(crate) fn new(bbox: BoundingBox) -> Self {
        Self { bbox }
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }
}

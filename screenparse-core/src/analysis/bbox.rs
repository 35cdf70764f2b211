use glam::Vec2;
use serde::{Serialize, Serializer};

/// A 2D axis-aligned bounding box in pixel space, origin at the top-left
/// of the screenshot with Y increasing downward.
///
/// Invariant: `min.x < max.x` and `min.y < max.y` for any box that
/// survives clamping; degenerate boxes report zero area.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Bbox {
    pub min: Vec2,
    pub max: Vec2,
}

impl Bbox {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Builds a box from `(x1, y1, x2, y2)` corner coordinates.
    pub fn from_xyxy(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            min: Vec2::new(x1, y1),
            max: Vec2::new(x2, y2),
        }
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn area(&self) -> f32 {
        let size = self.max - self.min;
        size.x * size.y
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) / 2.0
    }

    /// Overlapping area with `other`, 0.0 if the boxes are disjoint.
    pub fn intersection(&self, other: &Self) -> f32 {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);

        if max.x > min.x && max.y > min.y {
            (max.x - min.x) * (max.y - min.y)
        } else {
            0.0
        }
    }

    /// Intersection over union, in [0, 1].
    pub fn iou(&self, other: &Self) -> f32 {
        let intersection_area = self.intersection(other);
        let union_area = self.area() + other.area() - intersection_area;

        if union_area > 0.0 {
            intersection_area / union_area
        } else {
            0.0
        }
    }

    /// Intersection over the smaller of the two areas.
    ///
    /// More sensitive than IOU when the boxes differ widely in size: a
    /// small icon fully inside a large text block scores 1.0 here while
    /// its IOU stays near zero.
    pub fn overlap_ratio(&self, other: &Self) -> f32 {
        let intersection_area = self.intersection(other);
        let min_area = self.area().min(other.area());

        if min_area > 0.0 {
            intersection_area / min_area
        } else {
            0.0
        }
    }

    /// Whether this box completely contains `other` (boundary included).
    pub fn contains(&self, other: &Self) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    pub fn clamp(&self, min_bounds: Vec2, max_bounds: Vec2) -> Self {
        Self {
            min: self.min.max(min_bounds),
            max: self.max.min(max_bounds),
        }
    }

    pub fn clamp_mut(&mut self, min_bounds: Vec2, max_bounds: Vec2) {
        self.min = self.min.max(min_bounds);
        self.max = self.max.min(max_bounds);
    }

    /// Converts to a resolution-independent ratio box for the given image
    /// dimensions.
    pub fn to_ratio(&self, image_size: Vec2) -> RatioBox {
        RatioBox {
            x: self.min.x / image_size.x,
            y: self.min.y / image_size.y,
            w: self.width() / image_size.x,
            h: self.height() / image_size.y,
        }
    }
}

/// A bounding box expressed as fractions of the image width and height,
/// each component in [0, 1].
///
/// Serializes as `[x, y, w, h]` so callers consume it as a plain array.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RatioBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl RatioBox {
    /// Reconstructs the pixel box for the given image dimensions.
    ///
    /// Round-trip contract: `bbox.to_ratio(size).to_pixels(size)` matches
    /// the original box within one pixel of rounding tolerance.
    pub fn to_pixels(&self, image_size: Vec2) -> Bbox {
        let min = Vec2::new(self.x * image_size.x, self.y * image_size.y);
        let size = Vec2::new(self.w * image_size.x, self.h * image_size.y);
        Bbox::new(min, min + size)
    }
}

impl Serialize for RatioBox {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        [self.x, self.y, self.w, self.h].serialize(serializer)
    }
}

//! Common types for pose/object detection results.
//!
//! One inference call over one image produces a [`Detections`] set. The set preserves the engine's
//! native output order and is immutable input to annotation.

use crate::image::ImageBuffer;

/// Trait implemented by inference engines that detect posed objects in an input image.
///
/// The model value is the whole engine context: loading a model creates it, dropping it tears the
/// engine down. No process-global state is involved, which keeps engines swappable in tests.
pub trait PoseModel {
    /// Runs the model on `image` and returns all detections in the engine's native order.
    ///
    /// Box and keypoint coordinates are expressed in `image`'s pixel space. On error the caller
    /// must treat the result as absent; no partial detection set is ever returned.
    fn infer(&mut self, image: &ImageBuffer) -> anyhow::Result<Detections>;

    /// Returns the human-readable name of a class id.
    ///
    /// Unknown ids map to a fixed placeholder name rather than failing.
    fn class_name(&self, class_id: u32) -> &str;
}

/// An axis-aligned bounding box in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
}

impl BoundingBox {
    /// Creates a bounding box from two corner points, normalizing their order so that
    /// `left <= right` and `top <= bottom` always hold.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    #[inline]
    pub fn left(&self) -> i32 {
        self.left
    }

    #[inline]
    pub fn top(&self) -> i32 {
        self.top
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.right
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.bottom
    }

    #[inline]
    pub fn width(&self) -> u32 {
        (self.right - self.left) as u32
    }

    #[inline]
    pub fn height(&self) -> u32 {
        (self.bottom - self.top) as u32
    }
}

/// A 2D keypoint produced as part of a [`Detection`].
///
/// The meaning of a keypoint depends on its index in the keypoint list; coordinates are in
/// source-image pixel space.
#[derive(Debug, Clone, Copy)]
pub struct Keypoint {
    x: f32,
    y: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }
}

/// A detected object: class, confidence, bounding box, and keypoints.
///
/// Per convention, the confidence value lies between 0.0 and 1.0. Detections are immutable once
/// constructed and are discarded after the image they belong to has been annotated.
#[derive(Debug, Clone)]
pub struct Detection {
    class_id: u32,
    confidence: f32,
    bounding_box: BoundingBox,
    keypoints: Vec<Keypoint>,
}

impl Detection {
    pub fn new(class_id: u32, confidence: f32, bounding_box: BoundingBox) -> Self {
        Self {
            class_id,
            confidence,
            bounding_box,
            keypoints: Vec::new(),
        }
    }

    pub fn with_keypoints(
        class_id: u32,
        confidence: f32,
        bounding_box: BoundingBox,
        keypoints: Vec<Keypoint>,
    ) -> Self {
        Self {
            class_id,
            confidence,
            bounding_box,
            keypoints,
        }
    }

    #[inline]
    pub fn class_id(&self) -> u32 {
        self.class_id
    }

    #[inline]
    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        self.bounding_box
    }

    #[inline]
    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }
}

/// The full ordered output of one inference call.
#[derive(Debug, Clone, Default)]
pub struct Detections {
    vec: Vec<Detection>,
}

impl Detections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of detections in the set.
    pub fn len(&self) -> usize {
        self.vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    /// Appends a detection, preserving insertion order.
    pub fn push(&mut self, detection: Detection) {
        self.vec.push(detection);
    }

    /// Returns the first detection of the set, if any.
    ///
    /// Annotation draws the skeleton overlay for this detection only.
    pub fn first(&self) -> Option<&Detection> {
        self.vec.first()
    }

    /// Returns an iterator yielding the stored detections in their native order.
    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.vec.iter()
    }
}

impl FromIterator<Detection> for Detections {
    fn from_iter<I: IntoIterator<Item = Detection>>(iter: I) -> Self {
        Self {
            vec: iter.into_iter().collect(),
        }
    }
}

/// A data-driven table of keypoint links to visualize as skeleton lines.
///
/// Each entry names two keypoint indices that get a connecting line drawn between them. Entries
/// referencing keypoints a detection does not have are skipped during drawing.
#[derive(Debug, Clone)]
pub struct Skeleton {
    links: Vec<[usize; 2]>,
}

impl Skeleton {
    pub fn new(links: Vec<[usize; 2]>) -> Self {
        Self { links }
    }

    pub fn links(&self) -> &[[usize; 2]] {
        &self.links
    }
}

/// The deployed model outputs 2 keypoints with a single link between them.
impl Default for Skeleton {
    fn default() -> Self {
        Self::new(vec![[0, 1]])
    }
}

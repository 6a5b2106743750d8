//! Neural network inference via [tract](https://github.com/sonos/tract).
//!
//! [`YoloPose`] runs an ONNX pose-detection model exported in the ultralytics layout: one NCHW
//! image input and one `[1, 4 + classes + 3 * keypoints, anchors]` output holding box centers,
//! per-class scores and keypoint triples.

use std::path::Path;

use anyhow::Context;
use tract_onnx::prelude::*;
use tract_onnx::prelude::tract_ndarray::{ArrayView3, Ix3};

use crate::detection::{BoundingBox, Detection, Detections, Keypoint, PoseModel};
use crate::image::ImageBuffer;

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A pose-detection model loaded from an ONNX file.
///
/// The value owns the whole inference context; dropping it releases the model. Box and keypoint
/// coordinates returned by [`PoseModel::infer`] are mapped back into the source image's pixel
/// space.
pub struct YoloPose {
    plan: Plan,
    input_width: usize,
    input_height: usize,
    names: Vec<String>,
    threshold: f32,
    iou_threshold: f32,
}

impl YoloPose {
    pub const DEFAULT_THRESHOLD: f32 = 0.5;
    pub const DEFAULT_IOU_THRESHOLD: f32 = 0.45;

    /// Loads and optimizes an ONNX model.
    ///
    /// `names` maps class ids to display names and determines how many class-score rows the
    /// output is expected to carry.
    pub fn load<P: AsRef<Path>>(path: P, names: Vec<String>) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref(), names)
    }

    fn load_impl(path: &Path, names: Vec<String>) -> anyhow::Result<Self> {
        anyhow::ensure!(!names.is_empty(), "at least one class name is required");

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .with_context(|| format!("failed to load model '{}'", path.display()))?
            .into_optimized()?
            .into_runnable()?;

        let fact = plan.model().input_fact(0)?;
        let shape = fact
            .shape
            .as_concrete()
            .with_context(|| format!("model input shape {:?} is not concrete", fact.shape))?;
        let (input_height, input_width) = match *shape {
            [1, 3, h, w] => (h, w),
            _ => anyhow::bail!("unsupported model input shape {shape:?} (expected [1, 3, H, W])"),
        };

        Ok(Self {
            plan,
            input_width,
            input_height,
            names,
            threshold: Self::DEFAULT_THRESHOLD,
            iou_threshold: Self::DEFAULT_IOU_THRESHOLD,
        })
    }

    /// Sets the minimum confidence a detection needs to be reported.
    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    /// Returns the model's expected input size as `(width, height)`.
    pub fn input_resolution(&self) -> (usize, usize) {
        (self.input_width, self.input_height)
    }

    /// Samples the source image into the model's NCHW input tensor by nearest-neighbor stretch.
    fn input_tensor(&self, image: &ImageBuffer) -> Tensor {
        let (w, h) = (self.input_width, self.input_height);
        let (src_w, src_h) = (image.width(), image.height());
        tract_ndarray::Array4::from_shape_fn((1, 3, h, w), |(_, c, y, x)| {
            let sx = (((x as f32 + 0.5) * src_w as f32 / w as f32) as u32).min(src_w - 1);
            let sy = (((y as f32 + 0.5) * src_h as f32 / h as f32) as u32).min(src_h - 1);
            image.get(sx, sy)[c] as f32 / 255.0
        })
        .into()
    }
}

impl PoseModel for YoloPose {
    fn infer(&mut self, image: &ImageBuffer) -> anyhow::Result<Detections> {
        let tensor = self.input_tensor(image);
        let outputs = self.plan.run(tvec!(tensor.into()))?;
        let view = outputs[0].to_array_view::<f32>()?;
        let out = view.into_dimensionality::<Ix3>()?;

        let rows = out.shape()[1];
        let nc = self.names.len();
        anyhow::ensure!(
            rows > 4 + nc && (rows - 4 - nc) % 3 == 0,
            "unexpected output shape {:?} for {nc} class(es)",
            out.shape(),
        );
        let num_keypoints = (rows - 4 - nc) / 3;

        let scale = [
            image.width() as f32 / self.input_width as f32,
            image.height() as f32 / self.input_height as f32,
        ];
        let raw = decode_outputs(out, nc, num_keypoints, self.threshold, scale);
        Ok(suppress(raw, self.iou_threshold))
    }

    fn class_name(&self, class_id: u32) -> &str {
        self.names
            .get(class_id as usize)
            .map(String::as_str)
            .unwrap_or("object")
    }
}

/// Extracts all detections above `threshold` from a raw `[1, rows, anchors]` output.
///
/// `scale` maps model-input pixel coordinates back to source-image coordinates.
fn decode_outputs(
    out: ArrayView3<'_, f32>,
    num_classes: usize,
    num_keypoints: usize,
    threshold: f32,
    scale: [f32; 2],
) -> Vec<Detection> {
    let anchors = out.shape()[2];
    let mut detections = Vec::new();

    for j in 0..anchors {
        let mut class_id = 0;
        let mut confidence = f32::NEG_INFINITY;
        for c in 0..num_classes {
            let score = out[[0, 4 + c, j]];
            if score > confidence {
                class_id = c as u32;
                confidence = score;
            }
        }
        if confidence < threshold {
            continue;
        }

        let [cx, cy, w, h] = [out[[0, 0, j]], out[[0, 1, j]], out[[0, 2, j]], out[[0, 3, j]]];
        let bounding_box = BoundingBox::new(
            ((cx - w / 2.0) * scale[0]) as i32,
            ((cy - h / 2.0) * scale[1]) as i32,
            ((cx + w / 2.0) * scale[0]) as i32,
            ((cy + h / 2.0) * scale[1]) as i32,
        );

        let base = 4 + num_classes;
        let keypoints = (0..num_keypoints)
            .map(|k| {
                Keypoint::new(
                    out[[0, base + 3 * k, j]] * scale[0],
                    out[[0, base + 3 * k + 1, j]] * scale[1],
                )
            })
            .collect();

        detections.push(Detection::with_keypoints(
            class_id,
            confidence,
            bounding_box,
            keypoints,
        ));
    }

    detections
}

/// Greedy non-maximum suppression: keeps the most confident detection of each overlapping group.
fn suppress(mut raw: Vec<Detection>, iou_threshold: f32) -> Detections {
    raw.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));

    let mut detections = Detections::new();
    for candidate in raw {
        let overlaps = detections
            .iter()
            .any(|kept| iou(kept.bounding_box(), candidate.bounding_box()) >= iou_threshold);
        if !overlaps {
            detections.push(candidate);
        }
    }
    detections
}

fn iou(a: BoundingBox, b: BoundingBox) -> f32 {
    let iw = (a.right().min(b.right()) - a.left().max(b.left())).max(0) as f32;
    let ih = (a.bottom().min(b.bottom()) - a.top().max(b.top())).max(0) as f32;
    let intersection = iw * ih;

    let area_a = a.width() as f32 * a.height() as f32;
    let area_b = b.width() as f32 * b.height() as f32;
    let union = area_a + area_b - intersection;
    if union <= 0.0 {
        0.0
    } else {
        intersection / union
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tract_onnx::prelude::tract_ndarray::Array3;

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = BoundingBox::new(0, 0, 10, 10);
        let b = BoundingBox::new(20, 20, 30, 30);
        assert_eq!(iou(a, b), 0.0);
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = BoundingBox::new(5, 5, 25, 25);
        assert!((iou(a, a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn suppress_keeps_most_confident_of_overlapping_pair() {
        let overlapping = BoundingBox::new(0, 0, 100, 100);
        let shifted = BoundingBox::new(5, 5, 105, 105);
        let separate = BoundingBox::new(300, 300, 400, 400);
        let raw = vec![
            Detection::new(0, 0.6, overlapping),
            Detection::new(0, 0.9, shifted),
            Detection::new(0, 0.3, separate),
        ];

        let kept = suppress(raw, 0.45);
        assert_eq!(kept.len(), 2);
        let first = kept.first().unwrap();
        assert_eq!(first.confidence(), 0.9);
        assert_eq!(first.bounding_box(), shifted);
    }

    #[test]
    fn decode_applies_threshold_and_scale() {
        // One class, one keypoint, two anchors; only the first clears the threshold.
        let rows = 4 + 1 + 3;
        let out = Array3::from_shape_fn((1, rows, 2), |(_, row, j)| match (row, j) {
            (0, 0) => 50.0, // cx
            (1, 0) => 40.0, // cy
            (2, 0) => 20.0, // w
            (3, 0) => 10.0, // h
            (4, 0) => 0.8,  // score
            (5, 0) => 12.0, // kp x
            (6, 0) => 24.0, // kp y
            (4, 1) => 0.2,
            _ => 0.0,
        });

        let detections = decode_outputs(out.view(), 1, 1, 0.5, [2.0, 3.0]);
        assert_eq!(detections.len(), 1);

        let det = &detections[0];
        assert_eq!(det.bounding_box(), BoundingBox::new(80, 105, 120, 135));
        assert_eq!(det.keypoints().len(), 1);
        assert_eq!(det.keypoints()[0].x(), 24.0);
        assert_eq!(det.keypoints()[0].y(), 72.0);
    }
}

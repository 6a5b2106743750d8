//! Overlays detection results onto an image buffer.

use crate::detection::{Detection, Detections, Skeleton};
use crate::image::{draw, Color, ImageBuffer};

/// Presentation constants for annotation drawing.
///
/// The defaults draw blue boxes, red labels, red/yellow keypoint markers and a green link line.
#[derive(Debug, Clone)]
pub struct Style {
    pub box_color: Color,
    pub label_color: Color,
    /// Marker color per keypoint index; repeats from the start when a detection has more
    /// keypoints than colors.
    pub keypoint_colors: Vec<Color>,
    pub link_color: Color,
    pub stroke_width: u32,
    pub marker_diameter: u32,
    /// Vertical distance between a box's top edge and its label, in pixels.
    pub label_offset: i32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            box_color: Color::BLUE,
            label_color: Color::RED,
            keypoint_colors: vec![Color::RED, Color::YELLOW],
            link_color: Color::GREEN,
            stroke_width: 3,
            marker_diameter: 8,
            label_offset: 20,
        }
    }
}

/// Draws boxes, labels, keypoint markers and skeleton links for a [`Detections`] set.
#[derive(Debug, Clone, Default)]
pub struct Annotator {
    style: Style,
    skeleton: Skeleton,
}

impl Annotator {
    pub fn new(style: Style, skeleton: Skeleton) -> Self {
        Self { style, skeleton }
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Annotates `image` in place.
    ///
    /// Every detection gets its bounding box and a `"<class> <confidence>%"` label drawn above
    /// the box. Keypoint markers and skeleton links are drawn once per image, from the first
    /// detection only.
    pub fn annotate(
        &self,
        image: &mut ImageBuffer,
        detections: &Detections,
        class_name: impl Fn(u32) -> String,
    ) {
        for detection in detections.iter() {
            self.draw_box(image, detection, &class_name(detection.class_id()));
        }

        if let Some(first) = detections.first() {
            self.draw_skeleton(image, first);
        }
    }

    fn draw_box(&self, image: &mut ImageBuffer, detection: &Detection, name: &str) {
        let b = detection.bounding_box();
        draw::rect(image, b.left(), b.top(), b.width(), b.height())
            .color(self.style.box_color)
            .stroke_width(self.style.stroke_width);

        let label = label_text(name, detection.confidence());
        draw::text(image, b.left(), b.top() - self.style.label_offset, &label)
            .color(self.style.label_color)
            .align_left()
            .align_top();
    }

    fn draw_skeleton(&self, image: &mut ImageBuffer, detection: &Detection) {
        let keypoints = detection.keypoints();

        for &[a, b] in self.skeleton.links() {
            let (Some(from), Some(to)) = (keypoints.get(a), keypoints.get(b)) else {
                continue;
            };
            draw::line(
                image,
                from.x() as i32,
                from.y() as i32,
                to.x() as i32,
                to.y() as i32,
            )
            .color(self.style.link_color)
            .stroke_width(self.style.stroke_width);
        }

        for (i, keypoint) in keypoints.iter().enumerate() {
            let color = self.style.keypoint_colors[i % self.style.keypoint_colors.len()];
            draw::circle(
                image,
                keypoint.x() as i32,
                keypoint.y() as i32,
                self.style.marker_diameter,
            )
            .color(color)
            .filled();
        }
    }
}

/// Formats a detection label: class name plus confidence as a percentage with one decimal.
fn label_text(name: &str, confidence: f32) -> String {
    format!("{} {:.1}%", name, confidence * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{BoundingBox, Keypoint};
    use crate::image::PixelFormat;

    fn detection(left: i32, top: i32, keypoints: &[(f32, f32)]) -> Detection {
        Detection::with_keypoints(
            0,
            0.9,
            BoundingBox::new(left, top, left + 30, top + 30),
            keypoints.iter().map(|&(x, y)| Keypoint::new(x, y)).collect(),
        )
    }

    #[test]
    fn label_formats_confidence_to_one_decimal() {
        assert_eq!(label_text("widget", 0.876), "widget 87.6%");
        assert_eq!(label_text("widget", 1.0), "widget 100.0%");
    }

    #[test]
    fn label_is_anchored_above_the_box() {
        // Box top at y=20 with the default offset of 20 puts the label's top row at y=0.
        let mut image = ImageBuffer::new(120, 120, PixelFormat::Rgb888);
        let detections = [detection(10, 20, &[])].into_iter().collect();
        Annotator::default().annotate(&mut image, &detections, |_| "widget".into());

        let label_rows = (0..10)
            .flat_map(|y| (10..110).map(move |x| (x, y)))
            .filter(|&(x, y)| image.get(x, y) == Color::RED)
            .count();
        assert!(label_rows > 0, "no label pixels in rows 0..10");
    }

    #[test]
    fn skeleton_drawn_for_first_detection_only() {
        let mut image = ImageBuffer::new(200, 200, PixelFormat::Rgb888);
        let detections = [
            detection(5, 40, &[(20.0, 150.0), (60.0, 150.0)]),
            detection(80, 40, &[(120.0, 150.0), (160.0, 150.0)]),
            detection(150, 40, &[(20.0, 180.0), (60.0, 180.0)]),
        ]
        .into_iter()
        .collect();
        Annotator::default().annotate(&mut image, &detections, |_| "widget".into());

        // First detection: markers at both keypoints, a link between them.
        assert_eq!(image.get(20, 150), Color::RED);
        assert_eq!(image.get(60, 150), Color::YELLOW);
        assert_eq!(image.get(40, 150), Color::GREEN);

        // Later detections get no keypoint overlay.
        assert_eq!(image.get(120, 150), Color::BLACK);
        assert_eq!(image.get(160, 150), Color::BLACK);
        assert_eq!(image.get(20, 180), Color::BLACK);

        // But every detection gets its box.
        for left in [5, 80, 150] {
            assert_eq!(image.get(left as u32 + 15, 40), Color::BLUE);
        }
    }

    #[test]
    fn out_of_range_skeleton_links_are_skipped() {
        let mut image = ImageBuffer::new(100, 100, PixelFormat::Rgb888);
        let annotator = Annotator::new(Style::default(), Skeleton::new(vec![[0, 5]]));
        let detections = [detection(10, 40, &[(20.0, 80.0), (40.0, 80.0)])]
            .into_iter()
            .collect();

        // Must not panic; the link is ignored, the markers still render.
        annotator.annotate(&mut image, &detections, |_| "widget".into());
        assert_eq!(image.get(20, 80), Color::RED);
    }
}

use std::path::PathBuf;

/// An axis-aligned box in normalized `[0, 1]` coordinates, matching the
/// upstream detector's output space before it is scaled back to pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
}

impl BBox {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> f32 {
        (self.x_max - self.x_min).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y_max - self.y_min).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn intersection(&self, other: &BBox) -> f32 {
        let x_min = self.x_min.max(other.x_min);
        let y_min = self.y_min.max(other.y_min);
        let x_max = self.x_max.min(other.x_max);
        let y_max = self.y_max.min(other.y_max);
        (x_max - x_min).max(0.0) * (y_max - y_min).max(0.0)
    }

    pub fn iou(&self, other: &BBox) -> f32 {
        let inter = self.intersection(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }

    /// Scale a box out of normalized `[0, 1]` coordinates into detector
    /// pixel space, matching the upstream's per-axis `q_size`/`angular_size`
    /// scaling.
    pub fn scale_to(&self, width: f32, height: f32) -> BBox {
        BBox::new(
            self.x_min * width,
            self.y_min * height,
            self.x_max * width,
            self.y_max * height,
        )
    }

    pub fn center(&self) -> (f32, f32) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }
}

/// One detected peak: its box, the model's confidence, a class label,
/// and the extracted peak intensity from the source image.
#[derive(Debug, Clone)]
pub struct Detection {
    pub bbox: BBox,
    pub score: f32,
    pub label: u32,
    pub peak_intensity: f32,
}

/// The Detector stage's output for one processed frame.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub source_path: PathBuf,
    pub cursor: u64,
    pub detections: Vec<Detection>,
}

impl DetectionResult {
    pub fn new(source_path: impl Into<PathBuf>, cursor: u64, detections: Vec<Detection>) -> Self {
        Self {
            source_path: source_path.into(),
            cursor,
            detections,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = BBox::new(0.0, 0.0, 0.5, 0.5);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        let a = BBox::new(0.0, 0.0, 0.2, 0.2);
        let b = BBox::new(0.5, 0.5, 0.7, 0.7);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn scale_to_maps_normalized_box_into_pixel_space() {
        let a = BBox::new(0.0, 0.25, 0.5, 0.75);
        let scaled = a.scale_to(1000.0, 800.0);
        assert_eq!(scaled, BBox::new(0.0, 200.0, 500.0, 600.0));
    }

    #[test]
    fn degenerate_box_has_zero_area() {
        let a = BBox::new(0.5, 0.5, 0.2, 0.9);
        assert_eq!(a.area(), 0.0);
    }
}

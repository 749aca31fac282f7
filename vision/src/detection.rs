use serde::{Deserialize, Serialize};

/// Pixel-space box as reported by the detector: left/top corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> BoundingBox {
        BoundingBox {
            left,
            top,
            width,
            height,
        }
    }

    pub fn center_x(&self) -> f32 {
        self.left as f32 + self.width as f32 / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.top as f32 + self.height as f32 / 2.0
    }

    pub fn area(&self) -> f32 {
        self.width as f32 * self.height as f32
    }
}

/// One person found in a camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub center_x: f32,
    pub bounding_box: BoundingBox,
    pub area: f32,
    pub confidence: f32,
}

impl Detection {
    pub fn new(center_x: f32, bounding_box: BoundingBox, area: f32) -> Detection {
        Detection {
            center_x,
            bounding_box,
            area,
            confidence: 1.0,
        }
    }

    /// Derive center and area from the box itself
    pub fn from_box(bounding_box: BoundingBox, confidence: f32) -> Detection {
        Detection {
            center_x: bounding_box.center_x(),
            bounding_box,
            area: bounding_box.area(),
            confidence,
        }
    }
}

/// All person detections for a single camera frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    detections: Vec<Detection>,
}

impl DetectionFrame {
    pub fn new(detections: Vec<Detection>) -> DetectionFrame {
        DetectionFrame { detections }
    }

    pub fn empty() -> DetectionFrame {
        DetectionFrame::default()
    }

    pub fn push(&mut self, detection: Detection) {
        self.detections.push(detection);
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter()
    }

    /// Largest detection by area. On equal areas the earlier entry wins.
    pub fn largest(&self) -> Option<&Detection> {
        self.detections.iter().fold(None, |best: Option<&Detection>, candidate| match best {
            Some(current) if candidate.area <= current.area => Some(current),
            _ => Some(candidate),
        })
    }
}

impl From<Vec<Detection>> for DetectionFrame {
    fn from(detections: Vec<Detection>) -> Self {
        DetectionFrame::new(detections)
    }
}

use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

/// Axis-aligned box in pixel coordinates of the image that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
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
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    pub fn center_x(&self) -> f32 {
        (self.x_min + self.x_max) * 0.5
    }

    pub fn center_y(&self) -> f32 {
        (self.y_min + self.y_max) * 0.5
    }

    pub fn is_finite(&self) -> bool {
        self.x_min.is_finite()
            && self.y_min.is_finite()
            && self.x_max.is_finite()
            && self.y_max.is_finite()
    }

    /// Height of the shared vertical extent, 0 when the boxes are disjoint.
    pub fn vertical_overlap(&self, other: &BBox) -> f32 {
        (self.y_max.min(other.y_max) - self.y_min.max(other.y_min)).max(0.0)
    }

    /// Shared vertical extent over the shorter of the two heights.
    pub fn vertical_overlap_ratio(&self, other: &BBox) -> f32 {
        span_overlap_ratio(self.y_min, self.y_max, other.y_min, other.y_max)
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    pub fn scaled(&self, factor: f32) -> BBox {
        BBox {
            x_min: self.x_min * factor,
            y_min: self.y_min * factor,
            x_max: self.x_max * factor,
            y_max: self.y_max * factor,
        }
    }
}

pub(crate) fn span_overlap_ratio(a_min: f32, a_max: f32, b_min: f32, b_max: f32) -> f32 {
    let inter = a_max.min(b_max) - a_min.max(b_min);
    if inter <= 0.0 {
        return 0.0;
    }
    let shortest = (a_max - a_min).min(b_max - b_min);
    if shortest <= 0.0 {
        return 0.0;
    }
    inter / shortest
}

/// One recognized text unit. Built by a recognizer and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    text: String,
    bbox: BBox,
    confidence: Option<f32>,
}

impl Fragment {
    pub fn new(text: impl Into<String>, bbox: BBox, confidence: Option<f32>) -> Self {
        Self {
            text: text.into(),
            bbox,
            confidence,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bbox(&self) -> &BBox {
        &self.bbox
    }

    pub fn confidence(&self) -> Option<f32> {
        self.confidence
    }

    pub fn width(&self) -> f32 {
        self.bbox.width()
    }

    pub fn height(&self) -> f32 {
        self.bbox.height()
    }

    pub fn center_x(&self) -> f32 {
        self.bbox.center_x()
    }

    pub fn center_y(&self) -> f32 {
        self.bbox.center_y()
    }

    pub fn vertical_overlap_ratio(&self, other: &Fragment) -> f32 {
        self.bbox.vertical_overlap_ratio(&other.bbox)
    }

    /// Rejects boxes the clustering stage cannot reason about.
    pub fn validate(&self) -> Result<(), ExtractError> {
        let reason = if !self.bbox.is_finite() {
            "non-finite coordinates"
        } else if self.bbox.height() <= 0.0 {
            "zero height"
        } else if self.bbox.width() <= 0.0 {
            "zero width"
        } else {
            return Ok(());
        };
        Err(ExtractError::MalformedFragment {
            text: self.text.clone(),
            reason,
        })
    }
}

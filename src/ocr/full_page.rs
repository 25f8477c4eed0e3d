use anyhow::Result;
use image::DynamicImage;

use super::{Region, TableDetector};
use crate::reconstruct::BBox;

/// Treats the whole page as a single table.
///
/// Used when no detection model is configured; the page is expected to be a
/// table already.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullPageDetector;

impl TableDetector for FullPageDetector {
    fn detect(&self, page: &DynamicImage) -> Result<Vec<Region>> {
        if page.width() == 0 || page.height() == 0 {
            return Ok(Vec::new());
        }
        Ok(vec![Region {
            bbox: BBox::new(0.0, 0.0, page.width() as f32, page.height() as f32),
            confidence: None,
        }])
    }
}

//! Table detection and text recognition backends.
//!
//! Both collaborators are opaque models. The pipeline only relies on the two
//! traits below; handles are built once at startup and shared between
//! requests, so implementations must be safe to call concurrently.

mod command;
mod engine;
mod full_page;

use anyhow::{Result, anyhow};
use image::DynamicImage;
use serde::Deserialize;
use std::sync::Arc;

use crate::reconstruct::{BBox, Fragment};
use crate::settings::{DetectorKind, Settings};

pub use command::CommandDetector;
pub use engine::{TesseractRecognizer, list_tesseract_languages};
pub use full_page::FullPageDetector;

/// One detected table, in page pixel coordinates.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Region {
    #[serde(flatten)]
    pub bbox: BBox,
    #[serde(default)]
    pub confidence: Option<f32>,
}

pub trait TableDetector: Send + Sync {
    /// Returns table regions in a deterministic order for a given page.
    fn detect(&self, page: &DynamicImage) -> Result<Vec<Region>>;
}

pub trait TextRecognizer: Send + Sync {
    /// Returns fragments with boxes in the pixel space of `crop`.
    fn recognize(&self, crop: &DynamicImage) -> Result<Vec<Fragment>>;
}

pub fn build_detector(settings: &Settings) -> Result<Arc<dyn TableDetector>> {
    match settings.detector_kind {
        DetectorKind::FullPage => Ok(Arc::new(FullPageDetector)),
        DetectorKind::Command => {
            let command = settings.detector_command.clone().ok_or_else(|| {
                anyhow!("detector.command is required when detector.kind = \"command\"")
            })?;
            Ok(Arc::new(CommandDetector::new(
                command,
                settings.detector_args.clone(),
                settings.detector_min_confidence,
                settings.detector_max_detections,
            )))
        }
    }
}

pub fn build_recognizer(settings: &Settings) -> Result<Arc<dyn TextRecognizer>> {
    let recognizer = TesseractRecognizer::new(
        &settings.recognizer_languages,
        settings.recognizer_psm,
        settings.recognizer_min_confidence,
    )?;
    Ok(Arc::new(recognizer))
}

/// Cuts the region out of the page, clamped to the page bounds.
///
/// Returns `None` when nothing of the region lies inside the page.
pub fn crop_region(page: &DynamicImage, bbox: &BBox) -> Option<DynamicImage> {
    if !bbox.is_finite() {
        return None;
    }
    let (width, height) = (page.width() as f32, page.height() as f32);
    let x0 = bbox.x_min.floor().clamp(0.0, width);
    let y0 = bbox.y_min.floor().clamp(0.0, height);
    let x1 = bbox.x_max.ceil().clamp(0.0, width);
    let y1 = bbox.y_max.ceil().clamp(0.0, height);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some(page.crop_imm(
        x0 as u32,
        y0 as u32,
        (x1 - x0) as u32,
        (y1 - y0) as u32,
    ))
}

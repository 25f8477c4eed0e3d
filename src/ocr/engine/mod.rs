mod parse;
mod preprocess;
mod tesseract;

use anyhow::{Context, Result};
use image::DynamicImage;
use std::io::Write;
use tracing::debug;

use super::TextRecognizer;
use crate::reconstruct::Fragment;

pub use tesseract::list_tesseract_languages;

/// Text recognizer backed by the `tesseract` command line tool.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    languages: String,
    psm: u32,
    min_confidence: f32,
}

impl TesseractRecognizer {
    pub fn new(languages: &str, psm: u32, min_confidence: f32) -> Result<Self> {
        Ok(Self {
            languages: tesseract::resolve_languages(languages)?,
            psm,
            min_confidence,
        })
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, crop: &DynamicImage) -> Result<Vec<Fragment>> {
        let scale = preprocess::ocr_scale(crop.width());
        let prepared = preprocess::prepare_for_ocr(crop, scale);

        let mut tmp = tempfile::Builder::new()
            .prefix("table-extractor-")
            .suffix(".png")
            .tempfile()
            .with_context(|| "failed to create temp file for OCR")?;
        prepared
            .write_to(&mut tmp, image::ImageFormat::Png)
            .with_context(|| "failed to write temp image for OCR")?;
        tmp.flush().ok();

        let tsv = tesseract::recognize_tsv(tmp.path(), &self.languages, self.psm)?;
        let fragments = rescale(parse::parse_tsv_fragments(&tsv), scale, self.min_confidence);
        debug!(
            "tesseract recognized {} fragments ({}x{}, scale {})",
            fragments.len(),
            crop.width(),
            crop.height(),
            scale
        );
        Ok(fragments)
    }
}

/// Maps boxes from the upscaled OCR image back to crop pixels.
fn rescale(fragments: Vec<Fragment>, scale: u32, min_confidence: f32) -> Vec<Fragment> {
    let factor = 1.0 / scale.max(1) as f32;
    fragments
        .into_iter()
        .filter(|fragment| {
            fragment
                .confidence()
                .is_none_or(|conf| conf >= min_confidence)
        })
        .map(|fragment| {
            Fragment::new(
                fragment.text(),
                fragment.bbox().scaled(factor),
                fragment.confidence(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::BBox;

    #[test]
    fn rescale_maps_back_and_filters() {
        let fragments = vec![
            Fragment::new("keep", BBox::new(30.0, 60.0, 90.0, 120.0), Some(0.8)),
            Fragment::new("drop", BBox::new(0.0, 0.0, 3.0, 3.0), Some(0.1)),
        ];
        let out = rescale(fragments, 3, 0.5);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text(), "keep");
        let bbox = out[0].bbox();
        assert!((bbox.x_min - 10.0).abs() < 1e-4);
        assert!((bbox.y_max - 40.0).abs() < 1e-4);
    }
}

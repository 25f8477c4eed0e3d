#![allow(dead_code)]

use anyhow::{Result, anyhow};
use image::DynamicImage;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use table_extractor_rust::ocr::{Region, TableDetector, TextRecognizer};
use table_extractor_rust::reconstruct::{BBox, Fragment};
use table_extractor_rust::{Extractor, PipelineOptions};

pub struct FixedDetector {
    pub regions: Result<Vec<Region>, String>,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl FixedDetector {
    pub fn returning(regions: Vec<Region>) -> Self {
        Self {
            regions: Ok(regions),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            regions: Err(message.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TableDetector for FixedDetector {
    fn detect(&self, _page: &DynamicImage) -> Result<Vec<Region>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        match &self.regions {
            Ok(regions) => Ok(regions.clone()),
            Err(message) => Err(anyhow!(message.clone())),
        }
    }
}

/// Recognizer keyed by crop width; unknown widths fail.
#[derive(Default)]
pub struct WidthRecognizer {
    pub by_width: HashMap<u32, Vec<Fragment>>,
    pub calls: AtomicUsize,
}

impl WidthRecognizer {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextRecognizer for WidthRecognizer {
    fn recognize(&self, crop: &DynamicImage) -> Result<Vec<Fragment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.by_width
            .get(&crop.width())
            .cloned()
            .ok_or_else(|| anyhow!("recognizer unavailable"))
    }
}

pub fn region(x_min: f32, x_max: f32) -> Region {
    Region {
        bbox: BBox::new(x_min, 0.0, x_max, 200.0),
        confidence: Some(0.9),
    }
}

pub fn frag(text: &str, cx: f32, cy: f32) -> Fragment {
    Fragment::new(
        text,
        BBox::new(cx - 20.0, cy - 6.0, cx + 20.0, cy + 6.0),
        Some(0.9),
    )
}

/// Header row plus one body row, shuffled.
pub fn sample_fragments() -> Vec<Fragment> {
    vec![
        frag("4", 200.0, 50.0),
        frag("Name", 40.0, 10.0),
        frag("blue", 120.0, 50.0),
        frag("Qty", 200.0, 10.0),
        frag("Widget", 40.0, 50.0),
    ]
}

pub fn extractor(
    detector: Arc<FixedDetector>,
    recognizer: Arc<WidthRecognizer>,
) -> Extractor {
    let options = PipelineOptions {
        concurrency: 2,
        ..PipelineOptions::default()
    };
    Extractor::new(detector, recognizer, options)
}

pub fn png_page(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    DynamicImage::new_rgb8(width, height)
        .write_to(&mut bytes, image::ImageFormat::Png)
        .expect("encode png");
    bytes.into_inner()
}

use anyhow::{Context, Result, anyhow};
use image::DynamicImage;
use std::io::Write;
use std::process::Command;
use tracing::debug;

use super::{Region, TableDetector};

/// Runs an external table detection model.
///
/// The page is written to a temporary PNG whose path is appended to the
/// configured arguments. The command prints a JSON array of
/// `{x_min, y_min, x_max, y_max, confidence?}` objects on stdout.
#[derive(Debug, Clone)]
pub struct CommandDetector {
    program: String,
    args: Vec<String>,
    min_confidence: f32,
    max_detections: usize,
}

impl CommandDetector {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        min_confidence: f32,
        max_detections: usize,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            min_confidence,
            max_detections,
        }
    }

    fn run(&self, path: &std::path::Path) -> Result<String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .output()
            .with_context(|| format!("failed to run detector command '{}'", self.program))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("detector command failed: {}", stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl TableDetector for CommandDetector {
    fn detect(&self, page: &DynamicImage) -> Result<Vec<Region>> {
        let mut tmp = tempfile::Builder::new()
            .prefix("table-extractor-")
            .suffix(".png")
            .tempfile()
            .with_context(|| "failed to create temp file for detection")?;
        page.write_to(&mut tmp, image::ImageFormat::Png)
            .with_context(|| "failed to write temp image for detection")?;
        tmp.flush().ok();

        let stdout = self.run(tmp.path())?;
        let regions = parse_regions(&stdout)?;
        let received = regions.len();
        let regions = select_regions(regions, self.min_confidence, self.max_detections);
        debug!(
            "detector returned {} regions, kept {}",
            received,
            regions.len()
        );
        Ok(regions)
    }
}

fn parse_regions(stdout: &str) -> Result<Vec<Region>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).with_context(|| "failed to parse detector output as JSON")
}

/// Keeps confident regions in the order the model returned them.
fn select_regions(regions: Vec<Region>, min_confidence: f32, max_detections: usize) -> Vec<Region> {
    regions
        .into_iter()
        .filter(|region| region.confidence.is_none_or(|conf| conf >= min_confidence))
        .take(max_detections)
        .collect()
}

use anyhow::{Context, Result};
use std::path::Path;

pub mod annotate;
pub mod error;
pub mod format;
pub mod logging;
pub mod ocr;
pub mod pipeline;
pub mod reconstruct;
pub mod server;
pub mod settings;
mod test_util;

pub use error::ExtractError;
pub use format::{RowResponse, TableResponse, format_tables};
pub use pipeline::{Extractor, PipelineOptions, Table, decode_image};

/// Runs the whole pipeline on one image file and returns the JSON response.
pub async fn extract_file(image_path: &Path, settings_path: Option<&Path>) -> Result<String> {
    let settings = settings::load_settings(settings_path)?;
    let bytes = std::fs::read(image_path)
        .with_context(|| format!("failed to read image: {}", image_path.display()))?;
    let page = decode_image(&bytes)?;

    let extractor = Extractor::new(
        ocr::build_detector(&settings)?,
        ocr::build_recognizer(&settings)?,
        PipelineOptions::from_settings(&settings),
    );
    let tables = extractor.extract(page).await?;
    format::to_json_pretty(&tables).with_context(|| "failed to serialize tables")
}

//! Page level orchestration: detect tables, recognize each region, rebuild rows.

use futures_util::stream::{self, StreamExt};
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::annotate::AnnotationSession;
use crate::error::ExtractError;
use crate::ocr::{Region, TableDetector, TextRecognizer, crop_region};
use crate::reconstruct::{ReconstructionOptions, Row, assemble_table};
use crate::settings::{FailedRegionPolicy, Settings};

/// One table of the page. `table_no` follows the detector's order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    table_no: usize,
    rows: Vec<Row>,
    error: Option<String>,
}

impl Table {
    fn new(table_no: usize, rows: Vec<Row>) -> Self {
        Self {
            table_no,
            rows,
            error: None,
        }
    }

    fn failed(table_no: usize, error: String) -> Self {
        Self {
            table_no,
            rows: Vec::new(),
            error: Some(error),
        }
    }

    pub fn table_no(&self) -> usize {
        self.table_no
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub reconstruction: ReconstructionOptions,
    pub concurrency: usize,
    pub failed_region_policy: FailedRegionPolicy,
    pub debug_output_dir: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            reconstruction: ReconstructionOptions::default(),
            concurrency: 1,
            failed_region_policy: FailedRegionPolicy::Mark,
            debug_output_dir: None,
        }
    }
}

impl PipelineOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            reconstruction: settings.reconstruction(),
            concurrency: settings.effective_region_concurrency(),
            failed_region_policy: settings.failed_region_policy,
            debug_output_dir: settings.debug_output_dir.as_ref().map(PathBuf::from),
        }
    }
}

/// Decodes an uploaded PNG or JPEG page.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ExtractError> {
    if bytes.is_empty() {
        return Err(ExtractError::InputDecode("image is empty".to_string()));
    }
    match infer::get(bytes).map(|kind| kind.mime_type()) {
        Some("image/png") | Some("image/jpeg") => {}
        Some(other) => {
            return Err(ExtractError::InputDecode(format!(
                "unsupported image type: {}",
                other
            )));
        }
        None => {
            return Err(ExtractError::InputDecode(
                "data is not a PNG or JPEG image".to_string(),
            ));
        }
    }
    image::load_from_memory(bytes).map_err(|err| ExtractError::InputDecode(err.to_string()))
}

/// Runs detection, recognition and reconstruction for one page.
///
/// Holds the long-lived collaborator handles; cheap to clone and share.
#[derive(Clone)]
pub struct Extractor {
    detector: Arc<dyn TableDetector>,
    recognizer: Arc<dyn TextRecognizer>,
    options: PipelineOptions,
}

impl Extractor {
    pub fn new(
        detector: Arc<dyn TableDetector>,
        recognizer: Arc<dyn TextRecognizer>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            detector,
            recognizer,
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Extracts every table of the page.
    ///
    /// Detection failure aborts the page. A region whose recognition fails
    /// is handled by the failed region policy and never affects the others.
    pub async fn extract(&self, page: DynamicImage) -> Result<Vec<Table>, ExtractError> {
        let page = Arc::new(page);
        let (regions, session) = self.detect(page.clone()).await?;
        info!("detected {} table regions", regions.len());
        if regions.is_empty() {
            return Ok(Vec::new());
        }

        let concurrency = self.options.concurrency.max(1);
        let mut tables: Vec<Table> = stream::iter(regions.into_iter().enumerate())
            .map(|(idx, region)| {
                self.process_region(idx + 1, region, page.clone(), session.clone())
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;
        tables.sort_by_key(Table::table_no);

        if self.options.failed_region_policy == FailedRegionPolicy::Omit {
            tables.retain(|table| !table.is_failed());
        }
        Ok(tables)
    }

    async fn detect(
        &self,
        page: Arc<DynamicImage>,
    ) -> Result<(Vec<Region>, Option<AnnotationSession>), ExtractError> {
        let detector = self.detector.clone();
        let debug_dir = self.options.debug_output_dir.clone();
        tokio::task::spawn_blocking(move || -> Result<_, ExtractError> {
            let regions = detector
                .detect(&page)
                .map_err(|err| ExtractError::Detector(format!("{:#}", err)))?;
            let session = debug_dir.and_then(|dir| {
                AnnotationSession::start(&dir, &page, &regions)
                    .map_err(|err| warn!("failed to write debug page image: {:#}", err))
                    .ok()
            });
            Ok((regions, session))
        })
        .await
        .map_err(|err| ExtractError::Detector(format!("detector task failed: {}", err)))?
    }

    async fn process_region(
        &self,
        table_no: usize,
        region: Region,
        page: Arc<DynamicImage>,
        session: Option<AnnotationSession>,
    ) -> Table {
        let recognizer = self.recognizer.clone();
        let options = self.options.reconstruction;
        let outcome = tokio::task::spawn_blocking(move || {
            recognize_region(
                recognizer.as_ref(),
                &page,
                &region,
                table_no,
                session.as_ref(),
                &options,
            )
        })
        .await
        .unwrap_or_else(|err| {
            Err(ExtractError::Recognizer(format!(
                "recognizer task failed: {}",
                err
            )))
        });

        match outcome {
            Ok(rows) => {
                debug!("table {}: {} rows", table_no, rows.len());
                Table::new(table_no, rows)
            }
            Err(err) => {
                warn!("table {}: {}", table_no, err);
                Table::failed(table_no, err.to_string())
            }
        }
    }
}

fn recognize_region(
    recognizer: &dyn TextRecognizer,
    page: &DynamicImage,
    region: &Region,
    table_no: usize,
    session: Option<&AnnotationSession>,
    options: &ReconstructionOptions,
) -> Result<Vec<Row>, ExtractError> {
    let crop = crop_region(page, &region.bbox).ok_or_else(|| {
        ExtractError::Recognizer("detected region does not overlap the page".to_string())
    })?;
    let fragments = recognizer
        .recognize(&crop)
        .map_err(|err| ExtractError::Recognizer(err.to_string()))?;
    if let Some(session) = session
        && let Err(err) = session.write_region(table_no, &crop, &fragments)
    {
        warn!("failed to write debug image for table {}: {:#}", table_no, err);
    }
    Ok(assemble_table(fragments, crop.width() as f32, options))
}

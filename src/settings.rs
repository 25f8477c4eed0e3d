use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::reconstruct::{
    DEFAULT_CELL_MERGE_EPSILON, DEFAULT_ROW_OVERLAP_THRESHOLD, ReconstructionOptions,
};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

/// What the response carries for a region whose recognition failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedRegionPolicy {
    /// Keep the table with an empty row list and an error message.
    Mark,
    /// Drop the table; the remaining tables keep their numbers.
    Omit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorKind {
    FullPage,
    Command,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub request_timeout_secs: u64,
    pub max_upload_bytes: usize,
    /// 0 means one worker per CPU.
    pub region_concurrency: usize,
    pub failed_region_policy: FailedRegionPolicy,
    pub row_overlap_threshold: f32,
    pub cell_merge_epsilon: f32,
    pub detector_kind: DetectorKind,
    pub detector_command: Option<String>,
    pub detector_args: Vec<String>,
    pub detector_min_confidence: f32,
    pub detector_max_detections: usize,
    pub recognizer_languages: String,
    pub recognizer_psm: u32,
    pub recognizer_min_confidence: f32,
    pub debug_output_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_addr: "0.0.0.0:8000".to_string(),
            request_timeout_secs: 120,
            max_upload_bytes: 20 * 1024 * 1024,
            region_concurrency: 0,
            failed_region_policy: FailedRegionPolicy::Mark,
            row_overlap_threshold: DEFAULT_ROW_OVERLAP_THRESHOLD,
            cell_merge_epsilon: DEFAULT_CELL_MERGE_EPSILON,
            detector_kind: DetectorKind::FullPage,
            detector_command: None,
            detector_args: Vec::new(),
            detector_min_confidence: 0.25,
            detector_max_detections: 1000,
            recognizer_languages: "eng".to_string(),
            recognizer_psm: 6,
            recognizer_min_confidence: 0.0,
            debug_output_dir: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    server: Option<ServerSettings>,
    pipeline: Option<PipelineSettings>,
    reconstruction: Option<ReconstructionSettings>,
    detector: Option<DetectorSettings>,
    recognizer: Option<RecognizerSettings>,
    debug: Option<DebugSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
    request_timeout_secs: Option<u64>,
    max_upload_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelineSettings {
    region_concurrency: Option<usize>,
    failed_region_policy: Option<FailedRegionPolicy>,
}

#[derive(Debug, Default, Deserialize)]
struct ReconstructionSettings {
    row_overlap_threshold: Option<f32>,
    cell_merge_epsilon: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct DetectorSettings {
    kind: Option<DetectorKind>,
    command: Option<String>,
    args: Option<Vec<String>>,
    min_confidence: Option<f32>,
    max_detections: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizerSettings {
    languages: Option<String>,
    psm: Option<u32>,
    min_confidence: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct DebugSettings {
    output_dir: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn reconstruction(&self) -> ReconstructionOptions {
        ReconstructionOptions {
            row_overlap_threshold: self.row_overlap_threshold,
            cell_merge_epsilon: self.cell_merge_epsilon,
        }
    }

    pub fn effective_region_concurrency(&self) -> usize {
        if self.region_concurrency == 0 {
            num_cpus::get().max(1)
        } else {
            self.region_concurrency
        }
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(server) = incoming.server {
            if let Some(addr) = server.addr
                && !addr.trim().is_empty()
            {
                self.server_addr = addr;
            }
            if let Some(secs) = server.request_timeout_secs
                && secs > 0
            {
                self.request_timeout_secs = secs;
            }
            if let Some(limit) = server.max_upload_bytes
                && limit > 0
            {
                self.max_upload_bytes = limit;
            }
        }
        if let Some(pipeline) = incoming.pipeline {
            if let Some(concurrency) = pipeline.region_concurrency {
                self.region_concurrency = concurrency;
            }
            if let Some(policy) = pipeline.failed_region_policy {
                self.failed_region_policy = policy;
            }
        }
        if let Some(reconstruction) = incoming.reconstruction {
            if let Some(threshold) = reconstruction.row_overlap_threshold
                && threshold > 0.0
                && threshold <= 1.0
            {
                self.row_overlap_threshold = threshold;
            }
            if let Some(epsilon) = reconstruction.cell_merge_epsilon
                && epsilon >= 0.0
                && epsilon < 1.0
            {
                self.cell_merge_epsilon = epsilon;
            }
        }
        if let Some(detector) = incoming.detector {
            if let Some(kind) = detector.kind {
                self.detector_kind = kind;
            }
            if let Some(command) = detector.command {
                self.detector_command = if command.trim().is_empty() {
                    None
                } else {
                    Some(command)
                };
            }
            if let Some(args) = detector.args {
                self.detector_args = args;
            }
            if let Some(conf) = detector.min_confidence
                && (0.0..=1.0).contains(&conf)
            {
                self.detector_min_confidence = conf;
            }
            if let Some(max) = detector.max_detections
                && max > 0
            {
                self.detector_max_detections = max;
            }
        }
        if let Some(recognizer) = incoming.recognizer {
            if let Some(languages) = recognizer.languages
                && !languages.trim().is_empty()
            {
                self.recognizer_languages = languages;
            }
            if let Some(psm) = recognizer.psm {
                self.recognizer_psm = psm;
            }
            if let Some(conf) = recognizer.min_confidence
                && (0.0..=1.0).contains(&conf)
            {
                self.recognizer_min_confidence = conf;
            }
        }
        if let Some(debug) = incoming.debug
            && let Some(dir) = debug.output_dir
        {
            self.debug_output_dir = if dir.trim().is_empty() {
                None
            } else {
                Some(dir)
            };
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".table-extractor-rust"))
        }
    })
}

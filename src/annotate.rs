//! Debug images: detected tables drawn on the page, fragments drawn on crops.

use anyhow::{Context, Result};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

use crate::ocr::Region;
use crate::reconstruct::{BBox, Fragment};

const TABLE_COLOR: Rgb<u8> = Rgb([0, 200, 0]);
const FRAGMENT_COLOR: Rgb<u8> = Rgb([220, 0, 0]);

/// Annotated images of one request, sharing a file name stem.
#[derive(Debug, Clone)]
pub struct AnnotationSession {
    dir: PathBuf,
    stem: String,
}

impl AnnotationSession {
    /// Writes the page with its detected regions and opens a session.
    pub fn start(dir: &Path, page: &DynamicImage, regions: &[Region]) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create debug dir: {}", dir.display()))?;
        let file = tempfile::Builder::new()
            .prefix("page-")
            .suffix(".png")
            .tempfile_in(dir)
            .with_context(|| "failed to create debug image file")?;
        let path = file
            .into_temp_path()
            .keep()
            .with_context(|| "failed to persist debug image file")?;
        let stem = path
            .file_stem()
            .and_then(|value| value.to_str())
            .unwrap_or("page")
            .to_string();

        let boxes = regions.iter().map(|region| region.bbox).collect::<Vec<_>>();
        save_with_boxes(page, &boxes, TABLE_COLOR, &path)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            stem,
        })
    }

    pub fn write_region(
        &self,
        table_no: usize,
        crop: &DynamicImage,
        fragments: &[Fragment],
    ) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}-table{}.png", self.stem, table_no));
        let boxes = fragments.iter().map(|f| *f.bbox()).collect::<Vec<_>>();
        save_with_boxes(crop, &boxes, FRAGMENT_COLOR, &path)?;
        Ok(path)
    }
}

fn save_with_boxes(
    image: &DynamicImage,
    boxes: &[BBox],
    color: Rgb<u8>,
    path: &Path,
) -> Result<()> {
    let mut canvas = image.to_rgb8();
    for bbox in boxes {
        draw_rect(&mut canvas, bbox, color, 2);
    }
    canvas
        .save(path)
        .with_context(|| format!("failed to write debug image: {}", path.display()))
}

/// Outlines `bbox`, growing the border inwards for each extra pixel of thickness.
fn draw_rect(canvas: &mut RgbImage, bbox: &BBox, color: Rgb<u8>, thickness: u32) {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 || !bbox.is_finite() {
        return;
    }
    let x0 = (bbox.x_min.max(0.0) as u32).min(width - 1);
    let y0 = (bbox.y_min.max(0.0) as u32).min(height - 1);
    let x1 = (bbox.x_max.max(0.0) as u32).min(width - 1);
    let y1 = (bbox.y_max.max(0.0) as u32).min(height - 1);
    if x1 < x0 || y1 < y0 {
        return;
    }
    let (w, h) = (x1 - x0 + 1, y1 - y0 + 1);

    for t in 0..thickness {
        let inner_w = w.saturating_sub(2 * t);
        let inner_h = h.saturating_sub(2 * t);
        if inner_w == 0 || inner_h == 0 {
            break;
        }
        let rect = Rect::at((x0 + t) as i32, (y0 + t) as i32).of_size(inner_w, inner_h);
        draw_hollow_rect_mut(canvas, rect, color);
    }
}

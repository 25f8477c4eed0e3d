use std::collections::BTreeMap;

use crate::reconstruct::{BBox, Fragment};

#[derive(Clone)]
struct WordToken {
    text: String,
    bbox: BBox,
    conf: f32,
    len: usize,
}

/// Builds fragments from tesseract TSV output.
///
/// Words are grouped by their tesseract line and each line is split where
/// the horizontal gap between words is large, so that every cell of a table
/// row becomes its own fragment. Confidences are normalised to 0..1.
pub(super) fn parse_tsv_fragments(tsv: &str) -> Vec<Fragment> {
    let mut word_map: BTreeMap<(i32, i32, i32, i32), Vec<WordToken>> = BTreeMap::new();

    for (idx, row) in tsv.lines().enumerate() {
        if idx == 0 {
            continue;
        }
        let cols = row.split('\t').collect::<Vec<_>>();
        if cols.len() < 12 {
            continue;
        }
        let level: i32 = cols[0].parse().unwrap_or(0);
        if level != 5 {
            continue;
        }
        let page_num: i32 = cols[1].parse().unwrap_or(0);
        let block_num: i32 = cols[2].parse().unwrap_or(0);
        let par_num: i32 = cols[3].parse().unwrap_or(0);
        let line_num: i32 = cols[4].parse().unwrap_or(0);
        let left: f32 = cols[6].parse().unwrap_or(0.0);
        let top: f32 = cols[7].parse().unwrap_or(0.0);
        let width: f32 = cols[8].parse().unwrap_or(0.0);
        let height: f32 = cols[9].parse().unwrap_or(0.0);
        let conf: f32 = cols[10].parse().unwrap_or(-1.0);
        let text = cols[11].trim();
        if text.is_empty() || conf < 0.0 {
            continue;
        }

        let key = (page_num, block_num, par_num, line_num);
        word_map.entry(key).or_default().push(WordToken {
            text: text.to_string(),
            bbox: BBox::new(left, top, left + width, top + height),
            conf,
            len: text.chars().count().max(1),
        });
    }

    let mut fragments = Vec::new();
    for (_, mut words) in word_map {
        words.sort_by(|a, b| a.bbox.x_min.total_cmp(&b.bbox.x_min));
        for segment in split_word_segments(words) {
            if let Some(fragment) = build_fragment(&segment) {
                fragments.push(fragment);
            }
        }
    }
    fragments
}

fn split_word_segments(words: Vec<WordToken>) -> Vec<Vec<WordToken>> {
    if words.len() <= 1 {
        return if words.is_empty() {
            Vec::new()
        } else {
            vec![words]
        };
    }

    let mut heights = words.iter().map(|word| word.bbox.height()).collect::<Vec<_>>();
    heights.sort_by(f32::total_cmp);
    let median_h = heights[heights.len() / 2].max(1.0);
    let gap_threshold = (median_h * 1.5).clamp(8.0, 120.0);

    let mut segments: Vec<Vec<WordToken>> = Vec::new();
    let mut current: Vec<WordToken> = Vec::new();
    let mut last_right = 0f32;
    for word in words {
        if !current.is_empty() && word.bbox.x_min - last_right > gap_threshold {
            segments.push(std::mem::take(&mut current));
        }
        last_right = if current.is_empty() {
            word.bbox.x_max
        } else {
            last_right.max(word.bbox.x_max)
        };
        current.push(word);
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

fn build_fragment(words: &[WordToken]) -> Option<Fragment> {
    let first = words.first()?;
    let text = words
        .iter()
        .map(|word| word.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    let mut bbox = first.bbox;
    let mut conf_sum = 0.0;
    let mut len_sum = 0.0;
    for word in words {
        bbox = bbox.union(&word.bbox);
        let weight = word.len as f32;
        conf_sum += word.conf * weight;
        len_sum += weight;
    }
    let confidence = if len_sum > 0.0 {
        (conf_sum / len_sum / 100.0).clamp(0.0, 1.0)
    } else {
        0.0
    };
    Some(Fragment::new(text, bbox, Some(confidence)))
}

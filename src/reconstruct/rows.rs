use super::fragment::{Fragment, span_overlap_ratio};

pub const DEFAULT_ROW_OVERLAP_THRESHOLD: f32 = 0.5;

/// Vertical extent covered by the fragments of the open row.
#[derive(Debug, Clone, Copy)]
struct Band {
    min: f32,
    max: f32,
}

impl Band {
    fn of(fragment: &Fragment) -> Self {
        Self {
            min: fragment.bbox().y_min,
            max: fragment.bbox().y_max,
        }
    }

    fn overlap_ratio(&self, fragment: &Fragment) -> f32 {
        let bbox = fragment.bbox();
        span_overlap_ratio(self.min, self.max, bbox.y_min, bbox.y_max)
    }

    fn widen(&mut self, fragment: &Fragment) {
        self.min = self.min.min(fragment.bbox().y_min);
        self.max = self.max.max(fragment.bbox().y_max);
    }
}

/// Groups well-formed fragments into rows, top to bottom.
///
/// Fragments are walked by vertical center; each one joins the open row when
/// its overlap with the row's band reaches `threshold`, otherwise it starts a
/// new row. A fragment tall enough to span two rows merges them.
pub fn cluster_rows(mut fragments: Vec<Fragment>, threshold: f32) -> Vec<Vec<Fragment>> {
    fragments.sort_by(|a, b| {
        a.center_y()
            .total_cmp(&b.center_y())
            .then_with(|| a.center_x().total_cmp(&b.center_x()))
    });

    let mut rows = Vec::new();
    let mut current: Vec<Fragment> = Vec::new();
    let mut band: Option<Band> = None;

    for fragment in fragments {
        match band.as_mut() {
            Some(open) if open.overlap_ratio(&fragment) >= threshold => {
                open.widen(&fragment);
                current.push(fragment);
            }
            _ => {
                if !current.is_empty() {
                    rows.push(std::mem::take(&mut current));
                }
                band = Some(Band::of(&fragment));
                current.push(fragment);
            }
        }
    }
    if !current.is_empty() {
        rows.push(current);
    }
    rows
}

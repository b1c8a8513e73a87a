//! Per-frame detection post-processing: decoding, confidence gating and
//! greedy non-max suppression.

use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;

/// Values per candidate in the detector's flat output: cx, cy, w, h, score, class_id
pub const RECORD_LEN: usize = 6;

/// Axis-aligned box in normalized image coordinates, center form
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

impl BBox {
    pub fn new(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self { cx, cy, w, h }
    }

    /// Corner form `[x1, y1, x2, y2]`
    pub fn corners(&self) -> [f32; 4] {
        let half_w = self.w / 2.0;
        let half_h = self.h / 2.0;
        [
            self.cx - half_w,
            self.cy - half_h,
            self.cx + half_w,
            self.cy + half_h,
        ]
    }

    pub fn is_finite(&self) -> bool {
        [self.cx, self.cy, self.w, self.h].iter().all(|v| v.is_finite())
    }

    pub fn area(&self) -> f32 {
        self.w.max(0.0) * self.h.max(0.0)
    }

    pub fn center_distance(&self, other: &BBox) -> f32 {
        (self.cx - other.cx).hypot(self.cy - other.cy)
    }

    /// Intersection over union; 0 when the union has no area
    pub fn iou(&self, other: &BBox) -> f32 {
        let a = self.corners();
        let b = other.corners();

        let x1 = a[0].max(b[0]);
        let y1 = a[1].max(b[1]);
        let x2 = a[2].min(b[2]);
        let y2 = a[3].min(b[3]);

        let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionCandidate {
    pub bbox: BBox,
    pub score: f32,
    pub class_id: u32,
    pub class_name: String,
}

impl DetectionCandidate {
    pub fn new(bbox: BBox, score: f32, class_id: u32, class_name: impl Into<String>) -> Self {
        Self {
            bbox,
            score,
            class_id,
            class_name: class_name.into(),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.bbox.is_finite() && self.score.is_finite()
    }
}

/// Class id to name lookup
#[derive(Debug, Clone, Default)]
pub struct LabelMap {
    names: Vec<String>,
}

impl LabelMap {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn name(&self, class_id: u32) -> String {
        self.names
            .get(class_id as usize)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }
}

/// Decode one frame of flat `(cx, cy, w, h, score, class_id)` records.
///
/// A truncated record, a non-finite value or a negative class id makes the whole
/// frame decode as empty.
pub fn decode_frame(raw: &[f32], labels: &LabelMap) -> Vec<DetectionCandidate> {
    if raw.len() % RECORD_LEN != 0 {
        log::warn!(
            "dropping frame: {} values is not a whole number of records",
            raw.len()
        );
        return Vec::new();
    }
    if let Some(bad) = raw.iter().find(|v| !v.is_finite()) {
        log::warn!("dropping frame: non-finite value {}", bad);
        return Vec::new();
    }

    let mut candidates = Vec::with_capacity(raw.len() / RECORD_LEN);
    for record in raw.chunks_exact(RECORD_LEN) {
        let class = record[5];
        if class < 0.0 {
            log::warn!("dropping frame: negative class id {}", class);
            return Vec::new();
        }
        let class_id = class.round() as u32;
        candidates.push(DetectionCandidate::new(
            BBox::new(record[0], record[1], record[2], record[3]),
            record[4],
            class_id,
            labels.name(class_id),
        ));
    }
    candidates
}

/// Confidence gate followed by greedy non-max suppression.
///
/// Survivors come back in descending score order, at most `max_detections` of them.
pub fn filter(
    candidates: Vec<DetectionCandidate>,
    score_threshold: f32,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<DetectionCandidate> {
    // NaN scores fail the comparison and are discarded too
    let mut ranked: Vec<DetectionCandidate> = candidates
        .into_iter()
        .filter(|c| c.score >= score_threshold && c.bbox.is_finite())
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<DetectionCandidate> = Vec::new();
    for candidate in ranked {
        if keep.len() >= max_detections {
            break;
        }
        if keep
            .iter()
            .all(|kept| kept.bbox.iou(&candidate.bbox) <= iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep
}

/// Post-processor bound to one configuration
pub struct DetectionFilter {
    score_threshold: f32,
    iou_threshold: f32,
    max_detections: usize,
    labels: LabelMap,
}

impl DetectionFilter {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            score_threshold: config.score_threshold,
            iou_threshold: config.iou_threshold,
            max_detections: config.max_detections,
            labels: LabelMap::new(config.labels.clone()),
        }
    }

    /// Filter one frame of decoded candidates; any non-finite candidate drops the
    /// whole frame, as in `decode_frame`.
    pub fn apply(&self, candidates: Vec<DetectionCandidate>) -> Vec<DetectionCandidate> {
        if let Some(bad) = candidates.iter().find(|c| !c.is_finite()) {
            log::warn!("dropping frame: non-finite candidate {:?}", bad);
            return Vec::new();
        }
        filter(
            candidates,
            self.score_threshold,
            self.iou_threshold,
            self.max_detections,
        )
    }

    /// Decode and filter one raw detector frame
    pub fn process_raw(&self, raw: &[f32]) -> Vec<DetectionCandidate> {
        self.apply(decode_frame(raw, &self.labels))
    }
}

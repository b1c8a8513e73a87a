//! Frame-to-frame identity tracking of road hazards.
//!
//! Matching is greedy and track-ordered: each existing track, oldest first, takes
//! the best remaining candidate. This is not a globally optimal assignment (no
//! Hungarian solve); two tracks competing for the same candidate resolve in favour
//! of the older track even when the other pairing would score higher overall.

use serde::{Deserialize, Serialize};

use crate::config::TrackerConfig;
use crate::detection::{BBox, DetectionCandidate};

/// A persistent hazard identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: u64,
    pub bbox: BBox,
    pub score: f32,
    pub class_id: u32,
    pub class_name: String,
    /// Consecutive frames without a match
    pub lost_count: u32,
    /// Frame in which this track was last matched or created
    pub last_frame_id: u64,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Track {
    fn new(id: u64, det: DetectionCandidate, frame_id: u64) -> Self {
        let [x1, y1, x2, y2] = det.bbox.corners();
        Self {
            id,
            bbox: det.bbox,
            score: det.score,
            class_id: det.class_id,
            class_name: det.class_name,
            lost_count: 0,
            last_frame_id: frame_id,
            x1,
            y1,
            x2,
            y2,
        }
    }

    fn update_with_detection(&mut self, det: DetectionCandidate, frame_id: u64) {
        let [x1, y1, x2, y2] = det.bbox.corners();
        self.bbox = det.bbox;
        self.score = det.score;
        self.class_id = det.class_id;
        self.class_name = det.class_name;
        self.lost_count = 0;
        self.last_frame_id = frame_id;
        self.x1 = x1;
        self.y1 = y1;
        self.x2 = x2;
        self.y2 = y2;
    }
}

pub struct TrackManager {
    config: TrackerConfig,
    tracks: Vec<Track>,
    next_id: u64,
    frame_id: u64,
}

impl TrackManager {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: Vec::new(),
            next_id: 1,
            frame_id: 0,
        }
    }

    /// Match score of one track/candidate pair; 0 means "no match"
    fn match_score(&self, track: &Track, det: &DetectionCandidate) -> f32 {
        let iou = track.bbox.iou(&det.bbox);
        if iou >= self.config.iou_threshold && iou > 0.0 {
            iou
        } else if track.bbox.center_distance(&det.bbox) <= self.config.center_distance_threshold {
            self.config.center_fallback_score
        } else {
            0.0
        }
    }

    /// Advance one frame with its filtered candidates and return a snapshot of
    /// all live tracks.
    pub fn update(&mut self, candidates: Vec<DetectionCandidate>) -> Vec<Track> {
        self.frame_id += 1;
        let frame_id = self.frame_id;

        let mut pool: Vec<Option<DetectionCandidate>> = candidates.into_iter().map(Some).collect();

        for ti in 0..self.tracks.len() {
            let mut best: Option<(usize, f32)> = None;
            for (di, slot) in pool.iter().enumerate() {
                let Some(det) = slot else { continue };
                let score = self.match_score(&self.tracks[ti], det);
                if score > 0.0 && best.map_or(true, |(_, s)| score > s) {
                    best = Some((di, score));
                }
            }

            match best.and_then(|(di, _)| pool[di].take()) {
                Some(det) => self.tracks[ti].update_with_detection(det, frame_id),
                None => self.tracks[ti].lost_count += 1,
            }
        }

        let max_lost = self.config.max_lost;
        self.tracks.retain(|track| {
            let keep = track.lost_count <= max_lost;
            if !keep {
                log::debug!("track {} ({}) lost", track.id, track.class_name);
            }
            keep
        });

        for det in pool.into_iter().flatten() {
            if det.score < self.config.min_detection_confidence {
                continue;
            }
            let id = self.next_id;
            self.next_id += 1;
            log::debug!(
                "track {} opened for {} ({:.2}) at frame {}",
                id,
                det.class_name,
                det.score,
                frame_id
            );
            self.tracks.push(Track::new(id, det, frame_id));
        }

        self.tracks.clone()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Frames processed since construction or the last reset
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    /// Drop all tracks and restart id and frame numbering
    pub fn reset(&mut self) {
        self.tracks.clear();
        self.next_id = 1;
        self.frame_id = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(cx: f32, cy: f32, w: f32, h: f32, score: f32) -> DetectionCandidate {
        DetectionCandidate::new(BBox::new(cx, cy, w, h), score, 1, "pothole")
    }

    fn manager() -> TrackManager {
        TrackManager::new(TrackerConfig::default())
    }

    #[test]
    fn test_stable_identity_then_expiry() {
        let mut tm = manager();
        let mut ids = Vec::new();
        for _ in 0..5 {
            let tracks = tm.update(vec![det(0.5, 0.5, 0.1, 0.1, 0.9)]);
            assert_eq!(tracks.len(), 1);
            ids.push(tracks[0].id);
        }
        assert!(ids.iter().all(|&id| id == ids[0]));

        let max_lost = TrackerConfig::default().max_lost;
        for frame in 0..max_lost {
            let tracks = tm.update(Vec::new());
            assert_eq!(tracks.len(), 1, "removed too early at empty frame {}", frame);
            assert_eq!(tracks[0].lost_count, frame + 1);
        }
        assert!(tm.update(Vec::new()).is_empty());
    }

    #[test]
    fn test_match_resets_lost_count() {
        let mut tm = manager();
        tm.update(vec![det(0.5, 0.5, 0.1, 0.1, 0.9)]);
        tm.update(Vec::new());
        tm.update(Vec::new());
        let tracks = tm.update(vec![det(0.52, 0.5, 0.1, 0.1, 0.8)]);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].lost_count, 0);
        assert_eq!(tracks[0].last_frame_id, 4);
        assert_eq!(tracks[0].score, 0.8);
    }

    #[test]
    fn test_center_distance_fallback() {
        let mut tm = manager();
        let first = tm.update(vec![det(0.2, 0.2, 0.05, 0.05, 0.9)]);
        // no overlap, but centers 0.3 apart
        let second = tm.update(vec![det(0.5, 0.2, 0.05, 0.05, 0.9)]);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, first[0].id);
        assert!((second[0].x1 - 0.475).abs() < 1e-6);
    }

    #[test]
    fn test_far_candidate_opens_new_track() {
        let mut tm = manager();
        tm.update(vec![det(0.1, 0.1, 0.05, 0.05, 0.9)]);
        let tracks = tm.update(vec![det(0.9, 0.9, 0.05, 0.05, 0.9)]);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].lost_count, 1);
        assert_eq!(tracks[1].lost_count, 0);
        assert!(tracks[0].id < tracks[1].id);
    }

    #[test]
    fn test_iou_match_preferred_over_fallback() {
        let mut tm = manager();
        tm.update(vec![det(0.5, 0.5, 0.2, 0.2, 0.9)]);
        let tracks = tm.update(vec![
            det(0.7, 0.5, 0.05, 0.05, 0.95),
            det(0.52, 0.5, 0.2, 0.2, 0.6),
        ]);
        let original = tracks.iter().find(|t| t.id == 1).unwrap();
        assert_eq!(original.score, 0.6);
        // the leftover candidate became its own track
        assert_eq!(tracks.len(), 2);
    }

    #[test]
    fn test_low_confidence_does_not_spawn() {
        let mut tm = manager();
        let tracks = tm.update(vec![det(0.5, 0.5, 0.1, 0.1, 0.2)]);
        assert!(tracks.is_empty());
    }

    #[test]
    fn test_low_confidence_still_updates_existing() {
        let mut tm = manager();
        tm.update(vec![det(0.5, 0.5, 0.1, 0.1, 0.9)]);
        let tracks = tm.update(vec![det(0.5, 0.5, 0.1, 0.1, 0.1)]);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].score, 0.1);
    }

    #[test]
    fn test_ids_strictly_increasing_and_never_reused() {
        let mut tm = manager();
        let mut seen: Vec<u64> = Vec::new();
        for round in 0..4 {
            let x = 0.1 + round as f32 * 0.05;
            for t in tm.update(vec![det(x, 0.1, 0.02, 0.02, 0.9), det(x, 0.95, 0.02, 0.02, 0.9)]) {
                if !seen.contains(&t.id) {
                    seen.push(t.id);
                }
            }
            for _ in 0..=TrackerConfig::default().max_lost {
                tm.update(Vec::new());
            }
        }
        assert_eq!(seen.len(), 8);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_greedy_order_favours_older_track() {
        let mut tm = manager();
        tm.update(vec![det(0.30, 0.5, 0.2, 0.2, 0.9)]);
        tm.update(vec![det(0.30, 0.5, 0.2, 0.2, 0.9), det(0.80, 0.5, 0.2, 0.2, 0.9)]);
        // one candidate sitting between both tracks, nearer the younger one
        let tracks = tm.update(vec![det(0.62, 0.5, 0.2, 0.2, 0.9)]);
        let old = tracks.iter().find(|t| t.id == 1).unwrap();
        let young = tracks.iter().find(|t| t.id == 2).unwrap();
        assert_eq!(old.lost_count, 0);
        assert_eq!(young.lost_count, 1);
    }

    #[test]
    fn test_reset_behaves_like_new() {
        let frames = vec![
            vec![det(0.5, 0.5, 0.1, 0.1, 0.9)],
            vec![det(0.51, 0.5, 0.1, 0.1, 0.9), det(0.1, 0.9, 0.1, 0.1, 0.7)],
            Vec::new(),
        ];

        let mut used = manager();
        for _ in 0..3 {
            used.update(vec![det(0.3, 0.3, 0.1, 0.1, 0.9)]);
        }
        used.reset();
        assert_eq!(used.frame_id(), 0);
        assert!(used.tracks().is_empty());

        let mut fresh = manager();
        for frame in frames {
            assert_eq!(used.update(frame.clone()), fresh.update(frame));
        }
    }
}

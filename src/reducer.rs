//! Observation → event reduction.

use log::{debug, warn};
use thiserror::Error;

use crate::events::GestureEvent;
use crate::gestures::{self, NO_GESTURE};
use crate::landmarks::{HandObservation, LANDMARK_COUNT, joint_name};
use crate::tracker::{ChangeTracker, PublishedState};

/// Confidence reported for labels recovered by the geometric fallback.
pub const FALLBACK_CONFIDENCE: f64 = 0.7;

const UNKNOWN_HANDEDNESS: &str = "Unknown";

#[derive(Debug, Error, PartialEq)]
pub enum ReduceError {
    #[error("expected 0 or 21 landmarks, got {0}")]
    LandmarkCount(usize),
    #[error("landmark {} ({}) is not finite", .0, joint_label(.0))]
    NonFiniteLandmark(usize),
    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },
}

fn joint_label(idx: &usize) -> String {
    match joint_name(*idx) {
        Some((finger, joint)) => format!("{finger} {joint}"),
        None => "out of range".to_string(),
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReduceStats {
    pub frames: u64,
    pub published: u64,
    pub dropped: u64,
}

#[derive(Debug, Default)]
pub struct EventReducer {
    tracker: ChangeTracker,
    stats: ReduceStats,
}

impl EventReducer {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tracker: ChangeTracker::new(tolerance),
            stats: ReduceStats::default(),
        }
    }

    pub fn stats(&self) -> ReduceStats {
        self.stats
    }

    /// Reduces one frame. Malformed frames are logged and dropped so the
    /// caller's frame loop never stops on a single bad observation.
    pub fn process(&mut self, obs: &HandObservation) -> Option<GestureEvent> {
        self.stats.frames += 1;
        match self.reduce(obs) {
            Ok(Some(event)) => {
                self.stats.published += 1;
                Some(event)
            }
            Ok(None) => None,
            Err(e) => {
                self.stats.dropped += 1;
                warn!("dropping frame (ts={:?}): {e}", obs.timestamp_ms);
                None
            }
        }
    }

    pub fn reduce(&mut self, obs: &HandObservation) -> Result<Option<GestureEvent>, ReduceError> {
        let n = obs.landmarks.len();
        if n != 0 && n != LANDMARK_COUNT {
            return Err(ReduceError::LandmarkCount(n));
        }
        if let Some(idx) = obs.landmarks.iter().position(|p| !p.is_finite()) {
            return Err(ReduceError::NonFiniteLandmark(idx));
        }

        let mut gesture = match obs.gesture_label.as_deref().map(str::trim) {
            Some(l) if !l.is_empty() && !l.eq_ignore_ascii_case(NO_GESTURE) => l.to_string(),
            _ => NO_GESTURE.to_string(),
        };
        let mut gesture_conf = finite(obs.gesture_confidence, "gestureConfidence")?;

        let handedness = match obs.handedness_label.as_deref().map(str::trim) {
            Some(l) if !l.is_empty() => l,
            _ => UNKNOWN_HANDEDNESS,
        };
        let handedness_conf = finite(obs.handedness_confidence, "handednessConfidence")?;

        let mut finger_count = gestures::finger_count_for(&gesture);
        if gesture == NO_GESTURE && obs.has_hand() {
            let fb = gestures::classify_fallback(&obs.landmarks);
            if !fb.is_none() {
                debug!("fallback recovered {} ({} fingers)", fb.label, fb.count);
                gesture = fb.label.to_string();
                finger_count = fb.count;
                gesture_conf = FALLBACK_CONFIDENCE;
            }
        }

        let candidate = PublishedState {
            gesture,
            finger_count,
            landmarks: obs.landmarks.clone(),
        };
        if !self.tracker.has_changed(&candidate) {
            return Ok(None);
        }

        let event = GestureEvent::new(&candidate, gesture_conf, handedness, handedness_conf);
        self.tracker.replace(candidate);
        Ok(Some(event))
    }
}

fn finite(v: Option<f64>, field: &'static str) -> Result<f64, ReduceError> {
    match v {
        None => Ok(0.0),
        Some(x) if x.is_finite() => Ok(x),
        Some(_) => Err(ReduceError::NonFinite { field }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gestures::tests::synthetic_hand;
    use crate::landmarks::Landmark;
    use crate::tracker::DEFAULT_TOLERANCE;

    fn obs(label: Option<&str>, landmarks: Vec<Landmark>) -> HandObservation {
        HandObservation {
            gesture_label: label.map(str::to_string),
            gesture_confidence: label.map(|_| 0.91),
            handedness_label: Some("Right".into()),
            handedness_confidence: Some(0.876),
            landmarks,
            timestamp_ms: None,
        }
    }

    fn relaxed_hand() -> Vec<Landmark> {
        synthetic_hand([(120.0, 0.2); 4])
    }

    #[test]
    fn first_frame_publishes() {
        let mut r = EventReducer::new(DEFAULT_TOLERANCE);
        let ev = r.process(&HandObservation::default()).unwrap();
        assert_eq!(ev.gesture, "None");
        assert_eq!(ev.finger_count, 0);
        assert_eq!(ev.handedness, "Unknown");
        assert_eq!(ev.gesture_confidence, 0.0);
        assert!(ev.landmarks.is_empty());
    }

    #[test]
    fn identical_observations_publish_once() {
        let mut r = EventReducer::new(DEFAULT_TOLERANCE);
        let o = obs(Some("Victory"), relaxed_hand());
        assert!(r.process(&o).is_some());
        assert!(r.process(&o).is_none());
        assert!(r.process(&o).is_none());
        assert_eq!(
            r.stats(),
            ReduceStats {
                frames: 3,
                published: 1,
                dropped: 0
            }
        );
    }

    #[test]
    fn landmark_jitter_below_tolerance_is_suppressed() {
        let mut r = EventReducer::new(DEFAULT_TOLERANCE);
        let hand = relaxed_hand();
        assert!(r.process(&obs(Some("Victory"), hand.clone())).is_some());
        let jittered: Vec<_> = hand
            .iter()
            .map(|p| Landmark::new(p.x + 5e-5, p.y, p.z))
            .collect();
        assert!(r.process(&obs(Some("Victory"), jittered)).is_none());
        let moved: Vec<_> = hand
            .iter()
            .map(|p| Landmark::new(p.x + 5e-3, p.y, p.z))
            .collect();
        assert!(r.process(&obs(Some("Victory"), moved)).is_some());
    }

    #[test]
    fn lookup_table_resolves_counts() {
        for (label, count) in [
            ("Open_Palm", 5),
            ("Closed_Fist", 0),
            ("Pointing_Up", 1),
            ("Thumb_Up", 1),
            ("Victory", 2),
            ("ILoveYou", 3),
            ("Okay", 3),
            ("Live_Long", 2),
            ("Thumb_Down", 1),
            ("One", 1),
            ("Two", 2),
            ("Three", 3),
            ("Four", 4),
            ("Five", 5),
            ("Mystery", 0),
        ] {
            let mut r = EventReducer::new(DEFAULT_TOLERANCE);
            let ev = r.process(&obs(Some(label), relaxed_hand())).unwrap();
            assert_eq!(ev.gesture, label);
            assert_eq!(ev.finger_count, count, "label {label}");
            assert_eq!(ev.gesture_confidence, 0.91);
        }
    }

    #[test]
    fn fallback_three_fingers() {
        let mut r = EventReducer::new(DEFAULT_TOLERANCE);
        let hand = synthetic_hand([(170.0, 0.35), (170.0, 0.35), (170.0, 0.35), (100.0, 0.35)]);
        let ev = r.process(&obs(Some("None"), hand)).unwrap();
        assert_eq!(ev.gesture, "Three");
        assert_eq!(ev.finger_count, 3);
        assert_eq!(ev.gesture_confidence, 0.7);
        assert_eq!(ev.handedness, "Right");
        assert_eq!(ev.handedness_confidence, 0.88);
        assert_eq!(ev.landmarks.len(), LANDMARK_COUNT);

        let json: serde_json::Value = serde_json::from_str(&ev.to_json().unwrap()).unwrap();
        assert_eq!(json["gestureConfidence"], serde_json::json!(0.7));
        assert_eq!(json["fingerCount"], serde_json::json!(3));
    }

    #[test]
    fn fallback_runs_for_missing_or_lowercase_label() {
        let four = synthetic_hand([(175.0, 0.4); 4]);
        for label in [None, Some("none"), Some("")] {
            let mut r = EventReducer::new(DEFAULT_TOLERANCE);
            let ev = r.process(&obs(label, four.clone())).unwrap();
            assert_eq!((ev.gesture.as_str(), ev.finger_count), ("Four", 4));
        }
    }

    #[test]
    fn fallback_is_skipped_for_labelled_frames() {
        let mut r = EventReducer::new(DEFAULT_TOLERANCE);
        let four = synthetic_hand([(175.0, 0.4); 4]);
        let ev = r.process(&obs(Some("Victory"), four)).unwrap();
        assert_eq!((ev.gesture.as_str(), ev.finger_count), ("Victory", 2));
        assert_eq!(ev.gesture_confidence, 0.91);
    }

    #[test]
    fn inconclusive_fallback_keeps_original_label() {
        let mut r = EventReducer::new(DEFAULT_TOLERANCE);
        let ev = r.process(&obs(Some("None"), relaxed_hand())).unwrap();
        assert_eq!((ev.gesture.as_str(), ev.finger_count), ("None", 0));
        assert_eq!(ev.gesture_confidence, 0.91);
    }

    #[test]
    fn hand_leaving_frame_publishes() {
        let mut r = EventReducer::new(DEFAULT_TOLERANCE);
        assert!(r.process(&obs(Some("None"), relaxed_hand())).is_some());
        let ev = r.process(&obs(Some("None"), Vec::new())).unwrap();
        assert!(ev.landmarks.is_empty());
        // without a full hand on either side there is nothing to compare
        assert!(r.process(&obs(Some("None"), Vec::new())).is_some());
    }

    #[test]
    fn malformed_frames_are_dropped_without_touching_state() {
        let mut r = EventReducer::new(DEFAULT_TOLERANCE);
        let good = obs(Some("Victory"), relaxed_hand());
        assert!(r.process(&good).is_some());

        let short = obs(Some("Okay"), vec![Landmark::default(); 7]);
        assert_eq!(r.reduce(&short), Err(ReduceError::LandmarkCount(7)));

        let mut nan = obs(Some("Okay"), relaxed_hand());
        nan.gesture_confidence = Some(f64::NAN);
        assert!(r.process(&nan).is_none());

        let mut broken = relaxed_hand();
        broken[7].y = f64::INFINITY;
        let err = r.reduce(&obs(Some("Okay"), broken)).unwrap_err();
        assert_eq!(err, ReduceError::NonFiniteLandmark(7));
        assert_eq!(err.to_string(), "landmark 7 (index DIP) is not finite");

        assert!(r.process(&good).is_none());
        assert_eq!(r.stats().dropped, 1);
    }
}

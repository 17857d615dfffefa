use serde::Serialize;

use crate::landmarks::Landmark;
use crate::tracker::PublishedState;

/// Payload pushed to every subscriber on a publish.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureEvent {
    pub gesture: String,
    pub finger_count: i32,
    pub gesture_confidence: f64,
    pub handedness: String,
    #[serde(rename = "handednessConf")]
    pub handedness_confidence: f64,
    pub landmarks: Vec<Landmark>,
}

impl GestureEvent {
    pub fn new(
        state: &PublishedState,
        gesture_confidence: f64,
        handedness: &str,
        handedness_confidence: f64,
    ) -> Self {
        Self {
            gesture: state.gesture.clone(),
            finger_count: state.finger_count,
            gesture_confidence: round2(gesture_confidence),
            handedness: handedness.to_string(),
            handedness_confidence: round2(handedness_confidence),
            landmarks: state.landmarks.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Two-decimal rounding with exact ties going to the even digit.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidences_round_to_two_decimals() {
        assert_eq!(round2(2.0 / 3.0), 0.67);
        assert_eq!(round2(0.7), 0.7);
        assert_eq!(round2(0.994), 0.99);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn exact_ties_round_to_even() {
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(0.5), 0.5);
    }

    #[test]
    fn wire_shape() {
        let state = PublishedState {
            gesture: "Victory".into(),
            finger_count: 2,
            landmarks: vec![Landmark::new(0.25, 0.5, -0.125)],
        };
        let ev = GestureEvent::new(&state, 0.6666, "Right", 0.98765);
        let v: serde_json::Value = serde_json::from_str(&ev.to_json().unwrap()).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "gesture": "Victory",
                "fingerCount": 2,
                "gestureConfidence": 0.67,
                "handedness": "Right",
                "handednessConf": 0.99,
                "landmarks": [{"x": 0.25, "y": 0.5, "z": -0.125}]
            })
        );
    }
}

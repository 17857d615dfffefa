use log::debug;

use crate::geometry::{angle_degrees, distance};
use crate::landmarks::{Finger, LANDMARK_COUNT, Landmark, MIDDLE_MCP, WRIST};

/// Label the oracle reports when it has no opinion.
pub const NO_GESTURE: &str = "None";

const PIP_STRAIGHT_DEG: f64 = 160.0;
const TIP_REACH_NORM: f64 = 0.28;
const HAND_SIZE_EPS: f64 = 1e-6;

const FINGER_COUNTS: [(&str, i32); 15] = [
    ("None", 0),
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
];

/// Finger count for a classifier label; unknown labels count as 0.
pub fn finger_count_for(label: &str) -> i32 {
    FINGER_COUNTS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, n)| *n)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerState {
    pub finger: Finger,
    pub extended: bool,
    pub pip_angle_deg: f64,
    pub tip_mcp_norm: f64,
}

/// Straightness at the PIP joint and reach of the tip must both hold; a
/// half-curled finger usually passes only one of them.
pub fn finger_extended(pip_angle_deg: f64, tip_mcp_norm: f64) -> bool {
    pip_angle_deg > PIP_STRAIGHT_DEG && tip_mcp_norm > TIP_REACH_NORM
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fallback {
    pub label: &'static str,
    pub count: i32,
}

impl Fallback {
    pub const NONE: Fallback = Fallback {
        label: NO_GESTURE,
        count: 0,
    };

    pub fn is_none(&self) -> bool {
        self.label == NO_GESTURE
    }

    fn from_extended(n: usize) -> Self {
        match n {
            3 => Fallback {
                label: "Three",
                count: 3,
            },
            4 => Fallback {
                label: "Four",
                count: 4,
            },
            _ => Self::NONE,
        }
    }
}

/// Geometry-based three/four finger detection for frames the primary
/// classifier could not label.
pub fn classify_fallback(landmarks: &[Landmark]) -> Fallback {
    match finger_states(landmarks) {
        Some(states) => {
            let extended = states.iter().filter(|s| s.extended).count();
            debug!("[fallback] {} => extended={extended}", describe(&states));
            Fallback::from_extended(extended)
        }
        None => Fallback::NONE,
    }
}

pub fn finger_states(landmarks: &[Landmark]) -> Option<[FingerState; 4]> {
    if landmarks.len() != LANDMARK_COUNT {
        return None;
    }
    let wrist = *landmarks.get(WRIST)?;
    let middle_mcp = *landmarks.get(MIDDLE_MCP)?;
    let hand_size = distance(wrist, middle_mcp) + HAND_SIZE_EPS;

    let mut out = [FingerState {
        finger: Finger::Index,
        extended: false,
        pip_angle_deg: 0.0,
        tip_mcp_norm: 0.0,
    }; 4];
    for (slot, finger) in out.iter_mut().zip(Finger::ALL) {
        let [mcp, pip, dip, tip] = finger.joints().map(|i| landmarks.get(i).copied());
        let (mcp, pip, dip, tip) = (mcp?, pip?, dip?, tip?);

        let pip_angle_deg = angle_degrees(mcp, pip, dip);
        let tip_mcp_norm = distance(tip, mcp) / hand_size;
        *slot = FingerState {
            finger,
            extended: finger_extended(pip_angle_deg, tip_mcp_norm),
            pip_angle_deg,
            tip_mcp_norm,
        };
    }
    Some(out)
}

fn describe(states: &[FingerState]) -> String {
    states
        .iter()
        .map(|s| {
            format!(
                "{}:{}(θ={:.1},d={:.2})",
                s.finger.name(),
                if s.extended { "up" } else { "down" },
                s.pip_angle_deg,
                s.tip_mcp_norm
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Builds a hand with wrist at the origin and a unit hand size. Each
    /// finger gets the requested PIP angle and a tip placed `reach` hand
    /// sizes away from its MCP.
    pub(crate) fn synthetic_hand(fingers: [(f64, f64); 4]) -> Vec<Landmark> {
        let mut pts = vec![Landmark::default(); LANDMARK_COUNT];
        pts[WRIST] = Landmark::new(0.0, 0.0, 0.0);
        for (i, (finger, (angle, reach))) in Finger::ALL.iter().zip(fingers).enumerate() {
            let [mcp_i, pip_i, dip_i, tip_i] = finger.joints();
            // middle MCP (i == 1) sits exactly one unit above the wrist
            let mcp = Landmark::new((i as f64 - 1.0) * 0.2, 1.0, 0.0);
            let pip = Landmark::new(mcp.x, mcp.y + 0.1, 0.0);
            let bend = (180.0 - angle).to_radians();
            let dip = Landmark::new(pip.x + 0.1 * bend.sin(), pip.y + 0.1 * bend.cos(), 0.0);
            let tip = Landmark::new(mcp.x, mcp.y + reach, 0.0);
            pts[mcp_i] = mcp;
            pts[pip_i] = pip;
            pts[dip_i] = dip;
            pts[tip_i] = tip;
        }
        pts
    }

    #[test]
    fn finger_count_table() {
        let expected = [
            ("None", 0),
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
        ];
        for (label, count) in expected {
            assert_eq!(finger_count_for(label), count, "label {label}");
        }
        assert_eq!(finger_count_for("Spock"), 0);
        assert_eq!(finger_count_for("open_palm"), 0);
    }

    #[test]
    fn angle_threshold_is_strict() {
        assert!(!finger_extended(160.0, 0.35));
        assert!(finger_extended(160.01, 0.35));
    }

    #[test]
    fn reach_threshold_is_strict() {
        assert!(!finger_extended(170.0, 0.28));
        assert!(finger_extended(170.0, 0.2801));
    }

    #[test]
    fn three_extended_fingers() {
        let hand = synthetic_hand([(170.0, 0.35), (170.0, 0.35), (170.0, 0.35), (100.0, 0.35)]);
        assert_eq!(
            classify_fallback(&hand),
            Fallback {
                label: "Three",
                count: 3
            }
        );
    }

    #[test]
    fn four_extended_fingers() {
        let hand = synthetic_hand([(175.0, 0.4); 4]);
        assert_eq!(classify_fallback(&hand).count, 4);
        assert_eq!(classify_fallback(&hand).label, "Four");
    }

    #[test]
    fn fewer_than_three_is_none() {
        let curled = (90.0, 0.15);
        let straight = (175.0, 0.4);
        for hand in [
            synthetic_hand([curled; 4]),
            synthetic_hand([straight, curled, curled, curled]),
            synthetic_hand([straight, straight, curled, curled]),
        ] {
            assert_eq!(classify_fallback(&hand), Fallback::NONE);
        }
    }

    #[test]
    fn straight_but_short_finger_is_not_extended() {
        let hand = synthetic_hand([(175.0, 0.4), (175.0, 0.4), (175.0, 0.2), (100.0, 0.4)]);
        let states = finger_states(&hand).unwrap();
        assert!(states[0].extended);
        assert!(!states[2].extended);
        assert!(states[2].pip_angle_deg > 160.0);
        assert!(!states[3].extended);
        assert!((states[3].pip_angle_deg - 100.0).abs() < 0.01);
    }

    #[test]
    fn malformed_landmarks_yield_none() {
        assert_eq!(classify_fallback(&[]), Fallback::NONE);
        assert_eq!(classify_fallback(&[Landmark::default(); 5]), Fallback::NONE);
        let nan = vec![Landmark::new(f64::NAN, f64::NAN, f64::NAN); LANDMARK_COUNT];
        assert_eq!(classify_fallback(&nan), Fallback::NONE);
    }
}

//! Hand landmark layout and the per-frame oracle record.

use serde::{Deserialize, Serialize};

pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Landmark {
    #[cfg(test)]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// The four long fingers the fallback classifier looks at. The thumb is
/// never counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Finger {
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 4] = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky];

    /// MCP, PIP, DIP, TIP indices.
    pub fn joints(&self) -> [usize; 4] {
        match self {
            Finger::Index => [INDEX_MCP, INDEX_PIP, INDEX_DIP, INDEX_TIP],
            Finger::Middle => [MIDDLE_MCP, MIDDLE_PIP, MIDDLE_DIP, MIDDLE_TIP],
            Finger::Ring => [RING_MCP, RING_PIP, RING_DIP, RING_TIP],
            Finger::Pinky => [PINKY_MCP, PINKY_PIP, PINKY_DIP, PINKY_TIP],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Finger::Index => "Index",
            Finger::Middle => "Middle",
            Finger::Ring => "Ring",
            Finger::Pinky => "Pinky",
        }
    }
}

/// (finger, joint) naming for a landmark index.
pub fn joint_name(idx: usize) -> Option<(&'static str, &'static str)> {
    let name = match idx {
        WRIST => ("wrist", "WRIST"),
        THUMB_CMC => ("thumb", "CMC"),
        THUMB_MCP => ("thumb", "MCP"),
        THUMB_IP => ("thumb", "IP"),
        THUMB_TIP => ("thumb", "TIP"),
        _ => {
            let finger = Finger::ALL
                .iter()
                .find(|f| f.joints().contains(&idx))?;
            let joint = match idx - finger.joints()[0] {
                0 => "MCP",
                1 => "PIP",
                2 => "DIP",
                _ => "TIP",
            };
            let finger = match finger {
                Finger::Index => "index",
                Finger::Middle => "middle",
                Finger::Ring => "ring",
                Finger::Pinky => "pinky",
            };
            (finger, joint)
        }
    };
    Some(name)
}

/// One oracle record per processed video frame.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandObservation {
    #[serde(default)]
    pub gesture_label: Option<String>,
    #[serde(default)]
    pub gesture_confidence: Option<f64>,
    #[serde(default)]
    pub handedness_label: Option<String>,
    #[serde(default)]
    pub handedness_confidence: Option<f64>,
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
    #[serde(default)]
    pub timestamp_ms: Option<u64>,
}

impl HandObservation {
    pub fn has_hand(&self) -> bool {
        !self.landmarks.is_empty()
    }
}

//! Last-published state and change detection.

use crate::landmarks::{LANDMARK_COUNT, Landmark};

pub const DEFAULT_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedState {
    pub gesture: String,
    pub finger_count: i32,
    pub landmarks: Vec<Landmark>,
}

impl PublishedState {
    /// Neutral state before anything was published; differs from every
    /// real observation through `finger_count = -1`.
    pub fn initial() -> Self {
        Self {
            gesture: "none".to_string(),
            finger_count: -1,
            landmarks: Vec::new(),
        }
    }
}

impl Default for PublishedState {
    fn default() -> Self {
        Self::initial()
    }
}

/// True when `curr` differs from `prev` by more than `tol` on any coordinate,
/// or when either side is not a full 21-point hand.
pub fn landmarks_changed(prev: &[Landmark], curr: &[Landmark], tol: f64) -> bool {
    if prev.len() != LANDMARK_COUNT || curr.len() != LANDMARK_COUNT {
        return true;
    }
    prev.iter().zip(curr).any(|(a, b)| {
        (a.x - b.x).abs() > tol || (a.y - b.y).abs() > tol || (a.z - b.z).abs() > tol
    })
}

#[derive(Debug)]
pub struct ChangeTracker {
    last: PublishedState,
    tolerance: f64,
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl ChangeTracker {
    pub fn new(tolerance: f64) -> Self {
        Self {
            last: PublishedState::initial(),
            tolerance,
        }
    }

    #[cfg(test)]
    pub fn last(&self) -> &PublishedState {
        &self.last
    }

    pub fn has_changed(&self, candidate: &PublishedState) -> bool {
        candidate.gesture != self.last.gesture
            || candidate.finger_count != self.last.finger_count
            || landmarks_changed(&self.last.landmarks, &candidate.landmarks, self.tolerance)
    }

    /// Replaces the last-published state wholesale.
    pub fn replace(&mut self, published: PublishedState) {
        self.last = published;
    }
}

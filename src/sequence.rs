//! Placed moves and the sequences built from them.

use crate::clock::SliceClock;
use crate::error::Result;
use crate::frame::BodyState;
use crate::moves::MoveParams;
use serde::{Deserialize, Serialize};

/// One move placed on the timeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoveInstance {
    /// Name of the move type in the catalog.
    pub move_type: String,
    pub start_slice: u32,
    pub requested_slices: u32,
    pub params: MoveParams,
}

impl MoveInstance {
    pub fn new(
        move_type: impl Into<String>,
        start_slice: u32,
        requested_slices: u32,
        params: MoveParams,
    ) -> Self {
        Self {
            move_type: move_type.into(),
            start_slice,
            requested_slices,
            params,
        }
    }

    /// First slice after the move.
    pub fn end_slice(&self) -> u32 {
        self.start_slice.saturating_add(self.requested_slices)
    }

    /// Whether the half-open slice ranges of the two moves intersect.
    pub fn overlaps(&self, other: &MoveInstance) -> bool {
        self.start_slice < other.end_slice() && other.start_slice < self.end_slice()
    }

    pub fn covers(&self, slice: f64) -> bool {
        slice >= f64::from(self.start_slice) && slice < f64::from(self.end_slice())
    }
}

/// A named, tempo-bound list of moves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,
    pub slices_per_minute: f64,
    pub moves: Vec<MoveInstance>,
    /// Posture the robot is in before the first move.
    #[serde(default)]
    pub initial_state: BodyState,
}

impl Sequence {
    pub fn new(name: impl Into<String>, slices_per_minute: f64) -> Self {
        Self {
            name: name.into(),
            slices_per_minute,
            moves: Vec::new(),
            initial_state: BodyState::Stand,
        }
    }

    pub fn with_initial_state(mut self, state: BodyState) -> Self {
        self.initial_state = state;
        self
    }

    /// Appends a move; order on the timeline comes from `start_slice`.
    pub fn push(&mut self, instance: MoveInstance) -> &mut Self {
        self.moves.push(instance);
        self
    }

    pub fn remove(&mut self, index: usize) -> Option<MoveInstance> {
        (index < self.moves.len()).then(|| self.moves.remove(index))
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn clock(&self) -> Result<SliceClock> {
        SliceClock::new(self.slices_per_minute)
    }

    /// Slice at which the last move ends.
    pub fn duration_slices(&self) -> u32 {
        self.moves
            .iter()
            .map(MoveInstance::end_slice)
            .max()
            .unwrap_or(0)
    }

    pub fn duration_seconds(&self) -> Result<f64> {
        Ok(self.clock()?.slice_to_seconds(f64::from(self.duration_slices())))
    }
}

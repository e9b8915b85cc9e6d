//! Error taxonomy for validation, composition and playback.

use std::fmt;

/// Result type for choreography engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building, validating or composing a choreography.
///
/// Every variant carries enough context (move index, field, offending value)
/// to be shown to a user as a warning line.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid tempo: {slices_per_minute} slices per minute (must be > 0)")]
    InvalidTempo { slices_per_minute: f64 },

    #[error("invalid tick rate: {ticks_per_second} ticks per second (must be > 0)")]
    InvalidTickRate { ticks_per_second: f64 },

    #[error("move {index}: unknown move type '{name}'")]
    UnknownMoveType { index: usize, name: String },

    #[error("move type '{0}' is already registered")]
    DuplicateMoveType(String),

    #[error("move {index} ({name}): invalid duration of {requested} slices ({reason})")]
    InvalidDuration {
        index: usize,
        name: String,
        requested: u32,
        reason: String,
    },

    #[error("move {index} ({name}): parameters of kind '{found}' given, expected '{expected}'")]
    ParameterType {
        index: usize,
        name: String,
        expected: String,
        found: String,
    },

    #[error("move {index}: parameter '{field}' = {value} outside [{}, {}]", fmt_bound(.min), fmt_bound(.max))]
    ParameterBounds {
        index: usize,
        field: String,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },

    #[error("moves {first} and {second} overlap on {channels}")]
    MoveOverlap {
        first: usize,
        second: usize,
        channels: String,
    },

    #[error("move {index} ({name}) cannot start from {incoming:?}; admissible: {admissible:?}")]
    TransitionState {
        index: usize,
        name: String,
        incoming: crate::frame::BodyState,
        admissible: Vec<crate::frame::BodyState>,
    },

    #[error("animation '{animation}': keyframe {index} is not after the previous keyframe")]
    UnorderedKeyframe { animation: String, index: usize },

    #[error("animation '{0}' has no keyframes")]
    EmptyAnimation(String),

    #[error("move {index} ({name}) could not be evaluated: {reason}")]
    MoveEvaluation {
        index: usize,
        name: String,
        reason: String,
    },
}

fn fmt_bound(bound: &Option<f64>) -> String {
    match bound {
        Some(v) => v.to_string(),
        None => "..".to_string(),
    }
}

/// All errors found by a batch validation pass, in deterministic order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(pub Vec<Error>);

impl ValidationErrors {
    /// Collected errors in submission order.
    pub fn errors(&self) -> &[Error] {
        &self.0
    }

    /// Number of collected errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if any collected error matches `pred`.
    pub fn any(&self, pred: impl Fn(&Error) -> bool) -> bool {
        self.0.iter().any(pred)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.0.len())?;
        for err in &self.0 {
            write!(f, "\n  - {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = Error;
    type IntoIter = std::vec::IntoIter<Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

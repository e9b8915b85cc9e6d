//! Move catalog: the static table of move types a sequence is validated against.

use crate::animation::Animation;
use crate::clock::SliceClock;
use crate::config::ValidationMode;
use crate::error::{Error, Result};
use crate::frame::{BodyState, ControlFlags};
use crate::moves::{ArmJointTargets, MoveKind, ParamType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use tracing::debug;

/// Schema entry for one named parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub ty: ParamType,
    /// Inclusive bounds. Vector parameters are bounded per component.
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            min: None,
            max: None,
        }
    }

    pub fn bounded(name: impl Into<String>, ty: ParamType, min: f64, max: f64) -> Self {
        Self {
            name: name.into(),
            ty,
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }

    pub fn clamp(&self, value: f64) -> f64 {
        let value = self.min.map_or(value, |min| value.max(min));
        self.max.map_or(value, |max| value.min(max))
    }
}

/// Immutable description of a move.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoveType {
    pub name: String,
    pub kind: MoveKind,
    pub default_slices: u32,
    /// Overrides `default_slices` when present.
    pub default_seconds: Option<f64>,
    pub extendable: bool,
    pub min_slices: Option<u32>,
    pub max_slices: Option<u32>,
    pub min_seconds: Option<f64>,
    pub max_seconds: Option<f64>,
    pub entry_states: Vec<BodyState>,
    /// `None` leaves the incoming posture unchanged.
    pub exit_state: Option<BodyState>,
    pub controls: ControlFlags,
    pub params: Vec<ParamSpec>,
}

impl MoveType {
    /// A fixed-length move entered from standing, with the standard schema for `kind`.
    pub fn new(
        name: impl Into<String>,
        kind: MoveKind,
        default_slices: u32,
        controls: ControlFlags,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            default_slices,
            default_seconds: None,
            extendable: false,
            min_slices: None,
            max_slices: None,
            min_seconds: None,
            max_seconds: None,
            entry_states: vec![BodyState::Stand],
            exit_state: None,
            controls,
            params: standard_schema(kind),
        }
    }

    pub fn with_extendable(mut self, min_slices: u32, max_slices: u32) -> Self {
        self.extendable = true;
        self.min_slices = Some(min_slices);
        self.max_slices = Some(max_slices);
        self
    }

    pub fn with_seconds(mut self, default: f64, min: Option<f64>, max: Option<f64>) -> Self {
        self.default_seconds = Some(default);
        self.min_seconds = min;
        self.max_seconds = max;
        self
    }

    pub fn with_entry_states(mut self, states: &[BodyState]) -> Self {
        self.entry_states = states.to_vec();
        self
    }

    pub fn with_exit_state(mut self, state: BodyState) -> Self {
        self.exit_state = Some(state);
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn accepts_entry(&self, state: BodyState) -> bool {
        self.entry_states.contains(&state)
    }

    /// Posture after this move, given the posture it started from.
    pub fn resolve_exit(&self, incoming: BodyState) -> BodyState {
        self.exit_state.unwrap_or(incoming)
    }

    /// Default length at the given tempo.
    pub fn default_slices_at(&self, clock: &SliceClock) -> u32 {
        match self.default_seconds {
            Some(seconds) => clock.seconds_to_slice(seconds).round().max(1.0) as u32,
            None => self.default_slices,
        }
    }

    /// Tightest lower bound from the slice and second limits.
    pub fn min_slices_at(&self, clock: &SliceClock) -> Option<u32> {
        let from_seconds = self
            .min_seconds
            .map(|s| (clock.seconds_to_slice(s) - 1e-9).ceil().max(1.0) as u32);
        match (self.min_slices, from_seconds) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// Tightest upper bound from the slice and second limits.
    pub fn max_slices_at(&self, clock: &SliceClock) -> Option<u32> {
        let from_seconds = self
            .max_seconds
            .map(|s| (clock.seconds_to_slice(s) + 1e-9).floor().max(1.0) as u32);
        match (self.max_slices, from_seconds) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// Parameter schema shared by every move type of a kind.
pub fn standard_schema(kind: MoveKind) -> Vec<ParamSpec> {
    use ParamType::*;
    let easing = || ParamSpec::new("easing", Easing);
    match kind {
        MoveKind::BodyHeight => vec![ParamSpec::bounded("height", Float, -0.2, 0.2), easing()],
        MoveKind::Sway => vec![
            ParamSpec::bounded("vertical", Float, -0.2, 0.2),
            ParamSpec::bounded("horizontal", Float, -0.2, 0.2),
            ParamSpec::bounded("roll", Float, -0.5, 0.5),
            ParamSpec::bounded("pronounced", Float, 0.0, 1.0),
            easing(),
        ],
        MoveKind::ButtCircle => vec![
            ParamSpec::bounded("radius", Float, 0.0, 0.2),
            ParamSpec::bounded("beats_per_circle", Float, 0.5, 16.0),
            ParamSpec::bounded("number_of_circles", Count, 1.0, 32.0),
            ParamSpec::new("clockwise", Flag),
            ParamSpec::bounded("starting_angle", Float, -2.0 * PI, 2.0 * PI),
        ],
        MoveKind::RotateBody => vec![
            ParamSpec::bounded("rotation", Vector, -0.6, 0.6),
            ParamSpec::new("return_to_start_pose", Flag),
            ParamSpec::bounded("entry_slices", Float, 0.0, 32.0),
            ParamSpec::bounded("exit_slices", Float, 0.0, 32.0),
            easing(),
        ],
        MoveKind::Jump => vec![
            ParamSpec::bounded("yaw", Float, -PI, PI),
            ParamSpec::bounded("translation", Planar, -0.5, 0.5),
            ParamSpec::bounded("height", Float, 0.0, 0.3),
            ParamSpec::bounded("split_fraction", Float, 0.0, 0.5),
        ],
        MoveKind::Posture => vec![easing()],
        MoveKind::ArmMove => {
            let mut specs: Vec<ParamSpec> = ArmJointTargets::NAMES
                .iter()
                .map(|name| ParamSpec::bounded(*name, Float, -PI, PI))
                .collect();
            specs.push(easing());
            specs
        }
        MoveKind::Gripper => vec![ParamSpec::bounded("angle", Float, 0.0, 1.57), easing()],
        MoveKind::SetColor => vec![
            ParamSpec::bounded("color", Vector, 0.0, 1.0),
            ParamSpec::new("fade", Flag),
            easing(),
        ],
        MoveKind::Animate => vec![
            ParamSpec::bounded("body_entry_slices", Float, 0.0, 64.0),
            ParamSpec::bounded("body_exit_slices", Float, 0.0, 64.0),
            ParamSpec::bounded("translation_multiplier", Vector, -4.0, 4.0),
            ParamSpec::bounded("rotation_multiplier", Vector, -4.0, 4.0),
            ParamSpec::bounded("translation_offset", Vector, -0.5, 0.5),
            ParamSpec::bounded("rotation_offset", Vector, -PI, PI),
            ParamSpec::bounded("arm_multiplier", Float, -4.0, 4.0),
            ParamSpec::bounded("gripper_multiplier", Float, -4.0, 4.0),
            ParamSpec::bounded("gripper_offset", Float, -1.57, 1.57),
            ParamSpec::bounded("speed", Float, 0.1, 10.0),
            ParamSpec::bounded("offset_slices", Float, 0.0, 1024.0),
        ],
    }
}

/// Registry of move types by name, plus the animations behind animate moves.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveCatalog {
    types: BTreeMap<String, MoveType>,
    #[serde(default)]
    animations: BTreeMap<String, Animation>,
}

impl MoveCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in move table.
    pub fn standard() -> Self {
        use BodyState::*;
        let any = &BodyState::ALL;
        let entries = [
            MoveType::new("body_height", MoveKind::BodyHeight, 4, ControlFlags::BODY)
                .with_extendable(1, 64),
            MoveType::new("sway", MoveKind::Sway, 8, ControlFlags::BODY).with_extendable(4, 64),
            MoveType::new("butt_circle", MoveKind::ButtCircle, 16, ControlFlags::BODY)
                .with_extendable(4, 128),
            MoveType::new("rotate_body", MoveKind::RotateBody, 4, ControlFlags::BODY)
                .with_extendable(1, 64),
            MoveType::new("jump", MoveKind::Jump, 4, ControlFlags::BODY_AND_LEGS),
            MoveType::new("sit", MoveKind::Posture, 4, ControlFlags::BODY_AND_LEGS)
                .with_extendable(1, 32)
                .with_seconds(1.0, Some(0.5), Some(4.0))
                .with_exit_state(Sit),
            MoveType::new("kneel", MoveKind::Posture, 4, ControlFlags::BODY_AND_LEGS)
                .with_extendable(1, 32)
                .with_seconds(1.0, Some(0.5), Some(4.0))
                .with_exit_state(Kneel),
            MoveType::new("sprawl", MoveKind::Posture, 4, ControlFlags::BODY_AND_LEGS)
                .with_extendable(1, 32)
                .with_seconds(1.5, Some(0.75), Some(4.0))
                .with_exit_state(Sprawl),
            MoveType::new("stand_up", MoveKind::Posture, 4, ControlFlags::BODY_AND_LEGS)
                .with_extendable(1, 32)
                .with_seconds(1.0, Some(0.5), Some(4.0))
                .with_entry_states(&[Stand, Sit, Kneel, Sprawl])
                .with_exit_state(Stand),
            MoveType::new("arm_move", MoveKind::ArmMove, 4, ControlFlags::ARM)
                .with_extendable(1, 64)
                .with_entry_states(any),
            MoveType::new("gripper", MoveKind::Gripper, 2, ControlFlags::GRIPPER)
                .with_extendable(1, 32)
                .with_entry_states(any),
            MoveType::new("set_color", MoveKind::SetColor, 1, ControlFlags::LIGHTS)
                .with_extendable(1, 256)
                .with_entry_states(any),
        ];

        let mut catalog = Self::new();
        for move_type in entries {
            catalog.types.insert(move_type.name.clone(), move_type);
        }
        catalog
    }

    /// Adds a move type. Names are unique.
    pub fn insert(&mut self, move_type: MoveType) -> Result<()> {
        if self.types.contains_key(&move_type.name) {
            return Err(Error::DuplicateMoveType(move_type.name));
        }
        debug!(name = %move_type.name, kind = %move_type.kind, "registered move type");
        self.types.insert(move_type.name.clone(), move_type);
        Ok(())
    }

    /// Registers `animation` as an animate move named after it.
    ///
    /// Keyframes are checked (strict) or re-sorted (lenient) first. Control flags
    /// are derived from the fields the keyframes set.
    pub fn register_animation(
        &mut self,
        mut animation: Animation,
        mode: ValidationMode,
    ) -> Result<&MoveType> {
        if self.types.contains_key(&animation.name) {
            return Err(Error::DuplicateMoveType(animation.name));
        }
        animation.normalize(mode)?;

        let default_slices = animation.default_slices();
        let mut move_type = MoveType::new(
            animation.name.clone(),
            MoveKind::Animate,
            default_slices,
            animation.controls(),
        )
        .with_entry_states(&animation.entry_states);
        move_type.exit_state = animation.exit_state;
        if animation.extendable {
            move_type.extendable = true;
            move_type.min_slices = Some(1);
        }

        debug!(
            animation = %animation.name,
            default_slices,
            nominal_slices = animation.nominal_slices(),
            "registered animation"
        );
        let name = animation.name.clone();
        self.animations.insert(name.clone(), animation);
        Ok(&*self.types.entry(name).or_insert(move_type))
    }

    /// Looks up a move type by name.
    pub fn get(&self, name: &str) -> Option<&MoveType> {
        self.types.get(name)
    }

    /// Whether a move type called `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Normalized animation behind an animate move type.
    pub fn animation(&self, name: &str) -> Option<&Animation> {
        self.animations.get(name)
    }

    /// All registered move types.
    pub fn iter(&self) -> impl Iterator<Item = &MoveType> {
        self.types.values()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

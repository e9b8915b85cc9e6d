//! Move parameters as a closed tagged union, one parameter struct per move kind.
//!
//! Every scalar is optional: `None` means "unspecified, use the default or the
//! previous value", which is distinct from an explicit zero.

use crate::easing::Easing;
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Move families. Each [`MoveType`](crate::catalog::MoveType) belongs to exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    BodyHeight,
    Sway,
    ButtCircle,
    RotateBody,
    Jump,
    Posture,
    ArmMove,
    Gripper,
    SetColor,
    Animate,
}

impl MoveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MoveKind::BodyHeight => "body_height",
            MoveKind::Sway => "sway",
            MoveKind::ButtCircle => "butt_circle",
            MoveKind::RotateBody => "rotate_body",
            MoveKind::Jump => "jump",
            MoveKind::Posture => "posture",
            MoveKind::ArmMove => "arm_move",
            MoveKind::Gripper => "gripper",
            MoveKind::SetColor => "set_color",
            MoveKind::Animate => "animate",
        }
    }
}

impl fmt::Display for MoveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a parameter field in a move schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    Float,
    Count,
    Flag,
    Vector,
    Planar,
    Easing,
}

/// Mutable view of one parameter field, handed out by [`MoveParameters::visit_fields`].
pub enum FieldRef<'a> {
    Float(&'a mut Option<f32>),
    Count(&'a mut Option<u32>),
    Flag(&'a mut Option<bool>),
    Vector(&'a mut Option<Vec3>),
    Planar(&'a mut Option<Vec2>),
    Easing(&'a mut Option<Easing>),
}

impl FieldRef<'_> {
    pub fn param_type(&self) -> ParamType {
        match self {
            FieldRef::Float(_) => ParamType::Float,
            FieldRef::Count(_) => ParamType::Count,
            FieldRef::Flag(_) => ParamType::Flag,
            FieldRef::Vector(_) => ParamType::Vector,
            FieldRef::Planar(_) => ParamType::Planar,
            FieldRef::Easing(_) => ParamType::Easing,
        }
    }
}

/// Schema-checkable parameter set.
pub trait MoveParameters {
    /// Calls `visit` once per named field, in declaration order.
    fn visit_fields(&mut self, visit: &mut dyn FnMut(&'static str, FieldRef<'_>));
}

/// Whether a motion target is measured from the move's start pose or from the
/// choreography origin.
///
/// Replaces the deprecated single `absolute` switch; see [`LegacyJumpParams`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionFrame {
    #[default]
    Relative,
    Absolute,
}

impl MotionFrame {
    pub fn from_flag(absolute: bool) -> Self {
        if absolute {
            MotionFrame::Absolute
        } else {
            MotionFrame::Relative
        }
    }

    /// Resolves a per-axis flag against the legacy shared flag.
    /// The per-axis flag wins whenever it is set.
    pub fn resolve(per_axis: Option<bool>, legacy: Option<bool>) -> Self {
        Self::from_flag(per_axis.or(legacy).unwrap_or(false))
    }
}

/// Which leg pair leaves the ground first in a split jump.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadLegPair {
    /// Front legs for forward translation, hind legs otherwise.
    #[default]
    Auto,
    Front,
    Hind,
    Left,
    Right,
}

/// Six optional arm joint targets, radians.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmJointTargets {
    pub shoulder_0: Option<f32>,
    pub shoulder_1: Option<f32>,
    pub elbow_0: Option<f32>,
    pub elbow_1: Option<f32>,
    pub wrist_0: Option<f32>,
    pub wrist_1: Option<f32>,
}

impl ArmJointTargets {
    pub const NAMES: [&'static str; 6] = [
        "shoulder_0",
        "shoulder_1",
        "elbow_0",
        "elbow_1",
        "wrist_0",
        "wrist_1",
    ];

    pub fn as_array(&self) -> [Option<f32>; 6] {
        [
            self.shoulder_0,
            self.shoulder_1,
            self.elbow_0,
            self.elbow_1,
            self.wrist_0,
            self.wrist_1,
        ]
    }

    pub fn from_array(joints: [Option<f32>; 6]) -> Self {
        let [shoulder_0, shoulder_1, elbow_0, elbow_1, wrist_0, wrist_1] = joints;
        Self {
            shoulder_0,
            shoulder_1,
            elbow_0,
            elbow_1,
            wrist_0,
            wrist_1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_array().iter().all(Option::is_none)
    }

    fn visit(&mut self, visit: &mut dyn FnMut(&'static str, FieldRef<'_>)) {
        visit("shoulder_0", FieldRef::Float(&mut self.shoulder_0));
        visit("shoulder_1", FieldRef::Float(&mut self.shoulder_1));
        visit("elbow_0", FieldRef::Float(&mut self.elbow_0));
        visit("elbow_1", FieldRef::Float(&mut self.elbow_1));
        visit("wrist_0", FieldRef::Float(&mut self.wrist_0));
        visit("wrist_1", FieldRef::Float(&mut self.wrist_1));
    }
}

/// Raise or lower the body to an absolute height offset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyHeightParams {
    /// Height offset from nominal, meters. Unset keeps the current height.
    pub height: Option<f32>,
    pub easing: Option<Easing>,
}

/// Side-to-side body sway, one full cycle every two beats.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwayParams {
    pub vertical: Option<f32>,
    pub horizontal: Option<f32>,
    pub roll: Option<f32>,
    /// 0 gives a pure sine, 1 a sharp square-ish sway.
    pub pronounced: Option<f32>,
    pub easing: Option<Easing>,
}

/// Circle the hips around the feet.
///
/// `number_of_circles` takes precedence over `beats_per_circle` when both are set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtCircleParams {
    pub radius: Option<f32>,
    pub beats_per_circle: Option<f32>,
    pub number_of_circles: Option<u32>,
    pub clockwise: Option<bool>,
    /// Radians, measured from the +x axis.
    pub starting_angle: Option<f32>,
}

/// Rotate the body by a yaw/pitch/roll offset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotateBodyParams {
    /// Yaw, pitch and roll in radians.
    pub rotation: Option<Vec3>,
    /// Rotate out and back within the move instead of holding the rotation.
    pub return_to_start_pose: Option<bool>,
    pub entry_slices: Option<f32>,
    pub exit_slices: Option<f32>,
    pub easing: Option<Easing>,
}

/// Four-legged jump with optional yaw and planar translation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpParams {
    /// Radians.
    pub yaw: Option<f32>,
    /// Meters in the x/y plane.
    pub translation: Option<Vec2>,
    pub yaw_frame: MotionFrame,
    pub translation_frame: MotionFrame,
    /// Apex height of the body above its start height, meters.
    pub height: Option<f32>,
    /// Fraction of the move by which the trailing pair lags the leading pair.
    /// Zero or unset means all four feet leave and land together.
    pub split_fraction: Option<f32>,
    /// Only consulted when `split_fraction` is positive.
    pub lead_leg_pair: LeadLegPair,
}

/// Jump parameters in the deprecated layout with a shared `absolute` switch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyJumpParams {
    pub yaw: Option<f32>,
    pub translation: Option<Vec2>,
    pub absolute: Option<bool>,
    pub yaw_is_absolute: Option<bool>,
    pub translation_is_absolute: Option<bool>,
    pub height: Option<f32>,
    pub split_fraction: Option<f32>,
    pub lead_leg_pair: LeadLegPair,
}

impl From<LegacyJumpParams> for JumpParams {
    fn from(legacy: LegacyJumpParams) -> Self {
        JumpParams {
            yaw: legacy.yaw,
            translation: legacy.translation,
            yaw_frame: MotionFrame::resolve(legacy.yaw_is_absolute, legacy.absolute),
            translation_frame: MotionFrame::resolve(
                legacy.translation_is_absolute,
                legacy.absolute,
            ),
            height: legacy.height,
            split_fraction: legacy.split_fraction,
            lead_leg_pair: legacy.lead_leg_pair,
        }
    }
}

/// Transition between postures; the target posture is the move type's exit state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureParams {
    pub easing: Option<Easing>,
}

/// Drive arm joints to targets. Unset joints hold their current angle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmMoveParams {
    pub joints: ArmJointTargets,
    pub easing: Option<Easing>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GripperParams {
    /// Opening angle, radians. Unset holds the current angle.
    pub angle: Option<f32>,
    pub easing: Option<Easing>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetColorParams {
    /// RGB, each in `[0, 1]`.
    pub color: Option<Vec3>,
    /// Fade from the current color over the move instead of switching at once.
    pub fade: Option<bool>,
    pub easing: Option<Easing>,
}

/// Playback adjustments for a keyframe animation move.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimateParams {
    pub body_entry_slices: Option<f32>,
    pub body_exit_slices: Option<f32>,
    pub translation_multiplier: Option<Vec3>,
    pub rotation_multiplier: Option<Vec3>,
    pub translation_offset: Option<Vec3>,
    /// Yaw, pitch and roll in radians.
    pub rotation_offset: Option<Vec3>,
    pub arm_multiplier: Option<f32>,
    pub gripper_multiplier: Option<f32>,
    pub gripper_offset: Option<f32>,
    /// Time-axis scale applied before keyframe lookup.
    pub speed: Option<f32>,
    /// Start this many slices into the animation.
    pub offset_slices: Option<f32>,
}

/// Parameters of a placed move, tagged by move kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveParams {
    BodyHeight(BodyHeightParams),
    Sway(SwayParams),
    ButtCircle(ButtCircleParams),
    RotateBody(RotateBodyParams),
    Jump(JumpParams),
    Posture(PostureParams),
    ArmMove(ArmMoveParams),
    Gripper(GripperParams),
    SetColor(SetColorParams),
    Animate(AnimateParams),
}

impl MoveParams {
    pub fn kind(&self) -> MoveKind {
        match self {
            MoveParams::BodyHeight(_) => MoveKind::BodyHeight,
            MoveParams::Sway(_) => MoveKind::Sway,
            MoveParams::ButtCircle(_) => MoveKind::ButtCircle,
            MoveParams::RotateBody(_) => MoveKind::RotateBody,
            MoveParams::Jump(_) => MoveKind::Jump,
            MoveParams::Posture(_) => MoveKind::Posture,
            MoveParams::ArmMove(_) => MoveKind::ArmMove,
            MoveParams::Gripper(_) => MoveKind::Gripper,
            MoveParams::SetColor(_) => MoveKind::SetColor,
            MoveParams::Animate(_) => MoveKind::Animate,
        }
    }

    /// Default-valued parameters for `kind`.
    pub fn defaults(kind: MoveKind) -> Self {
        match kind {
            MoveKind::BodyHeight => MoveParams::BodyHeight(Default::default()),
            MoveKind::Sway => MoveParams::Sway(Default::default()),
            MoveKind::ButtCircle => MoveParams::ButtCircle(Default::default()),
            MoveKind::RotateBody => MoveParams::RotateBody(Default::default()),
            MoveKind::Jump => MoveParams::Jump(Default::default()),
            MoveKind::Posture => MoveParams::Posture(Default::default()),
            MoveKind::ArmMove => MoveParams::ArmMove(Default::default()),
            MoveKind::Gripper => MoveParams::Gripper(Default::default()),
            MoveKind::SetColor => MoveParams::SetColor(Default::default()),
            MoveKind::Animate => MoveParams::Animate(Default::default()),
        }
    }

    pub fn easing(&self) -> Option<Easing> {
        match self {
            MoveParams::BodyHeight(p) => p.easing,
            MoveParams::Sway(p) => p.easing,
            MoveParams::RotateBody(p) => p.easing,
            MoveParams::Posture(p) => p.easing,
            MoveParams::ArmMove(p) => p.easing,
            MoveParams::Gripper(p) => p.easing,
            MoveParams::SetColor(p) => p.easing,
            MoveParams::ButtCircle(_) | MoveParams::Jump(_) | MoveParams::Animate(_) => None,
        }
    }

    /// Declared entry and exit blend lengths, in slices.
    pub fn transition_slices(&self) -> (Option<f64>, Option<f64>) {
        let (entry, exit) = match self {
            MoveParams::RotateBody(p) => (p.entry_slices, p.exit_slices),
            MoveParams::Animate(p) => (p.body_entry_slices, p.body_exit_slices),
            _ => (None, None),
        };
        (entry.map(f64::from), exit.map(f64::from))
    }
}

impl MoveParameters for MoveParams {
    fn visit_fields(&mut self, visit: &mut dyn FnMut(&'static str, FieldRef<'_>)) {
        match self {
            MoveParams::BodyHeight(p) => {
                visit("height", FieldRef::Float(&mut p.height));
                visit("easing", FieldRef::Easing(&mut p.easing));
            }
            MoveParams::Sway(p) => {
                visit("vertical", FieldRef::Float(&mut p.vertical));
                visit("horizontal", FieldRef::Float(&mut p.horizontal));
                visit("roll", FieldRef::Float(&mut p.roll));
                visit("pronounced", FieldRef::Float(&mut p.pronounced));
                visit("easing", FieldRef::Easing(&mut p.easing));
            }
            MoveParams::ButtCircle(p) => {
                visit("radius", FieldRef::Float(&mut p.radius));
                visit("beats_per_circle", FieldRef::Float(&mut p.beats_per_circle));
                visit("number_of_circles", FieldRef::Count(&mut p.number_of_circles));
                visit("clockwise", FieldRef::Flag(&mut p.clockwise));
                visit("starting_angle", FieldRef::Float(&mut p.starting_angle));
            }
            MoveParams::RotateBody(p) => {
                visit("rotation", FieldRef::Vector(&mut p.rotation));
                visit(
                    "return_to_start_pose",
                    FieldRef::Flag(&mut p.return_to_start_pose),
                );
                visit("entry_slices", FieldRef::Float(&mut p.entry_slices));
                visit("exit_slices", FieldRef::Float(&mut p.exit_slices));
                visit("easing", FieldRef::Easing(&mut p.easing));
            }
            MoveParams::Jump(p) => {
                visit("yaw", FieldRef::Float(&mut p.yaw));
                visit("translation", FieldRef::Planar(&mut p.translation));
                visit("height", FieldRef::Float(&mut p.height));
                visit("split_fraction", FieldRef::Float(&mut p.split_fraction));
            }
            MoveParams::Posture(p) => {
                visit("easing", FieldRef::Easing(&mut p.easing));
            }
            MoveParams::ArmMove(p) => {
                p.joints.visit(visit);
                visit("easing", FieldRef::Easing(&mut p.easing));
            }
            MoveParams::Gripper(p) => {
                visit("angle", FieldRef::Float(&mut p.angle));
                visit("easing", FieldRef::Easing(&mut p.easing));
            }
            MoveParams::SetColor(p) => {
                visit("color", FieldRef::Vector(&mut p.color));
                visit("fade", FieldRef::Flag(&mut p.fade));
                visit("easing", FieldRef::Easing(&mut p.easing));
            }
            MoveParams::Animate(p) => {
                visit("body_entry_slices", FieldRef::Float(&mut p.body_entry_slices));
                visit("body_exit_slices", FieldRef::Float(&mut p.body_exit_slices));
                visit(
                    "translation_multiplier",
                    FieldRef::Vector(&mut p.translation_multiplier),
                );
                visit(
                    "rotation_multiplier",
                    FieldRef::Vector(&mut p.rotation_multiplier),
                );
                visit(
                    "translation_offset",
                    FieldRef::Vector(&mut p.translation_offset),
                );
                visit("rotation_offset", FieldRef::Vector(&mut p.rotation_offset));
                visit("arm_multiplier", FieldRef::Float(&mut p.arm_multiplier));
                visit("gripper_multiplier", FieldRef::Float(&mut p.gripper_multiplier));
                visit("gripper_offset", FieldRef::Float(&mut p.gripper_offset));
                visit("speed", FieldRef::Float(&mut p.speed));
                visit("offset_slices", FieldRef::Float(&mut p.offset_slices));
            }
        }
    }
}

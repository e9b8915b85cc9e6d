//! Pose and command types produced by the compositor.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete robot posture required before, or produced after, a move.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyState {
    #[default]
    Stand,
    Kneel,
    Sit,
    Sprawl,
}

impl BodyState {
    pub const ALL: [BodyState; 4] = [
        BodyState::Stand,
        BodyState::Kneel,
        BodyState::Sit,
        BodyState::Sprawl,
    ];
}

/// An independently controllable part of the robot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Body,
    Legs,
    Arm,
    Gripper,
    Lights,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Body,
        Channel::Legs,
        Channel::Arm,
        Channel::Gripper,
        Channel::Lights,
    ];
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Body => "body",
            Channel::Legs => "legs",
            Channel::Arm => "arm",
            Channel::Gripper => "gripper",
            Channel::Lights => "lights",
        };
        f.write_str(name)
    }
}

/// Which channels a move drives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlFlags {
    pub body: bool,
    pub legs: bool,
    pub arm: bool,
    pub gripper: bool,
    pub lights: bool,
}

impl ControlFlags {
    pub const NONE: ControlFlags = ControlFlags {
        body: false,
        legs: false,
        arm: false,
        gripper: false,
        lights: false,
    };

    pub const BODY: ControlFlags = ControlFlags {
        body: true,
        ..ControlFlags::NONE
    };

    pub const BODY_AND_LEGS: ControlFlags = ControlFlags {
        body: true,
        legs: true,
        ..ControlFlags::NONE
    };

    pub const ARM: ControlFlags = ControlFlags {
        arm: true,
        ..ControlFlags::NONE
    };

    pub const GRIPPER: ControlFlags = ControlFlags {
        gripper: true,
        ..ControlFlags::NONE
    };

    pub const LIGHTS: ControlFlags = ControlFlags {
        lights: true,
        ..ControlFlags::NONE
    };

    /// Whether `channel` is driven.
    pub fn controls(&self, channel: Channel) -> bool {
        match channel {
            Channel::Body => self.body,
            Channel::Legs => self.legs,
            Channel::Arm => self.arm,
            Channel::Gripper => self.gripper,
            Channel::Lights => self.lights,
        }
    }

    /// Turns `channel` on or off.
    pub fn set(&mut self, channel: Channel, value: bool) {
        match channel {
            Channel::Body => self.body = value,
            Channel::Legs => self.legs = value,
            Channel::Arm => self.arm = value,
            Channel::Gripper => self.gripper = value,
            Channel::Lights => self.lights = value,
        }
    }

    /// Channels controlled by both flag sets.
    pub fn intersection(&self, other: &ControlFlags) -> Vec<Channel> {
        self.channels().filter(|c| other.controls(*c)).collect()
    }

    /// True when the two flag sets share a channel.
    pub fn intersects(&self, other: &ControlFlags) -> bool {
        self.channels().any(|c| other.controls(c))
    }

    /// Controlled channels in [`Channel::ALL`] order.
    pub fn channels(&self) -> impl Iterator<Item = Channel> + '_ {
        Channel::ALL.into_iter().filter(|c| self.controls(*c))
    }

    pub fn is_empty(&self) -> bool {
        self.channels().next().is_none()
    }
}

/// Body position and orientation in the choreography frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for BodyPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl BodyPose {
    pub fn lerp(&self, other: &BodyPose, t: f32) -> BodyPose {
        BodyPose {
            position: self.position.lerp(other.position, t),
            rotation: self.rotation.slerp(other.rotation, t),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }
}

/// How a [`LegTarget::position`] should be interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegMode {
    /// Foot position relative to the body, meters.
    #[default]
    FootPosition,
    /// Hip x, hip y and knee angles, radians.
    JointAngles,
}

/// Target for one leg.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegTarget {
    pub position: Vec3,
    pub mode: LegMode,
    /// True while the foot is planted, false during swing.
    pub stance: bool,
}

impl LegTarget {
    pub fn foot(position: Vec3) -> Self {
        Self {
            position,
            mode: LegMode::FootPosition,
            stance: true,
        }
    }

    /// Interpolates position; mode and stance switch at the midpoint.
    pub fn lerp(&self, other: &LegTarget, t: f32) -> LegTarget {
        if self.mode != other.mode {
            return if t < 0.5 { *self } else { *other };
        }
        LegTarget {
            position: self.position.lerp(other.position, t),
            mode: self.mode,
            stance: if t < 0.5 { self.stance } else { other.stance },
        }
    }
}

/// Leg order used throughout: front-left, front-right, hind-left, hind-right.
pub const FRONT_LEFT: usize = 0;
pub const FRONT_RIGHT: usize = 1;
pub const HIND_LEFT: usize = 2;
pub const HIND_RIGHT: usize = 3;

pub type Legs = [LegTarget; 4];

/// Nominal standing body height above the feet, meters.
pub const NOMINAL_BODY_HEIGHT: f32 = 0.52;

/// Nominal standing foot positions relative to the body.
pub fn standing_legs() -> Legs {
    let h = -NOMINAL_BODY_HEIGHT;
    [
        LegTarget::foot(Vec3::new(0.30, 0.17, h)),
        LegTarget::foot(Vec3::new(0.30, -0.17, h)),
        LegTarget::foot(Vec3::new(-0.30, 0.17, h)),
        LegTarget::foot(Vec3::new(-0.30, -0.17, h)),
    ]
}

pub fn lerp_legs(a: &Legs, b: &Legs, t: f32) -> Legs {
    std::array::from_fn(|i| a[i].lerp(&b[i], t))
}

/// Six-joint arm command, radians.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmTarget {
    pub joint_angles: [f32; 6],
}

impl ArmTarget {
    pub fn lerp(&self, other: &ArmTarget, t: f32) -> ArmTarget {
        ArmTarget {
            joint_angles: std::array::from_fn(|i| {
                self.joint_angles[i] + (other.joint_angles[i] - self.joint_angles[i]) * t
            }),
        }
    }
}

/// RGB light color, each component in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightColor(pub Vec3);

impl Default for LightColor {
    fn default() -> Self {
        LightColor(Vec3::ZERO)
    }
}

impl LightColor {
    pub fn lerp(&self, other: &LightColor, t: f32) -> LightColor {
        LightColor(self.0.lerp(other.0, t))
    }
}

/// A single time-stamped, fully-resolved robot command.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandFrame {
    /// Output tick index.
    pub tick: u64,
    /// Seconds since the start of the choreography.
    pub time: f64,
    /// Timeline position in (fractional) slices.
    pub slice: f64,
    pub body: BodyPose,
    pub legs: Legs,
    pub arm: ArmTarget,
    /// Gripper opening angle, radians.
    pub gripper: f32,
    pub lights: LightColor,
}

impl Default for CommandFrame {
    fn default() -> Self {
        Self {
            tick: 0,
            time: 0.0,
            slice: 0.0,
            body: BodyPose {
                position: Vec3::new(0.0, 0.0, NOMINAL_BODY_HEIGHT),
                rotation: Quat::IDENTITY,
            },
            legs: standing_legs(),
            arm: ArmTarget::default(),
            gripper: 0.0,
            lights: LightColor::default(),
        }
    }
}

//! Keyframe animations and the blender that turns them into continuous poses.
//!
//! A keyframe only carries the fields it sets. Each field gets its own track of
//! set-points, so a field left unset at one keyframe is interpolated between the
//! surrounding keyframes that *do* set it.

use crate::clock::SLICES_PER_BEAT;
use crate::config::ValidationMode;
use crate::error::{Error, Result};
use crate::frame::{BodyState, ControlFlags, LegMode, LegTarget};
use crate::moves::{AnimateParams, ArmJointTargets};
use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Sparse pose for one leg. Only one of `foot_position` / `joint_angles`
/// is expected per keyframe; if both are set the foot position wins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimateLeg {
    /// Foot position relative to the body, meters.
    pub foot_position: Option<Vec3>,
    /// Hip x, hip y, knee, radians.
    pub joint_angles: Option<Vec3>,
    /// True for stance, false for swing.
    pub stance: Option<bool>,
}

impl AnimateLeg {
    fn is_empty(&self) -> bool {
        self.foot_position.is_none() && self.joint_angles.is_none() && self.stance.is_none()
    }
}

/// A sparse, timestamped partial pose.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationKeyframe {
    /// Seconds from the start of the animation.
    pub time: f64,
    /// Offset from the body pose at the start of the move.
    pub body_position: Option<Vec3>,
    pub body_rotation: Option<Quat>,
    pub legs: [AnimateLeg; 4],
    pub arm: ArmJointTargets,
    pub gripper: Option<f32>,
}

impl AnimationKeyframe {
    pub fn at(time: f64) -> Self {
        Self {
            time,
            ..Default::default()
        }
    }

    /// Copies every field set in `other` over this keyframe.
    fn merge(&mut self, other: &AnimationKeyframe) {
        if other.body_position.is_some() {
            self.body_position = other.body_position;
        }
        if other.body_rotation.is_some() {
            self.body_rotation = other.body_rotation;
        }
        for (mine, theirs) in self.legs.iter_mut().zip(other.legs.iter()) {
            if theirs.foot_position.is_some() {
                mine.foot_position = theirs.foot_position;
            }
            if theirs.joint_angles.is_some() {
                mine.joint_angles = theirs.joint_angles;
            }
            if theirs.stance.is_some() {
                mine.stance = theirs.stance;
            }
        }
        let mut arm = self.arm.as_array();
        for (mine, theirs) in arm.iter_mut().zip(other.arm.as_array()) {
            if theirs.is_some() {
                *mine = theirs;
            }
        }
        self.arm = ArmJointTargets::from_array(arm);
        if other.gripper.is_some() {
            self.gripper = other.gripper;
        }
    }
}

/// A named keyframe animation that can be registered as a move.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Animation {
    pub name: String,
    pub keyframes: Vec<AnimationKeyframe>,
    /// Tempo the animation was authored at, beats per minute.
    pub bpm: f64,
    /// Stretch keyframes to fill a whole number of slices exactly, instead of
    /// playing at nominal rate and padding or truncating the tail.
    pub retime_to_integer_slices: bool,
    pub extendable: bool,
    pub entry_states: Vec<BodyState>,
    pub exit_state: Option<BodyState>,
}

impl Animation {
    pub fn new(name: impl Into<String>, bpm: f64, keyframes: Vec<AnimationKeyframe>) -> Self {
        Self {
            name: name.into(),
            keyframes,
            bpm,
            retime_to_integer_slices: true,
            extendable: false,
            entry_states: vec![BodyState::Stand],
            exit_state: None,
        }
    }

    /// Time of the last keyframe, seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.keyframes
            .iter()
            .map(|k| k.time)
            .fold(0.0, f64::max)
    }

    /// Length in (fractional) slices at the authored tempo.
    pub fn nominal_slices(&self) -> f64 {
        self.duration_seconds() * self.bpm * SLICES_PER_BEAT / 60.0
    }

    /// Default move length: rounded when retiming, otherwise rounded up so the
    /// whole animation plays at nominal rate.
    pub fn default_slices(&self) -> u32 {
        let nominal = self.nominal_slices();
        let slices = if self.retime_to_integer_slices {
            nominal.round()
        } else {
            (nominal - 1e-9).ceil()
        };
        slices.max(1.0) as u32
    }

    /// Channels driven by at least one keyframe.
    pub fn controls(&self) -> ControlFlags {
        let mut flags = ControlFlags::NONE;
        for k in &self.keyframes {
            flags.body |= k.body_position.is_some() || k.body_rotation.is_some();
            flags.legs |= k.legs.iter().any(|l| !l.is_empty());
            flags.arm |= !k.arm.is_empty();
            flags.gripper |= k.gripper.is_some();
        }
        flags
    }

    /// Ensures keyframe times are strictly increasing.
    ///
    /// In lenient mode out-of-order keyframes are stably re-sorted and keyframes
    /// sharing a timestamp are merged, later fields winning.
    pub fn normalize(&mut self, mode: ValidationMode) -> Result<()> {
        if self.keyframes.is_empty() {
            return Err(Error::EmptyAnimation(self.name.clone()));
        }
        if let Some(index) = self.keyframes.iter().position(|k| !k.time.is_finite()) {
            return Err(Error::UnorderedKeyframe {
                animation: self.name.clone(),
                index,
            });
        }
        let first_bad = self
            .keyframes
            .windows(2)
            .position(|w| w[1].time <= w[0].time)
            .map(|i| i + 1);
        let Some(index) = first_bad else {
            return Ok(());
        };
        if mode == ValidationMode::Strict {
            return Err(Error::UnorderedKeyframe {
                animation: self.name.clone(),
                index,
            });
        }

        warn!(
            animation = %self.name,
            index, "keyframes out of order, re-sorting"
        );
        self.keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        let mut merged: Vec<AnimationKeyframe> = Vec::with_capacity(self.keyframes.len());
        for k in self.keyframes.drain(..) {
            match merged.last_mut() {
                Some(last) if last.time == k.time => last.merge(&k),
                _ => merged.push(k),
            }
        }
        self.keyframes = merged;
        Ok(())
    }
}

/// Set-points of one pose field over time.
#[derive(Clone, Debug)]
struct Track<T> {
    points: Vec<(f64, T)>,
}

impl<T: Copy> Track<T> {
    fn collect(
        keyframes: &[AnimationKeyframe],
        field: impl Fn(&AnimationKeyframe) -> Option<T>,
    ) -> Self {
        Self {
            points: keyframes
                .iter()
                .filter_map(|k| field(k).map(|v| (k.time, v)))
                .collect(),
        }
    }

    /// Last set-point at or before `t`.
    fn latest(&self, t: f64) -> Option<(f64, T)> {
        let idx = self.points.partition_point(|(time, _)| *time <= t);
        idx.checked_sub(1).map(|i| self.points[i])
    }

    fn first(&self) -> Option<(f64, T)> {
        self.points.first().copied()
    }

    /// Value at `t`, holding the first/last set-point outside the track's range.
    fn sample(&self, t: f64, lerp: impl Fn(T, T, f32) -> T) -> Option<T> {
        let idx = self.points.partition_point(|(time, _)| *time <= t);
        if idx == 0 {
            return self.points.first().map(|(_, v)| *v);
        }
        let (t0, v0) = self.points[idx - 1];
        match self.points.get(idx) {
            Some(&(t1, v1)) => {
                let w = ((t - t0) / (t1 - t0)) as f32;
                Some(lerp(v0, v1, w))
            }
            None => Some(v0),
        }
    }
}

#[derive(Clone, Debug)]
struct LegTracks {
    foot: Track<Vec3>,
    joints: Track<Vec3>,
    stance: Track<bool>,
}

impl LegTracks {
    fn sample(&self, t: f64) -> Option<LegTarget> {
        let latest_foot = self.foot.latest(t).map(|(time, _)| time);
        let latest_joints = self.joints.latest(t).map(|(time, _)| time);
        let mode = match (latest_foot, latest_joints) {
            (Some(f), Some(j)) if j > f => LegMode::JointAngles,
            (Some(_), _) => LegMode::FootPosition,
            (None, Some(_)) => LegMode::JointAngles,
            (None, None) => match (self.foot.first(), self.joints.first()) {
                (Some((f, _)), Some((j, _))) if j < f => LegMode::JointAngles,
                (Some(_), _) => LegMode::FootPosition,
                (None, Some(_)) => LegMode::JointAngles,
                (None, None) => return None,
            },
        };
        let track = match mode {
            LegMode::FootPosition => &self.foot,
            LegMode::JointAngles => &self.joints,
        };
        let position = track.sample(t, Vec3::lerp)?;
        let stance = self.stance.sample(t, |a, _, _| a).unwrap_or(true);
        Some(LegTarget {
            position,
            mode,
            stance,
        })
    }
}

/// Blended pose at one instant. `None` fields are not driven by the animation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AnimationPose {
    pub body_position: Option<Vec3>,
    pub body_rotation: Option<Quat>,
    pub legs: [Option<LegTarget>; 4],
    pub arm: [Option<f32>; 6],
    pub gripper: Option<f32>,
}

impl AnimationPose {
    /// Applies multipliers, then offsets.
    pub fn transform(mut self, params: &AnimateParams) -> Self {
        if let Some(position) = self.body_position.as_mut() {
            *position *= params.translation_multiplier.unwrap_or(Vec3::ONE);
            *position += params.translation_offset.unwrap_or(Vec3::ZERO);
        }
        if let Some(rotation) = self.body_rotation.as_mut() {
            let (yaw, pitch, roll) = rotation.to_euler(EulerRot::ZYX);
            let scaled = Vec3::new(yaw, pitch, roll)
                * params.rotation_multiplier.unwrap_or(Vec3::ONE)
                + params.rotation_offset.unwrap_or(Vec3::ZERO);
            *rotation = Quat::from_euler(EulerRot::ZYX, scaled.x, scaled.y, scaled.z);
        }
        if let Some(m) = params.arm_multiplier {
            for joint in self.arm.iter_mut().flatten() {
                *joint *= m;
            }
        }
        if let Some(gripper) = self.gripper.as_mut() {
            *gripper = *gripper * params.gripper_multiplier.unwrap_or(1.0)
                + params.gripper_offset.unwrap_or(0.0);
        }
        self
    }
}

/// Continuous pose function over one animation.
#[derive(Clone, Debug)]
pub struct AnimationBlender {
    duration: f64,
    retime: bool,
    body_position: Track<Vec3>,
    body_rotation: Track<Quat>,
    legs: [LegTracks; 4],
    arm: [Track<f32>; 6],
    gripper: Track<f32>,
}

impl AnimationBlender {
    /// Builds the blender. Keyframes must already be normalized.
    pub fn new(animation: &Animation) -> Result<Self> {
        if animation.keyframes.is_empty() {
            return Err(Error::EmptyAnimation(animation.name.clone()));
        }
        if let Some(index) = animation
            .keyframes
            .windows(2)
            .position(|w| !(w[1].time > w[0].time))
        {
            return Err(Error::UnorderedKeyframe {
                animation: animation.name.clone(),
                index: index + 1,
            });
        }
        let frames = &animation.keyframes;
        let legs = std::array::from_fn(|i| LegTracks {
            foot: Track::collect(frames, |k| k.legs[i].foot_position),
            joints: Track::collect(frames, |k| {
                k.legs[i]
                    .joint_angles
                    .filter(|_| k.legs[i].foot_position.is_none())
            }),
            stance: Track::collect(frames, |k| k.legs[i].stance),
        });
        let arm = std::array::from_fn(|j| Track::collect(frames, |k| k.arm.as_array()[j]));
        debug!(animation = %animation.name, keyframes = frames.len(), "built animation blender");
        Ok(Self {
            duration: animation.duration_seconds(),
            retime: animation.retime_to_integer_slices,
            body_position: Track::collect(frames, |k| k.body_position),
            body_rotation: Track::collect(frames, |k| k.body_rotation),
            legs,
            arm,
            gripper: Track::collect(frames, |k| k.gripper),
        })
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration
    }

    /// Raw blended pose at animation time `t` seconds.
    pub fn sample(&self, t: f64) -> AnimationPose {
        AnimationPose {
            body_position: self.body_position.sample(t, Vec3::lerp),
            body_rotation: self.body_rotation.sample(t, Quat::slerp),
            legs: std::array::from_fn(|i| self.legs[i].sample(t)),
            arm: std::array::from_fn(|j| self.arm[j].sample(t, |a, b, w| a + (b - a) * w)),
            gripper: self.gripper.sample(t, |a, b, w| a + (b - a) * w),
        }
    }

    /// Maps time within a move onto animation time.
    ///
    /// `speed` scales the time axis first and `offset_seconds` shifts the start.
    /// When retiming, the result is stretched so the animation exactly fills
    /// `move_seconds`; otherwise it plays at nominal rate and the tail holds.
    pub fn animation_time(
        &self,
        local_seconds: f64,
        move_seconds: f64,
        speed: f64,
        offset_seconds: f64,
    ) -> f64 {
        let nominal = local_seconds * speed + offset_seconds;
        if self.retime && move_seconds > 0.0 && self.duration > 0.0 {
            nominal * self.duration / move_seconds
        } else {
            nominal
        }
    }

    /// Pose for a placed animate move: time mapping, lookup, then the affine
    /// post-transform from `params`.
    pub fn sample_move(
        &self,
        local_seconds: f64,
        move_seconds: f64,
        offset_seconds: f64,
        params: &AnimateParams,
    ) -> AnimationPose {
        let speed = params.speed.map(f64::from).unwrap_or(1.0);
        let t = self.animation_time(local_seconds, move_seconds, speed, offset_seconds);
        self.sample(t).transform(params)
    }
}

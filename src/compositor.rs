//! Timeline compositor: turns a validated sequence into a stream of [`CommandFrame`]s.
//!
//! The entry point is [`Compositor`]. Build it from a [`ValidatedSequence`], the
//! [`MoveCatalog`] it was validated against and the robot's starting pose, then
//! either iterate [`Compositor::frames`] tick by tick or collect everything with
//! [`Compositor::compose`].

use crate::animation::AnimationBlender;
use crate::catalog::MoveCatalog;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::frame::{CommandFrame, lerp_legs};
use crate::motion::{Contribution, MotionContext, evaluate};
use crate::moves::{MoveKind, MoveParams};
use crate::validator::{ValidatedMove, ValidatedSequence};
use std::collections::HashMap;
use tracing::{debug, trace, warn};

/// Produces command frames for one validated sequence.
pub struct Compositor<'a> {
    sequence: &'a ValidatedSequence,
    catalog: &'a MoveCatalog,
    initial: CommandFrame,
    ticks_per_second: f64,
    blenders: HashMap<String, AnimationBlender>,
}

impl<'a> Compositor<'a> {
    /// Creates a compositor sampling at `ticks_per_second`.
    ///
    /// Fails with [`Error::InvalidTickRate`] if the rate is not a finite positive
    /// number. Animations that cannot be blended are not an error here; moves
    /// using them report [`Error::MoveEvaluation`] during composition.
    pub fn new(
        sequence: &'a ValidatedSequence,
        catalog: &'a MoveCatalog,
        initial: CommandFrame,
        ticks_per_second: f64,
    ) -> Result<Self> {
        if !ticks_per_second.is_finite() || ticks_per_second <= 0.0 {
            return Err(Error::InvalidTickRate { ticks_per_second });
        }

        let mut blenders = HashMap::new();
        for validated in sequence.moves() {
            let name = &validated.instance.move_type;
            if validated.instance.params.kind() != MoveKind::Animate
                || blenders.contains_key(name)
            {
                continue;
            }
            match catalog.animation(name).map(AnimationBlender::new) {
                Some(Ok(blender)) => {
                    blenders.insert(name.clone(), blender);
                }
                Some(Err(err)) => warn!(animation = %name, %err, "animation cannot be blended"),
                None => warn!(animation = %name, "animate move without animation data"),
            }
        }

        Ok(Self {
            sequence,
            catalog,
            initial,
            ticks_per_second,
            blenders,
        })
    }

    /// Creates a compositor using the tick rate from `config`.
    pub fn with_config(
        sequence: &'a ValidatedSequence,
        catalog: &'a MoveCatalog,
        initial: CommandFrame,
        config: &EngineConfig,
    ) -> Result<Self> {
        Self::new(sequence, catalog, initial, config.ticks_per_second)
    }

    pub fn ticks_per_second(&self) -> f64 {
        self.ticks_per_second
    }

    pub fn duration_seconds(&self) -> f64 {
        self.sequence.duration_seconds()
    }

    /// Number of frames covering `[0, duration)`.
    pub fn tick_count(&self) -> u64 {
        let ticks = self.duration_seconds() * self.ticks_per_second;
        (ticks - 1e-9).ceil().max(0.0) as u64
    }

    /// Streams frames in time order.
    pub fn frames(&self) -> FrameStream<'_, 'a> {
        debug!(
            sequence = %self.sequence.name(),
            ticks = self.tick_count(),
            ticks_per_second = self.ticks_per_second,
            "starting composition"
        );
        FrameStream {
            compositor: self,
            tick: 0,
            total_ticks: self.tick_count(),
            state: self.initial.clone(),
            status: vec![MoveStatus::Pending; self.sequence.moves().len()],
            reported: vec![false; self.sequence.moves().len()],
            faults: Vec::new(),
        }
    }

    /// Composes every frame, collecting evaluation faults alongside.
    pub fn compose(&self) -> Composition {
        let mut stream = self.frames();
        let frames: Vec<CommandFrame> = stream.by_ref().collect();
        Composition {
            frames,
            faults: stream.take_faults(),
        }
    }
}

/// All frames of a sequence plus the faults hit while producing them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Composition {
    pub frames: Vec<CommandFrame>,
    pub faults: Vec<Error>,
}

#[derive(Clone, Debug)]
enum MoveStatus {
    Pending,
    /// Holds the channel state captured on the move's first tick.
    Active(Box<CommandFrame>),
    Done,
}

/// Iterator over the frames of a [`Compositor`].
///
/// Dropping the stream is the way to stop playback early.
pub struct FrameStream<'c, 'a> {
    compositor: &'c Compositor<'a>,
    tick: u64,
    total_ticks: u64,
    state: CommandFrame,
    status: Vec<MoveStatus>,
    reported: Vec<bool>,
    faults: Vec<Error>,
}

impl FrameStream<'_, '_> {
    /// Evaluation faults reported so far, one per failing move.
    pub fn faults(&self) -> &[Error] {
        &self.faults
    }

    pub fn take_faults(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.faults)
    }

    /// Evaluates `validated` at `local_slices` and blends the result into the state.
    fn drive(
        &mut self,
        position: usize,
        validated: &ValidatedMove,
        snapshot: &CommandFrame,
        local_slices: f64,
    ) {
        let compositor = self.compositor;
        let Some(move_type) = compositor.catalog.get(&validated.instance.move_type) else {
            self.report(position, Error::UnknownMoveType {
                index: validated.index,
                name: validated.instance.move_type.clone(),
            });
            return;
        };
        let ctx = MotionContext {
            index: validated.index,
            move_type,
            instance: &validated.instance,
            clock: compositor.sequence.clock(),
            start: snapshot,
            origin: &compositor.initial,
            local_slices,
            animation: compositor.blenders.get(&validated.instance.move_type),
        };

        match evaluate(&ctx) {
            Ok(mut contribution) => {
                mask(&mut contribution, move_type.controls);
                let (entry, exit) = validated.instance.params.transition_slices();
                let requested = f64::from(validated.instance.requested_slices);
                let weight = blend_weight(local_slices, requested, entry, exit);
                if weight < 1.0 {
                    match validated.instance.params {
                        // Animation entry and exit blends only touch the body.
                        MoveParams::Animate(_) => {
                            contribution.body =
                                contribution.body.map(|b| snapshot.body.lerp(&b, weight));
                        }
                        _ => contribution = blend(snapshot, &contribution, weight),
                    }
                }
                contribution.apply_to(&mut self.state);
            }
            Err(err) => self.report(position, err),
        }
    }

    fn report(&mut self, position: usize, err: Error) {
        // One fault per move; the channel keeps holding its last state.
        if std::mem::replace(&mut self.reported[position], true) {
            return;
        }
        warn!(%err, tick = self.tick, "move evaluation failed, holding last state");
        self.faults.push(err);
    }
}

impl Iterator for FrameStream<'_, '_> {
    type Item = CommandFrame;

    fn next(&mut self) -> Option<CommandFrame> {
        if self.tick >= self.total_ticks {
            return None;
        }
        let compositor = self.compositor;
        let time = self.tick as f64 / compositor.ticks_per_second;
        let slice = tick_slice(
            self.tick,
            compositor.ticks_per_second,
            compositor.sequence.clock().slices_per_minute(),
        );

        for (position, validated) in compositor.sequence.moves().iter().enumerate() {
            let start = f64::from(validated.instance.start_slice);
            let end = f64::from(validated.instance.end_slice());
            if slice < start {
                // Sorted by start: nothing later has begun either.
                break;
            }
            let status = std::mem::replace(&mut self.status[position], MoveStatus::Done);
            let snapshot = match status {
                MoveStatus::Done => continue,
                MoveStatus::Pending => {
                    trace!(index = validated.index, slice, "move started");
                    Box::new(self.state.clone())
                }
                MoveStatus::Active(snapshot) => snapshot,
            };
            if slice < end {
                self.drive(position, validated, &snapshot, slice - start);
                self.status[position] = MoveStatus::Active(snapshot);
            } else {
                // Settle on the final pose so the channel holds it afterwards.
                self.drive(position, validated, &snapshot, end - start);
                trace!(index = validated.index, slice, "move finished");
            }
        }

        let mut frame = self.state.clone();
        frame.tick = self.tick;
        frame.time = time;
        frame.slice = slice;
        self.tick += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total_ticks.saturating_sub(self.tick) as usize;
        (remaining, Some(remaining))
    }
}

/// Timeline slice of output tick `tick`.
///
/// Computed in one step so ticks landing exactly on a slice boundary stay on it,
/// then snapped to the nearest whole slice within `1e-9`.
pub fn tick_slice(tick: u64, ticks_per_second: f64, slices_per_minute: f64) -> f64 {
    let slice = tick as f64 * slices_per_minute / (60.0 * ticks_per_second);
    let whole = slice.round();
    if (slice - whole).abs() < 1e-9 {
        whole
    } else {
        slice
    }
}

/// Weight of the move's own pose against the entry snapshot.
///
/// Ramps up over `entry` slices and back down over the final `exit` slices.
pub fn blend_weight(local: f64, requested: f64, entry: Option<f64>, exit: Option<f64>) -> f32 {
    let mut weight: f64 = 1.0;
    if let Some(entry) = entry
        && entry > 0.0
        && local < entry
    {
        weight = weight.min(local / entry);
    }
    if let Some(exit) = exit
        && exit > 0.0
        && local > requested - exit
    {
        weight = weight.min((requested - local) / exit);
    }
    weight.clamp(0.0, 1.0) as f32
}

fn mask(contribution: &mut Contribution, controls: crate::frame::ControlFlags) {
    if !controls.body {
        contribution.body = None;
    }
    if !controls.legs {
        contribution.legs = None;
    }
    if !controls.arm {
        contribution.arm = None;
    }
    if !controls.gripper {
        contribution.gripper = None;
    }
    if !controls.lights {
        contribution.lights = None;
    }
}

fn blend(snapshot: &CommandFrame, contribution: &Contribution, weight: f32) -> Contribution {
    Contribution {
        body: contribution.body.map(|b| snapshot.body.lerp(&b, weight)),
        legs: contribution
            .legs
            .map(|legs| lerp_legs(&snapshot.legs, &legs, weight)),
        arm: contribution.arm.map(|a| snapshot.arm.lerp(&a, weight)),
        gripper: contribution
            .gripper
            .map(|g| snapshot.gripper + (g - snapshot.gripper) * weight),
        lights: contribution.lights.map(|c| snapshot.lights.lerp(&c, weight)),
    }
}

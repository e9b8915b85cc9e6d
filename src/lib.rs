//! # choreo-timeline
//!
//! A choreography timeline engine for legged robots with an arm. Dance moves are
//! placed on a discrete timeline of *slices* (quarter beats), checked against a
//! [`MoveCatalog`], and composed into a continuous stream of fully resolved
//! [`CommandFrame`]s that an external dispatcher can send to the robot.
//!
//! The pipeline is:
//!
//! 1. Build a [`MoveCatalog`] once, usually [`MoveCatalog::standard`] plus any
//!    registered keyframe [`Animation`]s.
//! 2. Validate a [`Sequence`] with a [`Validator`], strict or lenient.
//! 3. Feed the [`ValidatedSequence`] to a [`Compositor`] and iterate its frames,
//!    optionally through a [`Pacer`] for real-time delivery.
//!
//! The crate performs no I/O. Everything is `serde` (de)serializable so callers
//! can load catalogs and sequences from whatever format they like.

pub mod animation;
pub mod catalog;
pub mod clock;
pub mod compositor;
pub mod config;
pub mod easing;
pub mod error;
pub mod frame;
pub mod motion;
pub mod moves;
pub mod pacer;
pub mod sequence;
pub mod validator;

pub use animation::{AnimateLeg, Animation, AnimationBlender, AnimationKeyframe, AnimationPose};
pub use catalog::{MoveCatalog, MoveType, ParamSpec};
pub use clock::{SLICES_PER_BEAT, SliceClock};
pub use compositor::{Composition, Compositor, FrameStream};
pub use config::{EngineConfig, ValidationMode};
pub use easing::Easing;
pub use error::{Error, Result, ValidationErrors};
pub use frame::*;
pub use moves::*;
pub use pacer::{LatencyFault, Pace, Pacer};
pub use sequence::{MoveInstance, Sequence};
pub use validator::{ValidatedMove, ValidatedSequence, ValidationWarning, Validator};

//! Sequence validation against a [`MoveCatalog`].
//!
//! Validation is batch: every problem in the sequence is collected before
//! returning. In [`ValidationMode::Lenient`] recoverable problems are corrected
//! and surfaced as [`ValidationWarning`]s instead.

use crate::catalog::{MoveCatalog, MoveType, ParamSpec};
use crate::clock::SliceClock;
use crate::config::ValidationMode;
use crate::error::{Error, ValidationErrors};
use crate::frame::BodyState;
use crate::moves::{FieldRef, MoveParameters};
use crate::sequence::{MoveInstance, Sequence};
use std::fmt;
use tracing::{debug, warn};

/// A recoverable problem that lenient validation corrected.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidationWarning {
    /// Index of the move in the submitted sequence.
    pub index: usize,
    /// What strict validation would have rejected.
    pub error: Error,
    pub correction: String,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.correction)
    }
}

/// A move that passed validation, with its resolved posture context.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedMove {
    /// Index of the move in the submitted sequence.
    pub index: usize,
    pub instance: MoveInstance,
    /// Posture the move starts from.
    pub incoming_state: BodyState,
    /// Posture the move leaves the robot in.
    pub exit_state: BodyState,
}

/// A sequence sorted by start slice, with corrections applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ValidatedSequence {
    name: String,
    clock: SliceClock,
    initial_state: BodyState,
    moves: Vec<ValidatedMove>,
    warnings: Vec<ValidationWarning>,
}

impl ValidatedSequence {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clock(&self) -> &SliceClock {
        &self.clock
    }

    pub fn initial_state(&self) -> BodyState {
        self.initial_state
    }

    /// Moves in timeline order.
    pub fn moves(&self) -> &[ValidatedMove] {
        &self.moves
    }

    pub fn warnings(&self) -> &[ValidationWarning] {
        &self.warnings
    }

    pub fn duration_slices(&self) -> u32 {
        self.moves
            .iter()
            .map(|m| m.instance.end_slice())
            .max()
            .unwrap_or(0)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.clock.slice_to_seconds(f64::from(self.duration_slices()))
    }

    /// Posture after the last move.
    pub fn final_state(&self) -> BodyState {
        self.moves
            .iter()
            .rev()
            .find(|m| m.exit_state != m.incoming_state)
            .map_or(self.initial_state, |m| m.exit_state)
    }
}

/// Checks sequences against a catalog.
pub struct Validator<'a> {
    catalog: &'a MoveCatalog,
    mode: ValidationMode,
}

impl<'a> Validator<'a> {
    pub fn new(catalog: &'a MoveCatalog, mode: ValidationMode) -> Self {
        Self { catalog, mode }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Validates `sequence`, returning it sorted and corrected, or every error found.
    ///
    /// Errors are ordered by check (per-move checks in submission order, then
    /// overlaps, then transitions in timeline order), so repeated runs report
    /// identically.
    pub fn validate(
        &self,
        sequence: &Sequence,
    ) -> std::result::Result<ValidatedSequence, ValidationErrors> {
        debug!(
            sequence = %sequence.name,
            moves = sequence.len(),
            mode = ?self.mode,
            "validating sequence"
        );
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let clock = match sequence.clock() {
            Ok(clock) => Some(clock),
            Err(err) => {
                errors.push(err);
                None
            }
        };

        let mut checked: Vec<(usize, MoveInstance, &MoveType)> = Vec::new();
        for (index, original) in sequence.moves.iter().enumerate() {
            let Some(move_type) = self.catalog.get(&original.move_type) else {
                errors.push(Error::UnknownMoveType {
                    index,
                    name: original.move_type.clone(),
                });
                continue;
            };
            if original.params.kind() != move_type.kind {
                errors.push(Error::ParameterType {
                    index,
                    name: move_type.name.clone(),
                    expected: move_type.kind.to_string(),
                    found: original.params.kind().to_string(),
                });
                continue;
            }

            let mut instance = original.clone();
            if let Some(clock) = &clock {
                self.check_duration(
                    index,
                    &mut instance,
                    move_type,
                    clock,
                    &mut errors,
                    &mut warnings,
                );
            }
            self.check_params(index, &mut instance, move_type, &mut errors, &mut warnings);
            checked.push((index, instance, move_type));
        }

        // Stable: equal start slices keep submission order.
        checked.sort_by_key(|(_, instance, _)| instance.start_slice);

        for (i, (first_index, first, first_type)) in checked.iter().enumerate() {
            for (second_index, second, second_type) in &checked[i + 1..] {
                if second.start_slice >= first.end_slice() {
                    break;
                }
                let shared = first_type.controls.intersection(&second_type.controls);
                if !shared.is_empty() && first.overlaps(second) {
                    let channels = shared
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ");
                    errors.push(Error::MoveOverlap {
                        first: *first_index,
                        second: *second_index,
                        channels,
                    });
                }
            }
        }

        let mut moves: Vec<ValidatedMove> = Vec::with_capacity(checked.len());
        for (position, (index, instance, move_type)) in checked.iter().enumerate() {
            // Posture lives on the body: body moves only look at earlier body moves.
            let feeds = |earlier: &MoveType| {
                if move_type.controls.body {
                    earlier.controls.body
                } else {
                    earlier.controls.intersects(&move_type.controls)
                }
            };
            let incoming = checked[..position]
                .iter()
                .zip(moves.iter())
                .rev()
                .find(|((_, _, earlier), _)| feeds(earlier))
                .map_or(sequence.initial_state, |(_, earlier)| earlier.exit_state);
            if !move_type.accepts_entry(incoming) {
                errors.push(Error::TransitionState {
                    index: *index,
                    name: move_type.name.clone(),
                    incoming,
                    admissible: move_type.entry_states.clone(),
                });
            }
            moves.push(ValidatedMove {
                index: *index,
                instance: instance.clone(),
                incoming_state: incoming,
                exit_state: move_type.resolve_exit(incoming),
            });
        }

        if !errors.is_empty() {
            debug!(sequence = %sequence.name, errors = errors.len(), "sequence rejected");
            return Err(ValidationErrors(errors));
        }

        let Some(clock) = clock else {
            return Err(ValidationErrors(errors));
        };
        debug!(
            sequence = %sequence.name,
            warnings = warnings.len(),
            "sequence validated"
        );
        Ok(ValidatedSequence {
            name: sequence.name.clone(),
            clock,
            initial_state: sequence.initial_state,
            moves,
            warnings,
        })
    }

    fn check_duration(
        &self,
        index: usize,
        instance: &mut MoveInstance,
        move_type: &MoveType,
        clock: &SliceClock,
        errors: &mut Vec<Error>,
        warnings: &mut Vec<ValidationWarning>,
    ) {
        let default = move_type.default_slices_at(clock);
        let requested = instance.requested_slices;
        let min = move_type.min_slices_at(clock);
        let max = move_type.max_slices_at(clock);

        let problem = if requested == 0 {
            Some(("zero length".to_string(), default))
        } else if !move_type.extendable {
            (requested != default)
                .then(|| (format!("not extendable, length must be {default}"), default))
        } else if let Some(min) = min
            && requested < min
        {
            Some((format!("shorter than minimum {min}"), min))
        } else if let Some(max) = max
            && requested > max
        {
            Some((format!("longer than maximum {max}"), max))
        } else {
            None
        };

        let Some((reason, corrected)) = problem else {
            return;
        };
        let error = Error::InvalidDuration {
            index,
            name: move_type.name.clone(),
            requested,
            reason,
        };
        match self.mode {
            ValidationMode::Strict => errors.push(error),
            ValidationMode::Lenient => {
                warn!(
                    index,
                    move_type = %move_type.name,
                    requested,
                    corrected,
                    "coercing move duration"
                );
                instance.requested_slices = corrected;
                warnings.push(ValidationWarning {
                    index,
                    error,
                    correction: format!("length set to {corrected} slices"),
                });
            }
        }
    }

    fn check_params(
        &self,
        index: usize,
        instance: &mut MoveInstance,
        move_type: &MoveType,
        errors: &mut Vec<Error>,
        warnings: &mut Vec<ValidationWarning>,
    ) {
        let mode = self.mode;
        let mut findings = Findings {
            index,
            mode,
            errors,
            warnings,
        };
        instance.params.visit_fields(&mut |name, field| {
            let Some(spec) = move_type.param(name) else {
                return;
            };
            if spec.ty != field.param_type() {
                findings.errors.push(Error::ParameterType {
                    index,
                    name: format!("{}.{}", move_type.name, name),
                    expected: format!("{:?}", spec.ty),
                    found: format!("{:?}", field.param_type()),
                });
                return;
            }
            match field {
                FieldRef::Float(Some(value)) => {
                    *value = findings.bound(name.to_string(), f64::from(*value), spec) as f32;
                }
                FieldRef::Count(Some(value)) => {
                    let checked = findings.bound(name.to_string(), f64::from(*value), spec);
                    *value = checked.round() as u32;
                }
                FieldRef::Vector(Some(value)) => {
                    let components = [
                        ("x", &mut value.x),
                        ("y", &mut value.y),
                        ("z", &mut value.z),
                    ];
                    for (axis, component) in components {
                        let field = format!("{name}.{axis}");
                        *component = findings.bound(field, f64::from(*component), spec) as f32;
                    }
                }
                FieldRef::Planar(Some(value)) => {
                    for (axis, component) in [("x", &mut value.x), ("y", &mut value.y)] {
                        let field = format!("{name}.{axis}");
                        *component = findings.bound(field, f64::from(*component), spec) as f32;
                    }
                }
                _ => {}
            }
        });
    }
}

struct Findings<'e> {
    index: usize,
    mode: ValidationMode,
    errors: &'e mut Vec<Error>,
    warnings: &'e mut Vec<ValidationWarning>,
}

impl Findings<'_> {
    /// Returns `value`, or its clamped replacement in lenient mode.
    fn bound(&mut self, field: String, value: f64, spec: &ParamSpec) -> f64 {
        if value.is_finite() && spec.contains(value) {
            return value;
        }
        let error = Error::ParameterBounds {
            index: self.index,
            field,
            value,
            min: spec.min,
            max: spec.max,
        };
        match self.mode {
            ValidationMode::Strict => {
                self.errors.push(error);
                value
            }
            ValidationMode::Lenient => {
                let clamped = spec.clamp(if value.is_finite() { value } else { 0.0 });
                warn!(index = self.index, %error, clamped, "clamping parameter");
                self.warnings.push(ValidationWarning {
                    index: self.index,
                    error,
                    correction: format!("clamped to {clamped}"),
                });
                clamped
            }
        }
    }
}

//! Slice clock: conversion between timeline slices and wall-clock seconds.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Slices in one musical beat. A slice is a quarter beat.
pub const SLICES_PER_BEAT: f64 = 4.0;

/// Converts between slice indices and elapsed seconds for a fixed tempo.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SliceClock {
    slices_per_minute: f64,
}

impl SliceClock {
    /// Creates a clock running at `slices_per_minute`.
    ///
    /// Fails with [`Error::InvalidTempo`] if the tempo is not a finite positive number.
    pub fn new(slices_per_minute: f64) -> Result<Self> {
        if !slices_per_minute.is_finite() || slices_per_minute <= 0.0 {
            return Err(Error::InvalidTempo { slices_per_minute });
        }
        Ok(Self { slices_per_minute })
    }

    /// Creates a clock from a tempo in beats per minute.
    pub fn from_bpm(bpm: f64) -> Result<Self> {
        Self::new(bpm * SLICES_PER_BEAT)
    }

    /// Tempo in slices per minute.
    pub fn slices_per_minute(&self) -> f64 {
        self.slices_per_minute
    }

    pub fn slices_per_second(&self) -> f64 {
        self.slices_per_minute / 60.0
    }

    /// Seconds from the timeline origin to `slice`.
    pub fn slice_to_seconds(&self, slice: f64) -> f64 {
        slice * 60.0 / self.slices_per_minute
    }

    /// Timeline position, in slices, of `seconds`.
    pub fn seconds_to_slice(&self, seconds: f64) -> f64 {
        seconds * self.slices_per_minute / 60.0
    }
}

/// One-shot form of [`SliceClock::slice_to_seconds`].
pub fn slice_to_seconds(slice: f64, slices_per_minute: f64) -> Result<f64> {
    Ok(SliceClock::new(slices_per_minute)?.slice_to_seconds(slice))
}

/// One-shot form of [`SliceClock::seconds_to_slice`].
pub fn seconds_to_slice(seconds: f64, slices_per_minute: f64) -> Result<f64> {
    Ok(SliceClock::new(slices_per_minute)?.seconds_to_slice(seconds))
}

//! # Per-Cycle Values
//!
//! Ready-made generators for the barrier's value-producing step.

mod draws;

pub use draws::{RandomDraw, SeededDraws};

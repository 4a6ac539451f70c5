//! # System Module
//!
//! Clinical stage assessment.
//!
//! The assessment logic is pure and deterministic: it sees a wound
//! snapshot, its treatments and an instant, and nothing else. Persisting
//! the result is the job of [`crate::evaluator`].

mod stage;

pub use stage::*;

//! Utility modules for the Pulsetrail Tracker.
//!
//! # Modules
//!
//! - [`debounce`]: Single-slot dwell debouncing for hover tracking
//! - [`sample`]: Interval sampling for pointer movement

pub mod debounce;
pub mod sample;

pub use debounce::{Debounced, Debouncer};
pub use sample::Sampler;

//! Background subtraction, contour extraction, zone test, centroid
//! tracker and object counter — split into a pure decision function and a
//! separate annotation function per SPEC_FULL.md §4.4 DESIGN NOTES, so
//! triggering logic is unit-testable without drawing or a display.

pub mod annotate;
pub mod decide;
pub mod error;
pub mod state;

pub use annotate::{annotate, encode_jpeg};
pub use decide::{decide, BoundingBox, DetectionEffects};
pub use error::{MotionError, Result};
pub use state::{DetectorConfig, MotionState, Tracker};

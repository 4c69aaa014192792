//! Geometry shared by every toplevel peer component.

pub mod window_state;

pub use window_state::{Geometry, Insets};

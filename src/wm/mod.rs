//! Window Manager Module
//!
//! Everything a toplevel peer negotiates with the running window manager:
//! who it is, what it supports, frame insets, decorations, state, stacking,
//! the transient-for chains of modal blocking, focus and grabs.

pub mod client;
pub mod client_flags;
pub mod decorations;
pub mod display;
pub mod events;
pub mod ewmh;
pub mod focus;
pub mod grab;
pub mod hints;
pub mod identity;
pub mod insets;
pub mod profile;
pub mod protocols;
pub mod session;
pub mod stacking;
pub mod state;
pub mod transients;

#[cfg(test)]
pub mod testing;

pub use client::{ToplevelWindow, WindowKind};
pub use client_flags::{ExtendedState, Layer, MwmDecorations, MwmFunctions, WmState};
pub use display::{X11Display, XServer};
pub use events::{PeerEvent, PointerInput, PointerKind};
pub use ewmh::Atoms;
pub use focus::{DenyReason, FocusResponse};
pub use identity::WmIdentity;
pub use profile::WmProfile;
pub use session::{Session, SessionLock, SessionState};
pub use state::WindowState;

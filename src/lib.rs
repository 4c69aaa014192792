//! xtoplevel
//!
//! X11 toplevel window peers for a GUI toolkit. Detects the running window
//! manager, negotiates decorations, insets, state and stacking with it, and
//! keeps the toolkit's synchronous focus and modal-blocking model in step
//! with the asynchronous server.

pub mod config;
pub mod error;
pub mod shared;
pub mod wm;

pub use config::Config;
pub use error::{Error, Result};
pub use shared::{Geometry, Insets};
pub use wm::{
    DenyReason, ExtendedState, FocusResponse, Layer, MwmDecorations, MwmFunctions, PeerEvent,
    PointerInput, PointerKind, Session, SessionLock, SessionState, ToplevelWindow, WindowKind,
    WindowState, WmIdentity, WmProfile, WmState, X11Display, XServer,
};

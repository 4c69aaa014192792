//! Error types for the toplevel peer layer.

use thiserror::Error;
use x11rb::errors::{ConnectError, ConnectionError, ReplyError};
use x11rb::protocol::xproto::Window;

/// Failures that reach callers of the toplevel peer layer.
///
/// Missing properties, absent selections and racing BadWindow/BadAccess
/// errors never show up here: they are folded into `None`/`false` results
/// at the native boundary.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to connect to the X server: {0}")]
    Connect(#[from] ConnectError),

    #[error("X11 connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("X11 request failed: {0}")]
    Reply(#[from] ReplyError),

    #[error("window 0x{0:x} is not a registered toplevel")]
    UnknownWindow(Window),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

use x11rb::protocol::xproto::Window;

use crate::shared::{Geometry, Insets};
use crate::wm::client_flags::{ExtendedState, Layer, MwmDecorations, MwmFunctions, WmState};

/// What kind of toolkit window backs a toplevel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowKind {
    /// Decorated application frame
    Frame,
    /// Decorated dialog, possibly modal
    Dialog,
    /// Undecorated window (popups, splash screens); never takes native focus
    Plain,
}

/// One native toplevel window peer.
///
/// Owner, blocker and chain links are handles resolved through the session
/// registry, never owning references.
#[derive(Debug, Clone)]
pub struct ToplevelWindow {
    /// X11 window ID
    pub window: Window,

    pub kind: WindowKind,

    /// Owning toplevel, if any
    pub owner: Option<Window>,

    /// Client-area bounds in root coordinates
    pub bounds: Geometry,

    /// Negotiated insets, `None` until known
    pub insets: Option<Insets>,

    pub resizable: bool,
    /// Requested decorations, Motif `ALL`-subtracts convention
    pub decorations: MwmDecorations,
    pub functions: MwmFunctions,

    /// Last `WM_STATE` seen
    pub wm_state: WmState,
    pub extended: ExtendedState,
    pub layer: Layer,

    /// Shown by the toolkit
    pub visible: bool,
    /// Last MapNotify/UnmapNotify seen
    pub mapped: bool,
    /// The WM has wrapped the window in a frame
    pub reparented: bool,
    pub focusable: bool,
    /// Embedded in a foreign window; never remapped or decorated
    pub embedded: bool,
    pub screen: usize,

    /// Smallest size the toolkit allows while resizable
    pub min_size: Option<(u32, u32)>,

    /// Dialog currently blocking this window
    pub modal_blocker: Option<Window>,
    /// Blocked before reparenting finished; chain splice still pending
    pub delayed_modal_blocking: bool,

    // Transient-for chain
    pub prev_transient_for: Option<Window>,
    pub next_transient_for: Option<Window>,
    /// `WM_TRANSIENT_FOR` as last written to the server
    pub cur_real_transient_for: Option<Window>,

    /// Owned window that should get focus when this one is activated
    pub actual_focused_window: Option<Window>,
}

impl ToplevelWindow {
    pub fn new(window: Window, kind: WindowKind, bounds: Geometry) -> Self {
        Self {
            window,
            kind,
            owner: None,
            bounds,
            insets: None,
            resizable: true,
            decorations: MwmDecorations::ALL,
            functions: MwmFunctions::ALL,
            wm_state: WmState::Withdrawn,
            extended: ExtendedState::empty(),
            layer: Layer::Normal,
            visible: false,
            mapped: false,
            reparented: false,
            focusable: true,
            embedded: false,
            screen: 0,
            min_size: None,
            modal_blocker: None,
            delayed_modal_blocking: false,
            prev_transient_for: None,
            next_transient_for: None,
            cur_real_transient_for: None,
            actual_focused_window: None,
        }
    }

    pub fn with_owner(mut self, owner: Window) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_focusable(mut self, focusable: bool) -> Self {
        self.focusable = focusable;
        self
    }

    pub fn with_embedded(mut self, embedded: bool) -> Self {
        self.embedded = embedded;
        self
    }

    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    pub fn with_screen(mut self, screen: usize) -> Self {
        self.screen = screen;
        self
    }

    /// Frames and dialogs get WM decorations
    pub fn is_decorated(&self) -> bool {
        matches!(self.kind, WindowKind::Frame | WindowKind::Dialog)
    }

    /// Windows the server should never focus directly
    pub fn is_natively_non_focusable(&self) -> bool {
        !self.is_decorated() || !self.focusable
    }

    pub fn is_modal_blocked(&self) -> bool {
        self.modal_blocker.is_some()
    }
}

//! Focus Module
//!
//! Native X11 focus is asynchronous and advisory. The toolkit wants a
//! synchronous answer, so requests are answered with a [`FocusResponse`]
//! and native FocusIn/FocusOut are reconciled against the window the
//! session believes is focused.

use tracing::{debug, trace};
use x11rb::protocol::xproto::{NotifyDetail, NotifyMode, Window};
use x11rb::{CURRENT_TIME, NONE};

use crate::error::Result;
use crate::wm::client_flags::WmState;
use crate::wm::display::XServer;
use crate::wm::ewmh::read_net_wm_state;
use crate::wm::events::PeerEvent;
use crate::wm::session::SessionState;

/// Focus as the toolkit sees it
#[derive(Debug, Default)]
pub struct FocusState {
    /// Window that last got a FocusGained
    pub focused_window: Option<Window>,
}

/// Why a focus request was turned down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotVisible,
    /// Iconified or `_NET_WM_STATE_HIDDEN`
    Hidden,
    NotFocusable,
    ModalBlocked,
    /// No frame or dialog above the window
    NoDecoratedOwner,
}

/// Outcome of [`SessionState::request_window_focus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusResponse {
    /// Focus moved; the FocusGained event is already queued
    Granted,
    /// Native focus was asked for; a FocusIn will follow if the WM agrees
    Requested,
    Denied(DenyReason),
}

impl SessionState {
    /// Nearest frame or dialog in the owner chain, `window` included
    pub(crate) fn decorated_owner(&self, window: Window) -> Option<Window> {
        let mut current = Some(window);
        for _ in 0..=self.windows.len() {
            let w = self.windows.get(&current?)?;
            if w.is_decorated() {
                return Some(w.window);
            }
            current = w.owner;
        }
        None
    }

    fn focus_denial(&self, server: &dyn XServer, window: Window) -> Result<Option<DenyReason>> {
        let w = self.window(window)?;
        if !w.visible {
            return Ok(Some(DenyReason::NotVisible));
        }
        if !w.focusable {
            return Ok(Some(DenyReason::NotFocusable));
        }
        if w.is_modal_blocked() {
            return Ok(Some(DenyReason::ModalBlocked));
        }
        if w.wm_state == WmState::Iconic {
            return Ok(Some(DenyReason::Hidden));
        }
        let net_state = read_net_wm_state(server, &self.atoms, window)?;
        if net_state.contains(&self.atoms._net_wm_state_hidden) {
            return Ok(Some(DenyReason::Hidden));
        }
        Ok(None)
    }

    /// Ask for focus on `window`.
    ///
    /// When the window's decorated owner is already active the focus moves
    /// at once, without a round trip. Otherwise the owner asks the server
    /// for native focus and remembers `window` for the FocusIn that follows.
    pub fn request_window_focus(&mut self, server: &dyn XServer, window: Window) -> Result<FocusResponse> {
        if let Some(reason) = self.focus_denial(server, window)? {
            debug!("Focus request for 0x{:x} denied: {:?}", window, reason);
            return Ok(FocusResponse::Denied(reason));
        }
        let Some(owner) = self.decorated_owner(window) else {
            debug!("Focus request for 0x{:x} denied: no decorated owner", window);
            return Ok(FocusResponse::Denied(DenyReason::NoDecoratedOwner));
        };

        let active = self.focus.focused_window.and_then(|f| self.decorated_owner(f));
        if active == Some(owner) {
            debug!("Owner 0x{:x} is active, focusing 0x{:x} directly", owner, window);
            self.move_focus(window);
            return Ok(FocusResponse::Granted);
        }

        if owner != window {
            if let Some(reason) = self.focus_denial(server, owner)? {
                debug!("Owner 0x{:x} of 0x{:x} refused focus: {:?}", owner, window, reason);
                return Ok(FocusResponse::Denied(reason));
            }
        }
        let actual = (owner != window).then_some(window);
        self.window_mut(owner)?.actual_focused_window = actual;

        debug!("Requesting native focus for 0x{:x}", owner);
        server.set_input_focus(owner, CURRENT_TIME)?;
        Ok(FocusResponse::Requested)
    }

    /// Make `window` the focused window, queuing the lost/gained pair
    fn move_focus(&mut self, window: Window) {
        let previous = self.focus.focused_window;
        if previous == Some(window) {
            return;
        }
        if let Some(previous) = previous {
            self.emit(PeerEvent::FocusLost {
                window: previous,
                opposite: Some(window),
            });
        }
        self.focus.focused_window = Some(window);
        self.emit(PeerEvent::FocusGained {
            window,
            opposite: previous,
        });
    }

    pub fn on_focus_in(&mut self, _server: &dyn XServer, window: Window, mode: NotifyMode) -> Result<()> {
        if mode != NotifyMode::NORMAL && mode != NotifyMode::WHILE_GRABBED {
            trace!("FocusIn 0x{:x} ignored, mode {:?}", window, mode);
            return Ok(());
        }
        let Some(w) = self.windows.get(&window) else {
            return Ok(());
        };
        if w.is_natively_non_focusable() || !w.visible || w.is_modal_blocked() {
            trace!("FocusIn 0x{:x} ignored", window);
            return Ok(());
        }

        let target = w
            .actual_focused_window
            .filter(|a| self.windows.get(a).is_some_and(|t| t.visible && !t.is_modal_blocked()))
            .unwrap_or(window);
        self.window_mut(window)?.actual_focused_window = None;
        if target != window {
            debug!("FocusIn 0x{:x} delivered to owned 0x{:x}", window, target);
        }
        self.move_focus(target);
        Ok(())
    }

    pub fn on_focus_out(
        &mut self,
        server: &dyn XServer,
        window: Window,
        mode: NotifyMode,
        detail: NotifyDetail,
    ) -> Result<()> {
        if mode != NotifyMode::NORMAL && mode != NotifyMode::WHILE_GRABBED {
            trace!("FocusOut 0x{:x} ignored, mode {:?}", window, mode);
            return Ok(());
        }
        // Focus only moved to a child or follows the pointer
        if detail == NotifyDetail::INFERIOR || detail == NotifyDetail::POINTER {
            return Ok(());
        }
        let Some(w) = self.windows.get(&window) else {
            return Ok(());
        };
        if w.is_natively_non_focusable() {
            return Ok(());
        }

        // Focus still reported on the window itself means it went nowhere known
        let opposite = self
            .registered_ancestor(server, server.get_input_focus()?)?
            .filter(|o| *o != window);
        if let Some(o) = opposite {
            if self.windows.get(&o).is_some_and(|t| t.is_natively_non_focusable()) {
                debug!("FocusOut 0x{:x} suppressed, 0x{:x} is not focusable", window, o);
                return Ok(());
            }
        }

        let Some(focused) = self.focus.focused_window else {
            return Ok(());
        };
        if self.decorated_owner(focused) != Some(window) {
            trace!("FocusOut 0x{:x} does not concern focused 0x{:x}", window, focused);
            return Ok(());
        }
        // Remember the owned window so the next FocusIn returns focus there
        if focused != window {
            self.window_mut(window)?.actual_focused_window = Some(focused);
        }
        self.focus.focused_window = None;
        self.emit(PeerEvent::FocusLost {
            window: focused,
            opposite,
        });
        Ok(())
    }

    /// First registered window at or above `window` in the server tree
    fn registered_ancestor(&self, server: &dyn XServer, window: Window) -> Result<Option<Window>> {
        let mut current = window;
        while current != NONE && current != self.root {
            if self.is_registered(current) {
                return Ok(Some(current));
            }
            match server.query_window_attributes(current)? {
                Some(attrs) if attrs.parent != current => current = attrs.parent,
                _ => break,
            }
        }
        Ok(None)
    }
}

//! Toplevel state
//!
//! ICCCM base state plus the extended bits (iconified, maximized per axis,
//! always on top) negotiated through whichever state protocols the window
//! manager speaks.

use tracing::debug;
use x11rb::protocol::xproto::{Atom, Window};

use crate::error::Result;
use crate::wm::client_flags::{ExtendedState, Layer, WmState};
use crate::wm::display::XServer;
use crate::wm::ewmh::read_wm_state;
use crate::wm::hints::WmHints;
use crate::wm::session::SessionState;

/// Snapshot of a toplevel's state as the window manager reports it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowState {
    pub base: WmState,
    pub extended: ExtendedState,
}

/// States every window manager can do: normal and iconified
pub fn is_frame_state_supported(state: ExtendedState) -> bool {
    state.is_empty() || state == ExtendedState::ICONIFIED
}

impl SessionState {
    /// Read `WM_STATE` and OR in every active protocol's bits
    pub fn get_state(&mut self, server: &dyn XServer, window: Window) -> Result<WindowState> {
        let protocols = self.protocols(server)?;
        let base = read_wm_state(server, &self.atoms, window)?;
        let mut extended = ExtendedState::empty();
        if base == WmState::Iconic {
            extended |= ExtendedState::ICONIFIED;
        }
        for protocol in protocols.iter() {
            extended |= protocol.get_state(server, &self.atoms, window)?;
        }
        Ok(WindowState { base, extended })
    }

    /// Whether a change of `atom` on `window` may have moved its state
    pub fn is_state_change(&mut self, server: &dyn XServer, window: Window, atom: Atom) -> Result<bool> {
        if !self.window(window)?.visible {
            return Ok(false);
        }
        if read_wm_state(server, &self.atoms, window)? == WmState::Withdrawn {
            return Ok(false);
        }
        if atom == self.atoms.wm_state {
            return Ok(true);
        }
        let protocols = self.protocols(server)?;
        Ok(protocols.is_state_change(&self.atoms, atom))
    }

    /// Whether `state` can be requested as a whole.
    ///
    /// Iconified combined with anything else never is; a single maximize
    /// axis depends on the window manager.
    pub fn supports_extended_state(&mut self, server: &dyn XServer, state: ExtendedState) -> Result<bool> {
        if is_frame_state_supported(state) {
            return Ok(true);
        }
        if state.contains(ExtendedState::ICONIFIED) {
            return Ok(false);
        }
        let protocols = self.protocols(server)?;
        if state.contains(ExtendedState::ALWAYS_ON_TOP)
            && !protocols.iter().any(|p| p.supports_layer(&self.atoms))
        {
            return Ok(false);
        }
        let maximized = state & ExtendedState::MAXIMIZED_BOTH;
        if maximized.is_empty() {
            return Ok(true);
        }
        let profile = self.profile(server)?;
        if maximized != ExtendedState::MAXIMIZED_BOTH && !profile.supports_unidirectional_maximize {
            debug!("Window manager refuses single-axis maximize {:?}", state);
            return Ok(false);
        }
        Ok(protocols
            .iter()
            .any(|p| p.supports_state(&self.atoms, maximized)))
    }

    /// Request `state` for `window`.
    ///
    /// Iconify goes through ICCCM; maximize bits go to the first protocol
    /// that supports them, never to more than one. Always-on-top is a layer
    /// request.
    pub fn set_extended_state(
        &mut self,
        server: &dyn XServer,
        window: Window,
        state: ExtendedState,
    ) -> Result<()> {
        let w = self.window(window)?;
        let old = w.extended;
        let visible = w.visible;
        debug!("Set extended state of 0x{:x}: {:?} -> {:?}", window, old, state);

        let iconify = state.contains(ExtendedState::ICONIFIED);
        if iconify != old.contains(ExtendedState::ICONIFIED) {
            if !visible {
                // Read by the window manager when the window is first mapped
                let initial = if iconify { WmState::Iconic } else { WmState::Normal };
                let mut hints = WmHints::read(server, &self.atoms, window)?.unwrap_or_default();
                hints.set_initial_state(initial);
                hints.write(server, &self.atoms, window)?;
            } else if iconify {
                server.send_client_message(
                    server.root(),
                    window,
                    self.atoms.wm_change_state,
                    [WmState::Iconic.to_raw(), 0, 0, 0, 0],
                )?;
            } else {
                server.map_window(window)?;
            }
        }

        let on_top = state.contains(ExtendedState::ALWAYS_ON_TOP);
        if on_top != old.contains(ExtendedState::ALWAYS_ON_TOP) {
            let layer = if on_top { Layer::AlwaysOnTop } else { Layer::Normal };
            self.set_layer(server, window, layer)?;
        }

        let max_old = old & ExtendedState::MAXIMIZED_BOTH;
        let max_new = state & ExtendedState::MAXIMIZED_BOTH;
        if max_old != max_new {
            let protocols = self.protocols(server)?;
            let changed = max_old | max_new;
            for protocol in protocols.iter() {
                if protocol.supports_state(&self.atoms, changed) {
                    protocol.set_state(server, &self.atoms, window, max_old, max_new, visible)?;
                    break;
                }
            }
        }

        // Visible windows learn their new state from the WM's notification
        if !visible {
            self.window_mut(window)?.extended = state;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::shared::Geometry;
    use crate::wm::client::{ToplevelWindow, WindowKind};
    use crate::wm::identity::WmIdentity;
    use crate::wm::session::Session;
    use crate::wm::testing::{FakeServer, Request};

    /// A session whose WM advertises both protocols under `name`
    fn session(name: &str) -> (Session<FakeServer>, Window) {
        let server = FakeServer::new();
        let check = server.create_window(server.root(), -1, -1, 1, 1);
        let net_check = server.atom("_NET_SUPPORTING_WM_CHECK");
        let win_check = server.atom("_WIN_SUPPORTING_WM_CHECK");
        for prop in [net_check, win_check] {
            server.set_prop32(server.root(), prop, 33, &[check]);
            server.set_prop32(check, prop, 33, &[check]);
        }
        server.set_prop_string(check, server.atom("_NET_WM_NAME"), name);
        let supported = [
            server.atom("_NET_WM_STATE"),
            server.atom("_NET_WM_STATE_MAXIMIZED_HORZ"),
            server.atom("_NET_WM_STATE_MAXIMIZED_VERT"),
        ];
        server.set_prop32(server.root(), server.atom("_NET_SUPPORTED"), 4, &supported);
        let win = [server.atom("_WIN_STATE"), server.atom("_WIN_LAYER")];
        server.set_prop32(server.root(), server.atom("_WIN_PROTOCOLS"), 4, &win);

        let w = server.create_window(server.root(), 0, 0, 100, 100);
        let session = Session::new(server, Config::default()).unwrap();
        session
            .register_window(ToplevelWindow::new(w, WindowKind::Frame, Geometry::new(0, 0, 100, 100)))
            .unwrap();
        (session, w)
    }

    #[test]
    fn compound_iconify_is_never_supported() {
        let (session, _) = session("KWin");
        assert!(session.supports_extended_state(ExtendedState::ICONIFIED).unwrap());
        assert!(session.supports_extended_state(ExtendedState::empty()).unwrap());
        for extra in [
            ExtendedState::MAXIMIZED_HORIZ,
            ExtendedState::MAXIMIZED_VERT,
            ExtendedState::MAXIMIZED_BOTH,
        ] {
            assert!(!session
                .supports_extended_state(ExtendedState::ICONIFIED | extra)
                .unwrap());
        }
    }

    #[test]
    fn single_axis_depends_on_wm() {
        let (kwin, _) = session("KWin");
        assert!(kwin.supports_extended_state(ExtendedState::MAXIMIZED_HORIZ).unwrap());
        assert!(kwin.supports_extended_state(ExtendedState::MAXIMIZED_BOTH).unwrap());

        for name in ["Metacity", "GNOME Shell"] {
            let (gnome, _) = session(name);
            assert!(!gnome.supports_extended_state(ExtendedState::MAXIMIZED_HORIZ).unwrap());
            assert!(!gnome.supports_extended_state(ExtendedState::MAXIMIZED_VERT).unwrap());
            assert!(gnome.supports_extended_state(ExtendedState::MAXIMIZED_BOTH).unwrap());
        }
    }

    #[test]
    fn no_protocol_means_no_maximize() {
        let server = FakeServer::new();
        let session = Session::new(server, Config::default()).unwrap();
        assert_eq!(session.identity().unwrap(), WmIdentity::Other);
        assert!(!session.supports_extended_state(ExtendedState::MAXIMIZED_BOTH).unwrap());
    }

    #[test]
    fn maximize_uses_only_the_first_protocol() {
        let (session, w) = session("KWin");
        let atoms = session.atoms();
        session.show_window(w).unwrap();
        session.server().clear_requests();
        session
            .set_extended_state(w, ExtendedState::MAXIMIZED_BOTH)
            .unwrap();
        assert_eq!(session.server().client_messages(atoms.net_wm_state).len(), 1);
        assert!(session.server().client_messages(atoms.win_state).is_empty());
    }

    #[test]
    fn iconify_sends_change_state_to_root() {
        let (session, w) = session("KWin");
        let atoms = session.atoms();
        session.show_window(w).unwrap();
        session.set_extended_state(w, ExtendedState::ICONIFIED).unwrap();
        let messages = session.server().client_messages(atoms.wm_change_state);
        assert_eq!(messages, vec![(1, w, [3, 0, 0, 0, 0])]);

        // The WM confirms, then the toolkit deiconifies
        session
            .server()
            .set_prop32(w, atoms.wm_state, atoms.wm_state, &[3, 0]);
        session.on_property_changed(w, atoms.wm_state, 0).unwrap();
        session.server().clear_requests();
        session.set_extended_state(w, ExtendedState::empty()).unwrap();
        assert_eq!(session.server().requests(), vec![Request::Map(w)]);
    }

    #[test]
    fn get_state_ors_protocol_bits() {
        let (session, w) = session("KWin");
        let atoms = session.atoms();
        session.server().set_prop32(w, atoms.wm_state, atoms.wm_state, &[1, 0]);
        session.server().set_prop32(w, atoms.win_state, atoms.cardinal, &[1 << 3]);
        session.server().set_prop32(
            w,
            atoms.net_wm_state,
            atoms.atom,
            &[atoms._net_wm_state_maximized_vert],
        );
        let state = session.get_state(w).unwrap();
        assert_eq!(state.base, WmState::Normal);
        assert_eq!(state.extended, ExtendedState::MAXIMIZED_BOTH);
    }

    #[test]
    fn state_change_gate_requires_visible_non_withdrawn() {
        let (session, w) = session("KWin");
        let atoms = session.atoms();
        assert!(!session.is_state_change(w, atoms.wm_state).unwrap());
        session.show_window(w).unwrap();
        assert!(!session.is_state_change(w, atoms.wm_state).unwrap());
        session.server().set_prop32(w, atoms.wm_state, atoms.wm_state, &[1, 0]);
        assert!(session.is_state_change(w, atoms.wm_state).unwrap());
        assert!(session.is_state_change(w, atoms.net_wm_state).unwrap());
        assert!(session.is_state_change(w, atoms.win_state).unwrap());
        assert!(!session.is_state_change(w, atoms.motif_wm_hints).unwrap());
    }

    #[test]
    fn hidden_iconify_sets_initial_state() {
        let (session, w) = session("KWin");
        let atoms = session.atoms();
        session.set_extended_state(w, ExtendedState::ICONIFIED).unwrap();
        assert!(session.server().client_messages(atoms.wm_change_state).is_empty());
        let hints = WmHints::read(session.server(), &atoms, w).unwrap().unwrap();
        assert_eq!(hints.initial_state(), Some(WmState::Iconic));

        session.set_extended_state(w, ExtendedState::empty()).unwrap();
        let hints = WmHints::read(session.server(), &atoms, w).unwrap().unwrap();
        assert_eq!(hints.initial_state(), Some(WmState::Normal));

        session.set_extended_state(w, ExtendedState::ICONIFIED).unwrap();
        session.show_window(w).unwrap();
        let hints = WmHints::read(session.server(), &atoms, w).unwrap().unwrap();
        assert_eq!(hints.initial_state(), Some(WmState::Iconic));
        assert!(session.server().requests().contains(&Request::Map(w)));
    }

    #[test]
    fn always_on_top_is_a_layer_request() {
        let (session, w) = session("KWin");
        let atoms = session.atoms();
        // _NET_SUPPORTED lacks ABOVE, so the _WIN layer takes it
        assert!(session.supports_extended_state(ExtendedState::ALWAYS_ON_TOP).unwrap());
        assert!(!session
            .supports_extended_state(ExtendedState::ALWAYS_ON_TOP | ExtendedState::ICONIFIED)
            .unwrap());

        session.show_window(w).unwrap();
        session.set_extended_state(w, ExtendedState::ALWAYS_ON_TOP).unwrap();
        assert_eq!(session.server().client_messages(atoms.win_layer), vec![(1, w, [6, 0, 0, 0, 0])]);
        assert_eq!(session.window(w).unwrap().layer, Layer::AlwaysOnTop);

        session.server().set_prop32(w, atoms.wm_state, atoms.wm_state, &[1, 0]);
        session.server().set_prop32(w, atoms.win_layer, atoms.cardinal, &[6]);
        assert!(session.get_state(w).unwrap().extended.contains(ExtendedState::ALWAYS_ON_TOP));
        session.on_property_changed(w, atoms.win_layer, 0).unwrap();
        assert!(session.window(w).unwrap().extended.contains(ExtendedState::ALWAYS_ON_TOP));
    }
}

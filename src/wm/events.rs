//! Event translation
//!
//! Structure and property notifications coming in from the event loop, and
//! the [`PeerEvent`]s queued for the toolkit in return. Focus and pointer
//! input are handled in `focus` and `grab`.

use tracing::{debug, trace};
use x11rb::protocol::xproto::{Atom, KeyButMask, Window};

use crate::error::Result;
use crate::shared::{Geometry, Insets};
use crate::wm::client_flags::{ExtendedState, Layer};
use crate::wm::display::XServer;
use crate::wm::ewmh::read_wm_state;
use crate::wm::session::SessionState;
use crate::wm::state::WindowState;

/// Pointer event flavours delivered to the toolkit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Press,
    Release,
    Motion,
}

/// Raw pointer event as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerInput {
    /// Window the server delivered the event to
    pub window: Window,
    /// Button number, 0 for motion
    pub button: u8,
    /// Modifier and button mask at the time of the event
    pub state: KeyButMask,
    pub root_x: i32,
    pub root_y: i32,
    /// Position relative to `window`
    pub x: i32,
    pub y: i32,
}

impl PointerInput {
    pub fn new(window: Window, button: u8, root_x: i32, root_y: i32, x: i32, y: i32) -> Self {
        Self {
            window,
            button,
            state: KeyButMask::default(),
            root_x,
            root_y,
            x,
            y,
        }
    }

    pub fn with_state(mut self, state: KeyButMask) -> Self {
        self.state = state;
        self
    }

    /// Any of the first three buttons held
    pub fn is_dragging(&self) -> bool {
        let buttons = KeyButMask::BUTTON1 | KeyButMask::BUTTON2 | KeyButMask::BUTTON3;
        u16::from(self.state) & u16::from(buttons) != 0
    }

    /// Wheel buttons, which never end a grab
    pub fn is_wheel(&self) -> bool {
        (4..=7).contains(&self.button)
    }
}

/// Notifications for the toolkit, drained by the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    Configured {
        window: Window,
        bounds: Geometry,
    },
    Mapped(Window),
    Unmapped(Window),
    InsetsChanged {
        window: Window,
        insets: Insets,
    },
    StateChanged {
        window: Window,
        old: WindowState,
        new: WindowState,
    },
    FocusGained {
        window: Window,
        opposite: Option<Window>,
    },
    FocusLost {
        window: Window,
        opposite: Option<Window>,
    },
    Pointer {
        window: Window,
        kind: PointerKind,
        button: u8,
        /// Position relative to `window`
        x: i32,
        y: i32,
        root_x: i32,
        root_y: i32,
    },
    /// The grab held by `window` ended because of an outside press
    Ungrab {
        window: Window,
    },
}

impl SessionState {
    pub fn on_configure_notify(
        &mut self,
        server: &dyn XServer,
        window: Window,
        bounds: Geometry,
        synthetic: bool,
    ) -> Result<()> {
        if !self.is_registered(window) {
            return Ok(());
        }
        let static_gravity = self.config.detection.static_gravity;
        let w = self.window_mut(window)?;
        // Real events on a reparented window carry frame-relative positions
        if synthetic || !w.reparented || static_gravity {
            w.bounds = bounds;
        } else {
            w.bounds.width = bounds.width;
            w.bounds.height = bounds.height;
        }
        let bounds = w.bounds;
        let needs_insets = w.insets.is_none() && w.visible;
        trace!("ConfigureNotify 0x{:x}: {:?} (synthetic: {})", window, bounds, synthetic);

        if needs_insets {
            self.compute_insets(server, window)?;
        }
        self.emit(PeerEvent::Configured { window, bounds });
        Ok(())
    }

    pub fn on_map_notify(&mut self, server: &dyn XServer, window: Window) -> Result<()> {
        if !self.is_registered(window) {
            return Ok(());
        }
        let w = self.window_mut(window)?;
        w.mapped = true;
        let needs_insets = w.insets.is_none();
        if needs_insets {
            self.compute_insets(server, window)?;
        }
        self.emit(PeerEvent::Mapped(window));
        Ok(())
    }

    pub fn on_unmap_notify(&mut self, _server: &dyn XServer, window: Window) -> Result<()> {
        if !self.is_registered(window) {
            return Ok(());
        }
        self.window_mut(window)?.mapped = false;
        self.emit(PeerEvent::Unmapped(window));
        Ok(())
    }

    pub fn on_reparent_notify(
        &mut self,
        server: &dyn XServer,
        window: Window,
        parent: Window,
    ) -> Result<()> {
        if !self.is_registered(window) {
            return Ok(());
        }
        let reparented = parent != self.root;
        let w = self.window_mut(window)?;
        w.reparented = reparented;
        debug!("0x{:x} reparented to 0x{:x}", window, parent);
        if !reparented {
            return Ok(());
        }

        let pending = if w.delayed_modal_blocking {
            w.delayed_modal_blocking = false;
            w.modal_blocker
        } else {
            None
        };
        w.insets = None;

        if let Some(blocker) = pending {
            debug!("Resolving delayed modal blocking of 0x{:x} by 0x{:x}", window, blocker);
            self.add_to_transient_fors(server, window, blocker)?;
        }
        self.compute_insets(server, window)?;
        Ok(())
    }

    pub fn on_property_changed(
        &mut self,
        server: &dyn XServer,
        window: Window,
        atom: Atom,
        time: u32,
    ) -> Result<()> {
        if !self.is_registered(window) {
            return Ok(());
        }
        trace!("PropertyNotify 0x{:x}: atom {} at {}", window, atom, time);

        if self.atoms.is_frame_extents(atom) {
            self.compute_insets(server, window)?;
            return Ok(());
        }

        let w = self.window(window)?;
        let old = WindowState {
            base: w.wm_state,
            extended: w.extended,
        };
        // Every ICCCM transition re-points the hints, shown or not
        if atom == self.atoms.wm_state {
            let base = read_wm_state(server, &self.atoms, window)?;
            if base != old.base {
                self.window_mut(window)?.wm_state = base;
                self.update_transient_for(server, window)?;
            }
        }

        if !self.is_state_change(server, window, atom)? {
            return Ok(());
        }
        let new = self.get_state(server, window)?;
        let w = self.window_mut(window)?;
        w.wm_state = new.base;
        w.extended = new.extended;
        w.layer = if new.extended.contains(ExtendedState::ALWAYS_ON_TOP) {
            Layer::AlwaysOnTop
        } else {
            Layer::Normal
        };
        if old != new {
            self.emit(PeerEvent::StateChanged { window, old, new });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::wm::client::{ToplevelWindow, WindowKind};
    use crate::wm::client_flags::WmState;
    use crate::wm::identity::WmIdentity;
    use crate::wm::session::Session;
    use crate::wm::testing::FakeServer;

    fn session_with_frame() -> (Session<FakeServer>, Window) {
        let server = FakeServer::new();
        let w = server.create_window(server.root(), 100, 100, 200, 100);
        let session = Session::new(server, Config::default()).unwrap();
        session.set_identity_override(WmIdentity::Kde2).unwrap();
        let mut t = ToplevelWindow::new(w, WindowKind::Frame, Geometry::new(100, 100, 200, 100));
        t.insets = Some(Insets::new(25, 5, 5, 5));
        session.register_window(t).unwrap();
        (session, w)
    }

    #[test]
    fn configure_keeps_position_when_reparented() {
        let (session, w) = session_with_frame();
        session.on_reparent_notify(w, session.server().create_window(1, 0, 0, 1, 1)).unwrap();
        session.drain_events();

        session.on_configure_notify(w, Geometry::new(5, 25, 300, 150), false).unwrap();
        assert_eq!(session.window(w).unwrap().bounds, Geometry::new(100, 100, 300, 150));

        session.on_configure_notify(w, Geometry::new(40, 50, 300, 150), true).unwrap();
        assert_eq!(session.window(w).unwrap().bounds, Geometry::new(40, 50, 300, 150));
        let events = session.drain_events();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn static_gravity_takes_position() {
        let server = FakeServer::new();
        let w = server.create_window(server.root(), 0, 0, 200, 100);
        let mut config = Config::default();
        config.detection.static_gravity = true;
        let session = Session::new(server, config).unwrap();
        let mut t = ToplevelWindow::new(w, WindowKind::Frame, Geometry::new(0, 0, 200, 100));
        t.reparented = true;
        t.insets = Some(Insets::zero());
        session.register_window(t).unwrap();
        session.on_configure_notify(w, Geometry::new(7, 8, 200, 100), false).unwrap();
        assert_eq!(session.window(w).unwrap().bounds.x, 7);
    }

    #[test]
    fn map_and_unmap_are_forwarded() {
        let (session, w) = session_with_frame();
        session.on_map_notify(w).unwrap();
        session.on_unmap_notify(w).unwrap();
        session.on_map_notify(0x4242).unwrap();
        assert_eq!(
            session.drain_events(),
            vec![PeerEvent::Mapped(w), PeerEvent::Unmapped(w)]
        );
        assert!(!session.window(w).unwrap().mapped);
    }

    #[test]
    fn wm_state_change_fires_state_changed() {
        let (session, w) = session_with_frame();
        let atoms = session.atoms();
        session.show_window(w).unwrap();
        session
            .server()
            .set_prop32(w, atoms.wm_state, atoms.wm_state, &[WmState::Normal.to_raw(), 0]);
        session.on_property_changed(w, atoms.wm_state, 0).unwrap();
        session.drain_events();

        session
            .server()
            .set_prop32(w, atoms.wm_state, atoms.wm_state, &[WmState::Iconic.to_raw(), 0]);
        session.on_property_changed(w, atoms.wm_state, 0).unwrap();
        let events = session.drain_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            PeerEvent::StateChanged { old, new, .. } => {
                assert_eq!(old.base, WmState::Normal);
                assert_eq!(new.base, WmState::Iconic);
                assert!(new.extended.contains(ExtendedState::ICONIFIED));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn unrelated_property_is_ignored() {
        let (session, w) = session_with_frame();
        let atoms = session.atoms();
        session.show_window(w).unwrap();
        session.on_property_changed(w, atoms.wm_normal_hints, 0).unwrap();
        assert!(session.drain_events().is_empty());
    }

    #[test]
    fn frame_extents_change_updates_insets() {
        let (session, w) = session_with_frame();
        let atoms = session.atoms();
        session
            .server()
            .set_prop32(w, atoms.net_frame_extents, atoms.cardinal, &[2, 2, 30, 2]);
        session.on_property_changed(w, atoms.net_frame_extents, 0).unwrap();
        assert_eq!(session.window(w).unwrap().insets, Some(Insets::new(30, 2, 2, 2)));
        assert!(session.drain_events().contains(&PeerEvent::InsetsChanged {
            window: w,
            insets: Insets::new(30, 2, 2, 2)
        }));
    }
}

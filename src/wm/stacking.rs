//! Stacking Module
//!
//! Server stacking order of the registered toplevels and the layer requests
//! (always-on-top) sent to the window manager.

use tracing::{debug, trace};
use x11rb::protocol::xproto::Window;

use crate::error::Result;
use crate::wm::client_flags::{ExtendedState, Layer};
use crate::wm::display::XServer;
use crate::wm::session::SessionState;

impl SessionState {
    /// Registered toplevels in stacking order, bottom first.
    ///
    /// Frames the window manager wraps around toplevels are walked through;
    /// an owned window found below its owner is moved just above it.
    pub fn collect_toplevels(&self, server: &dyn XServer) -> Result<Vec<Window>> {
        let mut order = Vec::new();
        self.collect_under(server, self.root, &mut order)?;

        let mut i = 0;
        // Bounded so an owner cycle cannot spin forever
        let mut moves = order.len() * order.len();
        while i < order.len() {
            let window = order[i];
            let owner_pos = self
                .windows
                .get(&window)
                .and_then(|w| w.owner)
                .and_then(|owner| order.iter().position(|o| *o == owner));
            match owner_pos {
                Some(pos) if pos > i && moves > 0 => {
                    moves -= 1;
                    order.remove(i);
                    order.insert(pos, window);
                }
                _ => i += 1,
            }
        }
        trace!("Toplevel stacking order: {:x?}", order);
        Ok(order)
    }

    fn collect_under(&self, server: &dyn XServer, parent: Window, out: &mut Vec<Window>) -> Result<()> {
        let Some(tree) = server.query_tree(parent)? else {
            return Ok(());
        };
        for child in tree.children {
            if self.is_registered(child) {
                out.push(child);
            } else {
                self.collect_under(server, child, out)?;
            }
        }
        Ok(())
    }

    /// Topmost visible toplevel whose bounds contain the root point
    pub fn window_at(&self, server: &dyn XServer, root_x: i32, root_y: i32) -> Result<Option<Window>> {
        let order = self.collect_toplevels(server)?;
        Ok(order.into_iter().rev().find(|w| {
            self.windows
                .get(w)
                .is_some_and(|t| t.visible && t.bounds.contains(root_x, root_y))
        }))
    }

    /// Raise `window`, keeping the rest of its transient chain above it
    pub fn to_front(&mut self, server: &dyn XServer, window: Window) -> Result<()> {
        if !self.window(window)?.visible {
            return Ok(());
        }
        debug!("Raising 0x{:x}", window);
        server.raise_window(window)?;

        let chain = self.transient_chain(window);
        let above: Vec<Window> = chain.into_iter().skip_while(|w| *w != window).collect();
        if above.len() > 1 {
            trace!("Restacking chain above 0x{:x}: {:x?}", window, above);
            server.restack_windows(&above)?;
        }
        Ok(())
    }

    /// Ask for `layer` through the first protocol that handles layers
    pub fn set_layer(&mut self, server: &dyn XServer, window: Window, layer: Layer) -> Result<()> {
        let protocols = self.protocols(server)?;
        let w = self.window_mut(window)?;
        w.layer = layer;
        let visible = w.visible;
        if !visible {
            w.extended
                .set(ExtendedState::ALWAYS_ON_TOP, layer == Layer::AlwaysOnTop);
        }

        match protocols.iter().find(|p| p.supports_layer(&self.atoms)) {
            Some(protocol) => {
                debug!("Layer of 0x{:x} -> {:?}", window, layer);
                protocol.set_layer(server, &self.atoms, window, layer, visible)
            }
            None => {
                debug!("No layer protocol, ignoring {:?} for 0x{:x}", layer, window);
                Ok(())
            }
        }
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
    use crate::wm::testing::FakeServer;

    #[test]
    fn frames_are_walked_through() {
        let server = FakeServer::new();
        let frame_a = server.create_window(server.root(), 0, 0, 110, 130);
        let a = server.create_window(frame_a, 5, 25, 100, 100);
        let unrelated = server.create_window(server.root(), 0, 0, 10, 10);
        let b = server.create_window(server.root(), 0, 0, 50, 50);
        let session = Session::new(server, Config::default()).unwrap();
        let g = Geometry::new(0, 0, 100, 100);
        for w in [a, b] {
            session
                .register_window(ToplevelWindow::new(w, WindowKind::Frame, g))
                .unwrap();
        }
        assert_eq!(session.collect_toplevels().unwrap(), vec![a, b]);
        assert!(!session.collect_toplevels().unwrap().contains(&unrelated));

        session.server().raise_window(frame_a).unwrap();
        assert_eq!(session.collect_toplevels().unwrap(), vec![b, a]);
    }

    #[test]
    fn owned_window_moves_above_owner() {
        let server = FakeServer::new();
        let dialog = server.create_window(server.root(), 0, 0, 50, 50);
        let frame = server.create_window(server.root(), 0, 0, 100, 100);
        let other = server.create_window(server.root(), 0, 0, 100, 100);
        let session = Session::new(server, Config::default()).unwrap();
        let g = Geometry::new(0, 0, 100, 100);
        session
            .register_window(ToplevelWindow::new(frame, WindowKind::Frame, g))
            .unwrap();
        session
            .register_window(ToplevelWindow::new(other, WindowKind::Frame, g))
            .unwrap();
        session
            .register_window(ToplevelWindow::new(dialog, WindowKind::Dialog, g).with_owner(frame))
            .unwrap();
        assert_eq!(session.collect_toplevels().unwrap(), vec![frame, dialog, other]);
    }

    #[test]
    fn window_at_picks_topmost_visible() {
        let server = FakeServer::new();
        let lower = server.create_window(server.root(), 0, 0, 100, 100);
        let upper = server.create_window(server.root(), 50, 50, 100, 100);
        let session = Session::new(server, Config::default()).unwrap();
        session
            .register_window(ToplevelWindow::new(lower, WindowKind::Frame, Geometry::new(0, 0, 100, 100)))
            .unwrap();
        session
            .register_window(ToplevelWindow::new(upper, WindowKind::Frame, Geometry::new(50, 50, 100, 100)))
            .unwrap();
        session.show_window(lower).unwrap();
        assert_eq!(session.window_at(60, 60).unwrap(), Some(lower));

        session.show_window(upper).unwrap();
        assert_eq!(session.window_at(60, 60).unwrap(), Some(upper));
        assert_eq!(session.window_at(10, 10).unwrap(), Some(lower));
        assert_eq!(session.window_at(500, 500).unwrap(), None);
    }

    #[test]
    fn to_front_keeps_blocker_on_top() {
        let server = FakeServer::new();
        let ids: Vec<Window> = (0..3)
            .map(|_| server.create_window(server.root(), 0, 0, 100, 100))
            .collect();
        let session = Session::new(server, Config::default()).unwrap();
        session.set_identity_override(WmIdentity::Compiz).unwrap();
        let kinds = [WindowKind::Frame, WindowKind::Frame, WindowKind::Dialog];
        for (w, kind) in ids.iter().zip(kinds) {
            session
                .register_window(ToplevelWindow::new(*w, kind, Geometry::new(0, 0, 100, 100)))
                .unwrap();
            session.show_window(*w).unwrap();
        }
        let (a, b, dialog) = (ids[0], ids[1], ids[2]);
        session.set_modal_blocked(a, dialog, true).unwrap();

        session.to_front(a).unwrap();
        assert_eq!(session.collect_toplevels().unwrap(), vec![b, a, dialog]);
    }

    #[test]
    fn layer_goes_to_first_layer_protocol() {
        let server = FakeServer::new();
        let check = server.create_window(server.root(), 0, 0, 1, 1);
        let prop = server.atom("_WIN_SUPPORTING_WM_CHECK");
        server.set_prop32(server.root(), prop, 33, &[check]);
        server.set_prop32(check, prop, 33, &[check]);
        let layer = server.atom("_WIN_LAYER");
        server.set_prop32(server.root(), server.atom("_WIN_PROTOCOLS"), 4, &[layer]);
        let w = server.create_window(server.root(), 0, 0, 100, 100);
        let session = Session::new(server, Config::default()).unwrap();
        session
            .register_window(ToplevelWindow::new(w, WindowKind::Frame, Geometry::new(0, 0, 100, 100)))
            .unwrap();

        session.set_layer(w, Layer::AlwaysOnTop).unwrap();
        assert_eq!(session.server().prop32(w, layer), Some(vec![6]));
        session.show_window(w).unwrap();
        session.set_layer(w, Layer::Normal).unwrap();
        assert_eq!(session.server().client_messages(layer), vec![(1, w, [4, 0, 0, 0, 0])]);
        assert_eq!(session.window(w).unwrap().layer, Layer::Normal);
    }
}

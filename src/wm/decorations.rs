//! Decoration hints
//!
//! Tells the window manager which frame parts and functions a toplevel
//! wants, through `_MOTIF_WM_HINTS` and, for OpenLook style managers,
//! `_OL_DECOR_DEL`. Resizability is carried both here and in the size hints.

use tracing::debug;
use x11rb::protocol::xproto::Window;

use crate::error::Result;
use crate::shared::Geometry;
use crate::wm::client_flags::{MwmDecorations, MwmFunctions, MwmHintFlags};
use crate::wm::display::XServer;
use crate::wm::ewmh::MotifWmHints;
use crate::wm::hints::SizeHints;
use crate::wm::session::SessionState;

impl SessionState {
    /// Push decoration and function hints for `window`.
    ///
    /// Masks use the Motif convention where `ALL` means "everything except
    /// the other bits set"; the returned masks are the explicit ones written.
    pub fn apply_decoration(
        &mut self,
        server: &dyn XServer,
        window: Window,
        resizable: bool,
        decorations: MwmDecorations,
        functions: MwmFunctions,
    ) -> Result<(MwmDecorations, MwmFunctions)> {
        let requested = (decorations, functions);
        let mut decorations = decorations;
        let mut functions = functions;
        if !resizable {
            let decor_bits = MwmDecorations::RESIZEH | MwmDecorations::MAXIMIZE;
            if decorations.contains(MwmDecorations::ALL) {
                decorations |= decor_bits;
            } else {
                decorations.remove(decor_bits);
            }
            let func_bits = MwmFunctions::RESIZE | MwmFunctions::MAXIMIZE;
            if functions.contains(MwmFunctions::ALL) {
                functions |= func_bits;
            } else {
                functions.remove(func_bits);
            }
        }
        let decorations = decorations.normalized();
        let functions = functions.normalized();
        debug!(
            "Decorations of 0x{:x}: {:?}, functions {:?} (resizable: {})",
            window, decorations, functions, resizable
        );

        let dialect = self.profile(server)?.decor;
        if dialect.motif {
            let mut hints = MotifWmHints::read(server, &self.atoms, window)?;
            hints.flags |= MwmHintFlags::FUNCTIONS | MwmHintFlags::DECORATIONS;
            hints.decorations = decorations;
            hints.functions = functions;
            hints.write(server, &self.atoms, window)?;
        }
        if dialect.open_look {
            self.write_ol_decor_del(server, window, decorations)?;
        }

        let w = self.window_mut(window)?;
        w.resizable = resizable;
        (w.decorations, w.functions) = requested;
        if w.visible && !w.embedded {
            self.force_decoration_refresh(server, window)?;
        }
        Ok((decorations, functions))
    }

    /// OpenLook lists the decorations to delete
    fn write_ol_decor_del(
        &self,
        server: &dyn XServer,
        window: Window,
        decorations: MwmDecorations,
    ) -> Result<()> {
        let mut deleted = Vec::new();
        if !decorations.contains(MwmDecorations::TITLE) {
            deleted.push(self.atoms.ol_decor_header);
        }
        if !decorations.intersects(MwmDecorations::RESIZEH | MwmDecorations::MAXIMIZE) {
            deleted.push(self.atoms.ol_decor_resize);
        }
        if !decorations
            .intersects(MwmDecorations::MENU | MwmDecorations::MAXIMIZE | MwmDecorations::MINIMIZE)
        {
            deleted.push(self.atoms.ol_decor_close);
        }
        if deleted.is_empty() {
            server.delete_property(window, self.atoms.ol_decor_del)
        } else {
            server.set_property32(window, self.atoms.ol_decor_del, self.atoms.atom, &deleted)
        }
    }

    /// Unmap and remap a mapped window so the WM re-reads its hints.
    ///
    /// Several window managers only look at decoration hints at map time.
    pub fn force_decoration_refresh(&mut self, server: &dyn XServer, window: Window) -> Result<()> {
        debug!("Remapping 0x{:x} to refresh decorations", window);
        server.unmap_window(window)?;
        server.sync()?;
        server.map_window(window)?;
        Ok(())
    }

    /// Let the user resize `window` again
    pub fn make_resizable(&mut self, server: &dyn XServer, window: Window) -> Result<()> {
        let w = self.window(window)?;
        let (bounds, min_size) = (w.bounds, w.min_size);
        let (decorations, functions) = (w.decorations, w.functions);
        debug!("Making 0x{:x} resizable", window);

        let mut hints = SizeHints::read(server, &self.atoms, window)?.unwrap_or_default();
        hints.release_size(min_size);
        hints.write(server, &self.atoms, window)?;
        self.request_frame_extents(server, window)?;
        server.move_resize_window(window, bounds)?;
        self.apply_decoration(server, window, true, decorations, functions)?;
        Ok(())
    }

    /// Pin `window` to `size`, moving its shell to `shell_bounds`
    pub fn make_non_resizable(
        &mut self,
        server: &dyn XServer,
        window: Window,
        size: (u32, u32),
        shell_bounds: Geometry,
    ) -> Result<()> {
        let w = self.window_mut(window)?;
        w.bounds = shell_bounds;
        let (decorations, functions) = (w.decorations, w.functions);
        debug!("Making 0x{:x} non-resizable at {}x{}", window, size.0, size.1);

        let mut hints = SizeHints::read(server, &self.atoms, window)?.unwrap_or_default();
        hints.fix_size(size.0, size.1);
        hints.write(server, &self.atoms, window)?;
        server.move_resize_window(window, shell_bounds)?;
        self.apply_decoration(server, window, false, decorations, functions)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::wm::client::{ToplevelWindow, WindowKind};
    use crate::wm::identity::WmIdentity;
    use crate::wm::session::Session;
    use crate::wm::testing::{FakeServer, Request};

    fn session(identity: WmIdentity) -> (Session<FakeServer>, Window) {
        let server = FakeServer::new();
        let w = server.create_window(server.root(), 0, 0, 200, 100);
        let session = Session::new(server, Config::default()).unwrap();
        session.set_identity_override(identity).unwrap();
        session
            .register_window(ToplevelWindow::new(w, WindowKind::Frame, Geometry::new(0, 0, 200, 100)))
            .unwrap();
        (session, w)
    }

    #[test]
    fn all_minus_one_bit_is_full_minus_that_bit() {
        let (session, w) = session(WmIdentity::Kde2);
        for bit in MwmDecorations::FULL.iter() {
            let (decor, _) = session
                .apply_decoration(w, true, MwmDecorations::ALL | bit, MwmFunctions::ALL)
                .unwrap();
            assert_eq!(decor, MwmDecorations::FULL - bit);
            let hints = MotifWmHints::read(session.server(), &session.atoms(), w).unwrap();
            assert_eq!(hints.decorations, MwmDecorations::FULL - bit);
            assert!(hints.flags.contains(MwmHintFlags::DECORATIONS | MwmHintFlags::FUNCTIONS));
        }
    }

    #[test]
    fn non_resizable_drops_resize_and_maximize() {
        let (session, w) = session(WmIdentity::Kde2);
        let (decor, funcs) = session
            .apply_decoration(w, false, MwmDecorations::ALL, MwmFunctions::ALL)
            .unwrap();
        assert!(!decor.intersects(MwmDecorations::RESIZEH | MwmDecorations::MAXIMIZE));
        assert!(!funcs.intersects(MwmFunctions::RESIZE | MwmFunctions::MAXIMIZE));
        assert!(funcs.contains(MwmFunctions::CLOSE | MwmFunctions::MOVE));

        let explicit = MwmDecorations::TITLE | MwmDecorations::RESIZEH | MwmDecorations::BORDER;
        let (decor, _) = session
            .apply_decoration(w, false, explicit, MwmFunctions::MOVE)
            .unwrap();
        assert_eq!(decor, MwmDecorations::TITLE | MwmDecorations::BORDER);
    }

    #[test]
    fn open_look_deletion_list() {
        let (session, w) = session(WmIdentity::OpenLook);
        let atoms = session.atoms();
        session
            .apply_decoration(w, true, MwmDecorations::BORDER, MwmFunctions::ALL)
            .unwrap();
        assert_eq!(
            session.server().prop32(w, atoms.ol_decor_del),
            Some(vec![atoms.ol_decor_header, atoms.ol_decor_resize, atoms.ol_decor_close])
        );
        session
            .apply_decoration(w, true, MwmDecorations::ALL, MwmFunctions::ALL)
            .unwrap();
        assert_eq!(session.server().prop32(w, atoms.ol_decor_del), None);
    }

    #[test]
    fn kde_gets_no_open_look_hints() {
        let (session, w) = session(WmIdentity::Kde2);
        let atoms = session.atoms();
        session
            .apply_decoration(w, true, MwmDecorations::BORDER, MwmFunctions::ALL)
            .unwrap();
        assert_eq!(session.server().prop32(w, atoms.ol_decor_del), None);
    }

    #[test]
    fn visible_window_is_remapped() {
        let (session, w) = session(WmIdentity::Kde2);
        session
            .apply_decoration(w, true, MwmDecorations::ALL, MwmFunctions::ALL)
            .unwrap();
        assert!(!session.server().requests().contains(&Request::Unmap(w)));

        session.show_window(w).unwrap();
        session.server().clear_requests();
        session
            .apply_decoration(w, true, MwmDecorations::ALL, MwmFunctions::ALL)
            .unwrap();
        let requests = session.server().requests();
        let tail: Vec<_> = requests.iter().rev().take(3).rev().cloned().collect();
        assert_eq!(tail, vec![Request::Unmap(w), Request::Sync, Request::Map(w)]);
    }

    #[test]
    fn make_non_resizable_then_resizable() {
        let (session, w) = session(WmIdentity::Kde2);
        let atoms = session.atoms();
        let shell = Geometry::new(10, 20, 300, 200);
        session.make_non_resizable(w, (300, 200), shell).unwrap();
        let hints = SizeHints::read(session.server(), &atoms, w).unwrap().unwrap();
        assert!(hints.is_fixed());
        assert!(session
            .server()
            .requests()
            .contains(&Request::MoveResize(w, shell)));
        assert!(!session.window(w).unwrap().resizable);
        let motif = MotifWmHints::read(session.server(), &atoms, w).unwrap();
        assert!(!motif.functions.contains(MwmFunctions::RESIZE));

        session.make_resizable(w).unwrap();
        let hints = SizeHints::read(session.server(), &atoms, w).unwrap().unwrap();
        assert!(!hints.is_fixed());
        assert!(session.window(w).unwrap().resizable);
        let motif = MotifWmHints::read(session.server(), &atoms, w).unwrap();
        assert!(motif.functions.contains(MwmFunctions::RESIZE));
    }
}

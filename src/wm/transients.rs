//! Transients Module
//!
//! Modal blocking expressed through `WM_TRANSIENT_FOR`.
//!
//! A blocked window and the dialog blocking it are threaded into a chain:
//! `prev_transient_for` points down to the window below, `next_transient_for`
//! up to the one above, and the blocking dialog sits on top. Every link is
//! mirrored to the server as a transient-for hint so the window manager
//! keeps dialogs above what they block. A hint is only written between two
//! windows in the same ICCCM state on the same screen; `update_transient_for`
//! finds the nearest compatible neighbours again after a state change.

use std::collections::HashSet;

use tracing::{debug, trace};
use x11rb::protocol::xproto::Window;

use crate::error::Result;
use crate::wm::client_flags::WmState;
use crate::wm::display::XServer;
use crate::wm::ewmh::read_wm_state;
use crate::wm::session::SessionState;

impl SessionState {
    fn wm_state_of(&self, server: &dyn XServer, window: Window) -> Result<WmState> {
        read_wm_state(server, &self.atoms, window)
    }

    /// Make `window` transient for `transient_for`.
    ///
    /// With `update_chain` the chain links are rewritten too. Unless
    /// `all_states` is set the hint is skipped for windows in different
    /// ICCCM states.
    pub(crate) fn set_toplevel_transient_for(
        &mut self,
        server: &dyn XServer,
        window: Window,
        transient_for: Window,
        update_chain: bool,
        all_states: bool,
    ) -> Result<()> {
        if update_chain {
            self.window_mut(window)?.prev_transient_for = Some(transient_for);
            self.window_mut(transient_for)?.next_transient_for = Some(window);
        }
        if self.window(window)?.cur_real_transient_for == Some(transient_for) {
            return Ok(());
        }
        if !all_states && self.wm_state_of(server, window)? != self.wm_state_of(server, transient_for)? {
            trace!("0x{:x} and 0x{:x} differ in state, hint deferred", window, transient_for);
            return Ok(());
        }
        if self.window(window)?.screen != self.window(transient_for)?.screen {
            return Ok(());
        }

        // Hints to hidden windows are useless; climb the owners to a shown one
        let mut target = transient_for;
        let mut steps = self.windows.len();
        loop {
            let t = self.window(target)?;
            if t.visible || steps == 0 {
                break;
            }
            steps -= 1;
            match t.owner.filter(|o| self.is_registered(*o)) {
                Some(owner) => target = owner,
                None => {
                    target = transient_for;
                    break;
                }
            }
        }

        debug!("WM_TRANSIENT_FOR 0x{:x} -> 0x{:x}", window, target);
        server.set_transient_for(window, Some(target))?;
        self.window_mut(window)?.cur_real_transient_for = Some(target);
        Ok(())
    }

    fn remove_transient_for_hint(&mut self, server: &dyn XServer, window: Window) -> Result<()> {
        server.set_transient_for(window, None)?;
        self.window_mut(window)?.cur_real_transient_for = None;
        Ok(())
    }

    /// Put back the natural hint: the owner, or nothing
    pub(crate) fn restore_transient_for(&mut self, server: &dyn XServer, window: Window) -> Result<()> {
        match self.window(window)?.owner.filter(|o| self.is_registered(*o)) {
            Some(owner) => self.set_toplevel_transient_for(server, window, owner, false, true),
            None => self.remove_transient_for_hint(server, window),
        }
    }

    /// Re-point `window`'s hints at the nearest chain neighbours sharing its
    /// state and screen
    pub(crate) fn update_transient_for(&mut self, server: &dyn XServer, window: Window) -> Result<()> {
        let state = self.wm_state_of(server, window)?;
        let screen = self.window(window)?.screen;

        let mut prev = self.window(window)?.prev_transient_for;
        while let Some(p) = prev {
            let w = self.window(p)?;
            if w.screen == screen && self.wm_state_of(server, p)? == state {
                break;
            }
            prev = w.prev_transient_for;
        }
        match prev {
            Some(p) => self.set_toplevel_transient_for(server, window, p, false, false)?,
            None => self.restore_transient_for(server, window)?,
        }

        let mut next = self.window(window)?.next_transient_for;
        while let Some(n) = next {
            let w = self.window(n)?;
            if w.screen == screen && self.wm_state_of(server, n)? == state {
                break;
            }
            next = w.next_transient_for;
        }
        if let Some(n) = next {
            self.set_toplevel_transient_for(server, n, window, false, false)?;
        }
        Ok(())
    }

    /// Bottom of the chain `window` is in
    fn chain_head(&self, window: Window) -> Result<Window> {
        let mut head = window;
        let mut steps = self.windows.len();
        while let Some(prev) = self.window(head)?.prev_transient_for {
            assert!(steps > 0, "transient-for chain through 0x{:x} has a cycle", window);
            steps -= 1;
            head = prev;
        }
        Ok(head)
    }

    /// The whole chain through `window`, bottom first
    pub fn transient_chain(&self, window: Window) -> Vec<Window> {
        let Ok(head) = self.chain_head(window) else {
            return Vec::new();
        };
        let mut chain = vec![head];
        let mut current = head;
        while let Some(next) = self.windows.get(&current).and_then(|w| w.next_transient_for) {
            if chain.contains(&next) {
                break;
            }
            chain.push(next);
            current = next;
        }
        chain
    }

    /// Splice `window` (and the chain below it) under `blocker`, keeping the
    /// server's current stacking order between the two chains
    pub(crate) fn add_to_transient_fors(&mut self, server: &dyn XServer, window: Window, blocker: Window) -> Result<()> {
        let mut blocker_chain = self.chain_head(blocker)?;
        // A window is blocked at most once, so it is on top of its own chain
        let mut this_chain = self.chain_head(window)?;

        if blocker_chain == blocker {
            self.set_toplevel_transient_for(server, blocker, window, true, false)?;
        } else {
            let toplevels = self.collect_toplevels(server)?;
            let mut merged: Option<Window> = None;
            let mut done = false;
            for w in toplevels {
                let prev_merged = merged;
                if w == this_chain {
                    if this_chain == window {
                        if let Some(pm) = prev_merged {
                            self.set_toplevel_transient_for(server, window, pm, true, false)?;
                        }
                        self.set_toplevel_transient_for(server, blocker_chain, window, true, false)?;
                        done = true;
                        break;
                    }
                    merged = Some(this_chain);
                    this_chain = self.next_in_chain(this_chain)?;
                } else if w == blocker_chain {
                    merged = Some(blocker_chain);
                    blocker_chain = self.next_in_chain(blocker_chain)?;
                } else {
                    continue;
                }

                let Some(m) = merged else { continue };
                match prev_merged {
                    None => self.window_mut(m)?.prev_transient_for = None,
                    Some(pm) => {
                        self.set_toplevel_transient_for(server, m, pm, true, false)?;
                        self.update_transient_for(server, m)?;
                    }
                }
                if blocker_chain == blocker {
                    self.set_toplevel_transient_for(server, this_chain, m, true, false)?;
                    self.set_toplevel_transient_for(server, blocker, window, true, false)?;
                    done = true;
                    break;
                }
            }

            if !done {
                // Some chain member is not in the server tree; stack what is
                // left of this chain under what is left of the blocker's
                debug!("Incomplete stacking order while blocking 0x{:x}", window);
                if let Some(m) = merged {
                    self.set_toplevel_transient_for(server, this_chain, m, true, false)?;
                }
                self.set_toplevel_transient_for(server, blocker_chain, window, true, false)?;
            }
        }
        server.sync()
    }

    /// Next window up a chain; chain walks never run off the top
    fn next_in_chain(&self, window: Window) -> Result<Window> {
        Ok(self.window(window)?.next_transient_for.unwrap_or(window))
    }

    /// Take `window` out of its blocker's chain.
    ///
    /// Windows below it that it (or a dialog it blocks) is blocking stay
    /// with it; everything else stays with the blocker.
    pub(crate) fn remove_from_transient_fors(&mut self, server: &dyn XServer, window: Window) -> Result<()> {
        let mut this_chain = window;
        let Some(mut other_chain) = self.window(window)?.next_transient_for else {
            return Ok(());
        };
        let mut this_chain_blockers = HashSet::from([window]);

        let mut to_split = self.window(window)?.prev_transient_for;
        while let Some(w) = to_split {
            let t = self.window(w)?;
            let below = t.prev_transient_for;
            if t.modal_blocker.is_some_and(|b| this_chain_blockers.contains(&b)) {
                self.set_toplevel_transient_for(server, this_chain, w, true, false)?;
                this_chain = w;
                this_chain_blockers.insert(w);
            } else {
                self.set_toplevel_transient_for(server, other_chain, w, true, false)?;
                other_chain = w;
            }
            to_split = below;
        }

        self.restore_transient_for(server, this_chain)?;
        self.window_mut(this_chain)?.prev_transient_for = None;
        self.restore_transient_for(server, other_chain)?;
        self.window_mut(other_chain)?.prev_transient_for = None;
        self.window_mut(window)?.next_transient_for = None;
        server.sync()
    }

    /// Block `window` by modal `dialog`, or lift that block.
    ///
    /// # Panics
    ///
    /// On unblocking by a dialog that is not the recorded blocker, on a
    /// window blocking itself, and on a block that would form a cycle.
    pub fn set_modal_blocked(
        &mut self,
        server: &dyn XServer,
        window: Window,
        dialog: Window,
        blocked: bool,
    ) -> Result<()> {
        let spliced = self.window(window)?.reparented || self.is_non_reparenting(server)?;
        let current = self.window(window)?.modal_blocker;

        if blocked {
            assert!(window != dialog, "window 0x{:x} cannot block itself", window);
            self.window(dialog)?;
            if current == Some(dialog) {
                return Ok(());
            }
            let mut up = Some(dialog);
            let mut steps = self.windows.len();
            while let Some(d) = up {
                assert!(
                    d != window && steps > 0,
                    "blocking 0x{:x} by 0x{:x} would form a cycle",
                    window,
                    dialog
                );
                steps -= 1;
                up = self.windows.get(&d).and_then(|t| t.modal_blocker);
            }
            if let Some(old) = current {
                self.set_modal_blocked(server, window, old, false)?;
            }

            debug!("0x{:x} blocked by 0x{:x}", window, dialog);
            self.window_mut(window)?.modal_blocker = Some(dialog);
            if spliced {
                self.add_to_transient_fors(server, window, dialog)?;
            } else {
                self.window_mut(window)?.delayed_modal_blocking = true;
            }
        } else {
            assert!(
                current == Some(dialog),
                "0x{:x} is not blocked by 0x{:x} (blocker: {:?})",
                window,
                dialog,
                current
            );
            debug!("0x{:x} unblocked from 0x{:x}", window, dialog);
            let w = self.window_mut(window)?;
            w.modal_blocker = None;
            if w.delayed_modal_blocking {
                w.delayed_modal_blocking = false;
            } else if spliced {
                self.remove_from_transient_fors(server, window)?;
            }
        }

        self.update_transient_for(server, window)
    }
}

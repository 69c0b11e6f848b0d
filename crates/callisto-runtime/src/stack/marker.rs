//! Frame-hide markers
//!
//! A [`FrameMarker`] names one frame that must not appear in captured traces while the
//! trampoline invocation that pushed it is still running. The [`MarkerRegistry`] holds
//! the active markers of one execution context in call order; the only way to add one
//! is [`MarkerRegistry::hide`], whose guard removes it again on drop.

use super::frame::FrameId;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use tracing::trace;

/// Token hiding one caller frame for the duration of one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameMarker {
    serial: u64,
    frame: FrameId,
}

impl FrameMarker {
    /// The hidden frame
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Registry-unique serial; markers are never reused
    pub fn serial(&self) -> u64 {
        self.serial
    }
}

/// Ordered stack of active markers for one execution context
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    markers: RefCell<Vec<FrameMarker>>,
    next_serial: Cell<u64>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hide `frame` until the returned guard is dropped.
    #[must_use = "the frame is only hidden while the guard is alive"]
    pub fn hide(&self, frame: FrameId) -> MarkerGuard<'_> {
        let serial = self.next_serial.get();
        self.next_serial.set(serial + 1);

        let marker = FrameMarker { serial, frame };
        let depth = {
            let mut markers = self.markers.borrow_mut();
            markers.push(marker);
            markers.len()
        };
        trace!(frame = %frame, serial, depth, "frame marker pushed");

        MarkerGuard {
            registry: self,
            marker,
        }
    }

    /// Whether any active marker hides `frame`
    pub fn is_hidden(&self, frame: FrameId) -> bool {
        self.markers.borrow().iter().any(|m| m.frame == frame)
    }

    /// Snapshot of the active markers, outermost first
    pub fn active(&self) -> Vec<FrameMarker> {
        self.markers.borrow().clone()
    }

    /// Set of frames hidden right now
    pub fn hidden_frames(&self) -> HashSet<FrameId> {
        self.markers.borrow().iter().map(|m| m.frame).collect()
    }

    pub fn len(&self) -> usize {
        self.markers.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.borrow().is_empty()
    }

    /// Swap the active markers out; used when entering and leaving an isolated scope.
    pub(crate) fn replace(&self, markers: Vec<FrameMarker>) -> Vec<FrameMarker> {
        self.markers.replace(markers)
    }

    fn release(&self, marker: FrameMarker) {
        let mut markers = self.markers.borrow_mut();
        // Normally the last entry; searching keeps the pop exact even if a scope swap
        // left other markers above it.
        if let Some(pos) = markers.iter().rposition(|m| m.serial == marker.serial) {
            markers.remove(pos);
        }
        trace!(
            frame = %marker.frame,
            serial = marker.serial,
            depth = markers.len(),
            "frame marker popped"
        );
    }
}

/// Scope guard returned by [`MarkerRegistry::hide`]
#[derive(Debug)]
pub struct MarkerGuard<'a> {
    registry: &'a MarkerRegistry,
    marker: FrameMarker,
}

impl MarkerGuard<'_> {
    pub fn marker(&self) -> FrameMarker {
        self.marker
    }
}

impl Drop for MarkerGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(self.marker);
    }
}

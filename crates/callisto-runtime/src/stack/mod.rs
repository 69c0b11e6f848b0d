//! Call stack, frame-hide markers and trace capture

pub mod frame;
pub mod marker;
pub mod trace;

use crate::error::RuntimeError;
use frame::{CallFrame, FrameId};
use marker::{FrameMarker, MarkerRegistry};
use std::cell::{Cell, RefCell};
use std::sync::Arc;
use tracing::{debug, trace};

/// Name of the context's root frame
pub const MAIN_FRAME: &str = "<main>";

/// Name of the root frame of an isolated scope (job queue, `run_isolated`)
pub const JOB_FRAME: &str = "<job>";

/// Frames of one execution context, outermost first
#[derive(Debug)]
pub struct CallStack {
    frames: RefCell<Vec<CallFrame>>,
    next_id: Cell<u64>,
    max_depth: usize,
}

impl CallStack {
    /// Create a stack holding only a root frame named `root`
    pub fn new(root: &str, max_depth: usize) -> Self {
        let stack = Self {
            frames: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            max_depth,
        };
        let root = stack.new_frame(Arc::from(root));
        stack.frames.borrow_mut().push(root);
        stack
    }

    fn new_frame(&self, function_name: Arc<str>) -> CallFrame {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        CallFrame {
            id: FrameId(id),
            function_name,
        }
    }

    /// Push a frame for `function_name`; it is popped when the guard drops.
    pub fn enter(&self, function_name: Arc<str>) -> Result<FrameGuard<'_>, RuntimeError> {
        let depth = self.depth();
        if depth >= self.max_depth {
            debug!(depth, function = %function_name, "call depth limit reached");
            return Err(RuntimeError::StackOverflow { depth });
        }

        let frame = self.new_frame(function_name);
        let id = frame.id;
        trace!(frame = %id, function = %frame.function_name, depth = depth + 1, "frame entered");
        self.frames.borrow_mut().push(frame);

        Ok(FrameGuard { stack: self, id })
    }

    /// The innermost frame (the caller of whatever runs right now)
    pub fn current(&self) -> FrameId {
        self.frames
            .borrow()
            .last()
            .map(|frame| frame.id)
            .unwrap_or_default()
    }

    pub fn depth(&self) -> usize {
        self.frames.borrow().len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Snapshot of the live frames, outermost first
    pub fn frames(&self) -> Vec<CallFrame> {
        self.frames.borrow().clone()
    }

    /// Run `f` over the live frames without copying them
    pub fn with_frames<R>(&self, f: impl FnOnce(&[CallFrame]) -> R) -> R {
        f(&self.frames.borrow())
    }

    fn pop(&self, id: FrameId) {
        let mut frames = self.frames.borrow_mut();
        if let Some(pos) = frames.iter().rposition(|frame| frame.id == id) {
            frames.remove(pos);
        }
    }
}

/// Scope guard returned by [`CallStack::enter`]
#[derive(Debug)]
pub struct FrameGuard<'a> {
    stack: &'a CallStack,
    id: FrameId,
}

impl FrameGuard<'_> {
    pub fn id(&self) -> FrameId {
        self.id
    }
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.stack.pop(self.id);
    }
}

/// An independent logical execution chain.
///
/// While alive, the stack holds only a fresh `<job>` root frame and the marker registry
/// is empty; the previous frames and markers are restored on drop.
pub(crate) struct ExecutionScope<'a> {
    stack: &'a CallStack,
    markers: &'a MarkerRegistry,
    saved_frames: Vec<CallFrame>,
    saved_markers: Vec<FrameMarker>,
}

impl<'a> ExecutionScope<'a> {
    pub(crate) fn enter(stack: &'a CallStack, markers: &'a MarkerRegistry) -> Self {
        let root = stack.new_frame(Arc::from(JOB_FRAME));
        let saved_frames = stack.frames.replace(vec![root]);
        let saved_markers = markers.replace(Vec::new());
        Self {
            stack,
            markers,
            saved_frames,
            saved_markers,
        }
    }
}

impl Drop for ExecutionScope<'_> {
    fn drop(&mut self) {
        self.stack
            .frames
            .replace(std::mem::take(&mut self.saved_frames));
        self.markers
            .replace(std::mem::take(&mut self.saved_markers));
    }
}

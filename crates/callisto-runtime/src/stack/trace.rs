//! Captured stack traces and the frame filter
//!
//! A trace is always captured through [`filter_frames`], which drops every frame hidden
//! by an active [`FrameMarker`] before the trace limit is applied.

use super::frame::{CallFrame, FrameId};
use super::marker::FrameMarker;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// One frame of a captured trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    pub id: FrameId,
    pub function_name: Arc<str>,
}

impl From<&CallFrame> for StackFrame {
    fn from(frame: &CallFrame) -> Self {
        StackFrame {
            id: frame.id,
            function_name: Arc::clone(&frame.function_name),
        }
    }
}

/// Filtered frames, innermost first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackTrace {
    frames: Vec<StackFrame>,
}

impl StackTrace {
    pub fn new(frames: Vec<StackFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Function names, innermost first
    pub fn function_names(&self) -> Vec<&str> {
        self.frames.iter().map(|f| f.function_name.as_ref()).collect()
    }

    pub fn contains_function(&self, name: &str) -> bool {
        self.frames.iter().any(|f| f.function_name.as_ref() == name)
    }

    pub fn contains_frame(&self, id: FrameId) -> bool {
        self.frames.iter().any(|f| f.id == id)
    }

    /// Render with a header line, e.g. `Error: test\n    at inner\n    at <main>`
    pub fn render(&self, header: &str) -> String {
        if self.frames.is_empty() {
            header.to_string()
        } else {
            format!("{}\n{}", header, self)
        }
    }
}

impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, frame) in self.frames.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "    at {}", frame.function_name)?;
        }
        Ok(())
    }
}

/// Remove every frame named by an active marker.
///
/// `raw` is the live call stack, outermost first. The result is innermost first,
/// keeps the relative order of the surviving frames, and holds at most `limit` of them.
pub fn filter_frames(raw: &[CallFrame], markers: &[FrameMarker], limit: usize) -> StackTrace {
    let hidden: HashSet<FrameId> = markers.iter().map(FrameMarker::frame).collect();

    let frames = raw
        .iter()
        .rev()
        .filter(|frame| !hidden.contains(&frame.id))
        .take(limit)
        .map(StackFrame::from)
        .collect();

    StackTrace { frames }
}

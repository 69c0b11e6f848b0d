//! Call frame implementation for function calls

use std::fmt;
use std::sync::Arc;

/// Identity of one pushed frame.
///
/// Ids are handed out by [`super::CallStack`] from a counter that starts at 1 and never
/// repeats within a context, so two activations of the same function are always
/// distinguishable. `FrameId::default()` (0) is never assigned to a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub(crate) u64);

impl FrameId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Call frame for function calls
///
/// Every call to a non-native function pushes one frame; natives run in their
/// caller's frame. The bottom of each stack is a root frame (`<main>` for the
/// context, `<job>` for an isolated job scope).
///
/// ```text
/// <main> -> outer -> middle -> inner
///  #1       #2       #3        #4     (FrameId, innermost last)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    /// Unique identity of this activation
    pub id: FrameId,
    /// Function name (for stack traces)
    pub function_name: Arc<str>,
}

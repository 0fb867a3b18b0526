//! Mutable interpreter state threaded through evaluation.

use weft_core::{CaptureBuf, CaptureMemory};

/// Capture scopes, named-capture memory, and recursion depth.
///
/// The scope stack starts with a root buffer that collects the final
/// output. Constructs that post-process their capture open a scope,
/// evaluate, and close it again; the open/close pairs are statically
/// balanced in the evaluator.
#[derive(Debug, Default)]
pub(crate) struct MatchState {
    root: CaptureBuf,
    scopes: Vec<CaptureBuf>,
    pub captures: CaptureMemory,
    pub depth: usize,
}

impl MatchState {
    pub fn new() -> Self {
        MatchState::default()
    }

    /// The innermost open buffer.
    pub fn top(&mut self) -> &mut CaptureBuf {
        self.scopes.last_mut().unwrap_or(&mut self.root)
    }

    pub fn open_scope(&mut self) {
        self.scopes.push(CaptureBuf::new());
    }

    pub fn close_scope(&mut self) -> CaptureBuf {
        debug_assert!(!self.scopes.is_empty(), "unbalanced capture scope");
        self.scopes.pop().unwrap_or_default()
    }

    pub fn into_root(self) -> CaptureBuf {
        debug_assert!(self.scopes.is_empty(), "unbalanced capture scope");
        self.root
    }
}

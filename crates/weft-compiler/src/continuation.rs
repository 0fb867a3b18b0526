//! Failure-continuation descriptors.
//!
//! Lowering keeps a stack of these, one per enclosing construct that
//! can absorb a miss. A descriptor names the construct's two exit
//! labels and which of them a miss inside the construct prefers; a
//! fail site compiles to a jump at the preferred exit of the innermost
//! descriptor, or to a raise when the stack is empty and the miss
//! escapes the rule.
//!
//! The descriptor also snapshots how many capture-buffer scopes were
//! open when the construct registered itself. Handler code emitted at
//! the exit labels truncates back to that depth, which is what keeps
//! scopes balanced when the miss happened underneath markers, joins,
//! or captures that never reached their own pop.

use crate::layout::Label;

/// Whether the enclosing compiled construct iterates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// A bounded iteration. The exits are its break and continue
    /// labels.
    Loop,
    /// A straight-line scope. The exits are its undo-and-fail and
    /// undo-and-succeed labels.
    Block,
}

/// Which of a scope's two exits a miss takes.
///
/// Every construct in this lowering registers its miss exit as
/// `primary` and reaches the other exit by falling through its own
/// lowered body: a loop sorts under-minimum from satisfied at its
/// break handler with a counter check, and a negation binds separate
/// handlers for the inner matcher's two outcomes. So only `Primary` is
/// ever constructed; `Secondary` exists for a construct that wants to
/// route misses at the other exit without re-registering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preference {
    Primary,
    Secondary,
}

/// One entry of the failure-continuation stack.
#[derive(Debug, Clone, Copy)]
pub struct FailureCont {
    pub kind: ScopeKind,
    pub preference: Preference,
    pub primary: Label,
    pub secondary: Label,
    /// Buffer scopes open in the current frame when this descriptor
    /// was registered.
    pub bufs: u16,
}

impl FailureCont {
    /// A straight-line scope whose misses land on `primary`.
    pub fn block(primary: Label, secondary: Label, bufs: u16) -> Self {
        FailureCont {
            kind: ScopeKind::Block,
            preference: Preference::Primary,
            primary,
            secondary,
            bufs,
        }
    }

    /// An iterating scope whose misses break out to `brk`.
    pub fn looping(brk: Label, cont: Label, bufs: u16) -> Self {
        FailureCont {
            kind: ScopeKind::Loop,
            preference: Preference::Primary,
            primary: brk,
            secondary: cont,
            bufs,
        }
    }

    /// The exit a miss inside this scope jumps to.
    pub fn fail_label(&self) -> Label {
        match self.preference {
            Preference::Primary => self.primary,
            Preference::Secondary => self.secondary,
        }
    }
}

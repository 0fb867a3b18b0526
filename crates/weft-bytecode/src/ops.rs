//! The instruction set.
//!
//! Ops fall into four families: terminal matches that consume input
//! and append it to the open capture buffer, bookkeeping ops over
//! marks and counters, capture-buffer scope ops, and control transfer.
//! Every op that can miss carries an explicit [`FailTo`] naming where
//! control goes when it does; there is no implicit unwinding inside a
//! program.
//!
//! The op type is generic over its jump operand so the compiler can
//! emit ops against symbolic labels and resolve them to [`OpAddr`]es
//! in a separate layout step. Stored programs always use `Op<OpAddr>`.

use std::fmt;

/// Index of an op inside a program's op vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpAddr(pub u32);

/// Index into a program's string table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrId(pub u32);

/// Index into a program's character-set table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SetId(pub u32);

/// Index into a program's predicate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PredId(pub u32);

/// A frame-local bookmark slot holding a scanner location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkSlot(pub u32);

/// A frame-local iteration counter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CounterSlot(pub u32);

/// Position of a rule in the runtime's dispatch table. Slots line up
/// with the rule registry's declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleSlot(pub u32);

impl fmt::Display for OpAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl fmt::Display for StrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C{}", self.0)
    }
}

impl fmt::Display for PredId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

impl fmt::Display for MarkSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

impl fmt::Display for CounterSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

impl fmt::Display for RuleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Where a missed op sends control.
///
/// `At` jumps to a recovery handler inside the same program; the
/// handler is responsible for truncating stray buffer scopes and
/// rewinding the scanner. `Raise` propagates the miss out of the
/// program entirely, to the failure target recorded at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailTo<L = OpAddr> {
    At(L),
    Raise,
}

/// One executable op.
///
/// Terminal matches compute their "expected" description from their
/// own operands when they miss, so runtime failure messages agree with
/// the tree interpreter's. Composite constructs describe themselves
/// through the string table instead ([`Op::Fail`] and
/// [`Op::ConsumeRejected`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op<L = OpAddr> {
    /// Consume one specific character.
    MatchChar { ch: char, fail: FailTo<L> },
    /// Consume one character inside an inclusive range.
    MatchRange {
        start: char,
        end: char,
        fail: FailTo<L>,
    },
    /// Consume one character contained in a sorted set.
    MatchSet { set: SetId, fail: FailTo<L> },
    /// Consume an exact string.
    MatchString { text: StrId, fail: FailTo<L> },
    /// Consume one character accepted by a named predicate.
    MatchPredicate { pred: PredId, fail: FailTo<L> },
    /// Succeed only at the end of input. Consumes nothing.
    MatchEof { fail: FailTo<L> },
    /// Consume the text currently stored under a capture name. Misses
    /// when nothing is stored or the input differs.
    MatchBackref { name: StrId, fail: FailTo<L> },

    /// Consume up to `width` characters of input a failed negation
    /// body rejected, at least one. Misses at the end of input. `desc`
    /// names the negation for the failure message.
    ConsumeRejected {
        width: u32,
        desc: StrId,
        fail: FailTo<L>,
    },

    /// Record the scanner position in a mark slot.
    SetMark(MarkSlot),
    /// Rewind the scanner to a recorded mark.
    RewindTo(MarkSlot),

    /// Zero a counter slot.
    ClearCounter(CounterSlot),
    /// Add one to a counter slot.
    IncrCounter(CounterSlot),
    /// Jump when a counter has reached `limit`.
    JumpCounterGe {
        counter: CounterSlot,
        limit: u32,
        target: L,
    },
    /// Jump when the scanner has not moved since a mark was set.
    JumpIfAtMark { mark: MarkSlot, target: L },

    /// Open a capture-buffer scope.
    PushBuf,
    /// Close the innermost scope, appending its content to the parent.
    PopMerge,
    /// Close the innermost scope, dropping its content.
    PopDiscard,
    /// Close the innermost scope, appending its flattened text to the
    /// parent.
    PopJoin,
    /// Close the innermost scope, wrapping its content in a named
    /// marker appended to the parent.
    PopMarker { name: StrId },
    /// Store the flattened text of the open scope under a capture
    /// name. Leaves the scope open.
    StoreCapture { name: StrId },
    /// Drop open buffer scopes down to `depth` scopes in this frame.
    /// Recovery handlers start with this to rebalance after a miss
    /// deep inside a construct that opened scopes of its own.
    TruncBufs { depth: u16 },

    /// Unconditional jump.
    Jump(L),
    /// Invoke another rule through the dispatch table. On a miss of
    /// the whole rule, control resumes at `fail`.
    CallRule { rule: RuleSlot, fail: FailTo<L> },
    /// Finish the program, returning to the caller.
    Return,
    /// Miss unconditionally. `expected` describes the construct;
    /// `chained` adopts the previously recorded miss as the cause.
    Fail {
        expected: StrId,
        chained: bool,
        fail: FailTo<L>,
    },
}

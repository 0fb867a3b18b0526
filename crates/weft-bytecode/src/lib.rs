#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Compiled matcher programs.
//!
//! A [`Program`] is the executable form of one grammar rule: a flat
//! vector of [`Op`]s addressed by index, plus the side tables the ops
//! refer into (strings, character sets, predicates) and the mark and
//! counter slot counts the runtime must provision per activation.
//!
//! Programs are produced by the compiler crate and executed by the
//! runtime crate; this crate only defines the format, validates it,
//! and renders it as text for inspection.

pub mod dump;
pub mod ops;
pub mod program;

#[cfg(test)]
mod dump_tests;

pub use dump::dump;
pub use ops::{CounterSlot, FailTo, MarkSlot, Op, OpAddr, PredId, RuleSlot, SetId, StrId};
pub use program::{PredicateEntry, Program, ProgramBuilder, ProgramError};

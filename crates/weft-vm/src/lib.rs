//! Weft VM: executes compiled grammar programs.
//!
//! - `table` - the per-rule engine table a match runs against
//! - `machine` - the executor
//! - `trace` - execution instrumentation
//!
//! The executor and the tree interpreter in `weft-grammar` implement
//! the same matching semantics: for any rule set, input, and options,
//! both engines agree on success or failure, consumed input, captured
//! output, and the failure chain. A [`RuleTable`] may mix the two
//! freely, with compiled rules calling interpreted ones and back.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod machine;
pub mod table;
pub mod trace;


pub use machine::{Vm, run_root, run_rule};
pub use table::{RuleEntry, RuleTable};
pub use trace::{NoopTracer, PrintTracer, Tracer};

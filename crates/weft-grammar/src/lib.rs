#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Grammar model, optimizer, and tree-walking matcher.
//!
//! A grammar is an immutable tree of [`GrammarNode`] values built
//! through the combinator methods on the type, registered under names
//! in a [`RuleSet`]. Matching walks the tree directly with the
//! backtracking interpreter in [`interpret`]; the sibling compiler
//! crate lowers the same trees into programs that the runtime crate
//! executes with identical semantics.
//!
//! The [`optimize`] module rewrites trees into cheaper shapes without
//! changing what they match; every pass can be toggled off.

pub mod interpret;
pub mod length;
pub mod node;
pub mod optimize;
pub mod registry;

#[cfg(test)]
mod node_tests;

pub use interpret::{DEFAULT_MAX_DEPTH, MatchOptions, match_fragment, match_node, match_rule};
pub use length::{LenBound, LengthAnalyzer, NegationMode};
pub use node::{GrammarNode, PredicateNode, backref, ch, char_range, eof, lit, one_of, pred, rule};
pub use optimize::{OptimizerOptions, optimize_node};
pub use registry::{RuleDef, RuleId, RuleSet};

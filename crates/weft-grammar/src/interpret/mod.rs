//! The backtracking tree interpreter.
//!
//! Walks a [`GrammarNode`] tree directly against a [`Scanner`],
//! rewinding on recoverable failures. This engine defines the
//! reference semantics; compiled programs must agree with it on every
//! input.

use serde::{Deserialize, Serialize};

use weft_core::{CaptureBuf, CaptureMemory, MatchResult, MatchValue, Scanner, Span};

use crate::length::NegationMode;
use crate::node::GrammarNode;
use crate::registry::RuleSet;

mod eval;
mod state;

#[cfg(test)]
mod tests;

use eval::Interp;
use state::MatchState;

/// Default bound on rule recursion.
pub const DEFAULT_MAX_DEPTH: usize = 1024;

/// Knobs shared by both engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOptions {
    /// How much input a successful negation consumes.
    pub negation: NegationMode,
    /// Rule recursion bound. Exceeding it is a hard fault.
    pub max_depth: usize,
}

impl Default for MatchOptions {
    fn default() -> Self {
        MatchOptions {
            negation: NegationMode::SingleChar,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl MatchOptions {
    pub fn negation(mut self, mode: NegationMode) -> Self {
        self.negation = mode;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Match the named rule against the whole of `input`, starting at the
/// beginning. The match itself may stop before the end of input.
pub fn match_rule(
    rules: &RuleSet,
    name: &str,
    input: &str,
    options: &MatchOptions,
) -> MatchResult<MatchValue> {
    let mut scanner = Scanner::new(input);
    let reference = GrammarNode::RuleReference(name.to_string());
    match_node(rules, &reference, &mut scanner, options)
}

/// Match one node tree at the scanner's current position.
pub fn match_node(
    rules: &RuleSet,
    node: &GrammarNode,
    scanner: &mut Scanner,
    options: &MatchOptions,
) -> MatchResult<MatchValue> {
    let start = scanner.location();
    let mut state = MatchState::new();
    Interp::new(rules, options).eval(node, scanner, &mut state)?;
    let buf = state.into_root();
    Ok(MatchValue {
        text: buf.flat_text(),
        items: buf.into_items(),
        span: Span::new(start, scanner.location()),
    })
}

/// Match one node tree sharing an existing capture memory.
///
/// This is the entry the compiled runtime uses for rules excluded from
/// compilation: the fragment consumes from the shared scanner, reads
/// and writes the caller's capture memory, and hands back its captured
/// output for the caller to merge. `depth` seeds the recursion counter
/// with the rule nesting already active in the caller, so the shared
/// limit holds across engine boundaries.
pub fn match_fragment(
    rules: &RuleSet,
    node: &GrammarNode,
    scanner: &mut Scanner,
    captures: &mut CaptureMemory,
    options: &MatchOptions,
    depth: usize,
) -> MatchResult<CaptureBuf> {
    let mut state = MatchState::new();
    state.captures = std::mem::take(captures);
    state.depth = depth;
    let outcome = Interp::new(rules, options).eval(node, scanner, &mut state);
    *captures = std::mem::take(&mut state.captures);
    outcome?;
    Ok(state.into_root())
}

/// Convenience for the common "does this node match this input" check.
pub fn matches(rules: &RuleSet, node: &GrammarNode, input: &str) -> bool {
    let mut scanner = Scanner::new(input);
    match_node(rules, node, &mut scanner, &MatchOptions::default()).is_ok()
}

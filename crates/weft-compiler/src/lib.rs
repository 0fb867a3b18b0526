//! Weft compiler: lowers grammar rules to executable programs.
//!
//! - `lower` - per-construct lowering of grammar trees to ops
//! - `continuation` - the failure-continuation stack lowering works against
//! - `layout` - symbolic labels and their resolution to op addresses
//! - `tables` - side-table pools with value deduplication
//!
//! Compilation is a build-time, single-threaded operation. The
//! [`Program`]s it produces are immutable and freely shareable across
//! threads; the executor in `weft-vm` runs them.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod continuation;
mod layout;
mod lower;
mod tables;

#[cfg(test)]
mod lower_tests;

use std::collections::HashSet;

use weft_bytecode::{Program, ProgramError};
use weft_grammar::{MatchOptions, RuleSet};

use crate::lower::Lowerer;

pub use continuation::{FailureCont, Preference, ScopeKind};
pub use layout::Label;

/// Errors that can occur while compiling rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A rule reference names a rule with no definition, or
    /// compilation of an undefined rule was requested.
    #[error("rule `{0}` is not defined")]
    UndefinedRule(String),

    /// A negation in length-maximizing mode wraps a matcher with no
    /// finite length bound. The interpreter reports this lazily at
    /// match time; compilation rejects the rule up front.
    #[error("cannot bound the length of `{node}` in rule `{rule}`")]
    UnboundedNegation { rule: String, node: String },

    /// A jump target was never given an address. Indicates a lowering
    /// bug, not a user error.
    #[error("label L{0} was never bound")]
    UnboundLabel(u32),

    /// The rule lowered to more ops than addresses can index.
    #[error("program too large: {ops} ops")]
    Oversized { ops: usize },

    /// The assembled program failed validation.
    #[error(transparent)]
    Invalid(#[from] ProgramError),
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, Error>;

/// Compile a single named rule against its rule set.
///
/// Rule references inside the body are compiled as indirect calls, so
/// every referenced rule must have a definition, but only the named
/// rule itself is lowered here.
pub fn compile_rule(rules: &RuleSet, name: &str, options: &MatchOptions) -> Result<Program> {
    let excluded = HashSet::new();
    Lowerer::new(rules, name, options, &excluded).lower_rule()
}

/// Compile every defined rule in the set.
///
/// The result is indexed by [`RuleId`](weft_grammar::RuleId): slot `i`
/// holds the program for rule `i`, or `None` for a declared rule with
/// no definition. Undefined rules are only an error when something
/// references them.
pub fn compile(rules: &RuleSet, options: &MatchOptions) -> Result<Vec<Option<Program>>> {
    compile_excluding(rules, options, &[])
}

/// Compile every defined rule except the named ones.
///
/// Excluded rules keep their `None` slot and run on the tree
/// interpreter instead, which is the escape hatch for rules the
/// compiler rejects, such as unbounded negations in length-maximizing
/// mode. References to an excluded rule still compile; they resolve
/// through the rule table at match time.
pub fn compile_excluding(
    rules: &RuleSet,
    options: &MatchOptions,
    exclude: &[&str],
) -> Result<Vec<Option<Program>>> {
    let excluded: HashSet<&str> = exclude.iter().copied().collect();
    let mut programs = Vec::with_capacity(rules.len());
    for (_, name, def) in rules.iter() {
        if def.is_none() || excluded.contains(name) {
            programs.push(None);
        } else {
            programs.push(Some(Lowerer::new(rules, name, options, &excluded).lower_rule()?));
        }
    }
    Ok(programs)
}

//! The per-rule engine table.

use std::sync::Arc;

use weft_bytecode::{Program, RuleSlot};
use weft_grammar::{GrammarNode, MatchOptions, RuleId, RuleSet};

/// How one rule runs.
#[derive(Debug, Clone)]
pub enum RuleEntry {
    /// Runs on the VM.
    Compiled(Arc<Program>),
    /// Runs on the tree interpreter. The node is a reference to the
    /// rule, so resolution, recursion accounting, and undefined-rule
    /// reporting follow the interpreter's own path.
    Fallback(GrammarNode),
}

/// Every rule of one grammar bound to an engine, indexed by
/// [`RuleSlot`].
///
/// Built once from a rule set and the program list `compile` produced
/// for it. Immutable afterward; matches running on different scanners
/// may share one table across threads.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: RuleSet,
    entries: Vec<RuleEntry>,
    options: MatchOptions,
}

impl RuleTable {
    /// Bind `programs` to `rules`. Slots without a program fall back
    /// to the interpreter.
    ///
    /// # Panics
    ///
    /// Panics when `programs` does not line up with `rules`: there
    /// must be one slot per declared rule, and every `CallRule` target
    /// must be within range.
    pub fn new(rules: RuleSet, programs: Vec<Option<Program>>, options: MatchOptions) -> Self {
        assert_eq!(
            programs.len(),
            rules.len(),
            "one program slot per declared rule"
        );
        let entries: Vec<RuleEntry> = programs
            .into_iter()
            .enumerate()
            .map(|(slot, program)| match program {
                Some(program) => RuleEntry::Compiled(Arc::new(program)),
                None => {
                    let name = rules
                        .name_at(RuleId(slot as u32))
                        .expect("slot within the rule set");
                    RuleEntry::Fallback(GrammarNode::RuleReference(name.to_string()))
                }
            })
            .collect();
        for entry in &entries {
            if let RuleEntry::Compiled(program) = entry {
                for callee in program.callees() {
                    assert!(
                        (callee.0 as usize) < entries.len(),
                        "rule `{}` calls slot {callee} outside the table",
                        program.rule()
                    );
                }
            }
        }
        RuleTable {
            rules,
            entries,
            options,
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The engine binding for `slot`.
    ///
    /// # Panics
    ///
    /// Panics when `slot` is out of range.
    pub fn entry(&self, slot: RuleSlot) -> &RuleEntry {
        &self.entries[slot.0 as usize]
    }

    pub fn slot_of(&self, name: &str) -> Option<RuleSlot> {
        self.rules.id_of(name).map(|id| RuleSlot(id.0))
    }

    /// The slot of the designated root rule, if one was set.
    pub fn root_slot(&self) -> Option<RuleSlot> {
        self.rules.root_name().and_then(|name| self.slot_of(name))
    }

    pub fn name_of(&self, slot: RuleSlot) -> &str {
        self.rules
            .name_at(RuleId(slot.0))
            .expect("slot within the rule set")
    }
}

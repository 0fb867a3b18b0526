//! Static length bounds for grammar nodes.
//!
//! Both engines ask the same two questions: the fewest characters a
//! node can consume, and the most. Negations in maximizing mode
//! consume as much as their inner matcher ever could, and the
//! double-negation rewrite only fires for nodes that always consume
//! exactly one character, so bounds must be exact where they are
//! finite and `Unbounded` anywhere they cannot be pinned down.
//!
//! Rule references make bounds grammar-dependent, so the analyzer
//! carries a [`RuleSet`] and caches per-rule answers. Recursive and
//! unbound rules resolve conservatively: unbounded maximum, zero
//! minimum.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::node::GrammarNode;
use crate::registry::RuleSet;

/// How much input a successful negation consumes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NegationMode {
    /// Exactly one character.
    #[default]
    SingleChar,
    /// As many characters as the negated matcher could at most have
    /// matched, clamped to the remaining input. Requires the negated
    /// matcher to have a finite maximum length.
    MaxLength,
}

/// An upper bound on consumed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LenBound {
    Finite(usize),
    Unbounded,
}

impl LenBound {
    pub fn finite(self) -> Option<usize> {
        match self {
            LenBound::Finite(n) => Some(n),
            LenBound::Unbounded => None,
        }
    }

    fn add(self, other: LenBound) -> LenBound {
        match (self, other) {
            (LenBound::Finite(a), LenBound::Finite(b)) => {
                LenBound::Finite(a.saturating_add(b))
            }
            _ => LenBound::Unbounded,
        }
    }

    fn scale(self, factor: usize) -> LenBound {
        match self {
            LenBound::Finite(0) => LenBound::Finite(0),
            LenBound::Finite(n) => LenBound::Finite(n.saturating_mul(factor)),
            LenBound::Unbounded if factor == 0 => LenBound::Finite(0),
            LenBound::Unbounded => LenBound::Unbounded,
        }
    }
}

/// Computes and caches length bounds against one rule set.
pub struct LengthAnalyzer<'a> {
    rules: &'a RuleSet,
    max_cache: HashMap<(String, NegationMode), LenBound>,
    min_cache: HashMap<String, usize>,
    visiting: HashSet<String>,
}

impl<'a> LengthAnalyzer<'a> {
    pub fn new(rules: &'a RuleSet) -> Self {
        LengthAnalyzer {
            rules,
            max_cache: HashMap::new(),
            min_cache: HashMap::new(),
            visiting: HashSet::new(),
        }
    }

    /// Most characters `node` can consume, under the given negation
    /// mode. `Unbounded` when no finite bound exists.
    pub fn max_len(&mut self, node: &GrammarNode, mode: NegationMode) -> LenBound {
        use GrammarNode::*;
        match node {
            Char(_) | CharRange { .. } | CharSet(_) | Predicate(_) => LenBound::Finite(1),
            StringLiteral(text) => LenBound::Finite(text.chars().count()),
            Eof => LenBound::Finite(0),
            Sequence(children) => children
                .iter()
                .fold(LenBound::Finite(0), |acc, child| {
                    acc.add(self.max_len(child, mode))
                }),
            Alternation(children) => children
                .iter()
                .map(|child| self.max_len(child, mode))
                .max()
                .unwrap_or(LenBound::Finite(0)),
            Repetition {
                inner, min, max, lazy,
            } => {
                let per_iteration = self.max_len(inner, mode);
                let count = if *lazy { Some(*min) } else { *max };
                match count {
                    Some(n) => per_iteration.scale(n as usize),
                    // Unbounded count still consumes nothing when the
                    // body is zero-width.
                    None if per_iteration == LenBound::Finite(0) => LenBound::Finite(0),
                    None => LenBound::Unbounded,
                }
            }
            Optional(inner) => self.max_len(inner, mode),
            Negation(inner) => match mode {
                NegationMode::SingleChar => LenBound::Finite(1),
                NegationMode::MaxLength => match self.max_len(inner, mode) {
                    LenBound::Finite(n) => LenBound::Finite(n.max(1)),
                    LenBound::Unbounded => LenBound::Unbounded,
                },
            },
            Ignore(inner) | Join(inner) => self.max_len(inner, mode),
            Marker { inner, .. } | NamedCapture { inner, .. } => self.max_len(inner, mode),
            RuleReference(name) => self.rule_max(name, mode),
            NamedBackreference(_) => LenBound::Unbounded,
        }
    }

    /// Fewest characters `node` consumes when it matches.
    pub fn min_len(&mut self, node: &GrammarNode) -> usize {
        use GrammarNode::*;
        match node {
            Char(_) | CharRange { .. } | CharSet(_) | Predicate(_) => 1,
            StringLiteral(text) => text.chars().count(),
            Eof => 0,
            Sequence(children) => children
                .iter()
                .map(|child| self.min_len(child))
                .fold(0usize, usize::saturating_add),
            Alternation(children) => children
                .iter()
                .map(|child| self.min_len(child))
                .min()
                .unwrap_or(0),
            Repetition { inner, min, .. } => {
                self.min_len(inner).saturating_mul(*min as usize)
            }
            Optional(_) => 0,
            // Both modes consume at least one character.
            Negation(_) => 1,
            Ignore(inner) | Join(inner) => self.min_len(inner),
            Marker { inner, .. } | NamedCapture { inner, .. } => self.min_len(inner),
            RuleReference(name) => self.rule_min(name),
            NamedBackreference(_) => 0,
        }
    }

    fn rule_max(&mut self, name: &str, mode: NegationMode) -> LenBound {
        let key = (name.to_string(), mode);
        if let Some(cached) = self.max_cache.get(&key) {
            return *cached;
        }
        if self.visiting.contains(name) {
            return LenBound::Unbounded;
        }
        let rules = self.rules;
        let bound = match rules.body(name) {
            Some(body) => {
                self.visiting.insert(name.to_string());
                let bound = self.max_len(body, mode);
                self.visiting.remove(name);
                bound
            }
            None => LenBound::Unbounded,
        };
        self.max_cache.insert(key, bound);
        bound
    }

    fn rule_min(&mut self, name: &str) -> usize {
        if let Some(cached) = self.min_cache.get(name) {
            return *cached;
        }
        if self.visiting.contains(name) {
            return 0;
        }
        let rules = self.rules;
        let bound = match rules.body(name) {
            Some(body) => {
                self.visiting.insert(name.to_string());
                let bound = self.min_len(body);
                self.visiting.remove(name);
                bound
            }
            None => 0,
        };
        self.min_cache.insert(name.to_string(), bound);
        bound
    }
}

//! Tree rewriting passes over grammar nodes.
//!
//! Every pass preserves match semantics: the rewritten tree succeeds
//! and fails on exactly the same inputs, consuming the same lengths.
//! Capture text is preserved too, except that double-negation
//! elimination keeps a capture-discarding inner discarded, where the
//! stacked negations would have re-emitted the consumed character.
//! Passes are independently
//! switchable through [`OptimizerOptions`]; the driver reapplies the
//! enabled set until the tree stops changing.

use crate::node::GrammarNode;
use crate::registry::RuleSet;

mod classes;
mod shape;


/// Which rewriting passes run. All of them, by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizerOptions {
    /// Splice nested sequences and alternations into their parent and
    /// unwrap single-child wrappers.
    pub flatten: bool,
    /// Fold adjacent literal runs in a sequence into one string.
    pub stringify: bool,
    /// Merge the characters of an alternation into contiguous ranges.
    pub rangify: bool,
    /// Merge intersecting ranges in an alternation.
    pub join_ranges: bool,
    /// Drop single characters an alternation range already covers.
    pub drop_subsumed: bool,
    /// Collapse remaining single characters of an alternation into
    /// one character set.
    pub fuse_char_sets: bool,
    /// Remove structurally equal alternation branches, keeping the
    /// first.
    pub dedup: bool,
    /// Rewrite `!!x` to `join(x)` when `x` always consumes exactly
    /// one character.
    pub collapse_double_negation: bool,
    /// Fold an optional repetition with a minimum below two into a
    /// zero-minimum repetition.
    pub fuse_optional_repetition: bool,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        OptimizerOptions {
            flatten: true,
            stringify: true,
            rangify: true,
            join_ranges: true,
            drop_subsumed: true,
            fuse_char_sets: true,
            dedup: true,
            collapse_double_negation: true,
            fuse_optional_repetition: true,
        }
    }
}

impl OptimizerOptions {
    /// Every pass disabled. Enable passes selectively from here.
    pub fn none() -> Self {
        OptimizerOptions {
            flatten: false,
            stringify: false,
            rangify: false,
            join_ranges: false,
            drop_subsumed: false,
            fuse_char_sets: false,
            dedup: false,
            collapse_double_negation: false,
            fuse_optional_repetition: false,
        }
    }

    pub fn flatten(mut self, on: bool) -> Self {
        self.flatten = on;
        self
    }

    pub fn stringify(mut self, on: bool) -> Self {
        self.stringify = on;
        self
    }

    pub fn rangify(mut self, on: bool) -> Self {
        self.rangify = on;
        self
    }

    pub fn join_ranges(mut self, on: bool) -> Self {
        self.join_ranges = on;
        self
    }

    pub fn drop_subsumed(mut self, on: bool) -> Self {
        self.drop_subsumed = on;
        self
    }

    pub fn fuse_char_sets(mut self, on: bool) -> Self {
        self.fuse_char_sets = on;
        self
    }

    pub fn dedup(mut self, on: bool) -> Self {
        self.dedup = on;
        self
    }

    pub fn collapse_double_negation(mut self, on: bool) -> Self {
        self.collapse_double_negation = on;
        self
    }

    pub fn fuse_optional_repetition(mut self, on: bool) -> Self {
        self.fuse_optional_repetition = on;
        self
    }
}

/// Cap on driver iterations. Passes converge in a handful of rounds;
/// the cap only guards against a rewrite cycle slipping in.
const FIXED_POINT_LIMIT: usize = 64;

/// Rewrite one node tree with the enabled passes until it stabilizes.
pub fn optimize_node(
    node: GrammarNode,
    rules: &RuleSet,
    options: &OptimizerOptions,
) -> GrammarNode {
    let mut current = node;
    for _ in 0..FIXED_POINT_LIMIT {
        let next = apply_once(current.clone(), rules, options);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Rewrite every bound rule body in the set.
///
/// Each rule is taken out of the set while its body is rewritten, so
/// a self-referential rule sees itself as unbound and length-driven
/// passes treat the reference conservatively.
pub(crate) fn optimize_rules(rules: &mut RuleSet, options: &OptimizerOptions) {
    let names: Vec<String> = rules.names().map(str::to_string).collect();
    for name in names {
        let Some(def) = rules.take_def(&name) else {
            continue;
        };
        let def = def.map_body(|body| optimize_node(body, rules, options));
        rules.put_def(&name, def);
    }
}

fn apply_once(
    node: GrammarNode,
    rules: &RuleSet,
    options: &OptimizerOptions,
) -> GrammarNode {
    let mut node = node;
    if options.flatten {
        node = shape::flatten(node);
    }
    if options.stringify {
        node = shape::stringify(node);
    }
    if options.rangify {
        node = classes::rangify(node);
    }
    if options.join_ranges {
        node = classes::join_ranges(node);
    }
    if options.drop_subsumed {
        node = classes::drop_subsumed(node);
    }
    if options.fuse_char_sets {
        node = classes::fuse_char_sets(node);
    }
    if options.dedup {
        node = classes::dedup(node);
    }
    if options.collapse_double_negation {
        node = shape::collapse_double_negation(node, rules);
    }
    if options.fuse_optional_repetition {
        node = shape::fuse_optional_repetition(node);
    }
    node
}

/// Rebuild `node` bottom-up, applying `f` to every node after its
/// children have been rewritten.
pub(crate) fn rewrite<F>(node: GrammarNode, f: &mut F) -> GrammarNode
where
    F: FnMut(GrammarNode) -> GrammarNode,
{
    use GrammarNode::*;
    let node = match node {
        Sequence(children) => {
            Sequence(children.into_iter().map(|c| rewrite(c, f)).collect())
        }
        Alternation(children) => {
            Alternation(children.into_iter().map(|c| rewrite(c, f)).collect())
        }
        Repetition {
            inner,
            min,
            max,
            lazy,
        } => Repetition {
            inner: Box::new(rewrite(*inner, f)),
            min,
            max,
            lazy,
        },
        Optional(inner) => Optional(Box::new(rewrite(*inner, f))),
        Negation(inner) => Negation(Box::new(rewrite(*inner, f))),
        Ignore(inner) => Ignore(Box::new(rewrite(*inner, f))),
        Join(inner) => Join(Box::new(rewrite(*inner, f))),
        Marker { name, inner } => Marker {
            name,
            inner: Box::new(rewrite(*inner, f)),
        },
        NamedCapture { name, inner } => NamedCapture {
            name,
            inner: Box::new(rewrite(*inner, f)),
        },
        leaf => leaf,
    };
    f(node)
}

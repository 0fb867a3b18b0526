//! Structural passes: flattening, literal folding, and the wrapper
//! rewrites around negation and repetition.

use crate::length::{LenBound, LengthAnalyzer, NegationMode};
use crate::node::GrammarNode;
use crate::registry::RuleSet;

use super::rewrite;

/// Splice nested sequences and alternations into their parent, and
/// unwrap wrappers left with a single child.
pub(crate) fn flatten(node: GrammarNode) -> GrammarNode {
    rewrite(node, &mut |node| match node {
        GrammarNode::Sequence(children) => {
            let mut flat = Vec::with_capacity(children.len());
            for child in children {
                match child {
                    GrammarNode::Sequence(nested) => flat.extend(nested),
                    other => flat.push(other),
                }
            }
            unwrap_single(GrammarNode::Sequence(flat))
        }
        GrammarNode::Alternation(children) => {
            let mut flat = Vec::with_capacity(children.len());
            for child in children {
                match child {
                    GrammarNode::Alternation(nested) => flat.extend(nested),
                    other => flat.push(other),
                }
            }
            unwrap_single(GrammarNode::Alternation(flat))
        }
        other => other,
    })
}

fn unwrap_single(node: GrammarNode) -> GrammarNode {
    match node {
        GrammarNode::Sequence(mut children) | GrammarNode::Alternation(mut children)
            if children.len() == 1 =>
        {
            match children.pop() {
                Some(only) => only,
                None => GrammarNode::Sequence(Vec::new()),
            }
        }
        other => other,
    }
}

/// Fold runs of two or more adjacent character and string literals in
/// a sequence into one string literal. A lone literal keeps its form.
pub(crate) fn stringify(node: GrammarNode) -> GrammarNode {
    rewrite(node, &mut |node| match node {
        GrammarNode::Sequence(children) => GrammarNode::Sequence(fold_literal_runs(children)),
        other => other,
    })
}

fn fold_literal_runs(children: Vec<GrammarNode>) -> Vec<GrammarNode> {
    fn flush(
        out: &mut Vec<GrammarNode>,
        run_text: &mut String,
        run_len: &mut usize,
        run_single: &mut Option<GrammarNode>,
    ) {
        match *run_len {
            0 => {}
            1 => {
                if let Some(single) = run_single.take() {
                    out.push(single);
                }
            }
            _ => out.push(GrammarNode::StringLiteral(std::mem::take(run_text))),
        }
        run_text.clear();
        *run_len = 0;
        *run_single = None;
    }

    let mut out = Vec::with_capacity(children.len());
    let mut run_text = String::new();
    let mut run_len = 0usize;
    let mut run_single: Option<GrammarNode> = None;

    for child in children {
        match child {
            GrammarNode::Char(c) => {
                run_text.push(c);
                run_len += 1;
                run_single = if run_len == 1 {
                    Some(GrammarNode::Char(c))
                } else {
                    None
                };
            }
            GrammarNode::StringLiteral(text) => {
                run_text.push_str(&text);
                run_len += 1;
                run_single = if run_len == 1 {
                    Some(GrammarNode::StringLiteral(text))
                } else {
                    None
                };
            }
            other => {
                flush(&mut out, &mut run_text, &mut run_len, &mut run_single);
                out.push(other);
            }
        }
    }
    flush(&mut out, &mut run_text, &mut run_len, &mut run_single);
    out
}

/// Rewrite `!!x` to `join(x)` when `x` consumes exactly one character
/// on every match, in either negation mode.
///
/// A single-width `x` keeps status and consumed length identical: the
/// outer negation consumes one raw character exactly where `x` matched
/// one. Capture text moves from the raw consumed character to `x`'s
/// own output, so an `x` that discards its capture stays discarded.
pub(crate) fn collapse_double_negation(node: GrammarNode, rules: &RuleSet) -> GrammarNode {
    let mut lengths = LengthAnalyzer::new(rules);
    rewrite(node, &mut |node| match node {
        GrammarNode::Negation(outer) => match *outer {
            GrammarNode::Negation(inner) if always_single_width(&inner, &mut lengths) => {
                GrammarNode::Join(inner)
            }
            other => GrammarNode::Negation(Box::new(other)),
        },
        other => other,
    })
}

fn always_single_width(node: &GrammarNode, lengths: &mut LengthAnalyzer<'_>) -> bool {
    lengths.min_len(node) == 1
        && lengths.max_len(node, NegationMode::SingleChar) == LenBound::Finite(1)
        && lengths.max_len(node, NegationMode::MaxLength) == LenBound::Finite(1)
}

/// Fold `(x{s,e})?` into `x{0,e}` when `s < 2`.
///
/// With a minimum of zero or one, the optional adds nothing the
/// zero-minimum repetition cannot already do. Minimums of two or more
/// change the reachable counts, and lazy repetitions settle for their
/// minimum, so both keep the wrapper.
pub(crate) fn fuse_optional_repetition(node: GrammarNode) -> GrammarNode {
    rewrite(node, &mut |node| match node {
        GrammarNode::Optional(inner) => match *inner {
            GrammarNode::Repetition {
                inner,
                min,
                max,
                lazy: false,
            } if min < 2 => GrammarNode::Repetition {
                inner,
                min: 0,
                max,
                lazy: false,
            },
            other => GrammarNode::Optional(Box::new(other)),
        },
        other => other,
    })
}

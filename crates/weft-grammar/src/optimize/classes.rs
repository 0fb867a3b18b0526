//! Character-class passes over alternation members.
//!
//! These passes regroup runs of adjacent single-character alternatives
//! of an alternation. Within such a run the members are
//! interchangeable: each consumes exactly one character and emits it,
//! so regrouping cannot change what the run accepts or produces. Any
//! other member ends the run — ordered choice pins it in place, and a
//! character alternative hoisted across it could shadow a longer match
//! the earlier member would have won.

use crate::node::GrammarNode;

use super::rewrite;

fn char_shaped(node: &GrammarNode) -> bool {
    matches!(
        node,
        GrammarNode::Char(_) | GrammarNode::CharSet(_) | GrammarNode::CharRange { .. }
    )
}

/// Feed each maximal run of adjacent character-shaped members through
/// `merge`, keeping every other member where it stands.
fn each_char_run(
    children: Vec<GrammarNode>,
    merge: impl Fn(Vec<GrammarNode>) -> Vec<GrammarNode>,
) -> Vec<GrammarNode> {
    let mut out = Vec::with_capacity(children.len());
    let mut run: Vec<GrammarNode> = Vec::new();
    for child in children {
        if char_shaped(&child) {
            run.push(child);
        } else {
            if !run.is_empty() {
                out.extend(merge(std::mem::take(&mut run)));
            }
            out.push(child);
        }
    }
    if !run.is_empty() {
        out.extend(merge(run));
    }
    out
}

/// Merge the single characters and character sets of each run into
/// contiguous ranges. Leftover singletons stay single characters.
pub(crate) fn rangify(node: GrammarNode) -> GrammarNode {
    rewrite(node, &mut |node| match node {
        GrammarNode::Alternation(children) => {
            GrammarNode::Alternation(each_char_run(children, rangify_members))
        }
        other => other,
    })
}

fn rangify_members(children: Vec<GrammarNode>) -> Vec<GrammarNode> {
    let atoms = children
        .iter()
        .filter(|c| matches!(c, GrammarNode::Char(_) | GrammarNode::CharSet(_)))
        .count();
    if atoms < 2 {
        return children;
    }

    let mut out = Vec::with_capacity(children.len());
    let mut chars: Vec<char> = Vec::new();
    let mut insert_at: Option<usize> = None;
    for child in children {
        match child {
            GrammarNode::Char(c) => {
                insert_at.get_or_insert(out.len());
                chars.push(c);
            }
            GrammarNode::CharSet(set) => {
                insert_at.get_or_insert(out.len());
                chars.extend(set.iter().copied());
            }
            other => out.push(other),
        }
    }
    chars.sort_unstable();
    chars.dedup();

    let at = insert_at.unwrap_or(0);
    out.splice(at..at, consecutive_runs(&chars));
    out
}

/// Group sorted characters into nodes: runs of consecutive code
/// points become ranges, singletons stay characters.
fn consecutive_runs(sorted: &[char]) -> Vec<GrammarNode> {
    let mut nodes = Vec::new();
    let mut iter = sorted.iter().copied();
    let Some(mut start) = iter.next() else {
        return nodes;
    };
    let mut end = start;
    for c in iter {
        if c as u32 == end as u32 + 1 {
            end = c;
            continue;
        }
        nodes.push(run_node(start, end));
        start = c;
        end = c;
    }
    nodes.push(run_node(start, end));
    nodes
}

fn run_node(start: char, end: char) -> GrammarNode {
    if start == end {
        GrammarNode::Char(start)
    } else {
        GrammarNode::CharRange { start, end }
    }
}

/// Merge intersecting character ranges within each run.
pub(crate) fn join_ranges(node: GrammarNode) -> GrammarNode {
    rewrite(node, &mut |node| match node {
        GrammarNode::Alternation(children) => {
            GrammarNode::Alternation(each_char_run(children, join_range_members))
        }
        other => other,
    })
}

fn join_range_members(children: Vec<GrammarNode>) -> Vec<GrammarNode> {
    let range_count = children
        .iter()
        .filter(|c| matches!(c, GrammarNode::CharRange { .. }))
        .count();
    if range_count < 2 {
        return children;
    }

    let mut out = Vec::with_capacity(children.len());
    let mut ranges: Vec<(char, char)> = Vec::new();
    let mut insert_at: Option<usize> = None;
    for child in children {
        match child {
            GrammarNode::CharRange { start, end } => {
                insert_at.get_or_insert(out.len());
                ranges.push((start, end));
            }
            other => out.push(other),
        }
    }
    ranges.sort_unstable();

    let mut merged: Vec<(char, char)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some((_, last_end)) if start <= *last_end => {
                if end > *last_end {
                    *last_end = end;
                }
            }
            _ => merged.push((start, end)),
        }
    }

    let at = insert_at.unwrap_or(0);
    out.splice(
        at..at,
        merged
            .into_iter()
            .map(|(start, end)| GrammarNode::CharRange { start, end }),
    );
    out
}

/// Remove single-character alternatives a range in the same run
/// already covers.
pub(crate) fn drop_subsumed(node: GrammarNode) -> GrammarNode {
    rewrite(node, &mut |node| match node {
        GrammarNode::Alternation(children) => {
            GrammarNode::Alternation(each_char_run(children, drop_subsumed_members))
        }
        other => other,
    })
}

fn drop_subsumed_members(children: Vec<GrammarNode>) -> Vec<GrammarNode> {
    let ranges: Vec<(char, char)> = children
        .iter()
        .filter_map(|c| match c {
            GrammarNode::CharRange { start, end } => Some((*start, *end)),
            _ => None,
        })
        .collect();
    if ranges.is_empty() {
        return children;
    }

    children
        .into_iter()
        .filter(|child| match child {
            GrammarNode::Char(c) => !ranges.iter().any(|&(start, end)| (start..=end).contains(c)),
            _ => true,
        })
        .collect()
}

/// Collapse the remaining single characters of each run into one
/// character set.
pub(crate) fn fuse_char_sets(node: GrammarNode) -> GrammarNode {
    rewrite(node, &mut |node| match node {
        GrammarNode::Alternation(children) => {
            GrammarNode::Alternation(each_char_run(children, fuse_members))
        }
        other => other,
    })
}

fn fuse_members(children: Vec<GrammarNode>) -> Vec<GrammarNode> {
    let singles = children
        .iter()
        .filter(|c| matches!(c, GrammarNode::Char(_)))
        .count();
    if singles < 2 {
        return children;
    }

    let mut out = Vec::with_capacity(children.len());
    let mut chars: Vec<char> = Vec::new();
    let mut insert_at: Option<usize> = None;
    for child in children {
        match child {
            GrammarNode::Char(c) => {
                insert_at.get_or_insert(out.len());
                chars.push(c);
            }
            other => out.push(other),
        }
    }
    chars.sort_unstable();
    chars.dedup();

    let at = insert_at.unwrap_or(0);
    out.insert(at, GrammarNode::CharSet(chars.into_boxed_slice()));
    out
}

/// Remove structurally equal alternation branches, keeping the first
/// occurrence. Order-insensitive equality applies, so nested
/// alternations that differ only in branch order also deduplicate.
pub(crate) fn dedup(node: GrammarNode) -> GrammarNode {
    rewrite(node, &mut |node| match node {
        GrammarNode::Alternation(children) => {
            let mut unique: Vec<GrammarNode> = Vec::with_capacity(children.len());
            for child in children {
                if !unique.contains(&child) {
                    unique.push(child);
                }
            }
            GrammarNode::Alternation(unique)
        }
        other => other,
    })
}

//! The grammar node model and its combinator algebra.
//!
//! Nodes are immutable: every combinator consumes its receiver and
//! returns a new tree. Construction already normalizes the easy cases
//! (nested sequences and alternations splice into their parent,
//! `optional` is idempotent, compatible repetition bounds compose) so
//! downstream code sees shallow, predictable shapes.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use weft_core::CharPredicate;

/// One node of a grammar tree.
///
/// Terminals consume input directly; the composite variants combine
/// child matchers. Equality is structural, except that [`Alternation`]
/// compares its children as a multiset: `a | b` equals `b | a`.
///
/// [`Alternation`]: GrammarNode::Alternation
#[derive(Debug, Clone)]
pub enum GrammarNode {
    /// Exactly one character.
    Char(char),
    /// One character within an inclusive range.
    CharRange { start: char, end: char },
    /// One character out of a sorted, deduplicated set.
    CharSet(Box<[char]>),
    /// A literal run of characters.
    StringLiteral(String),
    /// One character accepted by a named classifier function.
    Predicate(PredicateNode),
    /// The end of input. Consumes nothing.
    Eof,
    /// All children in order. Failure rewinds to the sequence start.
    Sequence(Vec<GrammarNode>),
    /// The first child that matches, tried in order.
    Alternation(Vec<GrammarNode>),
    /// The inner matcher repeated between `min` and `max` times.
    /// `max: None` means unbounded. A lazy repetition settles for the
    /// minimum instead of consuming greedily.
    Repetition {
        inner: Box<GrammarNode>,
        min: u32,
        max: Option<u32>,
        lazy: bool,
    },
    /// The inner matcher, or the empty match if it fails.
    Optional(Box<GrammarNode>),
    /// Succeeds when the inner matcher fails, consuming input the
    /// inner matcher could not match. See `NegationMode` for how much.
    Negation(Box<GrammarNode>),
    /// Matches the inner matcher but discards its captured output.
    Ignore(Box<GrammarNode>),
    /// Matches the inner matcher and flattens its output to one text.
    Join(Box<GrammarNode>),
    /// Matches the inner matcher and wraps its output in a named
    /// marker node.
    Marker { name: String, inner: Box<GrammarNode> },
    /// Matches the named rule from the enclosing rule set.
    RuleReference(String),
    /// Matches the inner matcher and stores its text under `name` in
    /// the invocation's capture memory.
    NamedCapture { name: String, inner: Box<GrammarNode> },
    /// Matches the text most recently stored under `name`.
    NamedBackreference(String),
}

/// A named character classifier.
///
/// Predicates compare and hash by name alone: the function itself has
/// no usable identity. Two predicates with the same name are the same
/// matcher as far as the grammar algebra is concerned.
#[derive(Clone)]
pub struct PredicateNode {
    pub name: String,
    pub test: CharPredicate,
}

impl PredicateNode {
    pub fn accepts(&self, c: char) -> bool {
        (self.test)(c)
    }
}

impl fmt::Debug for PredicateNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateNode")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for PredicateNode {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for PredicateNode {}

// ============================================================================
// Construction
// ============================================================================

/// A single-character terminal.
pub fn ch(c: char) -> GrammarNode {
    GrammarNode::Char(c)
}

/// An inclusive character range.
///
/// # Panics
///
/// Panics when `start > end`.
pub fn char_range(start: char, end: char) -> GrammarNode {
    assert!(
        start <= end,
        "char range start {start:?} exceeds end {end:?}"
    );
    GrammarNode::CharRange { start, end }
}

/// A terminal matching any one character of `alternatives`.
///
/// # Panics
///
/// Panics when `alternatives` is empty.
pub fn one_of(alternatives: &str) -> GrammarNode {
    let mut chars: Vec<char> = alternatives.chars().collect();
    assert!(!chars.is_empty(), "character set must not be empty");
    chars.sort_unstable();
    chars.dedup();
    GrammarNode::CharSet(chars.into_boxed_slice())
}

/// A literal string terminal. The empty string matches trivially.
pub fn lit(text: &str) -> GrammarNode {
    GrammarNode::StringLiteral(text.to_string())
}

/// A predicate terminal accepting any character `test` approves.
pub fn pred(
    name: &str,
    test: impl Fn(char) -> bool + Send + Sync + 'static,
) -> GrammarNode {
    GrammarNode::Predicate(PredicateNode {
        name: name.to_string(),
        test: std::sync::Arc::new(test),
    })
}

/// The end-of-input terminal.
pub fn eof() -> GrammarNode {
    GrammarNode::Eof
}

/// A reference to a named rule, resolved at match time.
pub fn rule(name: &str) -> GrammarNode {
    GrammarNode::RuleReference(name.to_string())
}

/// A backreference to a named capture.
pub fn backref(name: &str) -> GrammarNode {
    GrammarNode::NamedBackreference(name.to_string())
}

// ============================================================================
// Combinators
// ============================================================================

impl GrammarNode {
    /// Sequence: this matcher followed by `next`.
    ///
    /// Sequences splice: `a.then(b).then(c)` is one three-child
    /// sequence, not a nested pair.
    pub fn then(self, next: GrammarNode) -> GrammarNode {
        let mut children = match self {
            GrammarNode::Sequence(children) => children,
            other => vec![other],
        };
        match next {
            GrammarNode::Sequence(mut tail) => children.append(&mut tail),
            other => children.push(other),
        }
        GrammarNode::Sequence(children)
    }

    /// Ordered choice: this matcher, or `alternative` if it fails.
    ///
    /// Alternations splice like sequences do.
    pub fn or(self, alternative: GrammarNode) -> GrammarNode {
        let mut children = match self {
            GrammarNode::Alternation(children) => children,
            other => vec![other],
        };
        match alternative {
            GrammarNode::Alternation(mut tail) => children.append(&mut tail),
            other => children.push(other),
        }
        GrammarNode::Alternation(children)
    }

    /// Greedy repetition between `min` and `max` matches.
    ///
    /// Repeating a greedy repetition composes the bounds when the
    /// combined count range has no gaps; otherwise the repetitions
    /// nest.
    ///
    /// # Panics
    ///
    /// Panics when `min > max`.
    pub fn repeat(self, min: u32, max: u32) -> GrammarNode {
        assert!(min <= max, "repetition minimum {min} exceeds maximum {max}");
        make_repetition(self, min, Some(max), false)
    }

    /// Greedy repetition with no upper bound.
    pub fn at_least(self, min: u32) -> GrammarNode {
        make_repetition(self, min, None, false)
    }

    /// Greedy repetition, zero or more times.
    pub fn zero_or_more(self) -> GrammarNode {
        self.at_least(0)
    }

    /// Greedy repetition, one or more times.
    pub fn one_or_more(self) -> GrammarNode {
        self.at_least(1)
    }

    /// Lazy repetition: settles for exactly `min` matches.
    ///
    /// # Panics
    ///
    /// Panics when `min > max`.
    pub fn repeat_lazy(self, min: u32, max: u32) -> GrammarNode {
        assert!(min <= max, "repetition minimum {min} exceeds maximum {max}");
        make_repetition(self, min, Some(max), true)
    }

    /// Lazy unbounded repetition.
    pub fn at_least_lazy(self, min: u32) -> GrammarNode {
        make_repetition(self, min, None, true)
    }

    /// This matcher, or the empty match if it fails. Idempotent:
    /// `x.optional().optional()` is `x.optional()`.
    pub fn optional(self) -> GrammarNode {
        match self {
            already @ GrammarNode::Optional(_) => already,
            other => GrammarNode::Optional(Box::new(other)),
        }
    }

    /// Negation: succeeds when this matcher fails.
    pub fn negate(self) -> GrammarNode {
        GrammarNode::Negation(Box::new(self))
    }

    /// Match but discard the captured output.
    pub fn ignore(self) -> GrammarNode {
        GrammarNode::Ignore(Box::new(self))
    }

    /// Match and flatten the captured output into one text item.
    pub fn join(self) -> GrammarNode {
        GrammarNode::Join(Box::new(self))
    }

    /// Match and wrap the captured output in a marker node.
    pub fn mark(self, name: &str) -> GrammarNode {
        GrammarNode::Marker {
            name: name.to_string(),
            inner: Box::new(self),
        }
    }

    /// Match and store the captured text under `name` for later
    /// backreferences.
    pub fn capture(self, name: &str) -> GrammarNode {
        GrammarNode::NamedCapture {
            name: name.to_string(),
            inner: Box::new(self),
        }
    }
}

fn make_repetition(
    inner: GrammarNode,
    min: u32,
    max: Option<u32>,
    lazy: bool,
) -> GrammarNode {
    match inner {
        GrammarNode::Repetition {
            inner: nested,
            min: nested_min,
            max: nested_max,
            lazy: false,
        } if !lazy => match merge_repeat_bounds(nested_min, nested_max, min, max) {
            Some((merged_min, merged_max)) => GrammarNode::Repetition {
                inner: nested,
                min: merged_min,
                max: merged_max,
                lazy: false,
            },
            None => GrammarNode::Repetition {
                inner: Box::new(GrammarNode::Repetition {
                    inner: nested,
                    min: nested_min,
                    max: nested_max,
                    lazy: false,
                }),
                min,
                max,
                lazy,
            },
        },
        other => GrammarNode::Repetition {
            inner: Box::new(other),
            min,
            max,
            lazy,
        },
    }
}

/// Bounds for `x{a,b}` repeated `{c,d}` times, when the composition
/// collapses to a single repetition.
///
/// The total match count for `j` outer iterations spans `[j*a, j*b]`.
/// The union over `j` in `[c, d]` is the contiguous range `[a*c, b*d]`
/// only when consecutive spans touch: `(j+1)*a <= j*b + 1` for every
/// `j` below `d`, which is worst at `j = c`. An exact outer count
/// (`c == d`) always collapses.
fn merge_repeat_bounds(
    a: u32,
    b: Option<u32>,
    c: u32,
    d: Option<u32>,
) -> Option<(u32, Option<u32>)> {
    let lo = a.checked_mul(c)?;
    let hi = match (b, d) {
        (Some(b), Some(d)) => Some(b.checked_mul(d)?),
        _ => None,
    };
    if d == Some(c) {
        return Some((lo, hi));
    }
    let tiles = match b {
        None => c > 0 || a <= 1,
        Some(b) => (c as u64 + 1) * a as u64 <= c as u64 * b as u64 + 1,
    };
    tiles.then_some((lo, hi))
}

// ============================================================================
// Structural equality and hashing
// ============================================================================

impl PartialEq for GrammarNode {
    fn eq(&self, other: &Self) -> bool {
        use GrammarNode::*;
        match (self, other) {
            (Char(a), Char(b)) => a == b,
            (
                CharRange { start: a1, end: a2 },
                CharRange { start: b1, end: b2 },
            ) => a1 == b1 && a2 == b2,
            (CharSet(a), CharSet(b)) => a == b,
            (StringLiteral(a), StringLiteral(b)) => a == b,
            (Predicate(a), Predicate(b)) => a == b,
            (Eof, Eof) => true,
            (Sequence(a), Sequence(b)) => a == b,
            (Alternation(a), Alternation(b)) => multiset_eq(a, b),
            (
                Repetition {
                    inner: a,
                    min: a_min,
                    max: a_max,
                    lazy: a_lazy,
                },
                Repetition {
                    inner: b,
                    min: b_min,
                    max: b_max,
                    lazy: b_lazy,
                },
            ) => a_min == b_min && a_max == b_max && a_lazy == b_lazy && a == b,
            (Optional(a), Optional(b)) => a == b,
            (Negation(a), Negation(b)) => a == b,
            (Ignore(a), Ignore(b)) => a == b,
            (Join(a), Join(b)) => a == b,
            (
                Marker { name: a_name, inner: a },
                Marker { name: b_name, inner: b },
            ) => a_name == b_name && a == b,
            (RuleReference(a), RuleReference(b)) => a == b,
            (
                NamedCapture { name: a_name, inner: a },
                NamedCapture { name: b_name, inner: b },
            ) => a_name == b_name && a == b,
            (NamedBackreference(a), NamedBackreference(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for GrammarNode {}

/// Order-insensitive comparison with multiplicity. Equality is an
/// equivalence relation, so greedy bipartite matching is exact here.
fn multiset_eq(a: &[GrammarNode], b: &[GrammarNode]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut claimed = vec![false; b.len()];
    'next: for item in a {
        for (i, candidate) in b.iter().enumerate() {
            if !claimed[i] && item == candidate {
                claimed[i] = true;
                continue 'next;
            }
        }
        return false;
    }
    true
}

impl Hash for GrammarNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        use GrammarNode::*;
        match self {
            Char(c) => {
                state.write_u8(0);
                c.hash(state);
            }
            CharRange { start, end } => {
                state.write_u8(1);
                start.hash(state);
                end.hash(state);
            }
            CharSet(set) => {
                state.write_u8(2);
                set.hash(state);
            }
            StringLiteral(text) => {
                state.write_u8(3);
                text.hash(state);
            }
            Predicate(p) => {
                state.write_u8(4);
                p.name.hash(state);
            }
            Eof => state.write_u8(5),
            Sequence(children) => {
                state.write_u8(6);
                children.hash(state);
            }
            Alternation(children) => {
                // Commutative mix so a | b hashes like b | a.
                state.write_u8(7);
                state.write_usize(children.len());
                let mut mixed: u64 = 0;
                for child in children {
                    let mut h = DefaultHasher::new();
                    child.hash(&mut h);
                    mixed = mixed.wrapping_add(h.finish());
                }
                state.write_u64(mixed);
            }
            Repetition {
                inner,
                min,
                max,
                lazy,
            } => {
                state.write_u8(8);
                min.hash(state);
                max.hash(state);
                lazy.hash(state);
                inner.hash(state);
            }
            Optional(inner) => {
                state.write_u8(9);
                inner.hash(state);
            }
            Negation(inner) => {
                state.write_u8(10);
                inner.hash(state);
            }
            Ignore(inner) => {
                state.write_u8(11);
                inner.hash(state);
            }
            Join(inner) => {
                state.write_u8(12);
                inner.hash(state);
            }
            Marker { name, inner } => {
                state.write_u8(13);
                name.hash(state);
                inner.hash(state);
            }
            RuleReference(name) => {
                state.write_u8(14);
                name.hash(state);
            }
            NamedCapture { name, inner } => {
                state.write_u8(15);
                name.hash(state);
                inner.hash(state);
            }
            NamedBackreference(name) => {
                state.write_u8(16);
                name.hash(state);
            }
        }
    }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for GrammarNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use GrammarNode::*;
        match self {
            Char(c) => write!(f, "'{}'", c.escape_debug()),
            CharRange { start, end } => {
                write!(f, "'{}'..'{}'", start.escape_debug(), end.escape_debug())
            }
            CharSet(set) => {
                f.write_str("[")?;
                for c in set.iter() {
                    write!(f, "{}", c.escape_debug())?;
                }
                f.write_str("]")
            }
            StringLiteral(text) => write!(f, "{text:?}"),
            Predicate(p) => write!(f, "<{}>", p.name),
            Eof => f.write_str("end of input"),
            Sequence(children) => write_joined(f, children, " "),
            Alternation(children) => write_joined(f, children, " | "),
            Repetition {
                inner,
                min,
                max,
                lazy,
            } => {
                write!(f, "{inner}")?;
                match max {
                    Some(max) if min == max => write!(f, "{{{min}}}")?,
                    Some(max) => write!(f, "{{{min},{max}}}")?,
                    None => write!(f, "{{{min},}}")?,
                }
                if *lazy {
                    f.write_str("?")?;
                }
                Ok(())
            }
            Optional(inner) => write!(f, "{inner}?"),
            Negation(inner) => write!(f, "!{inner}"),
            Ignore(inner) => write!(f, "ignore({inner})"),
            Join(inner) => write!(f, "join({inner})"),
            Marker { name, inner } => write!(f, "mark({name}, {inner})"),
            RuleReference(name) => write!(f, "rule({name})"),
            NamedCapture { name, inner } => write!(f, "cap({name}, {inner})"),
            NamedBackreference(name) => write!(f, "backref({name})"),
        }
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    children: &[GrammarNode],
    separator: &str,
) -> fmt::Result {
    f.write_str("(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{child}")?;
    }
    f.write_str(")")
}

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::node::{GrammarNode, backref, ch, char_range, eof, lit, one_of, pred, rule};

fn hash_of(node: &GrammarNode) -> u64 {
    let mut hasher = DefaultHasher::new();
    node.hash(&mut hasher);
    hasher.finish()
}

#[test]
fn then_splices_sequences() {
    let node = ch('a').then(ch('b')).then(ch('c'));

    match node {
        GrammarNode::Sequence(children) => assert_eq!(children.len(), 3),
        other => panic!("expected a flat sequence, got {other:?}"),
    }
}

#[test]
fn then_splices_from_both_sides() {
    let left = ch('a').then(ch('b'));
    let right = ch('c').then(ch('d'));
    let node = left.then(right);

    match node {
        GrammarNode::Sequence(children) => assert_eq!(children.len(), 4),
        other => panic!("expected a flat sequence, got {other:?}"),
    }
}

#[test]
fn or_splices_alternations() {
    let node = ch('a').or(ch('b')).or(ch('c').or(ch('d')));

    match node {
        GrammarNode::Alternation(children) => assert_eq!(children.len(), 4),
        other => panic!("expected a flat alternation, got {other:?}"),
    }
}

#[test]
fn alternation_equality_ignores_order() {
    let forward = ch('a').or(ch('b')).or(ch('c'));
    let backward = ch('c').or(ch('b')).or(ch('a'));

    assert_eq!(forward, backward);
    assert_eq!(hash_of(&forward), hash_of(&backward));
}

#[test]
fn alternation_equality_respects_multiplicity() {
    let doubled = ch('a').or(ch('a')).or(ch('b'));
    let spread = ch('a').or(ch('b')).or(ch('b'));

    assert_ne!(doubled, spread);
}

#[test]
fn sequence_equality_respects_order() {
    assert_ne!(ch('a').then(ch('b')), ch('b').then(ch('a')));
}

#[test]
fn nested_alternation_equality_is_recursive() {
    let a = ch('x').or(ch('y')).then(ch('z'));
    let b = ch('y').or(ch('x')).then(ch('z'));

    assert_eq!(a, b);
    assert_eq!(hash_of(&a), hash_of(&b));
}

#[test]
fn predicates_compare_by_name() {
    let evens = pred("even", |c| (c as u32) % 2 == 0);
    let odds = pred("even", |c| (c as u32) % 2 == 1);
    let named_differently = pred("odd", |c| (c as u32) % 2 == 1);

    assert_eq!(evens, odds);
    assert_ne!(evens, named_differently);
}

#[test]
fn optional_is_idempotent() {
    let once = ch('a').optional();
    let twice = ch('a').optional().optional();

    assert_eq!(once, twice);
}

#[test]
fn repeat_composes_exact_outer_counts() {
    let node = ch('a').repeat(2, 3).repeat(2, 2);

    match node {
        GrammarNode::Repetition { min, max, lazy, .. } => {
            assert_eq!((min, max, lazy), (4, Some(6), false));
        }
        other => panic!("expected a collapsed repetition, got {other:?}"),
    }
}

#[test]
fn repeat_composes_when_count_spans_tile() {
    // j iterations of a{1,2} span [j, 2j]; spans for j in 2..=3 touch.
    let node = ch('a').repeat(1, 2).repeat(2, 3);

    match node {
        GrammarNode::Repetition { min, max, .. } => {
            assert_eq!((min, max), (2, Some(6)));
        }
        other => panic!("expected a collapsed repetition, got {other:?}"),
    }
}

#[test]
fn repeat_nests_when_count_spans_gap() {
    // a{2} under {1,2} matches 2 or 4 characters, never 3.
    let node = ch('a').repeat(2, 2).repeat(1, 2);

    match node {
        GrammarNode::Repetition { inner, min, max, .. } => {
            assert_eq!((min, max), (1, Some(2)));
            assert!(matches!(*inner, GrammarNode::Repetition { .. }));
        }
        other => panic!("expected a nested repetition, got {other:?}"),
    }
}

#[test]
fn repeat_composes_unbounded_inner() {
    let node = ch('a').at_least(2).repeat(1, 3);

    match node {
        GrammarNode::Repetition { min, max, .. } => {
            assert_eq!((min, max), (2, None));
        }
        other => panic!("expected a collapsed repetition, got {other:?}"),
    }
}

#[test]
fn repeat_nests_unbounded_inner_under_optional_count() {
    // a{2,} under {0,1} matches zero or at least two characters.
    let node = ch('a').at_least(2).repeat(0, 1);

    match node {
        GrammarNode::Repetition { inner, .. } => {
            assert!(matches!(*inner, GrammarNode::Repetition { .. }));
        }
        other => panic!("expected a nested repetition, got {other:?}"),
    }
}

#[test]
fn lazy_repetitions_never_compose() {
    let node = ch('a').repeat_lazy(1, 2).repeat(2, 2);

    match node {
        GrammarNode::Repetition { inner, .. } => {
            assert!(matches!(
                *inner,
                GrammarNode::Repetition { lazy: true, .. }
            ));
        }
        other => panic!("expected a nested repetition, got {other:?}"),
    }
}

#[test]
#[should_panic(expected = "exceeds maximum")]
fn repeat_rejects_inverted_bounds() {
    let _ = ch('a').repeat(3, 2);
}

#[test]
#[should_panic(expected = "exceeds end")]
fn char_range_rejects_inverted_bounds() {
    let _ = char_range('z', 'a');
}

#[test]
#[should_panic(expected = "must not be empty")]
fn one_of_rejects_empty_set() {
    let _ = one_of("");
}

#[test]
fn one_of_sorts_and_dedupes() {
    let node = one_of("cabba");

    match node {
        GrammarNode::CharSet(set) => assert_eq!(&*set, &['a', 'b', 'c']),
        other => panic!("expected a char set, got {other:?}"),
    }
}

#[test]
fn display_renders_grammar_notation() {
    assert_eq!(ch('a').to_string(), "'a'");
    assert_eq!(ch('\n').to_string(), "'\\n'");
    assert_eq!(char_range('0', '9').to_string(), "'0'..'9'");
    assert_eq!(one_of("abc").to_string(), "[abc]");
    assert_eq!(lit("let").to_string(), "\"let\"");
    assert_eq!(eof().to_string(), "end of input");
    assert_eq!(ch('a').then(ch('b')).to_string(), "('a' 'b')");
    assert_eq!(ch('a').or(ch('b')).to_string(), "('a' | 'b')");
    assert_eq!(ch('a').repeat(1, 3).to_string(), "'a'{1,3}");
    assert_eq!(ch('a').at_least(2).to_string(), "'a'{2,}");
    assert_eq!(ch('a').repeat_lazy(1, 3).to_string(), "'a'{1,3}?");
    assert_eq!(ch('a').optional().to_string(), "'a'?");
    assert_eq!(ch('a').negate().to_string(), "!'a'");
    assert_eq!(ch('a').ignore().to_string(), "ignore('a')");
    assert_eq!(ch('a').join().to_string(), "join('a')");
    assert_eq!(ch('a').mark("m").to_string(), "mark(m, 'a')");
    assert_eq!(rule("word").to_string(), "rule(word)");
    assert_eq!(ch('a').capture("x").to_string(), "cap(x, 'a')");
    assert_eq!(backref("x").to_string(), "backref(x)");
    assert_eq!(
        pred("digit", |c| c.is_ascii_digit()).to_string(),
        "<digit>"
    );
}

#[test]
fn clone_preserves_equality() {
    let node = lit("ab")
        .then(one_of("xyz").one_or_more())
        .or(char_range('0', '9').mark("digit"))
        .capture("head");

    assert_eq!(node.clone(), node);
    assert_eq!(hash_of(&node.clone()), hash_of(&node));
}

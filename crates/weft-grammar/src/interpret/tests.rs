use weft_core::{MatchError, MatchItem, MatchValue, Scanner};

use crate::interpret::{MatchOptions, match_node, match_rule, matches};
use crate::length::NegationMode;
use crate::node::{GrammarNode, backref, ch, char_range, eof, lit, one_of, pred, rule};
use crate::registry::{RuleDef, RuleSet};

fn no_rules() -> RuleSet {
    RuleSet::new()
}

fn run(node: &GrammarNode, input: &str) -> Result<MatchValue, MatchError> {
    let rules = no_rules();
    let mut scanner = Scanner::new(input);
    match_node(&rules, node, &mut scanner, &MatchOptions::default())
}

fn text_of(node: &GrammarNode, input: &str) -> String {
    match run(node, input) {
        Ok(value) => value.text,
        Err(err) => panic!("expected {node} to match {input:?}: {err}"),
    }
}

// ============================================================================
// Terminals
// ============================================================================

#[test]
fn char_matches_one_character() {
    assert_eq!(text_of(&ch('a'), "abc"), "a");
    assert!(run(&ch('a'), "b").is_err());
    assert!(run(&ch('a'), "").is_err());
}

#[test]
fn char_range_is_inclusive() {
    let digit = char_range('0', '9');
    assert_eq!(text_of(&digit, "0"), "0");
    assert_eq!(text_of(&digit, "9"), "9");
    assert!(run(&digit, "a").is_err());
}

#[test]
fn char_set_matches_membership() {
    let punct = one_of("+-*/");
    assert_eq!(text_of(&punct, "*"), "*");
    assert!(run(&punct, "%").is_err());
}

#[test]
fn literal_matches_exactly() {
    let kw = lit("let");
    assert_eq!(text_of(&kw, "letx"), "let");
    assert!(run(&kw, "le").is_err());
    assert!(run(&kw, "lft").is_err());
}

#[test]
fn empty_literal_matches_trivially() {
    let value = run(&lit(""), "abc").unwrap();
    assert_eq!(value.text, "");
    assert_eq!(value.span.len(), 0);
}

#[test]
fn predicate_consults_the_classifier() {
    let digit = pred("digit", |c| c.is_ascii_digit());
    assert_eq!(text_of(&digit, "7"), "7");
    assert!(run(&digit, "x").is_err());
}

#[test]
fn eof_only_matches_at_end() {
    assert!(run(&eof(), "").is_ok());
    assert!(run(&eof(), "a").is_err());

    let full = lit("ab").then(eof());
    assert_eq!(text_of(&full, "ab"), "ab");
    assert!(run(&full, "abc").is_err());
}

// ============================================================================
// Sequence and alternation
// ============================================================================

#[test]
fn sequence_matches_in_order() {
    let node = ch('a').then(ch('b')).then(ch('c'));
    assert_eq!(text_of(&node, "abc"), "abc");
}

#[test]
fn sequence_failure_rewinds_fully() {
    let rules = no_rules();
    let node = ch('a').then(ch('b')).then(ch('x'));
    let mut scanner = Scanner::new("abc");

    let err = match_node(&rules, &node, &mut scanner, &MatchOptions::default()).unwrap_err();
    assert!(err.is_recoverable());
    assert_eq!(scanner.offset(), 0, "failed sequence must rewind to its start");
}

#[test]
fn sequence_failure_reports_the_failing_child_as_cause() {
    let node = ch('a').then(ch('x'));
    let err = run(&node, "ab").unwrap_err();

    match err.deepest() {
        MatchError::Mismatch { location, expected, found, .. } => {
            assert_eq!(location.offset, 1);
            assert_eq!(expected, "'x'");
            assert_eq!(found, "'b'");
        }
        other => panic!("unexpected failure {other:?}"),
    }
}

#[test]
fn alternation_takes_the_first_match() {
    let node = lit("ab").or(lit("a"));
    assert_eq!(text_of(&node, "ab"), "ab");

    let flipped = lit("a").or(lit("ab"));
    assert_eq!(text_of(&flipped, "ab"), "a");
}

#[test]
fn alternation_rewinds_between_attempts() {
    // First branch consumes "ab" before failing; second must still
    // see the input from the start.
    let node = lit("ab").then(ch('x')).or(lit("abc"));
    assert_eq!(text_of(&node, "abc"), "abc");
}

#[test]
fn alternation_reports_the_last_branch_failure() {
    let node = ch('a').or(ch('b'));
    let err = run(&node, "z").unwrap_err();

    match err {
        MatchError::Mismatch { cause: Some(cause), .. } => match *cause {
            MatchError::Mismatch { ref expected, .. } => assert_eq!(expected, "'b'"),
            other => panic!("unexpected cause {other:?}"),
        },
        other => panic!("unexpected failure {other:?}"),
    }
}

#[test]
fn alternation_discards_the_losing_attempt_captures() {
    // The failing first branch captures "ab" before it fails; none of
    // it may leak into the winning branch's output.
    let node = lit("ab").then(ch('x')).or(lit("a"));
    assert_eq!(text_of(&node, "abc"), "a");
}

// ============================================================================
// Repetition
// ============================================================================

#[test]
fn repetition_is_greedy_up_to_max() {
    let node = ch('a').repeat(1, 3);
    assert_eq!(text_of(&node, "aaaaa"), "aaa");
    assert_eq!(text_of(&node, "aa"), "aa");
}

#[test]
fn repetition_unbounded_consumes_all() {
    let node = ch('a').at_least(0);
    assert_eq!(text_of(&node, "aaaa"), "aaaa");
    assert_eq!(text_of(&node, ""), "");
    assert_eq!(text_of(&node, "b"), "");
}

#[test]
fn repetition_below_minimum_fails() {
    let node = ch('a').repeat(3, 5);
    assert!(run(&node, "aa").is_err());
    assert_eq!(text_of(&node, "aaa"), "aaa");
}

#[test]
fn repetition_below_minimum_keeps_consumed_input() {
    // Failing the minimum leaves the iterations that did succeed
    // consumed instead of rewinding them.
    let rules = no_rules();
    let node = ch('a').repeat(3, 5);
    let mut scanner = Scanner::new("aab");

    let err = match_node(&rules, &node, &mut scanner, &MatchOptions::default()).unwrap_err();
    assert!(err.is_recoverable());
    assert_eq!(scanner.offset(), 2, "successful iterations stay consumed");
}

#[test]
fn lazy_repetition_settles_for_the_minimum() {
    let node = ch('a').repeat_lazy(2, 5);
    assert_eq!(text_of(&node, "aaaa"), "aa");

    let zero = ch('a').repeat_lazy(0, 5);
    assert_eq!(text_of(&zero, "aaaa"), "");
}

#[test]
fn zero_width_iteration_ends_the_loop() {
    // The body can match without consuming; the loop must notice and
    // stop instead of spinning.
    let node = lit("").at_least(0);
    assert!(run(&node, "abc").is_ok());

    let optional_body = ch('a').optional().at_least(2);
    let value = run(&optional_body, "b").unwrap();
    assert_eq!(value.text, "");
}

#[test]
fn zero_width_iteration_satisfies_the_minimum() {
    // Once an iteration consumes nothing, further iterations would
    // consume nothing too, so the loop counts as complete even below
    // its minimum.
    let node = ch('a').optional().repeat(3, 5);
    assert_eq!(text_of(&node, "ab"), "a");
}

#[test]
fn repetition_with_zero_max_matches_empty() {
    let node = ch('a').repeat(0, 0);
    let value = run(&node, "aaa").unwrap();
    assert_eq!(value.text, "");
    assert_eq!(value.span.len(), 0);
}

#[test]
fn number_grammar_matches_decimals() {
    let digit = char_range('0', '9');
    let number = digit
        .clone()
        .one_or_more()
        .then(ch('.').then(digit.one_or_more()).optional());

    assert_eq!(text_of(&number, "42"), "42");
    assert_eq!(text_of(&number, "3.14"), "3.14");
    assert_eq!(text_of(&number, "10."), "10");
    assert!(run(&number, ".5").is_err());
}

// ============================================================================
// Optional and negation
// ============================================================================

#[test]
fn optional_matches_present_or_absent() {
    let node = ch('-').optional().then(ch('1'));
    assert_eq!(text_of(&node, "-1"), "-1");
    assert_eq!(text_of(&node, "1"), "1");
}

#[test]
fn optional_discards_failed_attempt_captures() {
    let node = lit("ab").optional().then(lit("ax"));
    assert_eq!(text_of(&node, "ax"), "ax");
}

#[test]
fn negation_consumes_one_character_by_default() {
    let node = ch('a').negate();
    assert_eq!(text_of(&node, "xyz"), "x");
    assert!(run(&node, "abc").is_err());
}

#[test]
fn negation_fails_at_end_of_input() {
    let node = ch('a').negate();
    assert!(run(&node, "").is_err());
}

#[test]
fn negation_in_max_length_mode_consumes_the_inner_bound() {
    let rules = no_rules();
    let options = MatchOptions::default().negation(NegationMode::MaxLength);
    let node = lit("abc").negate();

    let mut scanner = Scanner::new("xyzw");
    let value = match_node(&rules, &node, &mut scanner, &options).unwrap();
    assert_eq!(value.text, "xyz");
}

#[test]
fn negation_in_max_length_mode_clamps_to_remaining_input() {
    let rules = no_rules();
    let options = MatchOptions::default().negation(NegationMode::MaxLength);
    let node = lit("abcdef").negate();

    let mut scanner = Scanner::new("xy");
    let value = match_node(&rules, &node, &mut scanner, &options).unwrap();
    assert_eq!(value.text, "xy");
}

#[test]
fn negation_in_max_length_mode_rejects_unbounded_inner() {
    let rules = no_rules();
    let options = MatchOptions::default().negation(NegationMode::MaxLength);
    let node = ch('a').one_or_more().negate();

    // The inner pattern fails, so the negation needs a consume width
    // and discovers it has none.
    let mut scanner = Scanner::new("xyz");
    let err = match_node(&rules, &node, &mut scanner, &options).unwrap_err();
    assert!(matches!(err, MatchError::UnboundedLength(_)));
    assert!(!err.is_recoverable());
}

#[test]
fn negation_failure_does_not_consume() {
    let rules = no_rules();
    let node = ch('a').negate().then(ch('a'));
    let mut scanner = Scanner::new("abc");

    assert!(match_node(&rules, &node, &mut scanner, &MatchOptions::default()).is_err());
    assert_eq!(scanner.offset(), 0);
}

#[test]
fn unbounded_negation_is_not_absorbed_by_alternation() {
    let rules = no_rules();
    let options = MatchOptions::default().negation(NegationMode::MaxLength);
    let inner = lit("b").then(ch('a').at_least(0));
    let node = inner.negate().or(ch('x'));

    let mut scanner = Scanner::new("x");
    let err = match_node(&rules, &node, &mut scanner, &options).unwrap_err();
    assert!(matches!(err, MatchError::UnboundedLength(_)));
}

// ============================================================================
// Capture post-processing
// ============================================================================

#[test]
fn ignore_matches_but_captures_nothing() {
    let node = ch('"')
        .ignore()
        .then(char_range('a', 'z').at_least(0))
        .then(ch('"').ignore());
    assert_eq!(text_of(&node, "\"hi\""), "hi");
}

#[test]
fn ignore_discards_markers_too() {
    let node = ch('a').mark("m").ignore().then(ch('b'));
    let value = run(&node, "ab").unwrap();
    assert_eq!(value.items, vec![MatchItem::Text("b".to_string())]);
}

#[test]
fn join_flattens_marker_output_to_text() {
    let node = ch('a').mark("m").then(ch('b')).join();
    let value = run(&node, "ab").unwrap();
    assert_eq!(value.items, vec![MatchItem::Text("ab".to_string())]);
}

#[test]
fn marker_wraps_its_capture() {
    let digit = char_range('0', '9');
    let node = digit.one_or_more().mark("number").then(ch('!'));
    let value = run(&node, "42!").unwrap();

    assert_eq!(value.items.len(), 2);
    match &value.items[0] {
        MatchItem::Marker(marker) => {
            assert_eq!(marker.name, "number");
            assert_eq!(marker.text(), "42");
        }
        other => panic!("expected a marker, got {other:?}"),
    }
    assert_eq!(value.items[1], MatchItem::Text("!".to_string()));
}

#[test]
fn markers_nest() {
    let digit = char_range('0', '9');
    let pair = digit
        .clone()
        .mark("lhs")
        .then(ch('+').ignore())
        .then(digit.mark("rhs"))
        .mark("sum");
    let value = run(&pair, "1+2").unwrap();

    match &value.items[0] {
        MatchItem::Marker(sum) => {
            assert_eq!(sum.name, "sum");
            assert_eq!(sum.children.len(), 2);
            match (&sum.children[0], &sum.children[1]) {
                (MatchItem::Marker(lhs), MatchItem::Marker(rhs)) => {
                    assert_eq!((lhs.name.as_str(), lhs.text().as_str()), ("lhs", "1"));
                    assert_eq!((rhs.name.as_str(), rhs.text().as_str()), ("rhs", "2"));
                }
                other => panic!("expected two child markers, got {other:?}"),
            }
        }
        other => panic!("expected the sum marker, got {other:?}"),
    }
}

#[test]
fn named_capture_feeds_backreferences() {
    // Matched quote style must close the string.
    let quote = one_of("'\"");
    let body = char_range('a', 'z').at_least(0);
    let node = quote.capture("q").then(body).then(backref("q"));

    assert_eq!(text_of(&node, "'hi'"), "'hi'");
    assert_eq!(text_of(&node, "\"hi\""), "\"hi\"");
    assert!(run(&node, "'hi\"").is_err());
}

#[test]
fn backreference_without_a_stored_capture_is_recoverable() {
    let node = backref("missing").or(ch('x'));
    assert_eq!(text_of(&node, "x"), "x");
}

#[test]
fn later_capture_overwrites_earlier() {
    let letter = char_range('a', 'z');
    let node = letter
        .clone()
        .capture("c")
        .then(letter.capture("c"))
        .then(backref("c"));
    assert_eq!(text_of(&node, "abb"), "abb");
    assert!(run(&node, "aba").is_err());
}

// ============================================================================
// Rules
// ============================================================================

#[test]
fn rule_reference_resolves_through_the_set() {
    let mut rules = RuleSet::new();
    rules.define_rule("digit", char_range('0', '9'));
    rules.define_rule("number", rule("digit").then(rule("digit").at_least(0)));

    let value = match_rule(&rules, "number", "123x", &MatchOptions::default()).unwrap();
    assert_eq!(value.text, "123");
}

#[test]
fn forward_references_bind_late() {
    let mut rules = RuleSet::new();
    // "item" is referenced before it is defined.
    rules.define_rule("list", rule("item").then(ch(',').then(rule("item")).at_least(0)));
    rules.define_rule("item", char_range('a', 'z').one_or_more());

    let value = match_rule(&rules, "list", "ab,cd,ef", &MatchOptions::default()).unwrap();
    assert_eq!(value.text, "ab,cd,ef");
}

#[test]
fn recursive_rules_match_nested_input() {
    let mut rules = RuleSet::new();
    rules.define_rule(
        "parens",
        ch('(')
            .then(rule("parens").or(char_range('a', 'z')))
            .then(ch(')')),
    );

    let value = match_rule(&rules, "parens", "((x))", &MatchOptions::default()).unwrap();
    assert_eq!(value.text, "((x))");
    assert!(match_rule(&rules, "parens", "((x)", &MatchOptions::default()).is_err());
}

#[test]
fn rule_failure_wraps_the_body_failure() {
    let mut rules = RuleSet::new();
    rules.define_rule("digit", char_range('0', '9'));

    let err = match_rule(&rules, "digit", "x", &MatchOptions::default()).unwrap_err();
    match err {
        MatchError::RuleFailed { ref rule, .. } => assert_eq!(rule, "digit"),
        other => panic!("expected a rule failure, got {other:?}"),
    }
    assert!(err.is_recoverable());
}

#[test]
fn undefined_rule_is_a_hard_fault() {
    let rules = no_rules();
    let err = match_rule(&rules, "ghost", "x", &MatchOptions::default()).unwrap_err();
    assert_eq!(err, MatchError::UndefinedRule("ghost".to_string()));
    assert!(!err.is_recoverable());
}

#[test]
fn declared_but_unbound_rule_is_a_hard_fault() {
    let mut rules = RuleSet::new();
    rules.declare("pending");

    let err = match_rule(&rules, "pending", "x", &MatchOptions::default()).unwrap_err();
    assert_eq!(err, MatchError::UndefinedRule("pending".to_string()));
}

#[test]
fn left_recursion_hits_the_depth_limit() {
    let mut rules = RuleSet::new();
    rules.define_rule("loop", rule("loop").then(ch('a')));

    let options = MatchOptions::default().max_depth(64);
    let err = match_rule(&rules, "loop", "aaa", &options).unwrap_err();
    assert_eq!(err, MatchError::DepthExceeded(64));
    assert!(!err.is_recoverable());
}

#[test]
fn depth_limit_is_not_absorbed_by_recovery() {
    let mut rules = RuleSet::new();
    rules.define_rule("loop", rule("loop"));
    rules.define_rule("start", rule("loop").or(ch('a')));

    let options = MatchOptions::default().max_depth(16);
    let err = match_rule(&rules, "start", "a", &options).unwrap_err();
    assert_eq!(err, MatchError::DepthExceeded(16));
}

#[test]
fn rule_metadata_is_preserved() {
    let mut rules = RuleSet::new();
    let id = rules.define(
        RuleDef::new("int", char_range('0', '9').one_or_more())
            .token_kind(weft_core::TokenKind(3))
            .convert(|text| text.parse().ok().map(weft_core::TokenValue::Integer)),
    );

    let def = rules.def_at(id).unwrap();
    assert_eq!(def.kind(), Some(weft_core::TokenKind(3)));
    assert_eq!(
        def.convert_text("42"),
        Some(weft_core::TokenValue::Integer(42))
    );
}

// ============================================================================
// Spans and entry points
// ============================================================================

#[test]
fn match_value_span_covers_the_consumed_region() {
    let node = lit("ab\ncd");
    let value = run(&node, "ab\ncdef").unwrap();

    assert_eq!(value.span.start.offset, 0);
    assert_eq!(value.span.end.offset, 5);
    assert_eq!(value.span.end.line, 2);
    assert_eq!(value.span.end.column, 3);
}

#[test]
fn match_node_starts_where_the_scanner_stands() {
    let rules = no_rules();
    let node = lit("cd");
    let mut scanner = Scanner::new("abcd");
    scanner.advance(2);

    let value = match_node(&rules, &node, &mut scanner, &MatchOptions::default()).unwrap();
    assert_eq!(value.span.start.offset, 2);
    assert_eq!(value.text, "cd");
}

#[test]
fn matches_helper_reports_success() {
    let rules = no_rules();
    assert!(matches(&rules, &lit("ab"), "abc"));
    assert!(!matches(&rules, &lit("ab"), "ba"));
}

use weft_bytecode::dump::dump;
use weft_bytecode::{Program, RuleSlot};
use weft_grammar::{
    GrammarNode, MatchOptions, NegationMode, RuleSet, backref, ch, char_range, eof, lit, one_of,
    pred, rule,
};

use crate::{Error, compile, compile_excluding, compile_rule};

fn compiled(body: GrammarNode) -> Program {
    let mut rules = RuleSet::new();
    rules.define_rule("r", body);
    compile_rule(&rules, "r", &MatchOptions::default()).unwrap()
}

#[test]
fn terminals_thread_the_sequence_continuation() {
    let program = compiled(
        one_of("+-")
            .optional()
            .then(pred("alpha", |c| c.is_alphabetic()))
            .then(eof()),
    );

    insta::assert_snapshot!(dump(&program), @r#"
    [program]
    rule = "r"
    ops = 15
    marks = 2
    counters = 0

    [strings]
    S00 "([+-]? <alpha> end of input)"

    [char_sets]
    C00 [+-]

    [predicates]
    P00 <alpha>

    [code]
    00 SetMark m0
    01 SetMark m1
    02 PushBuf
    03 MatchSet C00        !06
    04 PopMerge
    05 Jump -> 08
    06 TruncBufs 0
    07 RewindTo m1
    08 MatchPredicate P00  !11
    09 MatchEof            !11
    10 Jump -> 14
    11 TruncBufs 0
    12 RewindTo m0
    13 Fail S00            !raise
    14 Return
    "#);
}

#[test]
fn alternation_attempts_share_one_mark() {
    let program = compiled(ch('+').or(ch('-')));

    insta::assert_snapshot!(dump(&program), @r#"
    [program]
    rule = "r"
    ops = 15
    marks = 1
    counters = 0

    [strings]
    S00 "('+' | '-')"

    [code]
    00 SetMark m0
    01 PushBuf
    02 MatchChar '+'  !05
    03 PopMerge
    04 Jump -> 14
    05 TruncBufs 0
    06 RewindTo m0
    07 PushBuf
    08 MatchChar '-'  !11
    09 PopMerge
    10 Jump -> 14
    11 TruncBufs 0
    12 RewindTo m0
    13 Fail S00       !raise
    14 Return
    "#);
}

/// The unbounded greedy loop. The failing iteration breaks out through
/// the Loop continuation to the minimum check; earlier iterations stay
/// consumed.
#[test]
fn repetition_lowers_to_a_counted_loop() {
    let program = compiled(char_range('0', '9').one_or_more());

    insta::assert_snapshot!(dump(&program), @r#"
    [program]
    rule = "r"
    ops = 13
    marks = 1
    counters = 1

    [strings]
    S00 "'0'..'9'{1,}"

    [code]
    00 ClearCounter c0
    01 SetMark m0
    02 PushBuf
    03 MatchRange '0'..'9'  !08
    04 PopMerge
    05 IncrCounter c0
    06 JumpIfAtMark m0 -> 12
    07 Jump -> 01
    08 TruncBufs 0
    09 RewindTo m0
    10 JumpCounterGe c0 >= 1 -> 12
    11 Fail S00             !raise
    12 Return
    "#);
}

/// A lazy repetition caps iteration at the minimum instead of the
/// maximum.
#[test]
fn lazy_repetition_caps_at_the_minimum() {
    let program = compiled(ch('a').repeat_lazy(2, 5));

    insta::assert_snapshot!(dump(&program), @r#"
    [program]
    rule = "r"
    ops = 14
    marks = 1
    counters = 1

    [strings]
    S00 "'a'{2,5}?"

    [code]
    00 ClearCounter c0
    01 JumpCounterGe c0 >= 2 -> 13
    02 SetMark m0
    03 PushBuf
    04 MatchChar 'a'  !09
    05 PopMerge
    06 IncrCounter c0
    07 JumpIfAtMark m0 -> 13
    08 Jump -> 01
    09 TruncBufs 0
    10 RewindTo m0
    11 JumpCounterGe c0 >= 2 -> 13
    12 Fail S00       !raise
    13 Return
    "#);
}

#[test]
fn zero_cap_repetition_lowers_to_nothing() {
    let program = compiled(ch('a').repeat_lazy(0, 5));
    assert_eq!(program.len(), 1);
}

/// A miss inside the capture jumps to the sequence handler, whose
/// truncation depth drops the capture's still-open buffer.
#[test]
fn capture_scopes_truncate_on_failure() {
    let program = compiled(ch('a').repeat(1, 2).capture("word").then(backref("word")));

    insta::assert_snapshot!(dump(&program), @r#"
    [program]
    rule = "r"
    ops = 23
    marks = 2
    counters = 1

    [strings]
    S00 "word"
    S01 "'a'{1,2}"
    S02 "(cap(word, 'a'{1,2}) backref(word))"

    [code]
    00 SetMark m0
    01 PushBuf
    02 ClearCounter c0
    03 JumpCounterGe c0 >= 2 -> 15
    04 SetMark m1
    05 PushBuf
    06 MatchChar 'a'     !11
    07 PopMerge
    08 IncrCounter c0
    09 JumpIfAtMark m1 -> 15
    10 Jump -> 03
    11 TruncBufs 1
    12 RewindTo m1
    13 JumpCounterGe c0 >= 1 -> 15
    14 Fail S01          !19
    15 StoreCapture S00
    16 PopMerge
    17 MatchBackref S00  !19
    18 Jump -> 22
    19 TruncBufs 0
    20 RewindTo m0
    21 Fail S02          !raise
    22 Return
    "#);
}

#[test]
fn output_shaping_pops_match_their_push() {
    let program = compiled(ch('x').mark("m").then(ch('y').ignore()).then(ch('z').join()));

    insta::assert_snapshot!(dump(&program), @r#"
    [program]
    rule = "r"
    ops = 15
    marks = 1
    counters = 0

    [strings]
    S00 "m"
    S01 "(mark(m, 'x') ignore('y') join('z'))"

    [code]
    00 SetMark m0
    01 PushBuf
    02 MatchChar 'x'  !11
    03 PopMarker S00
    04 PushBuf
    05 MatchChar 'y'  !11
    06 PopDiscard
    07 PushBuf
    08 MatchChar 'z'  !11
    09 PopJoin
    10 Jump -> 14
    11 TruncBufs 0
    12 RewindTo m0
    13 Fail S01       !raise
    14 Return
    "#);
}

#[test]
fn rule_references_lower_to_indirect_calls() {
    let mut rules = RuleSet::new();
    rules.define_rule(
        "list",
        rule("item").then(ch(',').then(rule("item")).zero_or_more()),
    );
    rules.define_rule("item", ch('x'));
    let programs = compile(&rules, &MatchOptions::default()).unwrap();
    let list = programs[0].as_ref().unwrap();
    assert_eq!(
        list.callees().collect::<Vec<_>>(),
        vec![RuleSlot(1), RuleSlot(1)]
    );

    insta::assert_snapshot!(dump(list), @r#"
    [program]
    rule = "list"
    ops = 23
    marks = 3
    counters = 1

    [strings]
    S00 "(',' rule(item))"
    S01 "(rule(item) (',' rule(item)){0,})"

    [code]
    00 SetMark m0
    01 CallRule r1    !19
    02 ClearCounter c0
    03 SetMark m1
    04 PushBuf
    05 SetMark m2
    06 MatchChar ','  !09
    07 CallRule r1    !09
    08 Jump -> 12
    09 TruncBufs 1
    10 RewindTo m2
    11 Fail S00       !16
    12 PopMerge
    13 IncrCounter c0
    14 JumpIfAtMark m1 -> 18
    15 Jump -> 03
    16 TruncBufs 0
    17 RewindTo m1
    18 Jump -> 22
    19 TruncBufs 0
    20 RewindTo m0
    21 Fail S01       !raise
    22 Return
    "#);
}

/// Negation's two handlers. The match path fails without a cause, the
/// reject path consumes the fixed width.
#[test]
fn negation_lowers_to_two_handlers() {
    let program = compiled(ch('a').negate());

    insta::assert_snapshot!(dump(&program), @r#"
    [program]
    rule = "r"
    ops = 10
    marks = 1
    counters = 0

    [strings]
    S00 "!'a'"

    [code]
    00 SetMark m0
    01 PushBuf
    02 MatchChar 'a'          !06
    03 TruncBufs 0
    04 RewindTo m0
    05 Fail S00 nocause       !raise
    06 TruncBufs 0
    07 RewindTo m0
    08 ConsumeRejected 1 S00  !raise
    09 Return
    "#);
}

#[test]
fn max_length_negation_widens_to_the_inner_bound() {
    let mut rules = RuleSet::new();
    rules.define_rule("skip", lit("abc").negate());
    let options = MatchOptions::default().negation(NegationMode::MaxLength);
    let program = compile_rule(&rules, "skip", &options).unwrap();

    insta::assert_snapshot!(dump(&program), @r#"
    [program]
    rule = "skip"
    ops = 10
    marks = 1
    counters = 0

    [strings]
    S00 "abc"
    S01 "!\"abc\""

    [code]
    00 SetMark m0
    01 PushBuf
    02 MatchString S00        !06
    03 TruncBufs 0
    04 RewindTo m0
    05 Fail S01 nocause       !raise
    06 TruncBufs 0
    07 RewindTo m0
    08 ConsumeRejected 3 S01  !raise
    09 Return
    "#);
}

#[test]
fn unbounded_negation_is_rejected_up_front() {
    let mut rules = RuleSet::new();
    rules.define_rule("bad", ch('a').zero_or_more().negate());
    let options = MatchOptions::default().negation(NegationMode::MaxLength);
    let err = compile_rule(&rules, "bad", &options).unwrap_err();
    assert_eq!(
        err,
        Error::UnboundedNegation {
            rule: "bad".to_string(),
            node: "'a'{0,}".to_string(),
        }
    );

    // The same rule compiles in single-character mode.
    assert!(compile_rule(&rules, "bad", &MatchOptions::default()).is_ok());
}

#[test]
fn references_to_undefined_rules_are_rejected() {
    let mut rules = RuleSet::new();
    rules.define_rule("top", rule("missing"));
    let err = compile_rule(&rules, "top", &MatchOptions::default()).unwrap_err();
    assert_eq!(err, Error::UndefinedRule("missing".to_string()));

    // Declared but never bound reads the same as absent.
    rules.declare("ghost");
    rules.define_rule("top", rule("ghost"));
    let err = compile_rule(&rules, "top", &MatchOptions::default()).unwrap_err();
    assert_eq!(err, Error::UndefinedRule("ghost".to_string()));
}

#[test]
fn excluded_rules_keep_their_slot_and_stay_callable() {
    let mut rules = RuleSet::new();
    rules.define_rule("item", rule("value").then(ch(';')));
    rules.define_rule("value", char_range('a', 'z').one_or_more());
    rules.declare("unused");

    let programs = compile_excluding(&rules, &MatchOptions::default(), &["value"]).unwrap();
    assert_eq!(programs.len(), 3);
    assert!(programs[0].is_some());
    assert!(programs[1].is_none());
    assert!(programs[2].is_none());
    let item = programs[0].as_ref().unwrap();
    assert_eq!(item.callees().collect::<Vec<_>>(), vec![RuleSlot(1)]);
}

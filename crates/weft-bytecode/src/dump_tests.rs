use std::sync::Arc;

use crate::dump::dump;
use crate::ops::{CounterSlot, FailTo, MarkSlot, Op, OpAddr, PredId, SetId, StrId};
use crate::program::{PredicateEntry, Program};

/// The loop shape the compiler emits for `('0'..'9'){1,}`, assembled
/// by hand.
#[test]
fn dump_repetition_loop() {
    let m0 = MarkSlot(0);
    let c0 = CounterSlot(0);
    let program = Program::builder("digits")
        .ops(vec![
            Op::ClearCounter(c0),
            Op::SetMark(m0),
            Op::PushBuf,
            Op::MatchRange {
                start: '0',
                end: '9',
                fail: FailTo::At(OpAddr(8)),
            },
            Op::PopMerge,
            Op::IncrCounter(c0),
            Op::JumpIfAtMark {
                mark: m0,
                target: OpAddr(12),
            },
            Op::Jump(OpAddr(1)),
            Op::TruncBufs { depth: 0 },
            Op::RewindTo(m0),
            Op::JumpCounterGe {
                counter: c0,
                limit: 1,
                target: OpAddr(12),
            },
            Op::Fail {
                expected: StrId(0),
                chained: true,
                fail: FailTo::Raise,
            },
            Op::Return,
        ])
        .string("'0'..'9'{1,}")
        .marks(1)
        .counters(1)
        .build()
        .unwrap();

    insta::assert_snapshot!(dump(&program), @r#"
    [program]
    rule = "digits"
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

#[test]
fn dump_lists_every_side_table() {
    let program = Program::builder("token")
        .ops(vec![
            Op::MatchSet {
                set: SetId(0),
                fail: FailTo::Raise,
            },
            Op::MatchPredicate {
                pred: PredId(0),
                fail: FailTo::Raise,
            },
            Op::StoreCapture { name: StrId(0) },
            Op::Return,
        ])
        .string("name")
        .char_set(vec!['+', '-'])
        .predicate(PredicateEntry {
            name: "alpha".to_string(),
            test: Arc::new(|c| c.is_alphabetic()),
        })
        .build()
        .unwrap();

    insta::assert_snapshot!(dump(&program), @r#"
    [program]
    rule = "token"
    ops = 4
    marks = 0
    counters = 0

    [strings]
    S00 "name"

    [char_sets]
    C00 [+-]

    [predicates]
    P00 <alpha>

    [code]
    00 MatchSet C00        !raise
    01 MatchPredicate P00  !raise
    02 StoreCapture S00
    03 Return
    "#);
}

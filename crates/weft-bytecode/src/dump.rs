//! Text rendering of programs.
//!
//! The dump is a stable line-oriented format meant for snapshot tests
//! and debugging: a `[program]` header, one section per non-empty side
//! table, and a `[code]` listing with the failure target of each op in
//! an aligned right-hand column.

use std::fmt::Write;

use crate::ops::{FailTo, Op};
use crate::program::Program;

/// Digits needed to print every index below `count`, padded to at
/// least two so single-digit programs still line up.
fn width_for_count(count: usize) -> usize {
    count.saturating_sub(1).to_string().len().max(2)
}

struct Widths {
    op: usize,
    string: usize,
    set: usize,
    pred: usize,
}

/// Render `program` as text.
pub fn dump(program: &Program) -> String {
    let w = Widths {
        op: width_for_count(program.len()),
        string: width_for_count(program.strings().len()),
        set: width_for_count(program.char_sets().len()),
        pred: width_for_count(program.predicates().len()),
    };
    let mut out = String::new();

    let _ = writeln!(out, "[program]");
    let _ = writeln!(out, "rule = {:?}", program.rule());
    let _ = writeln!(out, "ops = {}", program.len());
    let _ = writeln!(out, "marks = {}", program.mark_slots());
    let _ = writeln!(out, "counters = {}", program.counter_slots());

    if !program.strings().is_empty() {
        let _ = writeln!(out, "\n[strings]");
        for (i, s) in program.strings().iter().enumerate() {
            let _ = writeln!(out, "S{:0width$} {:?}", i, s, width = w.string);
        }
    }
    if !program.char_sets().is_empty() {
        let _ = writeln!(out, "\n[char_sets]");
        for (i, set) in program.char_sets().iter().enumerate() {
            let chars: String = set.iter().map(|c| c.escape_debug().to_string()).collect();
            let _ = writeln!(out, "C{:0width$} [{}]", i, chars, width = w.set);
        }
    }
    if !program.predicates().is_empty() {
        let _ = writeln!(out, "\n[predicates]");
        for (i, entry) in program.predicates().iter().enumerate() {
            let _ = writeln!(out, "P{:0width$} <{}>", i, entry.name, width = w.pred);
        }
    }

    let _ = writeln!(out, "\n[code]");
    let rendered: Vec<(String, Option<String>)> =
        program.ops().iter().map(|op| render_op(op, &w)).collect();
    let body_width = rendered
        .iter()
        .filter(|(_, fail)| fail.is_some())
        .map(|(body, _)| body.len())
        .max()
        .unwrap_or(0);
    for (i, (body, fail)) in rendered.iter().enumerate() {
        match fail {
            Some(fail) => {
                let _ = writeln!(
                    out,
                    "{:0ow$} {:<bw$}  {}",
                    i,
                    body,
                    fail,
                    ow = w.op,
                    bw = body_width
                );
            }
            None => {
                let _ = writeln!(out, "{:0ow$} {}", i, body, ow = w.op);
            }
        }
    }
    out
}

fn render_op(op: &Op, w: &Widths) -> (String, Option<String>) {
    let addr = |a: &crate::ops::OpAddr| format!("{:0width$}", a.0, width = w.op);
    let fail = |f: &FailTo| match f {
        FailTo::At(a) => format!("!{}", addr(a)),
        FailTo::Raise => "!raise".to_string(),
    };
    let sid = |id: &crate::ops::StrId| format!("S{:0width$}", id.0, width = w.string);

    match op {
        Op::MatchChar { ch, fail: f } => (
            format!("MatchChar '{}'", ch.escape_debug()),
            Some(fail(f)),
        ),
        Op::MatchRange { start, end, fail: f } => (
            format!(
                "MatchRange '{}'..'{}'",
                start.escape_debug(),
                end.escape_debug()
            ),
            Some(fail(f)),
        ),
        Op::MatchSet { set, fail: f } => (
            format!("MatchSet C{:0width$}", set.0, width = w.set),
            Some(fail(f)),
        ),
        Op::MatchString { text, fail: f } => {
            (format!("MatchString {}", sid(text)), Some(fail(f)))
        }
        Op::MatchPredicate { pred, fail: f } => (
            format!("MatchPredicate P{:0width$}", pred.0, width = w.pred),
            Some(fail(f)),
        ),
        Op::MatchEof { fail: f } => ("MatchEof".to_string(), Some(fail(f))),
        Op::MatchBackref { name, fail: f } => {
            (format!("MatchBackref {}", sid(name)), Some(fail(f)))
        }
        Op::ConsumeRejected {
            width,
            desc,
            fail: f,
        } => (
            format!("ConsumeRejected {} {}", width, sid(desc)),
            Some(fail(f)),
        ),
        Op::SetMark(slot) => (format!("SetMark {slot}"), None),
        Op::RewindTo(slot) => (format!("RewindTo {slot}"), None),
        Op::ClearCounter(slot) => (format!("ClearCounter {slot}"), None),
        Op::IncrCounter(slot) => (format!("IncrCounter {slot}"), None),
        Op::JumpCounterGe {
            counter,
            limit,
            target,
        } => (
            format!("JumpCounterGe {counter} >= {limit} -> {}", addr(target)),
            None,
        ),
        Op::JumpIfAtMark { mark, target } => {
            (format!("JumpIfAtMark {mark} -> {}", addr(target)), None)
        }
        Op::PushBuf => ("PushBuf".to_string(), None),
        Op::PopMerge => ("PopMerge".to_string(), None),
        Op::PopDiscard => ("PopDiscard".to_string(), None),
        Op::PopJoin => ("PopJoin".to_string(), None),
        Op::PopMarker { name } => (format!("PopMarker {}", sid(name)), None),
        Op::StoreCapture { name } => (format!("StoreCapture {}", sid(name)), None),
        Op::TruncBufs { depth } => (format!("TruncBufs {depth}"), None),
        Op::Jump(target) => (format!("Jump -> {}", addr(target)), None),
        Op::CallRule { rule, fail: f } => (format!("CallRule {rule}"), Some(fail(f))),
        Op::Return => ("Return".to_string(), None),
        Op::Fail {
            expected,
            chained,
            fail: f,
        } => {
            let tail = if *chained { "" } else { " nocause" };
            (format!("Fail {}{}", sid(expected), tail), Some(fail(f)))
        }
    }
}

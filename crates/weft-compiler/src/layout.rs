//! Symbolic labels and their resolution to op addresses.
//!
//! Lowering emits ops in their final order but names jump targets with
//! fresh [`Label`]s, since most targets are not known until later code
//! has been emitted. Layout then rewrites every label to the op address
//! it was bound to.

use std::collections::HashMap;

use weft_bytecode::{FailTo, Op, OpAddr};

use crate::Error;

/// A forward-referencable position in the op stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub(crate) u32);

/// Rewrite label operands to the addresses they were bound to.
pub(crate) fn resolve(
    ops: Vec<Op<Label>>,
    bound: &HashMap<Label, u32>,
) -> Result<Vec<Op>, Error> {
    if ops.len() > u32::MAX as usize {
        return Err(Error::Oversized { ops: ops.len() });
    }
    let addr = |label: Label| -> Result<OpAddr, Error> {
        bound
            .get(&label)
            .map(|at| OpAddr(*at))
            .ok_or(Error::UnboundLabel(label.0))
    };
    let fail = |f: FailTo<Label>| -> Result<FailTo, Error> {
        Ok(match f {
            FailTo::At(label) => FailTo::At(addr(label)?),
            FailTo::Raise => FailTo::Raise,
        })
    };

    ops.into_iter()
        .map(|op| {
            Ok(match op {
                Op::MatchChar { ch, fail: f } => Op::MatchChar { ch, fail: fail(f)? },
                Op::MatchRange {
                    start,
                    end,
                    fail: f,
                } => Op::MatchRange {
                    start,
                    end,
                    fail: fail(f)?,
                },
                Op::MatchSet { set, fail: f } => Op::MatchSet { set, fail: fail(f)? },
                Op::MatchString { text, fail: f } => Op::MatchString {
                    text,
                    fail: fail(f)?,
                },
                Op::MatchPredicate { pred, fail: f } => Op::MatchPredicate {
                    pred,
                    fail: fail(f)?,
                },
                Op::MatchEof { fail: f } => Op::MatchEof { fail: fail(f)? },
                Op::MatchBackref { name, fail: f } => Op::MatchBackref {
                    name,
                    fail: fail(f)?,
                },
                Op::ConsumeRejected {
                    width,
                    desc,
                    fail: f,
                } => Op::ConsumeRejected {
                    width,
                    desc,
                    fail: fail(f)?,
                },
                Op::SetMark(slot) => Op::SetMark(slot),
                Op::RewindTo(slot) => Op::RewindTo(slot),
                Op::ClearCounter(slot) => Op::ClearCounter(slot),
                Op::IncrCounter(slot) => Op::IncrCounter(slot),
                Op::JumpCounterGe {
                    counter,
                    limit,
                    target,
                } => Op::JumpCounterGe {
                    counter,
                    limit,
                    target: addr(target)?,
                },
                Op::JumpIfAtMark { mark, target } => Op::JumpIfAtMark {
                    mark,
                    target: addr(target)?,
                },
                Op::PushBuf => Op::PushBuf,
                Op::PopMerge => Op::PopMerge,
                Op::PopDiscard => Op::PopDiscard,
                Op::PopJoin => Op::PopJoin,
                Op::PopMarker { name } => Op::PopMarker { name },
                Op::StoreCapture { name } => Op::StoreCapture { name },
                Op::TruncBufs { depth } => Op::TruncBufs { depth },
                Op::Jump(target) => Op::Jump(addr(target)?),
                Op::CallRule { rule, fail: f } => Op::CallRule {
                    rule,
                    fail: fail(f)?,
                },
                Op::Return => Op::Return,
                Op::Fail {
                    expected,
                    chained,
                    fail: f,
                } => Op::Fail {
                    expected,
                    chained,
                    fail: fail(f)?,
                },
            })
        })
        .collect()
}

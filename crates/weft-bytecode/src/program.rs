//! The program container and its integrity checks.

use std::fmt;

use weft_core::CharPredicate;

use crate::ops::{CounterSlot, FailTo, MarkSlot, Op, OpAddr, PredId, RuleSlot, SetId, StrId};

/// A named character test carried alongside a program.
///
/// Predicates keep their function values; only the name travels into
/// failure messages and dumps.
#[derive(Clone)]
pub struct PredicateEntry {
    pub name: String,
    pub test: CharPredicate,
}

impl PredicateEntry {
    pub fn accepts(&self, c: char) -> bool {
        (self.test)(c)
    }
}

impl fmt::Debug for PredicateEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateEntry")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Why a program failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProgramError {
    #[error("program has no ops")]
    Empty,
    #[error("op {op} can run past the end of the program")]
    OpenEnd { op: u32 },
    #[error("op {op} targets {target}, but the program ends at {len}")]
    TargetOutOfRange { op: u32, target: u32, len: u32 },
    #[error("op {op} reads string {id}, but the table holds {len}")]
    StringOutOfRange { op: u32, id: StrId, len: u32 },
    #[error("op {op} reads character set {id}, but the table holds {len}")]
    SetOutOfRange { op: u32, id: SetId, len: u32 },
    #[error("op {op} reads predicate {id}, but the table holds {len}")]
    PredicateOutOfRange { op: u32, id: PredId, len: u32 },
    #[error("op {op} uses mark {slot}, but the program declares {slots}")]
    MarkOutOfRange { op: u32, slot: MarkSlot, slots: u32 },
    #[error("op {op} uses counter {slot}, but the program declares {slots}")]
    CounterOutOfRange {
        op: u32,
        slot: CounterSlot,
        slots: u32,
    },
}

/// The compiled form of one rule.
///
/// Ops execute from address zero; the final op on every path is a
/// control transfer, so execution never runs off the end. All indices
/// into the op vector and the side tables are validated on
/// construction, which lets the executor index without checking.
#[derive(Debug, Clone)]
pub struct Program {
    rule: String,
    ops: Vec<Op>,
    strings: Vec<String>,
    char_sets: Vec<Box<[char]>>,
    predicates: Vec<PredicateEntry>,
    mark_slots: u32,
    counter_slots: u32,
}

impl Program {
    pub fn builder(rule: impl Into<String>) -> ProgramBuilder {
        ProgramBuilder {
            rule: rule.into(),
            ops: Vec::new(),
            strings: Vec::new(),
            char_sets: Vec::new(),
            predicates: Vec::new(),
            mark_slots: 0,
            counter_slots: 0,
        }
    }

    /// Name of the rule this program matches.
    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn op(&self, addr: OpAddr) -> Op {
        self.ops[addr.0 as usize]
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn string(&self, id: StrId) -> &str {
        &self.strings[id.0 as usize]
    }

    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    pub fn char_set(&self, id: SetId) -> &[char] {
        &self.char_sets[id.0 as usize]
    }

    pub fn char_sets(&self) -> &[Box<[char]>] {
        &self.char_sets
    }

    pub fn predicate(&self, id: PredId) -> &PredicateEntry {
        &self.predicates[id.0 as usize]
    }

    pub fn predicates(&self) -> &[PredicateEntry] {
        &self.predicates
    }

    /// Mark slots one activation of this program needs.
    pub fn mark_slots(&self) -> u32 {
        self.mark_slots
    }

    /// Counter slots one activation of this program needs.
    pub fn counter_slots(&self) -> u32 {
        self.counter_slots
    }

    /// Rule slots this program calls into, in op order.
    pub fn callees(&self) -> impl Iterator<Item = RuleSlot> + '_ {
        self.ops.iter().filter_map(|op| match op {
            Op::CallRule { rule, .. } => Some(*rule),
            _ => None,
        })
    }
}

/// Assembles and validates a [`Program`].
#[derive(Debug)]
pub struct ProgramBuilder {
    rule: String,
    ops: Vec<Op>,
    strings: Vec<String>,
    char_sets: Vec<Box<[char]>>,
    predicates: Vec<PredicateEntry>,
    mark_slots: u32,
    counter_slots: u32,
}

impl ProgramBuilder {
    pub fn op(mut self, op: Op) -> Self {
        self.ops.push(op);
        self
    }

    pub fn ops(mut self, ops: Vec<Op>) -> Self {
        self.ops = ops;
        self
    }

    pub fn string(mut self, s: impl Into<String>) -> Self {
        self.strings.push(s.into());
        self
    }

    pub fn strings(mut self, strings: Vec<String>) -> Self {
        self.strings = strings;
        self
    }

    pub fn char_set(mut self, set: impl Into<Box<[char]>>) -> Self {
        self.char_sets.push(set.into());
        self
    }

    pub fn char_sets(mut self, sets: Vec<Box<[char]>>) -> Self {
        self.char_sets = sets;
        self
    }

    pub fn predicate(mut self, entry: PredicateEntry) -> Self {
        self.predicates.push(entry);
        self
    }

    pub fn predicates(mut self, predicates: Vec<PredicateEntry>) -> Self {
        self.predicates = predicates;
        self
    }

    pub fn marks(mut self, slots: u32) -> Self {
        self.mark_slots = slots;
        self
    }

    pub fn counters(mut self, slots: u32) -> Self {
        self.counter_slots = slots;
        self
    }

    pub fn build(self) -> Result<Program, ProgramError> {
        let program = Program {
            rule: self.rule,
            ops: self.ops,
            strings: self.strings,
            char_sets: self.char_sets,
            predicates: self.predicates,
            mark_slots: self.mark_slots,
            counter_slots: self.counter_slots,
        };
        validate(&program)?;
        Ok(program)
    }
}

fn validate(program: &Program) -> Result<(), ProgramError> {
    if program.ops.is_empty() {
        return Err(ProgramError::Empty);
    }
    let len = program.ops.len() as u32;
    let last = len - 1;
    if !matches!(
        program.ops[last as usize],
        Op::Jump(_) | Op::Return | Op::Fail { .. }
    ) {
        return Err(ProgramError::OpenEnd { op: last });
    }

    for (at, op) in program.ops.iter().enumerate() {
        let at = at as u32;
        match *op {
            Op::MatchChar { fail, .. }
            | Op::MatchRange { fail, .. }
            | Op::MatchEof { fail } => check_fail(at, fail, len)?,
            Op::MatchSet { set, fail } => {
                check_set(at, set, program)?;
                check_fail(at, fail, len)?;
            }
            Op::MatchString { text, fail } => {
                check_str(at, text, program)?;
                check_fail(at, fail, len)?;
            }
            Op::MatchPredicate { pred, fail } => {
                check_pred(at, pred, program)?;
                check_fail(at, fail, len)?;
            }
            Op::MatchBackref { name, fail } => {
                check_str(at, name, program)?;
                check_fail(at, fail, len)?;
            }
            Op::ConsumeRejected { desc, fail, .. } => {
                check_str(at, desc, program)?;
                check_fail(at, fail, len)?;
            }
            Op::SetMark(slot) | Op::RewindTo(slot) => check_mark(at, slot, program)?,
            Op::ClearCounter(slot) | Op::IncrCounter(slot) => check_counter(at, slot, program)?,
            Op::JumpCounterGe {
                counter, target, ..
            } => {
                check_counter(at, counter, program)?;
                check_target(at, target, len)?;
            }
            Op::JumpIfAtMark { mark, target } => {
                check_mark(at, mark, program)?;
                check_target(at, target, len)?;
            }
            Op::PushBuf | Op::PopMerge | Op::PopDiscard | Op::PopJoin => {}
            Op::PopMarker { name } | Op::StoreCapture { name } => check_str(at, name, program)?,
            Op::TruncBufs { .. } => {}
            Op::Jump(target) => check_target(at, target, len)?,
            Op::CallRule { fail, .. } => check_fail(at, fail, len)?,
            Op::Return => {}
            Op::Fail { expected, fail, .. } => {
                check_str(at, expected, program)?;
                check_fail(at, fail, len)?;
            }
        }
    }
    Ok(())
}

fn check_target(op: u32, target: OpAddr, len: u32) -> Result<(), ProgramError> {
    if target.0 >= len {
        return Err(ProgramError::TargetOutOfRange {
            op,
            target: target.0,
            len,
        });
    }
    Ok(())
}

fn check_fail(op: u32, fail: FailTo, len: u32) -> Result<(), ProgramError> {
    match fail {
        FailTo::At(target) => check_target(op, target, len),
        FailTo::Raise => Ok(()),
    }
}

fn check_str(op: u32, id: StrId, program: &Program) -> Result<(), ProgramError> {
    let len = program.strings.len() as u32;
    if id.0 >= len {
        return Err(ProgramError::StringOutOfRange { op, id, len });
    }
    Ok(())
}

fn check_set(op: u32, id: SetId, program: &Program) -> Result<(), ProgramError> {
    let len = program.char_sets.len() as u32;
    if id.0 >= len {
        return Err(ProgramError::SetOutOfRange { op, id, len });
    }
    Ok(())
}

fn check_pred(op: u32, id: PredId, program: &Program) -> Result<(), ProgramError> {
    let len = program.predicates.len() as u32;
    if id.0 >= len {
        return Err(ProgramError::PredicateOutOfRange { op, id, len });
    }
    Ok(())
}

fn check_mark(op: u32, slot: MarkSlot, program: &Program) -> Result<(), ProgramError> {
    if slot.0 >= program.mark_slots {
        return Err(ProgramError::MarkOutOfRange {
            op,
            slot,
            slots: program.mark_slots,
        });
    }
    Ok(())
}

fn check_counter(op: u32, slot: CounterSlot, program: &Program) -> Result<(), ProgramError> {
    if slot.0 >= program.counter_slots {
        return Err(ProgramError::CounterOutOfRange {
            op,
            slot,
            slots: program.counter_slots,
        });
    }
    Ok(())
}

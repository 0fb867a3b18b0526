//! Lowering grammar trees to ops.
//!
//! Every construct compiles to the same control-flow shape the tree
//! interpreter walks, so the two engines agree on consumed input,
//! captured output, and failure chains. The correspondence is direct:
//! where the interpreter bookmarks the scanner, the lowered code sets
//! a mark; where it opens a capture scope, the code pushes a buffer;
//! where a recoverable failure would be absorbed, a
//! [`FailureCont`](crate::continuation::FailureCont) descriptor is on
//! the stack and fail sites jump to its preferred exit.
//!
//! Two interpreter quirks are reproduced deliberately: a repetition
//! that fails below its minimum does not rewind the iterations that
//! already matched, and an iteration that consumes nothing ends the
//! loop with the minimum considered satisfied.

use std::collections::{HashMap, HashSet};

use weft_bytecode::{CounterSlot, FailTo, MarkSlot, Op, Program, RuleSlot};
use weft_grammar::{GrammarNode, LenBound, LengthAnalyzer, MatchOptions, NegationMode, RuleSet};

use crate::Error;
use crate::continuation::FailureCont;
use crate::layout::{self, Label};
use crate::tables::{PredPool, SetPool, StringPool};

pub(crate) struct Lowerer<'a> {
    rules: &'a RuleSet,
    options: &'a MatchOptions,
    excluded: &'a HashSet<&'a str>,
    lengths: LengthAnalyzer<'a>,
    rule: &'a str,
    ops: Vec<Op<Label>>,
    bound: HashMap<Label, u32>,
    next_label: u32,
    conts: Vec<FailureCont>,
    buf_depth: u16,
    mark_slots: u32,
    counter_slots: u32,
    strings: StringPool,
    char_sets: SetPool,
    predicates: PredPool,
}

impl<'a> Lowerer<'a> {
    pub fn new(
        rules: &'a RuleSet,
        rule: &'a str,
        options: &'a MatchOptions,
        excluded: &'a HashSet<&'a str>,
    ) -> Self {
        Lowerer {
            rules,
            options,
            excluded,
            lengths: LengthAnalyzer::new(rules),
            rule,
            ops: Vec::new(),
            bound: HashMap::new(),
            next_label: 0,
            conts: Vec::new(),
            buf_depth: 0,
            mark_slots: 0,
            counter_slots: 0,
            strings: StringPool::default(),
            char_sets: SetPool::default(),
            predicates: PredPool::default(),
        }
    }

    /// Compile the rule this lowerer was created for.
    ///
    /// The body is lowered with an empty continuation stack: a miss
    /// nowhere absorbed raises out of the program, and the executor
    /// reports it as the rule's failure to the call site.
    pub fn lower_rule(mut self) -> Result<Program, Error> {
        let rules = self.rules;
        let Some(def) = rules.def(self.rule) else {
            return Err(Error::UndefinedRule(self.rule.to_string()));
        };
        self.lower(def.body())?;
        self.emit(Op::Return);
        debug_assert!(self.conts.is_empty(), "unbalanced continuation stack");
        debug_assert_eq!(self.buf_depth, 0, "unbalanced buffer scopes");

        let ops = layout::resolve(self.ops, &self.bound)?;
        let program = Program::builder(self.rule)
            .ops(ops)
            .strings(self.strings.into_strings())
            .char_sets(self.char_sets.into_sets())
            .predicates(self.predicates.into_entries())
            .marks(self.mark_slots)
            .counters(self.counter_slots)
            .build()?;
        Ok(program)
    }

    fn emit(&mut self, op: Op<Label>) {
        self.ops.push(op);
    }

    fn fresh_label(&mut self) -> Label {
        let label = Label(self.next_label);
        self.next_label += 1;
        label
    }

    /// Bind `label` to the next op emitted.
    fn bind(&mut self, label: Label) {
        self.bound.insert(label, self.ops.len() as u32);
    }

    fn alloc_mark(&mut self) -> MarkSlot {
        let slot = MarkSlot(self.mark_slots);
        self.mark_slots += 1;
        slot
    }

    fn alloc_counter(&mut self) -> CounterSlot {
        let slot = CounterSlot(self.counter_slots);
        self.counter_slots += 1;
        slot
    }

    /// Where a miss at the current point goes.
    fn fail_to(&self) -> FailTo<Label> {
        match self.conts.last() {
            Some(cont) => FailTo::At(cont.fail_label()),
            None => FailTo::Raise,
        }
    }

    fn lower(&mut self, node: &GrammarNode) -> Result<(), Error> {
        use GrammarNode::*;
        match node {
            Char(c) => {
                let fail = self.fail_to();
                self.emit(Op::MatchChar { ch: *c, fail });
                Ok(())
            }
            CharRange { start, end } => {
                let fail = self.fail_to();
                self.emit(Op::MatchRange {
                    start: *start,
                    end: *end,
                    fail,
                });
                Ok(())
            }
            CharSet(set) => {
                let set = self.char_sets.intern(set);
                let fail = self.fail_to();
                self.emit(Op::MatchSet { set, fail });
                Ok(())
            }
            StringLiteral(text) => {
                let text = self.strings.intern(text);
                let fail = self.fail_to();
                self.emit(Op::MatchString { text, fail });
                Ok(())
            }
            Predicate(p) => {
                let pred = self.predicates.intern(p);
                let fail = self.fail_to();
                self.emit(Op::MatchPredicate { pred, fail });
                Ok(())
            }
            Eof => {
                let fail = self.fail_to();
                self.emit(Op::MatchEof { fail });
                Ok(())
            }
            NamedBackreference(name) => {
                let name = self.strings.intern(name);
                let fail = self.fail_to();
                self.emit(Op::MatchBackref { name, fail });
                Ok(())
            }
            Sequence(children) => self.lower_sequence(node, children),
            Alternation(children) => self.lower_alternation(node, children),
            Repetition {
                inner,
                min,
                max,
                lazy,
            } => self.lower_repetition(node, inner, *min, *max, *lazy),
            Optional(inner) => self.lower_optional(inner),
            Negation(inner) => self.lower_negation(node, inner),
            Ignore(inner) => {
                self.emit(Op::PushBuf);
                self.buf_depth += 1;
                self.lower(inner)?;
                self.emit(Op::PopDiscard);
                self.buf_depth -= 1;
                Ok(())
            }
            Join(inner) => {
                self.emit(Op::PushBuf);
                self.buf_depth += 1;
                self.lower(inner)?;
                self.emit(Op::PopJoin);
                self.buf_depth -= 1;
                Ok(())
            }
            Marker { name, inner } => {
                let name = self.strings.intern(name);
                self.emit(Op::PushBuf);
                self.buf_depth += 1;
                self.lower(inner)?;
                self.emit(Op::PopMarker { name });
                self.buf_depth -= 1;
                Ok(())
            }
            NamedCapture { name, inner } => {
                let name = self.strings.intern(name);
                self.emit(Op::PushBuf);
                self.buf_depth += 1;
                self.lower(inner)?;
                self.emit(Op::StoreCapture { name });
                self.emit(Op::PopMerge);
                self.buf_depth -= 1;
                Ok(())
            }
            RuleReference(name) => self.lower_call(name),
        }
    }

    /// All children in order. A miss in any child undoes the whole
    /// sequence's consumption, then reports the sequence with the
    /// child's miss as the cause.
    fn lower_sequence(
        &mut self,
        node: &GrammarNode,
        children: &[GrammarNode],
    ) -> Result<(), Error> {
        let mark = self.alloc_mark();
        let undo = self.fresh_label();
        let done = self.fresh_label();
        let depth = self.buf_depth;

        self.emit(Op::SetMark(mark));
        self.conts.push(FailureCont::block(undo, done, depth));
        for child in children {
            self.lower(child)?;
        }
        self.conts.pop();
        self.emit(Op::Jump(done));

        self.bind(undo);
        self.emit(Op::TruncBufs { depth });
        self.emit(Op::RewindTo(mark));
        let expected = self.strings.intern(&node.to_string());
        let fail = self.fail_to();
        self.emit(Op::Fail {
            expected,
            chained: true,
            fail,
        });
        self.bind(done);
        Ok(())
    }

    /// First child that matches wins. Every attempt starts from the
    /// alternation's mark with a fresh buffer; the last attempt's miss
    /// becomes the cause of the alternation's own.
    fn lower_alternation(
        &mut self,
        node: &GrammarNode,
        children: &[GrammarNode],
    ) -> Result<(), Error> {
        let mark = self.alloc_mark();
        let done = self.fresh_label();
        let depth = self.buf_depth;

        self.emit(Op::SetMark(mark));
        for child in children {
            let next = self.fresh_label();
            self.conts.push(FailureCont::block(next, done, depth));
            self.emit(Op::PushBuf);
            self.buf_depth += 1;
            self.lower(child)?;
            self.emit(Op::PopMerge);
            self.buf_depth -= 1;
            self.conts.pop();
            self.emit(Op::Jump(done));

            self.bind(next);
            self.emit(Op::TruncBufs { depth });
            self.emit(Op::RewindTo(mark));
        }
        let expected = self.strings.intern(&node.to_string());
        let fail = self.fail_to();
        self.emit(Op::Fail {
            expected,
            chained: true,
            fail,
        });
        self.bind(done);
        Ok(())
    }

    /// Greedy iteration up to the cap, then the minimum check. The
    /// failing iteration rewinds to its own start only; earlier
    /// iterations keep their input and output even when the minimum
    /// check then fails.
    fn lower_repetition(
        &mut self,
        node: &GrammarNode,
        inner: &GrammarNode,
        min: u32,
        max: Option<u32>,
        lazy: bool,
    ) -> Result<(), Error> {
        let cap = if lazy { Some(min) } else { max };
        if cap == Some(0) {
            return Ok(());
        }

        let counter = self.alloc_counter();
        let mark = self.alloc_mark();
        let top = self.fresh_label();
        let stop = self.fresh_label();
        let done = self.fresh_label();
        let depth = self.buf_depth;

        self.emit(Op::ClearCounter(counter));
        self.bind(top);
        if let Some(cap) = cap {
            self.emit(Op::JumpCounterGe {
                counter,
                limit: cap,
                target: done,
            });
        }
        self.emit(Op::SetMark(mark));
        self.conts.push(FailureCont::looping(stop, top, depth));
        self.emit(Op::PushBuf);
        self.buf_depth += 1;
        self.lower(inner)?;
        self.emit(Op::PopMerge);
        self.buf_depth -= 1;
        self.conts.pop();
        self.emit(Op::IncrCounter(counter));
        self.emit(Op::JumpIfAtMark { mark, target: done });
        self.emit(Op::Jump(top));

        self.bind(stop);
        self.emit(Op::TruncBufs { depth });
        self.emit(Op::RewindTo(mark));
        if min > 0 {
            self.emit(Op::JumpCounterGe {
                counter,
                limit: min,
                target: done,
            });
            let expected = self.strings.intern(&node.to_string());
            let fail = self.fail_to();
            self.emit(Op::Fail {
                expected,
                chained: true,
                fail,
            });
        }
        self.bind(done);
        Ok(())
    }

    fn lower_optional(&mut self, inner: &GrammarNode) -> Result<(), Error> {
        let mark = self.alloc_mark();
        let skip = self.fresh_label();
        let done = self.fresh_label();
        let depth = self.buf_depth;

        self.emit(Op::SetMark(mark));
        self.conts.push(FailureCont::block(skip, done, depth));
        self.emit(Op::PushBuf);
        self.buf_depth += 1;
        self.lower(inner)?;
        self.emit(Op::PopMerge);
        self.buf_depth -= 1;
        self.conts.pop();
        self.emit(Op::Jump(done));

        self.bind(skip);
        self.emit(Op::TruncBufs { depth });
        self.emit(Op::RewindTo(mark));
        self.bind(done);
        Ok(())
    }

    /// Succeeds exactly when the inner matcher misses. The consumed
    /// width is fixed at compile time: one character, or in maximizing
    /// mode the inner matcher's static maximum. An unbounded maximum
    /// is a compile error rather than the interpreter's match-time
    /// fault.
    fn lower_negation(&mut self, node: &GrammarNode, inner: &GrammarNode) -> Result<(), Error> {
        let width = match self.options.negation {
            NegationMode::SingleChar => 1,
            NegationMode::MaxLength => {
                match self.lengths.max_len(inner, NegationMode::MaxLength) {
                    LenBound::Finite(n) => n.max(1),
                    LenBound::Unbounded => {
                        return Err(Error::UnboundedNegation {
                            rule: self.rule.to_string(),
                            node: inner.to_string(),
                        });
                    }
                }
            }
        };
        let width = u32::try_from(width).unwrap_or(u32::MAX);

        let mark = self.alloc_mark();
        let rejected = self.fresh_label();
        let matched = self.fresh_label();
        let depth = self.buf_depth;

        self.emit(Op::SetMark(mark));
        self.conts
            .push(FailureCont::block(rejected, matched, depth));
        self.emit(Op::PushBuf);
        self.buf_depth += 1;
        self.lower(inner)?;
        self.buf_depth -= 1;
        self.conts.pop();

        // Inner matched, so the negation misses. No cause: the misses
        // recorded while exploring the inner matcher are not why the
        // negation failed.
        self.bind(matched);
        self.emit(Op::TruncBufs { depth });
        self.emit(Op::RewindTo(mark));
        let expected = self.strings.intern(&node.to_string());
        let fail = self.fail_to();
        self.emit(Op::Fail {
            expected,
            chained: false,
            fail,
        });

        self.bind(rejected);
        self.emit(Op::TruncBufs { depth });
        self.emit(Op::RewindTo(mark));
        let desc = self.strings.intern(&node.to_string());
        let fail = self.fail_to();
        self.emit(Op::ConsumeRejected { width, desc, fail });
        Ok(())
    }

    fn lower_call(&mut self, name: &str) -> Result<(), Error> {
        let rules = self.rules;
        let Some(id) = rules.id_of(name) else {
            return Err(Error::UndefinedRule(name.to_string()));
        };
        // A bound definition compiles or falls back; a bare
        // declaration is only callable when it was excluded, which
        // defers resolution to match time like the interpreter.
        if rules.def(name).is_none() && !self.excluded.contains(name) {
            return Err(Error::UndefinedRule(name.to_string()));
        }
        let fail = self.fail_to();
        self.emit(Op::CallRule {
            rule: RuleSlot(id.0),
            fail,
        });
        Ok(())
    }
}

//! The program executor.
//!
//! Execution is a fetch-dispatch loop over the current frame's ops.
//! Backtracking never unwinds the Rust stack: a miss either jumps to a
//! failure handler inside the frame or pops frames until a call site
//! catches it, mirroring what the tree interpreter's recursion does
//! with `Result`s.
//!
//! Buffers, marks, and counters live in flat stacks shared by all
//! frames; each frame records the lengths at entry so returns and
//! unwinds can truncate back to them. A rule body writes into
//! whatever buffer is on top when it is called, which is how the
//! interpreter behaves too: a failing rule's text already merged into
//! the caller's scope stays there until an enclosing attempt scope is
//! discarded.

use std::sync::Arc;

use weft_bytecode::{CounterSlot, FailTo, MarkSlot, Op, OpAddr, Program, RuleSlot};
use weft_core::{
    CaptureBuf, CaptureMemory, Location, MarkerNode, MatchError, MatchResult, MatchValue, Scanner,
    Span,
};
use weft_grammar::match_fragment;

use crate::table::{RuleEntry, RuleTable};
use crate::trace::{NoopTracer, Tracer};

/// Match the table's root rule at the scanner's current position.
pub fn run_root(table: &RuleTable, scanner: &mut Scanner) -> MatchResult<MatchValue> {
    let Some(slot) = table.root_slot() else {
        return Err(MatchError::NoRoot);
    };
    Vm::new(table, scanner).execute(slot)
}

/// Match one named rule at the scanner's current position.
pub fn run_rule(table: &RuleTable, name: &str, scanner: &mut Scanner) -> MatchResult<MatchValue> {
    let Some(slot) = table.slot_of(name) else {
        return Err(MatchError::UndefinedRule(name.to_string()));
    };
    Vm::new(table, scanner).execute(slot)
}

/// One activation of a compiled program.
struct Frame {
    program: Arc<Program>,
    ip: u32,
    /// Where the call site sends this rule's failure.
    fail: FailTo,
    /// Scanner position on entry, for the `RuleFailed` report.
    entry: Location,
    buf_base: usize,
    mark_base: usize,
    counter_base: usize,
}

/// What a step decided about the run.
enum Flow {
    Continue,
    Done,
}

/// Executor state for one match.
pub struct Vm<'a> {
    table: &'a RuleTable,
    scanner: &'a mut Scanner,
    frames: Vec<Frame>,
    /// Output of the whole match. `bufs` stack on top of it.
    root: CaptureBuf,
    bufs: Vec<CaptureBuf>,
    marks: Vec<Location>,
    counters: Vec<u32>,
    captures: CaptureMemory,
    /// The most recent miss, consumed by the next chained `Fail`.
    last_miss: Option<MatchError>,
}

impl<'a> Vm<'a> {
    pub fn new(table: &'a RuleTable, scanner: &'a mut Scanner) -> Self {
        Vm {
            table,
            scanner,
            frames: Vec::new(),
            root: CaptureBuf::new(),
            bufs: Vec::new(),
            marks: Vec::new(),
            counters: Vec::new(),
            captures: CaptureMemory::new(),
            last_miss: None,
        }
    }

    /// Run the rule in `slot` to completion.
    pub fn execute(self, slot: RuleSlot) -> MatchResult<MatchValue> {
        self.execute_with(slot, &mut NoopTracer)
    }

    /// Run the rule in `slot` with a tracer attached.
    pub fn execute_with<T: Tracer>(
        mut self,
        slot: RuleSlot,
        tracer: &mut T,
    ) -> MatchResult<MatchValue> {
        let start = self.scanner.location();
        let table = self.table;
        match table.entry(slot) {
            RuleEntry::Compiled(program) => {
                self.call(Arc::clone(program), FailTo::Raise, tracer)?;
                loop {
                    match self.step(tracer)? {
                        Flow::Continue => {}
                        Flow::Done => break,
                    }
                }
            }
            RuleEntry::Fallback(node) => {
                let buf = match_fragment(
                    table.rules(),
                    node,
                    self.scanner,
                    &mut self.captures,
                    table.options(),
                    0,
                )?;
                self.root.merge(buf);
            }
        }
        let end = self.scanner.location();
        let text = self.root.flat_text();
        Ok(MatchValue {
            text,
            items: self.root.into_items(),
            span: Span::new(start, end),
        })
    }

    /// Execute the op under the current frame's instruction pointer.
    fn step<T: Tracer>(&mut self, tracer: &mut T) -> MatchResult<Flow> {
        let frame = self.frames.last_mut().expect("an active frame");
        let program = Arc::clone(&frame.program);
        let at = frame.ip;
        let op = program.op(OpAddr(at));
        frame.ip = at + 1;
        tracer.trace_op(program.rule(), at, &op);

        match op {
            Op::MatchChar { ch, fail } => self.match_one(
                fail,
                |c| c == ch,
                || format!("'{}'", ch.escape_debug()),
                tracer,
            ),
            Op::MatchRange { start, end, fail } => self.match_one(
                fail,
                |c| (start..=end).contains(&c),
                || format!("'{}'..'{}'", start.escape_debug(), end.escape_debug()),
                tracer,
            ),
            Op::MatchSet { set, fail } => self.match_one(
                fail,
                |c| program.char_set(set).binary_search(&c).is_ok(),
                || set_expected(program.char_set(set)),
                tracer,
            ),
            Op::MatchPredicate { pred, fail } => self.match_one(
                fail,
                |c| program.predicate(pred).accepts(c),
                || format!("<{}>", program.predicate(pred).name),
                tracer,
            ),
            Op::MatchString { text, fail } => {
                let text = program.string(text);
                if self.scanner.is_next(text) {
                    self.scanner.advance(text.chars().count());
                    self.top().push_str(text);
                    Ok(Flow::Continue)
                } else {
                    let err = self.miss(format!("{text:?}"));
                    self.divert(fail, err, tracer)
                }
            }
            Op::MatchEof { fail } => {
                if self.scanner.at_end() {
                    Ok(Flow::Continue)
                } else {
                    let err = self.miss("end of input");
                    self.divert(fail, err, tracer)
                }
            }
            Op::MatchBackref { name, fail } => {
                let name = program.string(name);
                let recalled = self.captures.recall(name).map(str::to_string);
                match recalled {
                    Some(text) if self.scanner.is_next(&text) => {
                        self.scanner.advance(text.chars().count());
                        self.top().push_str(&text);
                        Ok(Flow::Continue)
                    }
                    _ => {
                        let err = self.miss(format!("backref({name})"));
                        self.divert(fail, err, tracer)
                    }
                }
            }
            Op::ConsumeRejected { width, desc, fail } => {
                let take = (width as usize).min(self.scanner.remaining());
                if take == 0 {
                    let err = self.miss(program.string(desc));
                    return self.divert(fail, err, tracer);
                }
                if let Some(text) = self.scanner.read_string(take) {
                    self.top().push_str(&text);
                }
                Ok(Flow::Continue)
            }
            Op::SetMark(slot) => {
                let here = self.scanner.location();
                *self.mark_mut(slot) = here;
                Ok(Flow::Continue)
            }
            Op::RewindTo(slot) => {
                let to = *self.mark_mut(slot);
                self.scanner.rewind(to);
                Ok(Flow::Continue)
            }
            Op::ClearCounter(slot) => {
                *self.counter_mut(slot) = 0;
                Ok(Flow::Continue)
            }
            Op::IncrCounter(slot) => {
                *self.counter_mut(slot) += 1;
                Ok(Flow::Continue)
            }
            Op::JumpCounterGe {
                counter,
                limit,
                target,
            } => {
                if *self.counter_mut(counter) >= limit {
                    self.frame_mut().ip = target.0;
                }
                Ok(Flow::Continue)
            }
            Op::JumpIfAtMark { mark, target } => {
                if self.scanner.location().offset == self.mark_mut(mark).offset {
                    self.frame_mut().ip = target.0;
                }
                Ok(Flow::Continue)
            }
            Op::PushBuf => {
                self.bufs.push(CaptureBuf::new());
                Ok(Flow::Continue)
            }
            Op::PopMerge => {
                let buf = self.pop_buf();
                self.top().merge(buf);
                Ok(Flow::Continue)
            }
            Op::PopDiscard => {
                self.pop_buf();
                Ok(Flow::Continue)
            }
            Op::PopJoin => {
                let buf = self.pop_buf();
                self.top().push_str(&buf.flat_text());
                Ok(Flow::Continue)
            }
            Op::PopMarker { name } => {
                let buf = self.pop_buf();
                self.top()
                    .push_marker(MarkerNode::new(program.string(name), buf.into_items()));
                Ok(Flow::Continue)
            }
            Op::StoreCapture { name } => {
                let text = self.top().flat_text();
                self.captures.store(program.string(name), text);
                Ok(Flow::Continue)
            }
            Op::TruncBufs { depth } => {
                let base = self.frame().buf_base;
                self.bufs.truncate(base + depth as usize);
                Ok(Flow::Continue)
            }
            Op::Jump(target) => {
                self.frame_mut().ip = target.0;
                Ok(Flow::Continue)
            }
            Op::CallRule { rule, fail } => self.call_rule(rule, fail, tracer),
            Op::Return => {
                tracer.trace_return(program.rule());
                let frame = self.frames.pop().expect("an active frame");
                self.marks.truncate(frame.mark_base);
                self.counters.truncate(frame.counter_base);
                if self.frames.is_empty() {
                    Ok(Flow::Done)
                } else {
                    Ok(Flow::Continue)
                }
            }
            Op::Fail {
                expected,
                chained,
                fail,
            } => {
                let mut err = self.miss(program.string(expected));
                if chained {
                    if let Some(cause) = self.last_miss.take() {
                        err = err.caused_by(cause);
                    }
                }
                self.divert(fail, err, tracer)
            }
        }
    }

    /// Single-character terminals share one consume-or-miss path.
    fn match_one<T: Tracer>(
        &mut self,
        fail: FailTo,
        accepts: impl Fn(char) -> bool,
        expected: impl FnOnce() -> String,
        tracer: &mut T,
    ) -> MatchResult<Flow> {
        match self.scanner.peek(0) {
            Some(actual) if accepts(actual) => {
                self.scanner.advance(1);
                self.top().push_char(actual);
                Ok(Flow::Continue)
            }
            _ => {
                let err = self.miss(expected());
                self.divert(fail, err, tracer)
            }
        }
    }

    fn miss(&self, expected: impl Into<String>) -> MatchError {
        MatchError::mismatch(
            self.scanner.location(),
            expected,
            self.scanner.describe_next(),
        )
    }

    /// Send a recoverable miss where the op's failure target says:
    /// into a handler in the current frame, or unwinding out of it.
    fn divert<T: Tracer>(
        &mut self,
        fail: FailTo,
        err: MatchError,
        tracer: &mut T,
    ) -> MatchResult<Flow> {
        match fail {
            FailTo::At(addr) => {
                let frame = self.frames.last_mut().expect("an active frame");
                tracer.trace_fail_jump(frame.program.rule(), addr);
                frame.ip = addr.0;
                self.last_miss = Some(err);
                Ok(Flow::Continue)
            }
            FailTo::Raise => self.unwind(err, tracer),
        }
    }

    /// Pop frames until a call site catches the failure. Each popped
    /// frame wraps the error in its own `RuleFailed`, so the surfaced
    /// chain reads outermost rule first, the way the interpreter's
    /// recursion builds it.
    fn unwind<T: Tracer>(&mut self, err: MatchError, tracer: &mut T) -> MatchResult<Flow> {
        let mut err = err;
        loop {
            let frame = self.frames.pop().expect("an active frame");
            tracer.trace_raise(frame.program.rule());
            self.bufs.truncate(frame.buf_base);
            self.marks.truncate(frame.mark_base);
            self.counters.truncate(frame.counter_base);
            err = MatchError::RuleFailed {
                rule: frame.program.rule().to_string(),
                location: frame.entry,
                cause: Box::new(err),
            };
            match frame.fail {
                FailTo::At(addr) => {
                    let caller = self
                        .frames
                        .last_mut()
                        .expect("a handler address implies a caller");
                    caller.ip = addr.0;
                    self.last_miss = Some(err);
                    return Ok(Flow::Continue);
                }
                FailTo::Raise => {
                    if self.frames.is_empty() {
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Enter a compiled rule.
    fn call<T: Tracer>(
        &mut self,
        program: Arc<Program>,
        fail: FailTo,
        tracer: &mut T,
    ) -> MatchResult<()> {
        let max_depth = self.table.options().max_depth;
        if self.frames.len() >= max_depth {
            return Err(MatchError::DepthExceeded(max_depth));
        }
        tracer.trace_call(program.rule(), self.frames.len());
        let marks = program.mark_slots() as usize;
        let counters = program.counter_slots() as usize;
        let frame = Frame {
            ip: 0,
            fail,
            entry: self.scanner.location(),
            buf_base: self.bufs.len(),
            mark_base: self.marks.len(),
            counter_base: self.counters.len(),
            program,
        };
        self.marks.resize(self.marks.len() + marks, Location::START);
        self.counters.resize(self.counters.len() + counters, 0);
        self.frames.push(frame);
        Ok(())
    }

    /// Dispatch a `CallRule` through the table, whichever engine the
    /// callee is bound to.
    fn call_rule<T: Tracer>(
        &mut self,
        rule: RuleSlot,
        fail: FailTo,
        tracer: &mut T,
    ) -> MatchResult<Flow> {
        let table = self.table;
        match table.entry(rule) {
            RuleEntry::Compiled(callee) => {
                self.call(Arc::clone(callee), fail, tracer)?;
                Ok(Flow::Continue)
            }
            RuleEntry::Fallback(node) => {
                // The interpreter resolves the reference itself and
                // seeds its recursion counter with the frames already
                // active here, keeping the depth limit one number
                // across both engines.
                let outcome = match_fragment(
                    table.rules(),
                    node,
                    self.scanner,
                    &mut self.captures,
                    table.options(),
                    self.frames.len(),
                );
                match outcome {
                    Ok(buf) => {
                        self.top().merge(buf);
                        Ok(Flow::Continue)
                    }
                    Err(err) if err.is_recoverable() => self.divert(fail, err, tracer),
                    Err(hard) => Err(hard),
                }
            }
        }
    }

    fn frame(&self) -> &Frame {
        self.frames.last().expect("an active frame")
    }

    fn frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("an active frame")
    }

    /// The buffer ops currently write into.
    fn top(&mut self) -> &mut CaptureBuf {
        match self.bufs.last_mut() {
            Some(buf) => buf,
            None => &mut self.root,
        }
    }

    fn pop_buf(&mut self) -> CaptureBuf {
        self.bufs.pop().expect("a pushed buffer")
    }

    fn mark_mut(&mut self, slot: MarkSlot) -> &mut Location {
        let ix = self.frame().mark_base + slot.0 as usize;
        &mut self.marks[ix]
    }

    fn counter_mut(&mut self, slot: CounterSlot) -> &mut u32 {
        let ix = self.frame().counter_base + slot.0 as usize;
        &mut self.counters[ix]
    }
}

fn set_expected(set: &[char]) -> String {
    let mut out = String::from("[");
    for c in set {
        out.extend(c.escape_debug());
    }
    out.push(']');
    out
}

//! Execution instrumentation.
//!
//! The executor is generic over a [`Tracer`] so that the no-op
//! implementation compiles away entirely. Every hook receives raw data
//! the executor already has; formatting happens in the tracer.

use weft_bytecode::{Op, OpAddr};

/// Hooks called at the executor's interesting moments.
pub trait Tracer {
    /// Before an op executes. `at` is the op's own address.
    fn trace_op(&mut self, rule: &str, at: u32, op: &Op);

    /// A compiled rule frame was entered. `depth` counts frames
    /// already active below it.
    fn trace_call(&mut self, rule: &str, depth: usize);

    /// A compiled rule returned normally.
    fn trace_return(&mut self, rule: &str);

    /// A miss diverted to a failure handler inside the same frame.
    fn trace_fail_jump(&mut self, rule: &str, to: OpAddr);

    /// A miss escaped the frame and is unwinding through its caller.
    fn trace_raise(&mut self, rule: &str);
}

/// Tracer that does nothing and costs nothing.
pub struct NoopTracer;

impl Tracer for NoopTracer {
    #[inline(always)]
    fn trace_op(&mut self, _rule: &str, _at: u32, _op: &Op) {}

    #[inline(always)]
    fn trace_call(&mut self, _rule: &str, _depth: usize) {}

    #[inline(always)]
    fn trace_return(&mut self, _rule: &str) {}

    #[inline(always)]
    fn trace_fail_jump(&mut self, _rule: &str, _to: OpAddr) {}

    #[inline(always)]
    fn trace_raise(&mut self, _rule: &str) {}
}

/// Tracer that collects one line per event.
#[derive(Debug, Default)]
pub struct PrintTracer {
    lines: Vec<String>,
}

impl PrintTracer {
    pub fn new() -> Self {
        PrintTracer::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Write the collected trace to stderr.
    pub fn print(&self) {
        for line in &self.lines {
            eprintln!("{line}");
        }
    }
}

impl Tracer for PrintTracer {
    fn trace_op(&mut self, rule: &str, at: u32, op: &Op) {
        self.lines.push(format!("{rule}:{at:02} {op:?}"));
    }

    fn trace_call(&mut self, rule: &str, depth: usize) {
        self.lines.push(format!("call {rule} depth={depth}"));
    }

    fn trace_return(&mut self, rule: &str) {
        self.lines.push(format!("return {rule}"));
    }

    fn trace_fail_jump(&mut self, rule: &str, to: OpAddr) {
        self.lines.push(format!("{rule}: miss -> {to}"));
    }

    fn trace_raise(&mut self, rule: &str) {
        self.lines.push(format!("{rule}: raise"));
    }
}

//! Recursive evaluation of grammar nodes.
//!
//! Each composite construct owns its backtracking discipline:
//! sequences use the scanner's save stack, while alternation,
//! repetition, option, and negation bookmark a location and rewind to
//! it. Recovery only absorbs recoverable failures; hard faults
//! propagate straight out of any nesting.

use weft_core::{MatchError, MatchResult, Scanner};

use crate::length::{LenBound, LengthAnalyzer, NegationMode};
use crate::node::GrammarNode;
use crate::registry::RuleSet;

use super::MatchOptions;
use super::state::MatchState;

pub(crate) struct Interp<'a> {
    rules: &'a RuleSet,
    options: &'a MatchOptions,
    lengths: LengthAnalyzer<'a>,
}

impl<'a> Interp<'a> {
    pub fn new(rules: &'a RuleSet, options: &'a MatchOptions) -> Self {
        Interp {
            rules,
            options,
            lengths: LengthAnalyzer::new(rules),
        }
    }

    pub fn eval(
        &mut self,
        node: &GrammarNode,
        scanner: &mut Scanner,
        state: &mut MatchState,
    ) -> MatchResult<()> {
        use GrammarNode::*;
        match node {
            Char(expected) => self.match_one(node, scanner, state, |c| c == *expected),
            CharRange { start, end } => {
                self.match_one(node, scanner, state, |c| (*start..=*end).contains(&c))
            }
            CharSet(set) => {
                self.match_one(node, scanner, state, |c| set.binary_search(&c).is_ok())
            }
            Predicate(p) => self.match_one(node, scanner, state, |c| p.accepts(c)),
            StringLiteral(text) => self.eval_literal(node, text, scanner, state),
            Eof => {
                if scanner.at_end() {
                    Ok(())
                } else {
                    Err(self.miss(node, scanner))
                }
            }
            Sequence(children) => self.eval_sequence(node, children, scanner, state),
            Alternation(children) => self.eval_alternation(node, children, scanner, state),
            Repetition {
                inner,
                min,
                max,
                lazy,
            } => self.eval_repetition(node, inner, *min, *max, *lazy, scanner, state),
            Optional(inner) => self.eval_optional(inner, scanner, state),
            Negation(inner) => self.eval_negation(node, inner, scanner, state),
            Ignore(inner) => self.eval_ignore(inner, scanner, state),
            Join(inner) => self.eval_join(inner, scanner, state),
            Marker { name, inner } => self.eval_marker(name, inner, scanner, state),
            NamedCapture { name, inner } => self.eval_capture(name, inner, scanner, state),
            NamedBackreference(name) => self.eval_backref(node, name, scanner, state),
            RuleReference(name) => self.eval_rule(name, scanner, state),
        }
    }

    fn miss(&self, node: &GrammarNode, scanner: &Scanner) -> MatchError {
        MatchError::mismatch(scanner.location(), node.to_string(), scanner.describe_next())
    }

    fn match_one(
        &self,
        node: &GrammarNode,
        scanner: &mut Scanner,
        state: &mut MatchState,
        accepts: impl Fn(char) -> bool,
    ) -> MatchResult<()> {
        match scanner.peek(0) {
            Some(actual) if accepts(actual) => {
                scanner.advance(1);
                state.top().push_char(actual);
                Ok(())
            }
            _ => Err(self.miss(node, scanner)),
        }
    }

    fn eval_literal(
        &self,
        node: &GrammarNode,
        text: &str,
        scanner: &mut Scanner,
        state: &mut MatchState,
    ) -> MatchResult<()> {
        if !scanner.is_next(text) {
            return Err(self.miss(node, scanner));
        }
        scanner.advance(text.chars().count());
        state.top().push_str(text);
        Ok(())
    }

    /// All children in order; any failure rewinds to the sequence
    /// start and reports the sequence with the child's failure as the
    /// cause.
    fn eval_sequence(
        &mut self,
        node: &GrammarNode,
        children: &[GrammarNode],
        scanner: &mut Scanner,
        state: &mut MatchState,
    ) -> MatchResult<()> {
        scanner.save();
        for child in children {
            match self.eval(child, scanner, state) {
                Ok(()) => {}
                Err(err) if err.is_recoverable() => {
                    scanner.load_save();
                    return Err(self.miss(node, scanner).caused_by(err));
                }
                Err(hard) => {
                    scanner.discard_save();
                    return Err(hard);
                }
            }
        }
        scanner.discard_save();
        Ok(())
    }

    /// First child that matches wins. Each attempt starts from the
    /// same position with a fresh capture scope; when every child
    /// fails, the last child's failure is the reported cause.
    fn eval_alternation(
        &mut self,
        node: &GrammarNode,
        children: &[GrammarNode],
        scanner: &mut Scanner,
        state: &mut MatchState,
    ) -> MatchResult<()> {
        let start = scanner.location();
        let mut last_failure: Option<MatchError> = None;
        for child in children {
            state.open_scope();
            match self.eval(child, scanner, state) {
                Ok(()) => {
                    let buf = state.close_scope();
                    state.top().merge(buf);
                    return Ok(());
                }
                Err(err) if err.is_recoverable() => {
                    state.close_scope();
                    scanner.rewind(start);
                    last_failure = Some(err);
                }
                Err(hard) => {
                    state.close_scope();
                    return Err(hard);
                }
            }
        }
        let miss = self.miss(node, scanner);
        Err(match last_failure {
            Some(cause) => miss.caused_by(cause),
            None => miss,
        })
    }

    /// Greedy iteration up to `max`, then the minimum check. A lazy
    /// repetition settles for exactly `min` iterations. Failing the
    /// minimum does not rewind iterations that already succeeded. An
    /// iteration that consumes nothing ends the loop with the minimum
    /// considered satisfied.
    fn eval_repetition(
        &mut self,
        node: &GrammarNode,
        inner: &GrammarNode,
        min: u32,
        max: Option<u32>,
        lazy: bool,
        scanner: &mut Scanner,
        state: &mut MatchState,
    ) -> MatchResult<()> {
        let cap = if lazy { Some(min) } else { max };
        if cap == Some(0) {
            return Ok(());
        }

        let mut count: u32 = 0;
        let mut iteration_failure: Option<MatchError> = None;
        loop {
            if let Some(cap) = cap {
                if count >= cap {
                    break;
                }
            }
            let mark = scanner.location();
            state.open_scope();
            match self.eval(inner, scanner, state) {
                Ok(()) => {
                    let buf = state.close_scope();
                    state.top().merge(buf);
                    count += 1;
                    if scanner.location().offset == mark.offset {
                        return Ok(());
                    }
                }
                Err(err) if err.is_recoverable() => {
                    state.close_scope();
                    scanner.rewind(mark);
                    iteration_failure = Some(err);
                    break;
                }
                Err(hard) => {
                    state.close_scope();
                    return Err(hard);
                }
            }
        }

        if count >= min {
            return Ok(());
        }
        let miss = self.miss(node, scanner);
        Err(match iteration_failure {
            Some(cause) => miss.caused_by(cause),
            None => miss,
        })
    }

    fn eval_optional(
        &mut self,
        inner: &GrammarNode,
        scanner: &mut Scanner,
        state: &mut MatchState,
    ) -> MatchResult<()> {
        let mark = scanner.location();
        state.open_scope();
        match self.eval(inner, scanner, state) {
            Ok(()) => {
                let buf = state.close_scope();
                state.top().merge(buf);
            }
            Err(err) if err.is_recoverable() => {
                state.close_scope();
                scanner.rewind(mark);
            }
            Err(hard) => {
                state.close_scope();
                return Err(hard);
            }
        }
        Ok(())
    }

    /// Succeeds exactly when the inner matcher fails, then consumes
    /// input the inner matcher rejected: one character, or in
    /// maximizing mode as many as the inner matcher could at most
    /// have matched. Always at least one, so negation at the end of
    /// input fails.
    fn eval_negation(
        &mut self,
        node: &GrammarNode,
        inner: &GrammarNode,
        scanner: &mut Scanner,
        state: &mut MatchState,
    ) -> MatchResult<()> {
        let mark = scanner.location();
        state.open_scope();
        let attempt = self.eval(inner, scanner, state);
        state.close_scope();
        scanner.rewind(mark);

        match attempt {
            Ok(()) => Err(self.miss(node, scanner)),
            Err(hard) if !hard.is_recoverable() => Err(hard),
            Err(_) => {
                let width = match self.options.negation {
                    NegationMode::SingleChar => 1,
                    NegationMode::MaxLength => {
                        match self.lengths.max_len(inner, NegationMode::MaxLength) {
                            LenBound::Finite(n) => n.max(1),
                            LenBound::Unbounded => {
                                return Err(MatchError::UnboundedLength(inner.to_string()));
                            }
                        }
                    }
                };
                let take = width.min(scanner.remaining());
                if take == 0 {
                    return Err(self.miss(node, scanner));
                }
                if let Some(text) = scanner.read_string(take) {
                    state.top().push_str(&text);
                }
                Ok(())
            }
        }
    }

    fn eval_ignore(
        &mut self,
        inner: &GrammarNode,
        scanner: &mut Scanner,
        state: &mut MatchState,
    ) -> MatchResult<()> {
        state.open_scope();
        let outcome = self.eval(inner, scanner, state);
        state.close_scope();
        outcome
    }

    fn eval_join(
        &mut self,
        inner: &GrammarNode,
        scanner: &mut Scanner,
        state: &mut MatchState,
    ) -> MatchResult<()> {
        state.open_scope();
        match self.eval(inner, scanner, state) {
            Ok(()) => {
                let buf = state.close_scope();
                state.top().push_str(&buf.flat_text());
                Ok(())
            }
            Err(err) => {
                state.close_scope();
                Err(err)
            }
        }
    }

    fn eval_marker(
        &mut self,
        name: &str,
        inner: &GrammarNode,
        scanner: &mut Scanner,
        state: &mut MatchState,
    ) -> MatchResult<()> {
        state.open_scope();
        match self.eval(inner, scanner, state) {
            Ok(()) => {
                let buf = state.close_scope();
                state
                    .top()
                    .push_marker(weft_core::MarkerNode::new(name, buf.into_items()));
                Ok(())
            }
            Err(err) => {
                state.close_scope();
                Err(err)
            }
        }
    }

    fn eval_capture(
        &mut self,
        name: &str,
        inner: &GrammarNode,
        scanner: &mut Scanner,
        state: &mut MatchState,
    ) -> MatchResult<()> {
        state.open_scope();
        match self.eval(inner, scanner, state) {
            Ok(()) => {
                let buf = state.close_scope();
                state.captures.store(name, buf.flat_text());
                state.top().merge(buf);
                Ok(())
            }
            Err(err) => {
                state.close_scope();
                Err(err)
            }
        }
    }

    fn eval_backref(
        &mut self,
        node: &GrammarNode,
        name: &str,
        scanner: &mut Scanner,
        state: &mut MatchState,
    ) -> MatchResult<()> {
        let Some(text) = state.captures.recall(name).map(str::to_string) else {
            return Err(self.miss(node, scanner));
        };
        if !scanner.is_next(&text) {
            return Err(self.miss(node, scanner));
        }
        scanner.advance(text.chars().count());
        state.top().push_str(&text);
        Ok(())
    }

    /// Resolve and evaluate a named rule. Recoverable failures of the
    /// body are wrapped so reports show the rule chain; hard faults
    /// pass through untouched.
    fn eval_rule(
        &mut self,
        name: &str,
        scanner: &mut Scanner,
        state: &mut MatchState,
    ) -> MatchResult<()> {
        let rules = self.rules;
        let Some(def) = rules.def(name) else {
            return Err(MatchError::UndefinedRule(name.to_string()));
        };
        if state.depth >= self.options.max_depth {
            return Err(MatchError::DepthExceeded(self.options.max_depth));
        }

        let entry = scanner.location();
        state.depth += 1;
        let outcome = self.eval(def.body(), scanner, state);
        state.depth -= 1;

        outcome.map_err(|err| {
            if err.is_recoverable() {
                MatchError::RuleFailed {
                    rule: name.to_string(),
                    location: entry,
                    cause: Box::new(err),
                }
            } else {
                err
            }
        })
    }
}

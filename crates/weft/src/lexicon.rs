//! The [`Lexicon`]: a rule set plus the engine state to match it.
//!
//! A lexicon starts out interpreted: every match walks the grammar
//! trees directly. [`Lexicon::compile`] lowers the rules to matcher
//! programs and routes subsequent matches through the VM; rules left
//! out of compilation keep running on the interpreter through the same
//! rule table. Defining, optimizing, or re-rooting after compilation
//! drops the table, so a lexicon never runs stale programs.

use std::sync::Arc;

use weft_core::{MarkerNode, MatchError, MatchResult, MatchValue, Scanner, Token};
use weft_grammar::{
    GrammarNode, MatchOptions, OptimizerOptions, RuleDef, RuleId, RuleSet, match_node,
};
use weft_vm::RuleTable;

/// A named grammar and the machinery to match input against it.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    rules: RuleSet,
    options: MatchOptions,
    table: Option<Arc<RuleTable>>,
}

impl Lexicon {
    pub fn new() -> Self {
        Lexicon::default()
    }

    /// Replace the match options. Drops any compiled table, since
    /// programs bake options like the negation mode in.
    pub fn with_options(mut self, options: MatchOptions) -> Self {
        self.options = options;
        self.table = None;
        self
    }

    pub fn options(&self) -> &MatchOptions {
        &self.options
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Reserve a name so other rules can reference it before it is
    /// defined.
    pub fn declare(&mut self, name: &str) -> RuleId {
        self.table = None;
        self.rules.declare(name)
    }

    /// Register a rule with production metadata.
    pub fn define(&mut self, def: RuleDef) -> RuleId {
        self.table = None;
        self.rules.define(def)
    }

    /// Register a plain rule.
    pub fn define_rule(&mut self, name: &str, body: GrammarNode) -> RuleId {
        self.table = None;
        self.rules.define_rule(name, body)
    }

    /// Name the rule that [`Lexicon::match_input`], [`Lexicon::parse`],
    /// and [`Lexicon::tokenize`] start from.
    pub fn set_root(&mut self, name: &str) {
        self.table = None;
        self.rules.set_root(name);
    }

    /// Rewrite the rule bodies into cheaper equivalent shapes.
    pub fn optimize(&mut self, options: &OptimizerOptions) {
        self.table = None;
        self.rules.optimize(options);
    }

    /// Lower every defined rule to a matcher program.
    pub fn compile(&mut self) -> Result<(), weft_compiler::Error> {
        self.compile_excluding(&[])
    }

    /// Lower the rules to matcher programs, keeping the named ones on
    /// the tree interpreter.
    ///
    /// Exclusion is the escape hatch for rules the compiler rejects,
    /// such as a negation over an unbounded matcher in
    /// length-maximizing mode. Both engines share one capture memory
    /// per match, so excluded and compiled rules compose freely.
    pub fn compile_excluding(&mut self, exclude: &[&str]) -> Result<(), weft_compiler::Error> {
        let programs = weft_compiler::compile_excluding(&self.rules, &self.options, exclude)?;
        self.table = Some(Arc::new(RuleTable::new(
            self.rules.clone(),
            programs,
            self.options,
        )));
        Ok(())
    }

    pub fn is_compiled(&self) -> bool {
        self.table.is_some()
    }

    /// The compiled rule table, if [`Lexicon::compile`] has run since
    /// the last mutation. The table is behind an [`Arc`] so matches can
    /// run from several threads at once.
    pub fn table(&self) -> Option<&Arc<RuleTable>> {
        self.table.as_ref()
    }

    /// Match `input` against the root rule.
    pub fn match_input(&self, input: &str) -> MatchResult<MatchValue> {
        let root = self.rules.root_name().ok_or(MatchError::NoRoot)?;
        self.match_rule(root, input)
    }

    /// Match `input` against a named rule.
    pub fn match_rule(&self, name: &str, input: &str) -> MatchResult<MatchValue> {
        let mut scanner = Scanner::new(input);
        self.match_at(name, &mut scanner)
    }

    /// Match the root rule and shape the result into a tree.
    ///
    /// The match items become children of a marker named after the
    /// root rule, passed through the rule's node factory when one is
    /// registered.
    pub fn parse(&self, input: &str) -> MatchResult<MarkerNode> {
        let root = self.rules.root_name().ok_or(MatchError::NoRoot)?;
        let value = self.match_rule(root, input)?;
        let node = MarkerNode::new(root, value.items);
        Ok(match self.rules.def(root) {
            Some(def) => def.build_node(node),
            None => node,
        })
    }

    /// Match the root rule repeatedly until the input is exhausted,
    /// producing one token per match.
    ///
    /// Each token carries the root rule's token kind and the converted
    /// value when the rule registers those. A match that consumes
    /// nothing is reported as a failure rather than looping forever.
    pub fn tokenize(&self, input: &str) -> MatchResult<Vec<Token>> {
        let root = self.rules.root_name().ok_or(MatchError::NoRoot)?;
        let def = self.rules.def(root);
        let mut scanner = Scanner::new(input);
        let mut tokens = Vec::new();
        while !scanner.at_end() {
            let before = scanner.offset();
            let value = self.match_at(root, &mut scanner)?;
            if scanner.offset() == before {
                return Err(MatchError::mismatch(
                    scanner.location(),
                    format!("rule `{root}` to consume input"),
                    scanner.describe_next(),
                ));
            }
            let converted = def.and_then(|d| d.convert_text(&value.text));
            tokens.push(Token {
                rule: root.to_string(),
                kind: def.and_then(|d| d.kind()),
                text: value.text,
                value: converted,
                span: value.span,
            });
        }
        Ok(tokens)
    }

    /// Run one rule at the scanner's position on whichever engine is
    /// live. Both paths report an undefined name the same way.
    fn match_at(&self, name: &str, scanner: &mut Scanner) -> MatchResult<MatchValue> {
        match &self.table {
            Some(table) => weft_vm::run_rule(table, name, scanner),
            None => {
                let reference = GrammarNode::RuleReference(name.to_string());
                match_node(&self.rules, &reference, scanner, &self.options)
            }
        }
    }
}

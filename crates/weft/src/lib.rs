//! Weft: grammar combinators that match, parse, and tokenize text.
//!
//! Grammars are built from composable [`GrammarNode`] values, collected into a
//! [`Lexicon`], and run either by the backtracking tree interpreter or by
//! compiled matcher programs on the bytecode VM. Both engines produce the same
//! matches and the same failures.
//!
//! # Example
//!
//! ```
//! use weft::{Lexicon, char_range};
//!
//! let mut lexicon = Lexicon::new();
//! lexicon.define_rule(
//!     "number",
//!     char_range('0', '9')
//!         .one_or_more()
//!         .then(weft::ch('.').then(char_range('0', '9').one_or_more()).optional()),
//! );
//! lexicon.set_root("number");
//! lexicon.compile().expect("the grammar compiles");
//!
//! let value = lexicon.match_input("3.14!").expect("a match");
//! assert_eq!(value.text, "3.14");
//! ```

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod lexicon;
pub mod report;


pub use lexicon::Lexicon;
pub use report::{report, report_colored};

pub use weft_bytecode::{Program, dump};
/// Errors raised while lowering a rule set to matcher programs.
pub use weft_compiler::Error as CompileError;
pub use weft_core::{
    CaptureMemory, Location, MarkerNode, MatchError, MatchItem, MatchResult, MatchValue, Scanner,
    Span, Token, TokenKind, TokenValue,
};
pub use weft_grammar::{
    DEFAULT_MAX_DEPTH, GrammarNode, MatchOptions, NegationMode, OptimizerOptions, RuleDef, RuleId,
    RuleSet, backref, ch, char_range, eof, lit, match_node, one_of, pred, rule,
};
pub use weft_vm::{NoopTracer, PrintTracer, RuleEntry, RuleTable, Tracer, Vm};

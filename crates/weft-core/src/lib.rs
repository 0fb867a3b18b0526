#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data types shared by the weft grammar engine crates.
//!
//! Everything here is engine-agnostic: the character [`Scanner`] the
//! matchers consume input through, [`Location`]/[`Span`] positions,
//! capture buffers and their [`MatchItem`] output, token types for
//! lexer-style rules, and the [`MatchError`] failure taxonomy both the
//! tree interpreter and the compiled runtime report through.

use std::sync::Arc;

pub mod capture;
pub mod error;
pub mod location;
pub mod scanner;
pub mod token;


pub use capture::{CaptureBuf, CaptureMemory, MarkerNode, MatchItem, MatchValue};
pub use error::{MatchError, MatchResult};
pub use location::{Location, Span};
pub use scanner::Scanner;
pub use token::{Token, TokenKind, TokenValue};

/// Character classifier backing predicate terminals.
///
/// Shared so a grammar can be cloned and matched from several threads.
pub type CharPredicate = Arc<dyn Fn(char) -> bool + Send + Sync>;

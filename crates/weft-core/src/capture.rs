//! Match output: items, marker nodes, and scope accumulators.
//!
//! Matchers append what they consume into the innermost open
//! [`CaptureBuf`]. Scopes that post-process their output (ignore, join,
//! markers, named captures) open a fresh buffer, run their inner
//! matcher, then fold the buffer into the parent. Adjacent plain text
//! coalesces into a single item so `"a" "b" "c"` captures as `"abc"`,
//! not three fragments.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::location::Span;

/// One element of match output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchItem {
    /// Consumed input text.
    Text(String),
    /// A structural node emitted by a marker scope.
    Marker(MarkerNode),
}

impl MatchItem {
    fn write_flat_text(&self, out: &mut String) {
        match self {
            MatchItem::Text(text) => out.push_str(text),
            MatchItem::Marker(node) => {
                for child in &node.children {
                    child.write_flat_text(out);
                }
            }
        }
    }
}

/// A named node in the match output tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerNode {
    pub name: String,
    pub children: Vec<MatchItem>,
}

impl MarkerNode {
    pub fn new(name: impl Into<String>, children: Vec<MatchItem>) -> Self {
        MarkerNode {
            name: name.into(),
            children,
        }
    }

    /// All text under this node, markers flattened away.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            child.write_flat_text(&mut out);
        }
        out
    }
}

/// Accumulator for one capture scope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureBuf {
    items: Vec<MatchItem>,
}

impl CaptureBuf {
    pub fn new() -> Self {
        CaptureBuf::default()
    }

    pub fn push_char(&mut self, c: char) {
        match self.items.last_mut() {
            Some(MatchItem::Text(text)) => text.push(c),
            _ => self.items.push(MatchItem::Text(c.to_string())),
        }
    }

    pub fn push_str(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        match self.items.last_mut() {
            Some(MatchItem::Text(existing)) => existing.push_str(text),
            _ => self.items.push(MatchItem::Text(text.to_string())),
        }
    }

    pub fn push_marker(&mut self, node: MarkerNode) {
        self.items.push(MatchItem::Marker(node));
    }

    /// Append another buffer's items, coalescing text at the seam.
    pub fn merge(&mut self, other: CaptureBuf) {
        for item in other.items {
            match item {
                MatchItem::Text(text) => self.push_str(&text),
                MatchItem::Marker(node) => self.items.push(MatchItem::Marker(node)),
            }
        }
    }

    /// Concatenated text of every item, markers flattened away.
    pub fn flat_text(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            item.write_flat_text(&mut out);
        }
        out
    }

    pub fn items(&self) -> &[MatchItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<MatchItem> {
        self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// Per-invocation memory for named captures.
///
/// Written by capture scopes on success, read by backreferences.
/// Cleared between top-level match invocations, never during one.
#[derive(Debug, Clone, Default)]
pub struct CaptureMemory {
    slots: HashMap<String, String>,
}

impl CaptureMemory {
    pub fn new() -> Self {
        CaptureMemory::default()
    }

    pub fn store(&mut self, name: &str, text: String) {
        self.slots.insert(name.to_string(), text);
    }

    pub fn recall(&self, name: &str) -> Option<&str> {
        self.slots.get(name).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

/// The success value of a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchValue {
    /// Structured output: text runs interleaved with marker nodes.
    pub items: Vec<MatchItem>,
    /// All consumed-and-kept text, flattened.
    pub text: String,
    /// Input region the match covered.
    pub span: Span,
}

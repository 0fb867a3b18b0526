//! Named rule registry with two-phase binding.
//!
//! Rules can be *declared* (name reserved, body pending) before they
//! are *defined*, so mutually recursive grammars build in any order.
//! Ids are stable insertion indices: declaring or defining a name that
//! already exists reuses its slot.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use weft_core::{MarkerNode, TokenKind, TokenValue};

use crate::node::GrammarNode;
use crate::optimize::{self, OptimizerOptions};

/// Stable index of a rule within its [`RuleSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub u32);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

type ConvertFn = Arc<dyn Fn(&str) -> Option<TokenValue> + Send + Sync>;
type FactoryFn = Arc<dyn Fn(MarkerNode) -> MarkerNode + Send + Sync>;

/// A named rule: a grammar body plus optional production metadata.
#[derive(Clone)]
pub struct RuleDef {
    name: String,
    body: GrammarNode,
    token_kind: Option<TokenKind>,
    convert: Option<ConvertFn>,
    node_factory: Option<FactoryFn>,
}

impl RuleDef {
    pub fn new(name: impl Into<String>, body: GrammarNode) -> Self {
        RuleDef {
            name: name.into(),
            body,
            token_kind: None,
            convert: None,
            node_factory: None,
        }
    }

    /// Tag tokens produced by this rule with a class.
    pub fn token_kind(mut self, kind: TokenKind) -> Self {
        self.token_kind = Some(kind);
        self
    }

    /// Convert matched text into a token payload.
    pub fn convert(
        mut self,
        f: impl Fn(&str) -> Option<TokenValue> + Send + Sync + 'static,
    ) -> Self {
        self.convert = Some(Arc::new(f));
        self
    }

    /// Post-process the marker node this rule produces when parsing.
    pub fn node_factory(
        mut self,
        f: impl Fn(MarkerNode) -> MarkerNode + Send + Sync + 'static,
    ) -> Self {
        self.node_factory = Some(Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &GrammarNode {
        &self.body
    }

    pub fn kind(&self) -> Option<TokenKind> {
        self.token_kind
    }

    /// Apply the converter to matched text, if one is declared.
    pub fn convert_text(&self, text: &str) -> Option<TokenValue> {
        self.convert.as_ref().and_then(|f| f(text))
    }

    /// Run the node factory, or return the default node unchanged.
    pub fn build_node(&self, node: MarkerNode) -> MarkerNode {
        match &self.node_factory {
            Some(f) => f(node),
            None => node,
        }
    }

    pub(crate) fn map_body(mut self, f: impl FnOnce(GrammarNode) -> GrammarNode) -> RuleDef {
        let body = std::mem::replace(&mut self.body, GrammarNode::Sequence(Vec::new()));
        self.body = f(body);
        self
    }
}

impl fmt::Debug for RuleDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleDef")
            .field("name", &self.name)
            .field("body", &self.body)
            .field("token_kind", &self.token_kind)
            .finish_non_exhaustive()
    }
}

/// The rules of one grammar, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: IndexMap<String, Option<RuleDef>>,
    root: Option<String>,
}

impl RuleSet {
    pub fn new() -> Self {
        RuleSet::default()
    }

    /// Reserve a name without binding a body yet.
    pub fn declare(&mut self, name: &str) -> RuleId {
        let entry = self.rules.entry(name.to_string());
        let id = RuleId(entry.index() as u32);
        entry.or_insert(None);
        id
    }

    /// Bind a rule definition, declaring the name if needed.
    /// Redefining an existing rule replaces its previous definition.
    pub fn define(&mut self, def: RuleDef) -> RuleId {
        let entry = self.rules.entry(def.name.clone());
        let id = RuleId(entry.index() as u32);
        *entry.or_insert(None) = Some(def);
        id
    }

    /// Shorthand for defining a rule with no metadata.
    pub fn define_rule(&mut self, name: &str, body: GrammarNode) -> RuleId {
        self.define(RuleDef::new(name, body))
    }

    /// Name the entry rule, declaring it if needed.
    pub fn set_root(&mut self, name: &str) {
        self.declare(name);
        self.root = Some(name.to_string());
    }

    pub fn root_name(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn id_of(&self, name: &str) -> Option<RuleId> {
        self.rules.get_index_of(name).map(|i| RuleId(i as u32))
    }

    pub fn name_at(&self, id: RuleId) -> Option<&str> {
        self.rules.get_index(id.0 as usize).map(|(name, _)| name.as_str())
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    /// The definition bound to `name`, or `None` when the name is
    /// unknown or declared but not yet bound.
    pub fn def(&self, name: &str) -> Option<&RuleDef> {
        self.rules.get(name).and_then(Option::as_ref)
    }

    pub fn def_at(&self, id: RuleId) -> Option<&RuleDef> {
        self.rules
            .get_index(id.0 as usize)
            .and_then(|(_, def)| def.as_ref())
    }

    pub fn body(&self, name: &str) -> Option<&GrammarNode> {
        self.def(name).map(RuleDef::body)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &str, Option<&RuleDef>)> {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, (name, def))| (RuleId(i as u32), name.as_str(), def.as_ref()))
    }

    /// Rewrite every bound rule body with the enabled optimizer passes.
    pub fn optimize(&mut self, options: &OptimizerOptions) {
        optimize::optimize_rules(self, options);
    }

    /// Take a definition out of its slot for in-place rewriting.
    /// While it is out, references to the rule resolve as unbound.
    pub(crate) fn take_def(&mut self, name: &str) -> Option<RuleDef> {
        self.rules.get_mut(name)?.take()
    }

    pub(crate) fn put_def(&mut self, name: &str, def: RuleDef) {
        if let Some(slot) = self.rules.get_mut(name) {
            *slot = Some(def);
        }
    }
}

//! Side-table pools with value deduplication.

use std::collections::HashMap;

use weft_bytecode::{PredId, PredicateEntry, SetId, StrId};
use weft_grammar::PredicateNode;

/// Interns strings, handing out stable [`StrId`]s.
#[derive(Debug, Default)]
pub(crate) struct StringPool {
    lookup: HashMap<String, StrId>,
    strings: Vec<String>,
}

impl StringPool {
    pub fn intern(&mut self, s: &str) -> StrId {
        if let Some(id) = self.lookup.get(s) {
            return *id;
        }
        let id = StrId(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.lookup.insert(s.to_string(), id);
        id
    }

    pub fn into_strings(self) -> Vec<String> {
        self.strings
    }
}

/// Interns sorted character sets.
#[derive(Debug, Default)]
pub(crate) struct SetPool {
    lookup: HashMap<Box<[char]>, SetId>,
    sets: Vec<Box<[char]>>,
}

impl SetPool {
    pub fn intern(&mut self, set: &[char]) -> SetId {
        if let Some(id) = self.lookup.get(set) {
            return *id;
        }
        let id = SetId(self.sets.len() as u32);
        self.sets.push(set.into());
        self.lookup.insert(set.into(), id);
        id
    }

    pub fn into_sets(self) -> Vec<Box<[char]>> {
        self.sets
    }
}

/// Interns predicates. Predicates share the grammar algebra's identity
/// rule: the name is the key, the first function registered under it
/// wins.
#[derive(Debug, Default)]
pub(crate) struct PredPool {
    lookup: HashMap<String, PredId>,
    entries: Vec<PredicateEntry>,
}

impl PredPool {
    pub fn intern(&mut self, pred: &PredicateNode) -> PredId {
        if let Some(id) = self.lookup.get(&pred.name) {
            return *id;
        }
        let id = PredId(self.entries.len() as u32);
        self.entries.push(PredicateEntry {
            name: pred.name.clone(),
            test: pred.test.clone(),
        });
        self.lookup.insert(pred.name.clone(), id);
        id
    }

    pub fn into_entries(self) -> Vec<PredicateEntry> {
        self.entries
    }
}

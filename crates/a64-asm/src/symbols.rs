//! Label table built by the first assembly pass.
//!
//! Separate chaining over a bucket vector; the bucket count doubles and every
//! entry is rehashed once the load factor passes 0.75. Labels are owned here
//! and looked up by `&str`.

use crate::error::AsmError;

const INITIAL_CAPACITY: usize = 16;
const MAX_LOAD_FACTOR: f64 = 0.75;

#[derive(Debug, Clone)]
struct Symbol {
    label: Box<str>,
    address: u64,
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
    buckets: Vec<Vec<Symbol>>,
    len: usize,
}

/// djb2
fn hash(label: &str) -> u64 {
    label
        .bytes()
        .fold(5381u64, |h, b| h.wrapping_mul(33).wrapping_add(b as u64))
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buckets: vec![Vec::new(); capacity.max(1)],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn bucket(&self, label: &str) -> usize {
        (hash(label) % self.buckets.len() as u64) as usize
    }

    pub fn define(&mut self, label: &str, address: u64) -> Result<(), AsmError> {
        let idx = self.bucket(label);
        if self.buckets[idx].iter().any(|s| &*s.label == label) {
            return Err(AsmError::DuplicateLabel(label.to_string()));
        }
        self.buckets[idx].push(Symbol {
            label: label.into(),
            address,
        });
        self.len += 1;
        if self.len as f64 / self.buckets.len() as f64 > MAX_LOAD_FACTOR {
            self.grow();
        }
        Ok(())
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.buckets[self.bucket(label)]
            .iter()
            .find(|s| &*s.label == label)
            .map(|s| s.address)
    }

    pub fn resolve(&self, label: &str) -> Result<u64, AsmError> {
        self.get(label)
            .ok_or_else(|| AsmError::UndefinedLabel(label.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.buckets
            .iter()
            .flatten()
            .map(|s| (&*s.label, s.address))
    }

    fn grow(&mut self) {
        let new_capacity = self.buckets.len() * 2;
        let old = std::mem::replace(&mut self.buckets, vec![Vec::new(); new_capacity]);
        for sym in old.into_iter().flatten() {
            let idx = self.bucket(&sym.label);
            self.buckets[idx].push(sym);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_then_resolve() {
        let mut st = SymbolTable::new();
        st.define("loop", 8).unwrap();
        st.define(".end", 16).unwrap();
        assert_eq!(st.resolve("loop").unwrap(), 8);
        assert_eq!(st.resolve(".end").unwrap(), 16);
        assert!(matches!(st.resolve("nope"), Err(AsmError::UndefinedLabel(l)) if l == "nope"));
    }

    #[test]
    fn duplicate_is_rejected_and_keeps_first() {
        let mut st = SymbolTable::new();
        st.define("a", 4).unwrap();
        assert!(matches!(st.define("a", 12), Err(AsmError::DuplicateLabel(_))));
        assert_eq!(st.get("a"), Some(4));
        assert_eq!(st.len(), 1);
    }

    #[test]
    fn grows_past_load_factor() {
        let mut st = SymbolTable::with_capacity(4);
        for i in 0..4 {
            st.define(&format!("l{i}"), i * 4).unwrap();
        }
        assert_eq!(st.capacity(), 8);
        assert_eq!(st.len(), 4);
        for i in 0..4 {
            assert_eq!(st.get(&format!("l{i}")), Some(i * 4));
        }
    }
}

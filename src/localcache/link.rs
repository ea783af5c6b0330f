//! Linked-key index
//!
//! Records which cached keys are derived from which parent keys, so that
//! deleting a parent also evicts everything computed from it. The index is
//! guarded by its own lock: a cascade touches keys in arbitrary shards.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct LinkIndex {
    /// parent -> keys derived from it
    dependents: HashMap<String, HashSet<String>>,
    /// dependent -> parents it was derived from
    parents: HashMap<String, HashSet<String>>,
}

/// Reverse index from parent keys to dependent keys
#[derive(Debug, Default)]
pub struct Link {
    index: Mutex<LinkIndex>,
}

impl Link {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` as depending on each of `parents`
    pub fn link(&self, key: &str, parents: &[String]) {
        if parents.is_empty() {
            return;
        }
        let mut index = self.index.lock();
        for parent in parents {
            if parent == key {
                continue;
            }
            index
                .dependents
                .entry(parent.clone())
                .or_default()
                .insert(key.to_string());
            index
                .parents
                .entry(key.to_string())
                .or_default()
                .insert(parent.clone());
        }
    }

    /// Unregister `key` and return every key that transitively depends on it.
    ///
    /// The returned set never contains `key` itself.
    pub fn del(&self, key: &str) -> HashSet<String> {
        let mut index = self.index.lock();
        let mut cascade = HashSet::new();
        let mut pending = vec![key.to_string()];

        while let Some(current) = pending.pop() {
            index.unlink_from_parents(&current);
            if let Some(dependents) = index.dependents.remove(&current) {
                for dependent in dependents {
                    if dependent != key && cascade.insert(dependent.clone()) {
                        pending.push(dependent);
                    }
                }
            }
        }
        cascade
    }

    /// Number of parent keys with registered dependents
    pub fn len(&self) -> usize {
        self.index.lock().dependents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LinkIndex {
    fn unlink_from_parents(&mut self, key: &str) {
        let Some(parents) = self.parents.remove(key) else {
            return;
        };
        for parent in parents {
            if let Some(dependents) = self.dependents.get_mut(&parent) {
                dependents.remove(key);
                if dependents.is_empty() {
                    self.dependents.remove(&parent);
                }
            }
        }
    }
}

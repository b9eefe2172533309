// Copyright 2025 OctoQTI Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-scope duration accumulators
//!
//! One entry per test, test part and assessment section identifier; item
//! occurrences keep their own duration inside their session.

use octoqti_model::QtiDuration;
use rustc_hash::FxHashMap;

/// Accumulated elapsed time per scope identifier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationStore {
    order: Vec<String>,
    entries: FxHashMap<String, QtiDuration>,
}

impl DurationStore {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated duration of a scope; zero for a scope never seen
    pub fn get(&self, identifier: &str) -> QtiDuration {
        self.entries
            .get(identifier)
            .copied()
            .unwrap_or(QtiDuration::ZERO)
    }

    /// True when an entry exists for the scope
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    /// Add elapsed time to a scope, initializing it when first seen
    pub fn add(&mut self, identifier: &str, duration: QtiDuration) {
        match self.entries.get_mut(identifier) {
            Some(entry) => *entry += duration,
            None => {
                self.order.push(identifier.to_string());
                self.entries.insert(identifier.to_string(), duration);
            }
        }
    }

    /// Overwrite a scope's accumulated duration
    pub fn set(&mut self, identifier: &str, duration: QtiDuration) {
        if !self.entries.contains_key(identifier) {
            self.order.push(identifier.to_string());
        }
        self.entries.insert(identifier.to_string(), duration);
    }

    /// Iterate entries in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&str, QtiDuration)> {
        self.order
            .iter()
            .filter_map(move |id| self.entries.get(id).map(|d| (id.as_str(), *d)))
    }

    /// Number of scopes tracked
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when no scope is tracked
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseen_scope_reads_zero() {
        let store = DurationStore::new();
        assert_eq!(store.get("P01"), QtiDuration::ZERO);
    }

    #[test]
    fn add_accumulates() {
        let mut store = DurationStore::new();
        store.add("P01", QtiDuration::from_seconds(10));
        store.add("P01", QtiDuration::from_seconds(5));
        assert_eq!(store.get("P01"), QtiDuration::from_seconds(15));
    }

    #[test]
    fn set_overwrites_and_registers() {
        let mut store = DurationStore::new();
        store.set("tst", QtiDuration::ZERO);
        store.add("tst", QtiDuration::from_seconds(90));
        store.set("tst", QtiDuration::from_seconds(60));
        assert_eq!(store.get("tst"), QtiDuration::from_seconds(60));
        assert!(store.contains("tst"));
    }

    #[test]
    fn iteration_follows_first_seen_order() {
        let mut store = DurationStore::new();
        store.set("tst", QtiDuration::ZERO);
        store.set("P01", QtiDuration::ZERO);
        store.set("S01", QtiDuration::ZERO);
        let ids: Vec<_> = store.iter().map(|(id, _)| id.to_string()).collect();
        assert_eq!(ids, ["tst", "P01", "S01"]);
    }
}

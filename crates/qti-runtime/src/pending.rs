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

//! Pending responses for simultaneous submission
//!
//! In simultaneous mode, responses are staged here when an attempt ends and
//! processed in arrival order when the test part ends.

use octoqti_model::{AssessmentItemRef, State};
use std::sync::Arc;

/// Responses staged for one item occurrence
#[derive(Clone)]
pub struct PendingResponses {
    /// The item reference the responses belong to
    pub item_ref: Arc<AssessmentItemRef>,
    /// Occurrence of the item reference
    pub occurrence: usize,
    /// The staged response variables
    pub responses: State,
}

impl PendingResponses {
    /// Stage responses for `(item_ref, occurrence)`
    pub fn new(item_ref: Arc<AssessmentItemRef>, occurrence: usize, responses: State) -> Self {
        Self {
            item_ref,
            occurrence,
            responses,
        }
    }
}

/// The staged-response queue of a test session
#[derive(Clone, Default)]
pub struct PendingResponseStore {
    entries: Vec<PendingResponses>,
}

impl PendingResponseStore {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an entry. A second staging for the same occurrence replaces the
    /// first in place, keeping its queue slot.
    pub fn add_pending(&mut self, pending: PendingResponses) {
        let key = (
            pending.item_ref.identifier.clone(),
            pending.occurrence,
        );
        match self
            .entries
            .iter_mut()
            .find(|e| e.item_ref.identifier == key.0 && e.occurrence == key.1)
        {
            Some(slot) => *slot = pending,
            None => self.entries.push(pending),
        }
    }

    /// Borrow the staged entry for an occurrence, when one exists
    pub fn get_pending(&self, item_ref: &str, occurrence: usize) -> Option<&PendingResponses> {
        self.entries
            .iter()
            .find(|e| e.item_ref.identifier == item_ref && e.occurrence == occurrence)
    }

    /// All staged entries in arrival order
    pub fn all(&self) -> &[PendingResponses] {
        &self.entries
    }

    /// Drop every staged entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of staged entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is staged
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octoqti_model::AssessmentItemRef;

    fn pending(id: &str, occurrence: usize) -> PendingResponses {
        PendingResponses::new(
            Arc::new(AssessmentItemRef::new(id, format!("{id}.xml"))),
            occurrence,
            State::new(),
        )
    }

    #[test]
    fn arrival_order_is_kept() {
        let mut store = PendingResponseStore::new();
        store.add_pending(pending("Q02", 0));
        store.add_pending(pending("Q01", 0));
        let ids: Vec<_> = store
            .all()
            .iter()
            .map(|p| p.item_ref.identifier.clone())
            .collect();
        assert_eq!(ids, ["Q02", "Q01"]);
    }

    #[test]
    fn restaging_replaces_in_place() {
        let mut store = PendingResponseStore::new();
        store.add_pending(pending("Q01", 0));
        store.add_pending(pending("Q02", 0));
        store.add_pending(pending("Q01", 0));
        assert_eq!(store.len(), 2);
        let ids: Vec<_> = store
            .all()
            .iter()
            .map(|p| p.item_ref.identifier.clone())
            .collect();
        assert_eq!(ids, ["Q01", "Q02"]);
    }

    #[test]
    fn lookup_and_clear() {
        let mut store = PendingResponseStore::new();
        store.add_pending(pending("Q01", 1));
        assert!(store.get_pending("Q01", 1).is_some());
        assert!(store.get_pending("Q01", 0).is_none());
        store.clear();
        assert!(store.is_empty());
    }
}

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

//! Item session store
//!
//! Maps `(itemRef identifier, occurrence)` to at most one [`ItemSession`],
//! iterable in insertion order.

use crate::error::{Result, SessionError};
use crate::item_session::ItemSession;
use rustc_hash::FxHashMap;

type Key = (String, usize);

/// The session store of a test session
#[derive(Default)]
pub struct ItemSessionStore {
    sessions: Vec<ItemSession>,
    index: FxHashMap<Key, usize>,
}

impl ItemSessionStore {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session under its `(itemRef, occurrence)` key.
    ///
    /// At most one session may exist per key; a duplicate is an invariant
    /// breach.
    pub fn add_session(&mut self, session: ItemSession) -> Result<()> {
        let key = (
            session.item_ref().identifier.clone(),
            session.occurrence(),
        );
        if self.index.contains_key(&key) {
            return Err(SessionError::logic(format!(
                "an item session already exists for '{}.{}'",
                key.0, key.1
            )));
        }
        self.index.insert(key, self.sessions.len());
        self.sessions.push(session);
        Ok(())
    }

    /// True when a session exists for the key
    pub fn has_session(&self, item_ref: &str, occurrence: usize) -> bool {
        self.index
            .contains_key(&(item_ref.to_string(), occurrence))
    }

    /// Borrow a session by key
    pub fn get_session(&self, item_ref: &str, occurrence: usize) -> Option<&ItemSession> {
        self.index
            .get(&(item_ref.to_string(), occurrence))
            .map(|&i| &self.sessions[i])
    }

    /// Mutably borrow a session by key
    pub fn get_session_mut(
        &mut self,
        item_ref: &str,
        occurrence: usize,
    ) -> Option<&mut ItemSession> {
        let i = *self.index.get(&(item_ref.to_string(), occurrence))?;
        Some(&mut self.sessions[i])
    }

    /// Number of sessions held
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True when no session is held
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Number of sessions held for one item reference
    pub fn occurrence_count(&self, item_ref: &str) -> usize {
        self.index.keys().filter(|(id, _)| id == item_ref).count()
    }

    /// Iterate sessions in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ItemSession> {
        self.sessions.iter()
    }

    /// Iterate sessions mutably, in insertion order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ItemSession> {
        self.sessions.iter_mut()
    }
}

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

//! Snapshot storage seam
//!
//! The codec defines the byte stream; a storage backend keeps it per
//! session identifier. Backends must serialize access per session — the
//! codec itself never locks.

use crate::error::{CodecError, Result};
use bytes::Bytes;
use rustc_hash::FxHashMap;
use std::sync::Mutex;

/// Stores and retrieves encoded session streams by session identifier
pub trait SessionStorage: Send + Sync {
    /// The stream last persisted for `session_id`
    fn retrieval_stream(&self, session_id: &str) -> Result<Bytes>;

    /// Persist `stream` under `session_id`, replacing any earlier one
    fn persist_stream(&self, session_id: &str, stream: Bytes) -> Result<()>;
}

/// A process-local storage backend, for tests and embedders
#[derive(Default)]
pub struct InMemorySessionStorage {
    streams: Mutex<FxHashMap<String, Bytes>>,
}

impl InMemorySessionStorage {
    /// An empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored streams
    pub fn len(&self) -> usize {
        self.streams.lock().expect("storage mutex poisoned").len()
    }

    /// True when nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStorage for InMemorySessionStorage {
    fn retrieval_stream(&self, session_id: &str) -> Result<Bytes> {
        self.streams
            .lock()
            .expect("storage mutex poisoned")
            .get(session_id)
            .cloned()
            .ok_or_else(|| CodecError::NotFound {
                session_id: session_id.to_string(),
            })
    }

    fn persist_stream(&self, session_id: &str, stream: Bytes) -> Result<()> {
        self.streams
            .lock()
            .expect("storage mutex poisoned")
            .insert(session_id.to_string(), stream);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_and_retrieve() {
        let storage = InMemorySessionStorage::new();
        storage
            .persist_stream("s1", Bytes::from_static(b"\x01\x02"))
            .unwrap();
        assert_eq!(
            storage.retrieval_stream("s1").unwrap(),
            Bytes::from_static(b"\x01\x02")
        );
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn missing_session_is_not_found() {
        let storage = InMemorySessionStorage::new();
        assert!(matches!(
            storage.retrieval_stream("absent"),
            Err(CodecError::NotFound { .. })
        ));
    }

    #[test]
    fn persisting_replaces_the_stream() {
        let storage = InMemorySessionStorage::new();
        storage
            .persist_stream("s1", Bytes::from_static(b"old"))
            .unwrap();
        storage
            .persist_stream("s1", Bytes::from_static(b"new"))
            .unwrap();
        assert_eq!(
            storage.retrieval_stream("s1").unwrap(),
            Bytes::from_static(b"new")
        );
    }
}

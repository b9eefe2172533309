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

//! Error types for the snapshot codec

use octoqti_model::ModelError;
use octoqti_runtime::SessionError;
use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Faults raised while encoding or decoding a session snapshot
#[derive(Error, Debug)]
pub enum CodecError {
    /// The stream ended before the expected field
    #[error("Truncated stream: needed {needed} more byte(s) for {what}")]
    Truncated {
        /// Field being read
        what: &'static str,
        /// Missing byte count
        needed: usize,
    },

    /// The stream carries a different format version
    #[error("Snapshot format version {found} is not supported (expected {expected})")]
    VersionMismatch {
        /// Version this codec writes
        expected: u8,
        /// Version found in the stream
        found: u8,
    },

    /// A field does not fit the fixed width the format gives it
    #[error("{what} of {value} exceeds the format limit of {limit}")]
    FieldOverflow {
        /// Field being written
        what: &'static str,
        /// The oversized value
        value: usize,
        /// The format's limit
        limit: usize,
    },

    /// A component index that the seeker cannot resolve
    #[error("No {class} component at index {index}")]
    UnknownComponent {
        /// Component class name
        class: &'static str,
        /// The unresolvable index
        index: usize,
    },

    /// A component missing from the seeker's tables
    #[error("Component '{identifier}' is not indexed as {class}")]
    UnindexedComponent {
        /// Component class name
        class: &'static str,
        /// Identifier of the missing component
        identifier: String,
    },

    /// A length-prefixed string holding invalid UTF-8
    #[error("Invalid UTF-8 in a string field")]
    InvalidUtf8,

    /// An enum discriminant or value outside its domain
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The decoded pieces do not assemble into a session
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The stream disagrees with the assessment tree it is decoded against
    #[error("Snapshot does not match the assessment test: {message}")]
    ModelMismatch {
        /// Human-readable description
        message: String,
    },

    /// The storage backend has no stream for the requested session
    #[error("No stored snapshot for session '{session_id}'")]
    NotFound {
        /// The requested session identifier
        session_id: String,
    },

    /// The storage backend failed
    #[error("Snapshot storage failed: {message}")]
    Storage {
        /// Human-readable description
        message: String,
    },
}

impl CodecError {
    /// Create a model mismatch error
    pub fn model_mismatch(message: impl Into<String>) -> Self {
        Self::ModelMismatch {
            message: message.into(),
        }
    }
}

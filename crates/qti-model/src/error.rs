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

//! Error types for the model crate

use crate::types::{BaseType, Cardinality};
use thiserror::Error;

/// Result type alias for model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Model-specific error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A variable identifier that matches none of the accepted forms
    /// (`name`, `prefix.name`, `prefix.N.name`)
    #[error("Malformed variable identifier: '{identifier}'")]
    MalformedIdentifier {
        /// The offending identifier string
        identifier: String,
    },

    /// A container value holding more than one base type
    #[error("Mixed container: expected {expected} but found {found}")]
    MixedContainer {
        /// Base type of the first element
        expected: BaseType,
        /// Base type of the offending element
        found: BaseType,
    },

    /// A value assigned with the wrong cardinality
    #[error("Cardinality mismatch for '{identifier}': expected {expected}, found {found}")]
    CardinalityMismatch {
        /// Identifier of the target variable
        identifier: String,
        /// Declared cardinality
        expected: Cardinality,
        /// Cardinality of the assigned value
        found: Cardinality,
    },

    /// A value assigned with the wrong base type
    #[error("Base type mismatch for '{identifier}': expected {expected}, found {found}")]
    BaseTypeMismatch {
        /// Identifier of the target variable
        identifier: String,
        /// Declared base type
        expected: BaseType,
        /// Base type of the assigned value
        found: BaseType,
    },

    /// An ISO-8601 duration that could not be parsed
    #[error("Invalid duration: '{value}'")]
    InvalidDuration {
        /// The invalid lexical value
        value: String,
    },

    /// A duration operation that would produce a negative duration
    #[error("Duration arithmetic underflow: {message}")]
    DurationUnderflow {
        /// Human-readable description of the failing operation
        message: String,
    },

    /// A variable looked up by a name with no binding in the target state
    #[error("No variable '{identifier}' in the target state")]
    UnknownVariable {
        /// Identifier of the missing variable
        identifier: String,
    },

    /// A raw discriminant that maps to no enum variant
    #[error("Unknown {what} value: {value}")]
    UnknownEnumValue {
        /// Which enumeration was being decoded
        what: &'static str,
        /// The raw value
        value: u8,
    },
}

impl ModelError {
    /// Create a malformed identifier error
    pub fn malformed_identifier(identifier: impl Into<String>) -> Self {
        Self::MalformedIdentifier {
            identifier: identifier.into(),
        }
    }

    /// Create an invalid duration error
    pub fn invalid_duration(value: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
        }
    }

    /// Create an unknown variable error
    pub fn unknown_variable(identifier: impl Into<String>) -> Self {
        Self::UnknownVariable {
            identifier: identifier.into(),
        }
    }
}

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

//! Variable identifiers
//!
//! Three forms address a variable in a test session scope:
//!
//! * `name` — a variable in the global scope
//! * `prefix.name` — a variable of the item referenced by `prefix`
//! * `prefix.N.name` — the same, pinned to the N-th occurrence (1-based)

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A parsed variable identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VariableIdentifier {
    prefix: Option<String>,
    sequence_number: Option<u32>,
    name: String,
}

impl VariableIdentifier {
    /// Parse an identifier, accepting the three lexical forms
    pub fn parse(input: &str) -> Result<Self> {
        let mut parts = input.split('.');
        let first = parts.next().unwrap_or_default();
        let second = parts.next();
        let third = parts.next();
        if parts.next().is_some() {
            return Err(ModelError::malformed_identifier(input));
        }

        match (second, third) {
            (None, _) => {
                if !is_qti_identifier(first) {
                    return Err(ModelError::malformed_identifier(input));
                }
                Ok(Self {
                    prefix: None,
                    sequence_number: None,
                    name: first.to_string(),
                })
            }
            (Some(name), None) => {
                if !is_qti_identifier(first) || !is_qti_identifier(name) {
                    return Err(ModelError::malformed_identifier(input));
                }
                Ok(Self {
                    prefix: Some(first.to_string()),
                    sequence_number: None,
                    name: name.to_string(),
                })
            }
            (Some(seq), Some(name)) => {
                let sequence_number: u32 = seq
                    .parse()
                    .map_err(|_| ModelError::malformed_identifier(input))?;
                if sequence_number == 0
                    || !is_qti_identifier(first)
                    || !is_qti_identifier(name)
                {
                    return Err(ModelError::malformed_identifier(input));
                }
                Ok(Self {
                    prefix: Some(first.to_string()),
                    sequence_number: Some(sequence_number),
                    name: name.to_string(),
                })
            }
        }
    }

    /// A pre-validated simple identifier
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            prefix: None,
            sequence_number: None,
            name: name.into(),
        }
    }

    /// True for the `prefix.name` and `prefix.N.name` forms
    pub fn has_prefix(&self) -> bool {
        self.prefix.is_some()
    }

    /// True for the `prefix.N.name` form
    pub fn has_sequence_number(&self) -> bool {
        self.sequence_number.is_some()
    }

    /// The prefix, when present
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The 1-based occurrence number, when present
    pub fn sequence_number(&self) -> Option<u32> {
        self.sequence_number
    }

    /// The variable name
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for VariableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.prefix, self.sequence_number) {
            (Some(prefix), Some(n)) => write!(f, "{prefix}.{n}.{}", self.name),
            (Some(prefix), None) => write!(f, "{prefix}.{}", self.name),
            _ => f.write_str(&self.name),
        }
    }
}

impl FromStr for VariableIdentifier {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Check the QTI identifier lexical form: a letter or underscore, followed by
/// letters, digits, hyphens and underscores.
pub fn is_qti_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

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

//! Variable addressing over the session scope
//!
//! An identifier is parsed once into a resolved target, then read or
//! written; no repeated string parsing on the hot path. Reads of absent
//! variables yield null; writes require a declared target.

use super::TestSession;
use crate::engine::EvaluationScope;
use crate::error::{Result, SessionError};
use octoqti_model::{SubmissionMode, Value, VariableIdentifier};

/// Where an identifier lands after scope resolution
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ResolvedTarget {
    /// The whole test's accumulated duration
    TestDuration,
    /// A test-scoped outcome variable
    GlobalOutcome(String),
    /// The accumulated duration of a test part or section
    ScopeDuration(String),
    /// A variable of one item occurrence
    ItemVariable {
        item_ref: String,
        occurrence: usize,
        name: String,
    },
    /// Nothing answers to the identifier
    Unresolved,
}

impl TestSession {
    pub(crate) fn resolve_target(&self, identifier: &VariableIdentifier) -> ResolvedTarget {
        let Some(prefix) = identifier.prefix() else {
            if identifier.name() == "duration" {
                return ResolvedTarget::TestDuration;
            }
            return ResolvedTarget::GlobalOutcome(identifier.name().to_string());
        };

        let occurrences = self.route.route_items_by_assessment_item_ref(prefix).len();
        if occurrences > 0 {
            let occurrence = match identifier.sequence_number() {
                Some(n) => (n - 1) as usize,
                None => match self.last_occurrence_update.get(prefix) {
                    Some(&occurrence) => occurrence,
                    None => {
                        // several occurrences and individual submission:
                        // without an update record the address is ambiguous
                        // and reads as null
                        let individual = self
                            .route
                            .route_items_by_assessment_item_ref(prefix)
                            .first()
                            .map(|item| {
                                item.test_part().submission_mode == SubmissionMode::Individual
                            })
                            .unwrap_or(false);
                        if occurrences > 1 && individual {
                            return ResolvedTarget::Unresolved;
                        }
                        0
                    }
                },
            };
            return ResolvedTarget::ItemVariable {
                item_ref: prefix.to_string(),
                occurrence,
                name: identifier.name().to_string(),
            };
        }

        if identifier.name() == "duration" {
            let is_scope = self.test.test_part(prefix).is_some()
                || self
                    .route
                    .items()
                    .iter()
                    .any(|item| item.sections().iter().any(|s| s.identifier == prefix));
            if is_scope {
                return ResolvedTarget::ScopeDuration(prefix.to_string());
            }
        }
        ResolvedTarget::Unresolved
    }

    /// Read a variable by identifier; absent or out-of-scope targets read
    /// as null
    pub fn value(&self, identifier: &str) -> Result<Option<Value>> {
        let parsed = VariableIdentifier::parse(identifier)
            .map_err(|e| SessionError::out_of_range(e.to_string()))?;
        match self.resolve_target(&parsed) {
            ResolvedTarget::TestDuration => Ok(Some(Value::duration(
                self.durations.get(&self.test.identifier),
            ))),
            ResolvedTarget::ScopeDuration(scope) => {
                Ok(Some(Value::duration(self.durations.get(&scope))))
            }
            ResolvedTarget::GlobalOutcome(name) => {
                Ok(self.outcomes.value(&name).flatten().cloned())
            }
            ResolvedTarget::ItemVariable {
                item_ref,
                occurrence,
                name,
            } => Ok(self
                .item_sessions
                .get_session(&item_ref, occurrence)
                .and_then(|session| session.value_of(&name))),
            ResolvedTarget::Unresolved => Ok(None),
        }
    }

    /// Write a declared variable by identifier
    pub fn set_value(&mut self, identifier: &str, value: Option<Value>) -> Result<()> {
        let parsed = VariableIdentifier::parse(identifier)
            .map_err(|e| SessionError::out_of_range(e.to_string()))?;
        match self.resolve_target(&parsed) {
            ResolvedTarget::TestDuration | ResolvedTarget::ScopeDuration(_) => {
                Err(SessionError::OutOfScope {
                    message: format!("duration '{identifier}' is read-only"),
                })
            }
            ResolvedTarget::GlobalOutcome(name) => {
                if !self.outcomes.contains(&name) {
                    return Err(SessionError::UnknownVariable {
                        identifier: identifier.to_string(),
                    });
                }
                self.outcomes
                    .set_value(&name, value)
                    .map_err(|e| SessionError::out_of_range(e.to_string()))
            }
            ResolvedTarget::ItemVariable {
                item_ref,
                occurrence,
                name,
            } => {
                let label = format!("{item_ref}.{occurrence}");
                let session = self
                    .item_sessions
                    .get_session_mut(&item_ref, occurrence)
                    .ok_or_else(|| SessionError::UnknownVariable {
                        identifier: identifier.to_string(),
                    })?;
                session
                    .set_variable_value(&name, value)
                    .map_err(|e| SessionError::from_item_error(&label, e))
            }
            ResolvedTarget::Unresolved => Err(SessionError::UnknownVariable {
                identifier: identifier.to_string(),
            }),
        }
    }

    /// Clear a global variable's value to null; prefixed targets are out of
    /// scope for unsetting
    pub fn unset_value(&mut self, identifier: &str) -> Result<()> {
        let parsed = VariableIdentifier::parse(identifier)
            .map_err(|e| SessionError::out_of_range(e.to_string()))?;
        if parsed.has_prefix() {
            return Err(SessionError::OutOfScope {
                message: format!("cannot unset the item-scoped variable '{identifier}'"),
            });
        }
        if parsed.name() == "duration" {
            return Err(SessionError::OutOfScope {
                message: "the test duration cannot be unset".into(),
            });
        }
        self.outcomes
            .unset_variable(parsed.name())
            .map_err(|_| SessionError::UnknownVariable {
                identifier: identifier.to_string(),
            })
    }
}

impl EvaluationScope for TestSession {
    fn value_of(&self, identifier: &str) -> Option<Value> {
        self.value(identifier).ok().flatten()
    }
}

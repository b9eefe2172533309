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

//! Test-control rules and their expressions
//!
//! Expressions are opaque payloads: the runtime hands them to the injected
//! expression engine and only interprets the returned value. The engine
//! implementation (operators, built-ins) lives outside this workspace.

use serde::{Deserialize, Serialize};

/// Branch target ending the whole test
pub const EXIT_TEST: &str = "EXIT_TEST";
/// Branch target ending the current test part
pub const EXIT_TESTPART: &str = "EXIT_TESTPART";
/// Branch target ending the current assessment section
pub const EXIT_SECTION: &str = "EXIT_SECTION";

/// An opaque expression payload
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Expression {
    source: String,
}

impl Expression {
    /// Wrap an expression source
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    /// The raw source handed to the expression engine
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// A boolean guard; a route item whose guards fail is skipped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreCondition {
    /// The guard expression
    pub expression: Expression,
}

impl PreCondition {
    /// Create a precondition
    pub fn new(expression: Expression) -> Self {
        Self { expression }
    }
}

/// A conditional jump evaluated when leaving a route item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchRule {
    /// Identifier of the target item, section or test part, or one of the
    /// `EXIT_*` specials
    pub target: String,
    /// The jump condition
    pub expression: Expression,
}

impl BranchRule {
    /// Create a branch rule
    pub fn new(target: impl Into<String>, expression: Expression) -> Self {
        Self {
            target: target.into(),
            expression,
        }
    }

    /// True when the target is one of the `EXIT_*` specials
    pub fn is_special_target(&self) -> bool {
        matches!(
            self.target.as_str(),
            EXIT_TEST | EXIT_TESTPART | EXIT_SECTION
        )
    }
}

/// One step of test-level outcome processing: evaluate, assign to an outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRule {
    /// Identifier of the target outcome variable
    pub target: String,
    /// The value expression
    pub expression: Expression,
}

impl OutcomeRule {
    /// Create an outcome rule
    pub fn new(target: impl Into<String>, expression: Expression) -> Self {
        Self {
            target: target.into(),
            expression,
        }
    }
}

/// One step of item response processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRule {
    /// Identifier of the target item outcome variable
    pub target: String,
    /// The value expression
    pub expression: Expression,
}

impl ResponseRule {
    /// Create a response rule
    pub fn new(target: impl Into<String>, expression: Expression) -> Self {
        Self {
            target: target.into(),
            expression,
        }
    }
}

/// The response processing attached to an item reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseProcessing {
    /// Rules applied in order after each attempt
    pub rules: Vec<ResponseRule>,
}

impl ResponseProcessing {
    /// Response processing from a rule list
    pub fn new(rules: Vec<ResponseRule>) -> Self {
        Self { rules }
    }
}

/// A template variable default evaluated before the first attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDefault {
    /// Identifier of the target template variable
    pub template_identifier: String,
    /// The default-value expression
    pub expression: Expression,
}

impl TemplateDefault {
    /// Create a template default
    pub fn new(template_identifier: impl Into<String>, expression: Expression) -> Self {
        Self {
            template_identifier: template_identifier.into(),
            expression,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_targets_are_recognized() {
        let rule = BranchRule::new(EXIT_TEST, Expression::new("true"));
        assert!(rule.is_special_target());
        let rule = BranchRule::new("Q05", Expression::new("true"));
        assert!(!rule.is_special_target());
    }
}

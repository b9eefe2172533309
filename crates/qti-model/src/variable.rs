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

//! Variables and their declarations

use crate::error::{ModelError, Result};
use crate::types::{BaseType, Cardinality};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Behavioral family of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariableKind {
    /// Written by response or outcome processing
    Outcome,
    /// Candidate-facing input captured per item
    Response,
    /// Set before an attempt, producing per-attempt randomization
    Template,
}

/// A variable declaration from the assessment model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    /// Declared name
    pub identifier: String,
    /// Behavioral family
    pub kind: VariableKind,
    /// Declared cardinality
    pub cardinality: Cardinality,
    /// Declared base type
    pub base_type: BaseType,
    /// Declared default value
    pub default_value: Option<Value>,
    /// Declared correct response (response declarations only)
    pub correct_response: Option<Value>,
}

impl VariableDeclaration {
    /// A declaration with no default and no correct response
    pub fn new(
        identifier: impl Into<String>,
        kind: VariableKind,
        cardinality: Cardinality,
        base_type: BaseType,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            cardinality,
            base_type,
            default_value: None,
            correct_response: None,
        }
    }

    /// Shorthand for an outcome declaration
    pub fn outcome(
        identifier: impl Into<String>,
        cardinality: Cardinality,
        base_type: BaseType,
    ) -> Self {
        Self::new(identifier, VariableKind::Outcome, cardinality, base_type)
    }

    /// Shorthand for a response declaration
    pub fn response(
        identifier: impl Into<String>,
        cardinality: Cardinality,
        base_type: BaseType,
    ) -> Self {
        Self::new(identifier, VariableKind::Response, cardinality, base_type)
    }

    /// Shorthand for a template declaration
    pub fn template(
        identifier: impl Into<String>,
        cardinality: Cardinality,
        base_type: BaseType,
    ) -> Self {
        Self::new(identifier, VariableKind::Template, cardinality, base_type)
    }

    /// Attach a default value
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Attach a correct response
    pub fn with_correct_response(mut self, value: Value) -> Self {
        self.correct_response = Some(value);
        self
    }
}

/// A live variable: a declaration snapshot plus the current value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    identifier: String,
    kind: VariableKind,
    cardinality: Cardinality,
    base_type: BaseType,
    value: Option<Value>,
    default_value: Option<Value>,
    correct_response: Option<Value>,
}

impl Variable {
    /// Build a variable matching a declaration; the value starts null
    pub fn from_declaration(declaration: &VariableDeclaration) -> Self {
        Self {
            identifier: declaration.identifier.clone(),
            kind: declaration.kind,
            cardinality: declaration.cardinality,
            base_type: declaration.base_type,
            value: None,
            default_value: declaration.default_value.clone(),
            correct_response: declaration.correct_response.clone(),
        }
    }

    /// Declared name
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Behavioral family
    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    /// Declared cardinality
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Declared base type
    pub fn base_type(&self) -> BaseType {
        self.base_type
    }

    /// Current value; `None` is the QTI null
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Declared default value
    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    /// Declared correct response
    pub fn correct_response(&self) -> Option<&Value> {
        self.correct_response.as_ref()
    }

    /// Assign a value after checking it against the declaration
    pub fn set_value(&mut self, value: Value) -> Result<()> {
        self.check_compatible(&value)?;
        self.value = Some(value);
        Ok(())
    }

    /// Assign a possibly-null value
    pub fn set_value_or_null(&mut self, value: Option<Value>) -> Result<()> {
        match value {
            Some(v) => self.set_value(v),
            None => {
                self.value = None;
                Ok(())
            }
        }
    }

    /// Set the value to null, keeping the binding
    pub fn unset(&mut self) {
        self.value = None;
    }

    /// Copy the declared default into the value (null when no default)
    pub fn apply_default(&mut self) {
        self.value = self.default_value.clone();
    }

    /// True when the current value equals the declared correct response
    pub fn is_correct(&self) -> bool {
        match (&self.value, &self.correct_response) {
            (Some(v), Some(c)) => v == c,
            _ => false,
        }
    }

    fn check_compatible(&self, value: &Value) -> Result<()> {
        if value.cardinality() != self.cardinality {
            return Err(ModelError::CardinalityMismatch {
                identifier: self.identifier.clone(),
                expected: self.cardinality,
                found: value.cardinality(),
            });
        }
        // an empty container carries no base type to check
        if let Some(found) = value.base_type() {
            if found != self.base_type {
                return Err(ModelError::BaseTypeMismatch {
                    identifier: self.identifier.clone(),
                    expected: self.base_type,
                    found,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::QtiValue;

    fn score_declaration() -> VariableDeclaration {
        VariableDeclaration::outcome("SCORE", Cardinality::Single, BaseType::Float)
            .with_default(Value::float(0.0))
    }

    #[test]
    fn variable_starts_null_until_default_applied() {
        let mut var = Variable::from_declaration(&score_declaration());
        assert!(var.value().is_none());
        var.apply_default();
        assert_eq!(var.value(), Some(&Value::float(0.0)));
    }

    #[test]
    fn set_value_enforces_declaration() {
        let mut var = Variable::from_declaration(&score_declaration());
        assert!(var.set_value(Value::float(1.5)).is_ok());

        let err = var.set_value(Value::integer(1)).unwrap_err();
        assert!(matches!(err, ModelError::BaseTypeMismatch { .. }));

        let err = var
            .set_value(Value::multiple(vec![QtiValue::Float(1.0)]).unwrap())
            .unwrap_err();
        assert!(matches!(err, ModelError::CardinalityMismatch { .. }));
    }

    #[test]
    fn empty_container_passes_base_type_check() {
        let decl =
            VariableDeclaration::response("RESPONSE", Cardinality::Multiple, BaseType::Identifier);
        let mut var = Variable::from_declaration(&decl);
        var.set_value(Value::multiple(vec![]).unwrap()).unwrap();
        assert!(var.value().unwrap().is_empty());
    }

    #[test]
    fn correctness_probe() {
        let decl =
            VariableDeclaration::response("RESPONSE", Cardinality::Single, BaseType::Identifier)
                .with_correct_response(Value::identifier("CHOICE_A"));
        let mut var = Variable::from_declaration(&decl);
        assert!(!var.is_correct());
        var.set_value(Value::identifier("CHOICE_A")).unwrap();
        assert!(var.is_correct());
        var.unset();
        assert!(!var.is_correct());
    }
}

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

//! Keyed variable containers
//!
//! A [`State`] maps variable names to [`Variable`]s. Iteration follows
//! insertion order so that snapshots are deterministic.

use crate::error::{ModelError, Result};
use crate::value::Value;
use crate::variable::{Variable, VariableDeclaration, VariableKind};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// An insertion-ordered container of variables keyed by name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    order: Vec<String>,
    variables: FxHashMap<String, Variable>,
}

impl State {
    /// An empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state holding one variable per declaration
    pub fn from_declarations<'a>(
        declarations: impl IntoIterator<Item = &'a VariableDeclaration>,
    ) -> Self {
        let mut state = Self::new();
        for declaration in declarations {
            state.set_variable(Variable::from_declaration(declaration));
        }
        state
    }

    /// Insert or replace a variable
    pub fn set_variable(&mut self, variable: Variable) {
        let name = variable.identifier().to_string();
        if self.variables.insert(name.clone(), variable).is_none() {
            self.order.push(name);
        }
    }

    /// Borrow a variable by name
    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    /// Mutably borrow a variable by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.get_mut(name)
    }

    /// True when a binding exists for `name`
    pub fn contains(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// Assign a value to a bound variable
    pub fn set_value(&mut self, name: &str, value: Option<Value>) -> Result<()> {
        let variable = self
            .variables
            .get_mut(name)
            .ok_or_else(|| ModelError::unknown_variable(name))?;
        variable.set_value_or_null(value)
    }

    /// Current value of a bound variable; outer `None` means no binding
    pub fn value(&self, name: &str) -> Option<Option<&Value>> {
        self.variables.get(name).map(Variable::value)
    }

    /// Set a bound variable's value to null, keeping the binding
    pub fn unset_variable(&mut self, name: &str) -> Result<()> {
        let variable = self
            .variables
            .get_mut(name)
            .ok_or_else(|| ModelError::unknown_variable(name))?;
        variable.unset();
        Ok(())
    }

    /// Copy every declared default into its variable
    pub fn apply_defaults(&mut self) {
        for name in &self.order {
            if let Some(variable) = self.variables.get_mut(name) {
                variable.apply_default();
            }
        }
    }

    /// Reset every outcome variable to its declared default, or null
    pub fn reset_outcome_variables(&mut self) {
        for name in &self.order {
            if let Some(variable) = self.variables.get_mut(name) {
                if variable.kind() == VariableKind::Outcome {
                    variable.apply_default();
                }
            }
        }
    }

    /// Number of bound variables
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when no variable is bound
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate variables in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.order
            .iter()
            .filter_map(move |name| self.variables.get(name))
    }

    /// Iterate variables of one kind in insertion order
    pub fn iter_kind(&self, kind: VariableKind) -> impl Iterator<Item = &Variable> {
        self.iter().filter(move |v| v.kind() == kind)
    }
}

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

//! Collaborator seams of the session runtime
//!
//! The expression language, the item-session factory and the results
//! pipeline are external concerns. The runtime consumes them through the
//! object-safe traits below, injected as `Arc<dyn …>`.

use crate::error::{ExpressionError, ResultError};
use crate::item_session::ItemSession;
use octoqti_model::{
    AssessmentItemRef, Expression, NavigationMode, SubmissionMode, Value,
};
use std::sync::Arc;

/// Read access to the variables visible from an evaluation point.
///
/// The test session implements this with full scope resolution (global
/// outcomes, prefixed item variables, duration entries); an item session
/// implements it over its own variables. One engine therefore serves both
/// test-level rules and item response processing.
pub trait EvaluationScope {
    /// Current value of `identifier`, or `None` when absent or null
    fn value_of(&self, identifier: &str) -> Option<Value>;
}

/// Evaluates rule expressions against a scope.
///
/// Used by the runtime in exactly these contexts: branch-rule conditions,
/// preconditions, template defaults, outcome rules and item response rules.
pub trait ExpressionEngine: Send + Sync {
    /// Evaluate `expression`, returning its value or QTI null
    fn evaluate(
        &self,
        expression: &Expression,
        scope: &dyn EvaluationScope,
    ) -> Result<Option<Value>, ExpressionError>;
}

/// An engine that evaluates everything to null.
///
/// Suitable for tests without processing rules and for embedders that drive
/// scoring outside the session.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullExpressionEngine;

impl ExpressionEngine for NullExpressionEngine {
    fn evaluate(
        &self,
        _expression: &Expression,
        _scope: &dyn EvaluationScope,
    ) -> Result<Option<Value>, ExpressionError> {
        Ok(None)
    }
}

/// Builds item sessions for route items scheduled by eligibility selection
pub trait SessionManager: Send + Sync {
    /// Create a fresh (not yet begun) item session
    fn create_item_session(
        &self,
        item_ref: &Arc<AssessmentItemRef>,
        navigation_mode: NavigationMode,
        submission_mode: SubmissionMode,
        must_be_visible: bool,
    ) -> ItemSession;
}

/// The default factory: plain item sessions wired to one expression engine
pub struct DefaultSessionManager {
    engine: Arc<dyn ExpressionEngine>,
}

impl DefaultSessionManager {
    /// Create a factory handing `engine` to every session
    pub fn new(engine: Arc<dyn ExpressionEngine>) -> Self {
        Self { engine }
    }
}

impl SessionManager for DefaultSessionManager {
    fn create_item_session(
        &self,
        item_ref: &Arc<AssessmentItemRef>,
        navigation_mode: NavigationMode,
        submission_mode: SubmissionMode,
        _must_be_visible: bool,
    ) -> ItemSession {
        ItemSession::new(
            Arc::clone(item_ref),
            navigation_mode,
            submission_mode,
            Arc::clone(&self.engine),
        )
    }
}

/// Receives item and test results as they become final
pub trait ResultReporter: Send + Sync {
    /// Called after an item session's variables were updated
    fn submit_item_results(
        &self,
        session: &ItemSession,
        occurrence: usize,
    ) -> Result<(), ResultError>;

    /// Called when test results become final per the submission policy
    fn submit_test_results(&self, outcomes: &octoqti_model::State) -> Result<(), ResultError>;
}

/// A reporter that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResultReporter;

impl ResultReporter for NullResultReporter {
    fn submit_item_results(
        &self,
        _session: &ItemSession,
        _occurrence: usize,
    ) -> Result<(), ResultError> {
        Ok(())
    }

    fn submit_test_results(&self, _outcomes: &octoqti_model::State) -> Result<(), ResultError> {
        Ok(())
    }
}

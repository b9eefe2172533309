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

//! Test session runtime for QTI assessment tests
//!
//! The stateful interpreter that drives a candidate's session over a parsed
//! assessment test and its materialized route: item session lifecycles,
//! navigation and submission modes, branching and preconditions, four-scope
//! time limits, pending-response batching and outcome processing.
//!
//! Within one session the runtime is synchronous and single-threaded; time
//! advances only through explicit [`TestSession::set_time`] observations.
//! Distinct sessions are independent and may run on distinct threads.

pub mod config;
pub mod durations;
pub mod engine;
pub mod error;
pub mod item_session;
pub mod pending;
pub mod route;
pub mod session;
pub mod store;

pub use config::TestSessionConfig;
pub use durations::DurationStore;
pub use engine::{
    DefaultSessionManager, EvaluationScope, ExpressionEngine, NullExpressionEngine,
    NullResultReporter, ResultReporter, SessionManager,
};
pub use error::{
    ExpressionError, ItemResult, ItemSessionError, Result, ResultError, SessionError,
    SessionErrorCode, TimeScope,
};
pub use item_session::{ItemSession, ItemSessionSnapshot};
pub use pending::{PendingResponseStore, PendingResponses};
pub use route::{Route, RouteItem};
pub use session::{TestSession, TestSessionBuilder, TestSessionRestore};
pub use store::ItemSessionStore;

#[cfg(test)]
pub(crate) mod test_support {
    //! Scripted collaborators shared by the crate's unit tests

    use crate::engine::{EvaluationScope, ExpressionEngine};
    use crate::error::ExpressionError;
    use octoqti_model::{Expression, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// An engine resolving expressions from a scripted table.
    ///
    /// `true`, `false` and `null` evaluate literally; `var(ID)` reads `ID`
    /// from the scope; anything else resolves through the table and
    /// evaluates to null when unscripted.
    #[derive(Default)]
    pub struct ScriptedEngine {
        answers: HashMap<String, Option<Value>>,
        log: Mutex<Vec<String>>,
    }

    impl ScriptedEngine {
        /// Script `source` to evaluate to `value`
        pub fn on(mut self, source: &str, value: Value) -> Self {
            self.answers.insert(source.to_string(), Some(value));
            self
        }

        /// Script `source` to evaluate to null
        pub fn on_null(mut self, source: &str) -> Self {
            self.answers.insert(source.to_string(), None);
            self
        }

        /// Sources evaluated so far, in order
        pub fn evaluations(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl ExpressionEngine for ScriptedEngine {
        fn evaluate(
            &self,
            expression: &Expression,
            scope: &dyn EvaluationScope,
        ) -> Result<Option<Value>, ExpressionError> {
            let source = expression.source();
            self.log.lock().unwrap().push(source.to_string());
            if source == "true" {
                return Ok(Some(Value::boolean(true)));
            }
            if source == "false" {
                return Ok(Some(Value::boolean(false)));
            }
            if source == "null" {
                return Ok(None);
            }
            if let Some(inner) = source.strip_prefix("var(").and_then(|s| s.strip_suffix(')')) {
                return Ok(scope.value_of(inner));
            }
            if source == "fail" {
                return Err(ExpressionError::new(source, "scripted failure"));
            }
            Ok(self.answers.get(source).cloned().flatten())
        }
    }
}

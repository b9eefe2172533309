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

//! QTI assessment test session runtime
//!
//! A runtime engine for IMS QTI assessment tests: given a parsed
//! [`AssessmentTest`] and a materialized [`Route`], a [`TestSession`] drives
//! a candidate's run — navigation and submission modes, item lifecycles,
//! branching and preconditions, four-scope time limits, pending-response
//! batching, outcome processing and feedback gating — and the
//! [`SessionCodec`] snapshots it to a durable byte stream.
//!
//! ```no_run
//! use octoqti::{
//!     NullExpressionEngine, Route, RouteItem, TestSessionBuilder,
//! };
//! use std::sync::Arc;
//!
//! # fn assessment() -> (Arc<octoqti::AssessmentTest>, Vec<RouteItem>) { unimplemented!() }
//! let (test, route_items) = assessment();
//! let mut session = TestSessionBuilder::new(
//!     "candidate-42",
//!     test,
//!     Route::new(route_items),
//!     Arc::new(NullExpressionEngine),
//! )
//! .build();
//! session.begin_test_session()?;
//! # Ok::<(), octoqti::SessionError>(())
//! ```

// Workspace crates
pub use octoqti_codec as codec;
pub use octoqti_model as model;
pub use octoqti_runtime as runtime;

// Data model
pub use octoqti_model::{
    AssessmentItemRef, AssessmentSection, AssessmentTest, BaseType, BranchRule, Cardinality,
    CompletionStatus, Expression, ItemSessionControl, ItemSessionState, ModelError,
    NavigationMode, OutcomeRule, Point, PreCondition, QtiDuration, QtiFile, QtiPair, QtiValue,
    ResponseProcessing, ResponseRule, SectionPart, ShowHide, State, SubmissionMode,
    TemplateDefault, TestFeedback, TestFeedbackAccess, TestPart, TestResultsSubmission,
    TestSessionState, TimeLimits, Value, Variable, VariableDeclaration, VariableIdentifier,
    VariableKind, EXIT_SECTION, EXIT_TEST, EXIT_TESTPART,
};

// Session runtime
pub use octoqti_runtime::{
    DefaultSessionManager, DurationStore, EvaluationScope, ExpressionEngine, ExpressionError,
    ItemSession, ItemSessionError, ItemSessionSnapshot, ItemSessionStore, NullExpressionEngine,
    NullResultReporter, PendingResponseStore, PendingResponses, ResultError, ResultReporter,
    Route, RouteItem, SessionError, SessionErrorCode, SessionManager, TestSession,
    TestSessionBuilder, TestSessionConfig, TimeScope,
};

// Snapshot codec
pub use octoqti_codec::{
    CodecError, InMemorySessionStorage, Seeker, SessionCodec, SessionCollaborators,
    SessionStorage, FORMAT_VERSION,
};

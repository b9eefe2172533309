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

//! Data model for QTI assessment test sessions
//!
//! Typed values and variables, variable identifiers, and the read-only
//! assessment tree (test parts, sections, item references, declarations and
//! rules) consumed by the session runtime.

pub mod duration;
pub mod error;
pub mod feedback;
pub mod identifier;
pub mod rules;
pub mod state;
pub mod types;
pub mod value;
pub mod variable;

pub use duration::QtiDuration;
pub use error::{ModelError, Result};
pub use feedback::TestFeedback;
pub use identifier::{is_qti_identifier, VariableIdentifier};
pub use rules::{
    BranchRule, Expression, OutcomeRule, PreCondition, ResponseProcessing, ResponseRule,
    TemplateDefault, EXIT_SECTION, EXIT_TEST, EXIT_TESTPART,
};
pub use state::State;
pub use test::{
    AssessmentItemRef, AssessmentSection, AssessmentTest, ItemSessionControl, SectionPart,
    TestPart, TimeLimits,
};
pub use types::{
    BaseType, Cardinality, CompletionStatus, ItemSessionState, NavigationMode, ShowHide,
    SubmissionMode, TestFeedbackAccess, TestResultsSubmission, TestSessionState,
};
pub use value::{Point, QtiFile, QtiPair, QtiValue, Value};
pub use variable::{Variable, VariableDeclaration, VariableKind};

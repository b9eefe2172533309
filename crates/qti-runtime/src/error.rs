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

//! Error taxonomy of the session runtime
//!
//! Faults are a closed set with distinct codes. Item-session faults are
//! raised by [`ItemSessionError`]; the test-session driver catches them at
//! its boundary and rethrows a [`SessionError`] carrying the original as
//! source. Control flow never unwinds for normal paths: "no previous route
//! item" and friends are ordinary `Err` values.

use octoqti_model::ModelError;
use thiserror::Error;

/// Result type alias for driver-level operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Result type alias for item-session operations
pub type ItemResult<T> = std::result::Result<T, ItemSessionError>;

/// The scope a duration fault is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeScope {
    /// The whole assessment test
    Test,
    /// A test part
    TestPart,
    /// An assessment section
    AssessmentSection,
    /// An item occurrence
    Item,
}

impl TimeScope {
    /// Lexical name used in messages
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Test => "assessmentTest",
            Self::TestPart => "testPart",
            Self::AssessmentSection => "assessmentSection",
            Self::Item => "assessmentItem",
        }
    }
}

/// A fault raised by an expression engine invocation
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Expression '{expression}' failed: {message}")]
pub struct ExpressionError {
    /// Source of the failing expression
    pub expression: String,
    /// Human-readable failure description
    pub message: String,
}

impl ExpressionError {
    /// Create an expression error
    pub fn new(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            message: message.into(),
        }
    }
}

/// A fault raised by a result reporter
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Result submission failed: {message}")]
pub struct ResultError {
    /// Human-readable failure description
    pub message: String,
}

impl ResultError {
    /// Create a result submission error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Faults raised by a single item session
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ItemSessionError {
    /// The operation is not legal in the session's current state
    #[error("Item session state violation: {message}")]
    StateViolation {
        /// Human-readable description with the affected session
        message: String,
    },

    /// The attempt ceiling was reached
    #[error("Maximum number of attempts ({max_attempts}) reached by '{session}'")]
    AttemptsOverflow {
        /// `<itemRefId>.<occurrence>` of the affected session
        session: String,
        /// The ceiling in force
        max_attempts: u32,
    },

    /// A submitted response does not fit a declared response variable
    #[error("Invalid response for '{session}': {message}")]
    InvalidResponse {
        /// `<itemRefId>.<occurrence>` of the affected session
        session: String,
        /// Human-readable description
        message: String,
    },

    /// Every response was null while skipping is forbidden
    #[error("Skipping is forbidden by '{session}'")]
    SkippingForbidden {
        /// `<itemRefId>.<occurrence>` of the affected session
        session: String,
    },

    /// The item's maximum duration was exceeded
    #[error("Maximum duration exceeded by '{session}'")]
    DurationOverflow {
        /// `<itemRefId>.<occurrence>` of the affected session
        session: String,
    },

    /// The item's minimum duration was not reached
    #[error("Minimum duration not yet reached by '{session}'")]
    DurationUnderflow {
        /// `<itemRefId>.<occurrence>` of the affected session
        session: String,
    },

    /// Response processing failed
    #[error("Response processing failed for '{session}'")]
    ResponseProcessing {
        /// `<itemRefId>.<occurrence>` of the affected session
        session: String,
        /// The engine fault
        #[source]
        source: ExpressionError,
    },

    /// A processing rule targeted an undeclared variable
    #[error("No variable '{identifier}' declared by '{session}'")]
    UnknownVariable {
        /// `<itemRefId>.<occurrence>` of the affected session
        session: String,
        /// The missing variable
        identifier: String,
    },

    /// A value does not fit its declaration
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Distinct code of a [`SessionError`], stable across message changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionErrorCode {
    /// Wrong engine state for the operation
    StateViolation,
    /// Navigation not permitted in the current navigation mode
    NavigationModeViolation,
    /// Jump target outside the route
    ForbiddenJump,
    /// Internal invariant breach
    LogicError,
    /// Unknown variable in the target scope
    UnknownVariable,
    /// Malformed identifier or out-of-range access
    OutOfRange,
    /// Operation not permitted on the addressed scope
    OutOfScope,
    /// Response processing failed
    ResponseProcessingError,
    /// Outcome processing failed
    OutcomeProcessingError,
    /// Result submission failed
    ResultSubmissionError,
    /// Attempt ceiling reached
    AttemptsOverflow,
    /// Response rejected by validation
    InvalidResponse,
    /// Skipping forbidden
    SkippingForbidden,
    /// Test maximum duration exceeded
    TestDurationOverflow,
    /// Test part maximum duration exceeded
    TestPartDurationOverflow,
    /// Section maximum duration exceeded
    AssessmentSectionDurationOverflow,
    /// Item maximum duration exceeded
    AssessmentItemDurationOverflow,
    /// Test minimum duration not reached
    TestDurationUnderflow,
    /// Test part minimum duration not reached
    TestPartDurationUnderflow,
    /// Section minimum duration not reached
    AssessmentSectionDurationUnderflow,
    /// Item minimum duration not reached
    AssessmentItemDurationUnderflow,
}

/// Faults raised by the test session driver
#[derive(Error, Debug)]
pub enum SessionError {
    /// The operation is not legal in the session's current state
    #[error("State violation: {message}")]
    StateViolation {
        /// Human-readable description
        message: String,
    },

    /// Navigation not permitted in the current navigation mode
    #[error("Navigation mode violation: {message}")]
    NavigationModeViolation {
        /// Human-readable description
        message: String,
    },

    /// Jump target outside the route
    #[error("Forbidden jump: {message}")]
    ForbiddenJump {
        /// Human-readable description
        message: String,
    },

    /// Internal invariant breach
    #[error("Logic error: {message}")]
    LogicError {
        /// Human-readable description
        message: String,
    },

    /// Unknown variable in the target scope
    #[error("No variable '{identifier}' in the session scope")]
    UnknownVariable {
        /// The unresolvable identifier
        identifier: String,
    },

    /// Malformed identifier or out-of-range access
    #[error("Out of range: {message}")]
    OutOfRange {
        /// Human-readable description
        message: String,
    },

    /// Operation not permitted on the addressed scope
    #[error("Out of scope: {message}")]
    OutOfScope {
        /// Human-readable description
        message: String,
    },

    /// Response processing failed
    #[error("Response processing failed: {message}")]
    ResponseProcessing {
        /// Human-readable description with the affected session
        message: String,
        /// The originating fault, when one exists
        #[source]
        source: Option<ItemSessionError>,
    },

    /// Outcome processing failed
    #[error("Outcome processing failed: {message}")]
    OutcomeProcessing {
        /// Human-readable description
        message: String,
        /// The engine fault, when one exists
        #[source]
        source: Option<ExpressionError>,
    },

    /// Result submission failed
    #[error("Result submission failed: {message}")]
    ResultSubmission {
        /// Human-readable description
        message: String,
        /// The reporter fault
        #[source]
        source: Option<ResultError>,
    },

    /// Attempt ceiling reached
    #[error("Attempts overflow: {message}")]
    AttemptsOverflow {
        /// Human-readable description with the affected session
        message: String,
        /// The originating item fault
        #[source]
        source: Option<ItemSessionError>,
    },

    /// Response rejected by validation
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Human-readable description with the affected session
        message: String,
        /// The originating item fault
        #[source]
        source: Option<ItemSessionError>,
    },

    /// Skipping forbidden for the current item
    #[error("Skipping forbidden: {message}")]
    SkippingForbidden {
        /// Human-readable description with the affected session
        message: String,
        /// The originating item fault
        #[source]
        source: Option<ItemSessionError>,
    },

    /// A maximum duration was exceeded at some scope
    #[error("Maximum duration exceeded for {scope} '{identifier}'", scope = .scope.as_str())]
    DurationOverflow {
        /// The affected scope
        scope: TimeScope,
        /// Identifier of the scope; `<itemRefId>.<occurrence>` for items
        identifier: String,
        /// The originating item fault, when one exists
        #[source]
        source: Option<ItemSessionError>,
    },

    /// A minimum duration was not reached at some scope
    #[error("Minimum duration not reached for {scope} '{identifier}'", scope = .scope.as_str())]
    DurationUnderflow {
        /// The affected scope
        scope: TimeScope,
        /// Identifier of the scope; `<itemRefId>.<occurrence>` for items
        identifier: String,
        /// The originating item fault, when one exists
        #[source]
        source: Option<ItemSessionError>,
    },
}

impl SessionError {
    /// Create a state violation
    pub fn state_violation(message: impl Into<String>) -> Self {
        Self::StateViolation {
            message: message.into(),
        }
    }

    /// Create a logic error
    pub fn logic(message: impl Into<String>) -> Self {
        Self::LogicError {
            message: message.into(),
        }
    }

    /// Create an out-of-range error
    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::OutOfRange {
            message: message.into(),
        }
    }

    /// The distinct code of this fault
    pub fn code(&self) -> SessionErrorCode {
        match self {
            Self::StateViolation { .. } => SessionErrorCode::StateViolation,
            Self::NavigationModeViolation { .. } => SessionErrorCode::NavigationModeViolation,
            Self::ForbiddenJump { .. } => SessionErrorCode::ForbiddenJump,
            Self::LogicError { .. } => SessionErrorCode::LogicError,
            Self::UnknownVariable { .. } => SessionErrorCode::UnknownVariable,
            Self::OutOfRange { .. } => SessionErrorCode::OutOfRange,
            Self::OutOfScope { .. } => SessionErrorCode::OutOfScope,
            Self::ResponseProcessing { .. } => SessionErrorCode::ResponseProcessingError,
            Self::OutcomeProcessing { .. } => SessionErrorCode::OutcomeProcessingError,
            Self::ResultSubmission { .. } => SessionErrorCode::ResultSubmissionError,
            Self::AttemptsOverflow { .. } => SessionErrorCode::AttemptsOverflow,
            Self::InvalidResponse { .. } => SessionErrorCode::InvalidResponse,
            Self::SkippingForbidden { .. } => SessionErrorCode::SkippingForbidden,
            Self::DurationOverflow { scope, .. } => match scope {
                TimeScope::Test => SessionErrorCode::TestDurationOverflow,
                TimeScope::TestPart => SessionErrorCode::TestPartDurationOverflow,
                TimeScope::AssessmentSection => {
                    SessionErrorCode::AssessmentSectionDurationOverflow
                }
                TimeScope::Item => SessionErrorCode::AssessmentItemDurationOverflow,
            },
            Self::DurationUnderflow { scope, .. } => match scope {
                TimeScope::Test => SessionErrorCode::TestDurationUnderflow,
                TimeScope::TestPart => SessionErrorCode::TestPartDurationUnderflow,
                TimeScope::AssessmentSection => {
                    SessionErrorCode::AssessmentSectionDurationUnderflow
                }
                TimeScope::Item => SessionErrorCode::AssessmentItemDurationUnderflow,
            },
        }
    }

    /// Map an item-session fault to the closest driver fault, keeping the
    /// original as source. `session` is `<itemRefId>.<occurrence>`.
    pub fn from_item_error(session: &str, error: ItemSessionError) -> Self {
        match &error {
            ItemSessionError::StateViolation { message } => Self::StateViolation {
                message: format!("{message} ('{session}')"),
            },
            ItemSessionError::AttemptsOverflow { max_attempts, .. } => Self::AttemptsOverflow {
                message: format!(
                    "maximum number of attempts ({max_attempts}) reached by '{session}'"
                ),
                source: Some(error),
            },
            ItemSessionError::InvalidResponse { message, .. } => Self::InvalidResponse {
                message: format!("{message} ('{session}')"),
                source: Some(error),
            },
            ItemSessionError::SkippingForbidden { .. } => Self::SkippingForbidden {
                message: format!("skipping is forbidden by '{session}'"),
                source: Some(error),
            },
            ItemSessionError::DurationOverflow { .. } => Self::DurationOverflow {
                scope: TimeScope::Item,
                identifier: session.to_string(),
                source: Some(error),
            },
            ItemSessionError::DurationUnderflow { .. } => Self::DurationUnderflow {
                scope: TimeScope::Item,
                identifier: session.to_string(),
                source: Some(error),
            },
            ItemSessionError::ResponseProcessing { .. } => Self::ResponseProcessing {
                message: format!("response processing failed for '{session}'"),
                source: Some(error),
            },
            ItemSessionError::UnknownVariable { identifier, .. } => Self::UnknownVariable {
                identifier: format!("{session}.{identifier}"),
            },
            ItemSessionError::Model(model) => Self::LogicError {
                message: format!("model fault in '{session}': {model}"),
            },
        }
    }
}

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

//! Core enumerations of the QTI runtime data model
//!
//! Discriminant values are part of the binary snapshot contract and must not
//! be reordered.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base type of a QTI variable or value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BaseType {
    /// A QTI identifier
    Identifier = 0,
    /// A boolean
    Boolean = 1,
    /// A 32-bit signed integer
    Integer = 2,
    /// An IEEE-754 double precision float
    Float = 3,
    /// A string
    String = 4,
    /// A point (two integer coordinates)
    Point = 5,
    /// An unordered pair of identifiers
    Pair = 6,
    /// An ordered pair of identifiers
    DirectedPair = 7,
    /// A time interval
    Duration = 8,
    /// An uploaded file
    File = 9,
    /// A URI
    Uri = 10,
}

impl BaseType {
    /// The QTI lexical name of this base type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::String => "string",
            Self::Point => "point",
            Self::Pair => "pair",
            Self::DirectedPair => "directedPair",
            Self::Duration => "duration",
            Self::File => "file",
            Self::Uri => "uri",
        }
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for BaseType {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Identifier),
            1 => Ok(Self::Boolean),
            2 => Ok(Self::Integer),
            3 => Ok(Self::Float),
            4 => Ok(Self::String),
            5 => Ok(Self::Point),
            6 => Ok(Self::Pair),
            7 => Ok(Self::DirectedPair),
            8 => Ok(Self::Duration),
            9 => Ok(Self::File),
            10 => Ok(Self::Uri),
            _ => Err(ModelError::UnknownEnumValue {
                what: "baseType",
                value,
            }),
        }
    }
}

/// Cardinality of a QTI variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Cardinality {
    /// Exactly one value
    Single = 0,
    /// An unordered bag of values
    Multiple = 1,
    /// An ordered list of values
    Ordered = 2,
    /// A keyed record of values
    Record = 3,
}

impl Cardinality {
    /// The QTI lexical name of this cardinality
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Multiple => "multiple",
            Self::Ordered => "ordered",
            Self::Record => "record",
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for Cardinality {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Single),
            1 => Ok(Self::Multiple),
            2 => Ok(Self::Ordered),
            3 => Ok(Self::Record),
            _ => Err(ModelError::UnknownEnumValue {
                what: "cardinality",
                value,
            }),
        }
    }
}

/// Navigation mode of a test part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NavigationMode {
    /// Forward-only navigation, no jumps
    Linear = 0,
    /// Arbitrary jumps within the current test part
    NonLinear = 1,
}

impl TryFrom<u8> for NavigationMode {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Linear),
            1 => Ok(Self::NonLinear),
            _ => Err(ModelError::UnknownEnumValue {
                what: "navigationMode",
                value,
            }),
        }
    }
}

/// Submission mode of a test part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SubmissionMode {
    /// Response processing runs after each attempt
    Individual = 0,
    /// Responses are batched until the end of the test part
    Simultaneous = 1,
}

impl TryFrom<u8> for SubmissionMode {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Individual),
            1 => Ok(Self::Simultaneous),
            _ => Err(ModelError::UnknownEnumValue {
                what: "submissionMode",
                value,
            }),
        }
    }
}

/// When a test feedback may be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TestFeedbackAccess {
    /// While the candidate is still interacting
    During = 0,
    /// Only at the end of the test or test part
    AtEnd = 1,
}

impl TryFrom<u8> for TestFeedbackAccess {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::During),
            1 => Ok(Self::AtEnd),
            _ => Err(ModelError::UnknownEnumValue {
                what: "testFeedbackAccess",
                value,
            }),
        }
    }
}

/// Whether a matching outcome shows or hides the bound feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ShowHide {
    /// Fire the feedback when the outcome matches
    Show = 0,
    /// Fire the feedback when the outcome does not match
    Hide = 1,
}

impl TryFrom<u8> for ShowHide {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Show),
            1 => Ok(Self::Hide),
            _ => Err(ModelError::UnknownEnumValue {
                what: "showHide",
                value,
            }),
        }
    }
}

/// Lifecycle state of a test session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TestSessionState {
    /// Created, not yet begun
    Initial = 1,
    /// The candidate is taking the test
    Interacting = 2,
    /// A test-level modal feedback is being shown
    ModalFeedback = 3,
    /// Interaction is paused
    Suspended = 4,
    /// The session has ended
    Closed = 5,
}

impl TryFrom<u8> for TestSessionState {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Initial),
            2 => Ok(Self::Interacting),
            3 => Ok(Self::ModalFeedback),
            4 => Ok(Self::Suspended),
            5 => Ok(Self::Closed),
            _ => Err(ModelError::UnknownEnumValue {
                what: "testSessionState",
                value,
            }),
        }
    }
}

/// Lifecycle state of an item session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ItemSessionState {
    /// Not yet scheduled by item selection
    NotSelected = 1,
    /// Selected and initialized, no attempt taken
    Initial = 2,
    /// An attempt is in progress
    Interacting = 3,
    /// Interaction is paused
    Suspended = 4,
    /// No further attempts are possible
    Closed = 5,
    /// The model solution is being shown
    Solution = 6,
    /// The session is being reviewed
    Review = 7,
    /// An item-level modal feedback is being shown
    ModalFeedback = 8,
}

impl TryFrom<u8> for ItemSessionState {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::NotSelected),
            2 => Ok(Self::Initial),
            3 => Ok(Self::Interacting),
            4 => Ok(Self::Suspended),
            5 => Ok(Self::Closed),
            6 => Ok(Self::Solution),
            7 => Ok(Self::Review),
            8 => Ok(Self::ModalFeedback),
            _ => Err(ModelError::UnknownEnumValue {
                what: "itemSessionState",
                value,
            }),
        }
    }
}

/// Completion status of an item session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CompletionStatus {
    /// No attempt has begun
    NotAttempted = 0,
    /// An attempt has begun but completion cannot be determined
    Unknown = 1,
    /// The item was completed
    Completed = 2,
    /// The item was ended without completion
    Incomplete = 3,
}

impl CompletionStatus {
    /// The QTI lexical value of this status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotAttempted => "not_attempted",
            Self::Unknown => "unknown",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<u8> for CompletionStatus {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::NotAttempted),
            1 => Ok(Self::Unknown),
            2 => Ok(Self::Completed),
            3 => Ok(Self::Incomplete),
            _ => Err(ModelError::UnknownEnumValue {
                what: "completionStatus",
                value,
            }),
        }
    }
}

/// When test results are pushed to the result reporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum TestResultsSubmission {
    /// Once, when the test session ends
    #[default]
    End = 0,
    /// After every outcome processing run
    OutcomeProcessing = 1,
}

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

//! Core value types for QTI variables
//!
//! A scalar carries exactly one of the eleven QTI base types. A [`Value`]
//! wraps scalars into the four cardinalities; container values are never
//! mixed-typed.

use crate::error::{ModelError, Result};
use crate::types::{BaseType, Cardinality};
use crate::QtiDuration;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point value: two integer coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate
    pub x: i32,
    /// Vertical coordinate
    pub y: i32,
}

impl Point {
    /// Create a new point
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.x, self.y)
    }
}

/// A pair of identifiers; direction is decided by the enclosing base type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QtiPair {
    /// First identifier
    pub first: String,
    /// Second identifier
    pub second: String,
}

impl QtiPair {
    /// Create a new pair
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }
}

impl fmt::Display for QtiPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first, self.second)
    }
}

/// An uploaded file value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QtiFile {
    /// MIME type of the payload
    pub mime_type: String,
    /// Original filename, when the delivery platform kept one
    pub filename: Option<String>,
    /// Raw payload
    pub data: Vec<u8>,
}

/// A single QTI value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QtiValue {
    /// A QTI identifier
    Identifier(String),
    /// A boolean
    Boolean(bool),
    /// A 32-bit signed integer
    Integer(i32),
    /// An IEEE-754 double
    Float(f64),
    /// A string
    String(String),
    /// A point
    Point(Point),
    /// An unordered pair of identifiers
    Pair(QtiPair),
    /// An ordered pair of identifiers
    DirectedPair(QtiPair),
    /// A time interval
    Duration(QtiDuration),
    /// An uploaded file
    File(QtiFile),
    /// A URI
    Uri(String),
}

impl QtiValue {
    /// The base type of this scalar
    pub fn base_type(&self) -> BaseType {
        match self {
            Self::Identifier(_) => BaseType::Identifier,
            Self::Boolean(_) => BaseType::Boolean,
            Self::Integer(_) => BaseType::Integer,
            Self::Float(_) => BaseType::Float,
            Self::String(_) => BaseType::String,
            Self::Point(_) => BaseType::Point,
            Self::Pair(_) => BaseType::Pair,
            Self::DirectedPair(_) => BaseType::DirectedPair,
            Self::Duration(_) => BaseType::Duration,
            Self::File(_) => BaseType::File,
            Self::Uri(_) => BaseType::Uri,
        }
    }

    /// Borrow as a boolean, if this is one
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow as an integer, if this is one
    pub fn as_integer(&self) -> Option<i32> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Borrow as a float, widening integers
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(f64::from(*i)),
            _ => None,
        }
    }

    /// Borrow as an identifier, if this is one
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Self::Identifier(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as a duration, if this is one
    pub fn as_duration(&self) -> Option<QtiDuration> {
        match self {
            Self::Duration(d) => Some(*d),
            _ => None,
        }
    }
}

impl fmt::Display for QtiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(s) | Self::String(s) | Self::Uri(s) => f.write_str(s),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Point(p) => write!(f, "{p}"),
            Self::Pair(p) | Self::DirectedPair(p) => write!(f, "{p}"),
            Self::Duration(d) => write!(f, "{d}"),
            Self::File(file) => write!(f, "file:{}", file.mime_type),
        }
    }
}

/// A variable value in one of the four cardinalities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Exactly one scalar
    Single(QtiValue),
    /// An unordered bag of scalars of one base type
    Multiple(Vec<QtiValue>),
    /// An ordered list of scalars of one base type
    Ordered(Vec<QtiValue>),
    /// Named fields, each a scalar of the record's base type
    Record(Vec<(String, QtiValue)>),
}

impl Value {
    /// Wrap a scalar
    pub fn single(value: QtiValue) -> Self {
        Self::Single(value)
    }

    /// A single boolean value
    pub fn boolean(value: bool) -> Self {
        Self::Single(QtiValue::Boolean(value))
    }

    /// A single integer value
    pub fn integer(value: i32) -> Self {
        Self::Single(QtiValue::Integer(value))
    }

    /// A single float value
    pub fn float(value: f64) -> Self {
        Self::Single(QtiValue::Float(value))
    }

    /// A single identifier value
    pub fn identifier(value: impl Into<String>) -> Self {
        Self::Single(QtiValue::Identifier(value.into()))
    }

    /// A single duration value
    pub fn duration(value: QtiDuration) -> Self {
        Self::Single(QtiValue::Duration(value))
    }

    /// Build a multiple container, rejecting mixed base types
    pub fn multiple(values: Vec<QtiValue>) -> Result<Self> {
        check_homogeneous(&values)?;
        Ok(Self::Multiple(values))
    }

    /// Build an ordered container, rejecting mixed base types
    pub fn ordered(values: Vec<QtiValue>) -> Result<Self> {
        check_homogeneous(&values)?;
        Ok(Self::Ordered(values))
    }

    /// Build a record container, rejecting mixed base types
    pub fn record(fields: Vec<(String, QtiValue)>) -> Result<Self> {
        let mut expected: Option<BaseType> = None;
        for (_, v) in &fields {
            match expected {
                None => expected = Some(v.base_type()),
                Some(bt) if bt != v.base_type() => {
                    return Err(ModelError::MixedContainer {
                        expected: bt,
                        found: v.base_type(),
                    });
                }
                _ => {}
            }
        }
        Ok(Self::Record(fields))
    }

    /// The cardinality of this value
    pub fn cardinality(&self) -> Cardinality {
        match self {
            Self::Single(_) => Cardinality::Single,
            Self::Multiple(_) => Cardinality::Multiple,
            Self::Ordered(_) => Cardinality::Ordered,
            Self::Record(_) => Cardinality::Record,
        }
    }

    /// The base type of this value; `None` for an empty container
    pub fn base_type(&self) -> Option<BaseType> {
        match self {
            Self::Single(v) => Some(v.base_type()),
            Self::Multiple(vs) | Self::Ordered(vs) => vs.first().map(QtiValue::base_type),
            Self::Record(fields) => fields.first().map(|(_, v)| v.base_type()),
        }
    }

    /// Number of scalars held
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Multiple(vs) | Self::Ordered(vs) => vs.len(),
            Self::Record(fields) => fields.len(),
        }
    }

    /// True for an empty container
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the scalar of a single-cardinality value
    pub fn as_single(&self) -> Option<&QtiValue> {
        match self {
            Self::Single(v) => Some(v),
            _ => None,
        }
    }

    /// True when this is the single boolean `true`
    pub fn is_true(&self) -> bool {
        matches!(self, Self::Single(QtiValue::Boolean(true)))
    }

    /// True when a single value equals `scalar`, or a container holds it
    pub fn matches(&self, scalar: &QtiValue) -> bool {
        match self {
            Self::Single(v) => v == scalar,
            Self::Multiple(vs) | Self::Ordered(vs) => vs.contains(scalar),
            Self::Record(fields) => fields.iter().any(|(_, v)| v == scalar),
        }
    }
}

fn check_homogeneous(values: &[QtiValue]) -> Result<()> {
    let mut iter = values.iter();
    let Some(first) = iter.next() else {
        return Ok(());
    };
    let expected = first.base_type();
    for v in iter {
        if v.base_type() != expected {
            return Err(ModelError::MixedContainer {
                expected,
                found: v.base_type(),
            });
        }
    }
    Ok(())
}

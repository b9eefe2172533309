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

//! Test session configuration flags
//!
//! The bit values are part of the binary snapshot contract.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Behavior flags of a test session, stored as a bitset
#[derive(Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TestSessionConfig(u32);

impl TestSessionConfig {
    /// Evaluate branch rules even in nonlinear navigation
    pub const FORCE_BRANCHING: Self = Self(1);
    /// Evaluate item-effective preconditions even in nonlinear navigation
    pub const FORCE_PRECONDITIONS: Self = Self(2);
    /// Record visited positions and use them for backward moves
    pub const PATH_TRACKING: Self = Self(4);
    /// Permit jumps regardless of the navigation mode
    pub const ALWAYS_ALLOW_JUMPS: Self = Self(8);
    /// Materialize every item session when the test begins
    pub const INITIALIZE_ALL_ITEMS: Self = Self(16);

    /// No flag set
    pub fn new() -> Self {
        Self(0)
    }

    /// Rebuild from raw bits, masking unknown ones
    pub fn from_bits(bits: u32) -> Self {
        Self(bits & 0x1f)
    }

    /// The raw bitset
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// True when every flag in `other` is set
    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// This configuration with the flags of `other` added
    #[must_use]
    pub fn with(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for TestSessionConfig {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for TestSessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        for (flag, name) in [
            (Self::FORCE_BRANCHING, "FORCE_BRANCHING"),
            (Self::FORCE_PRECONDITIONS, "FORCE_PRECONDITIONS"),
            (Self::PATH_TRACKING, "PATH_TRACKING"),
            (Self::ALWAYS_ALLOW_JUMPS, "ALWAYS_ALLOW_JUMPS"),
            (Self::INITIALIZE_ALL_ITEMS, "INITIALIZE_ALL_ITEMS"),
        ] {
            if self.contains(flag) {
                names.push(name);
            }
        }
        write!(f, "TestSessionConfig({})", names.join(" | "))
    }
}

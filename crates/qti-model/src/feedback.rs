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

//! Test-level feedback bindings

use crate::types::{ShowHide, TestFeedbackAccess};
use crate::value::{QtiValue, Value};
use serde::{Deserialize, Serialize};

/// Conditional content bound to an outcome variable, shown during or at the
/// end of a test or test part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestFeedback {
    /// Identifier of the feedback content
    pub identifier: String,
    /// Identifier of the bound outcome variable
    pub outcome_identifier: String,
    /// When the feedback may be shown
    pub access: TestFeedbackAccess,
    /// Whether a match shows or hides the feedback
    pub show_hide: ShowHide,
    /// Candidate-facing title
    pub title: String,
}

impl TestFeedback {
    /// Create a feedback binding
    pub fn new(
        identifier: impl Into<String>,
        outcome_identifier: impl Into<String>,
        access: TestFeedbackAccess,
        show_hide: ShowHide,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            outcome_identifier: outcome_identifier.into(),
            access,
            show_hide,
            title: String::new(),
        }
    }

    /// Decide whether this feedback fires against the bound outcome's value.
    ///
    /// Single-cardinality outcomes match by equality, containers by
    /// membership; the result is flipped for [`ShowHide::Hide`].
    pub fn fires(&self, outcome_value: Option<&Value>) -> bool {
        let probe = QtiValue::Identifier(self.identifier.clone());
        let matched = outcome_value.map(|v| v.matches(&probe)).unwrap_or(false);
        match self.show_hide {
            ShowHide::Show => matched,
            ShowHide::Hide => !matched,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_fires_on_match() {
        let fb = TestFeedback::new(
            "PASSED",
            "OUTCOME",
            TestFeedbackAccess::AtEnd,
            ShowHide::Show,
        );
        assert!(fb.fires(Some(&Value::identifier("PASSED"))));
        assert!(!fb.fires(Some(&Value::identifier("FAILED"))));
        assert!(!fb.fires(None));
    }

    #[test]
    fn hide_fires_on_mismatch() {
        let fb = TestFeedback::new(
            "PASSED",
            "OUTCOME",
            TestFeedbackAccess::During,
            ShowHide::Hide,
        );
        assert!(!fb.fires(Some(&Value::identifier("PASSED"))));
        assert!(fb.fires(Some(&Value::identifier("FAILED"))));
        assert!(fb.fires(None));
    }

    #[test]
    fn container_outcome_matches_by_membership() {
        let fb = TestFeedback::new(
            "HINT_A",
            "FLAGS",
            TestFeedbackAccess::During,
            ShowHide::Show,
        );
        let flags = Value::multiple(vec![
            QtiValue::Identifier("HINT_A".into()),
            QtiValue::Identifier("HINT_B".into()),
        ])
        .unwrap();
        assert!(fb.fires(Some(&flags)));
    }
}

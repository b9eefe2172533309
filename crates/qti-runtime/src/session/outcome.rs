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

//! Outcome processing, deferred submission and feedback gating

use super::TestSession;
use crate::error::{Result, SessionError};
use octoqti_model::{TestFeedbackAccess, TestResultsSubmission};
use std::sync::Arc;
use tracing::debug;

impl TestSession {
    /// Reset the global outcomes to their defaults and run the test's
    /// outcome rules, then submit results when the policy says so
    pub(crate) fn outcome_processing(&mut self) -> Result<()> {
        self.outcomes.reset_outcome_variables();
        let rules = self.test.outcome_rules.clone();
        let engine = self.expression_engine();
        for rule in &rules {
            let value = engine.evaluate(&rule.expression, self).map_err(|source| {
                SessionError::OutcomeProcessing {
                    message: format!("rule targeting '{}' failed", rule.target),
                    source: Some(source),
                }
            })?;
            if !self.outcomes.contains(&rule.target) {
                return Err(SessionError::OutcomeProcessing {
                    message: format!("no outcome '{}' declared by the test", rule.target),
                    source: None,
                });
            }
            self.outcomes
                .set_value(&rule.target, value)
                .map_err(|e| SessionError::OutcomeProcessing {
                    message: format!("cannot assign outcome '{}': {e}", rule.target),
                    source: None,
                })?;
        }
        debug!(session = %self.session_id, "outcome processing ran");

        if self.results_submission == TestResultsSubmission::OutcomeProcessing {
            self.submit_test_results()?;
        }
        Ok(())
    }

    /// Process every staged response set in arrival order, then run outcome
    /// processing once and clear the queue
    pub(crate) fn deferred_response_submission(&mut self) -> Result<()> {
        let entries = self.pending.all().to_vec();
        debug!(session = %self.session_id, count = entries.len(),
               "deferred response submission");
        for entry in &entries {
            let ref_id = entry.item_ref.identifier.clone();
            let occurrence = entry.occurrence;
            let label = format!("{ref_id}.{occurrence}");
            let response_processing = entry.item_ref.response_processing.clone();
            let session = self
                .item_sessions
                .get_session_mut(&ref_id, occurrence)
                .ok_or_else(|| {
                    SessionError::logic(format!(
                        "pending responses for '{label}' but no item session"
                    ))
                })?;
            session
                .complete_deferred_attempt(&entry.responses, response_processing.as_ref())
                .map_err(|e| SessionError::from_item_error(&label, e))?;
            self.last_occurrence_update.insert(ref_id.clone(), occurrence);
            self.submit_item_results(&ref_id, occurrence)?;
        }
        self.outcome_processing()?;
        self.pending.clear();
        Ok(())
    }

    /// Decide whether a test-level modal feedback must fire at the current
    /// stop, per the test's and current part's feedback bindings
    pub(crate) fn must_fire_feedback(&self) -> Result<bool> {
        if self.route.is_exhausted() {
            return Ok(false);
        }
        let at_test_end = self.route.is_last();
        let at_part_end = self.route.is_last_of_test_part()?;
        let current_part = Arc::clone(self.route.current()?.test_part());

        for feedback in &self.test.test_feedbacks {
            if feedback.access == TestFeedbackAccess::AtEnd && !at_test_end {
                continue;
            }
            let outcome = self.outcomes.value(&feedback.outcome_identifier).flatten();
            if feedback.fires(outcome) {
                return Ok(true);
            }
        }
        for feedback in &current_part.test_feedbacks {
            if feedback.access == TestFeedbackAccess::AtEnd && !at_part_end {
                continue;
            }
            let outcome = self.outcomes.value(&feedback.outcome_identifier).flatten();
            if feedback.fires(outcome) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Push one item session's results to the reporter
    pub(crate) fn submit_item_results(
        &mut self,
        item_ref: &str,
        occurrence: usize,
    ) -> Result<()> {
        let reporter = Arc::clone(&self.reporter);
        let session = self
            .item_sessions
            .get_session(item_ref, occurrence)
            .ok_or_else(|| {
                SessionError::logic(format!(
                    "no item session '{item_ref}.{occurrence}' to submit"
                ))
            })?;
        reporter
            .submit_item_results(session, occurrence)
            .map_err(|source| SessionError::ResultSubmission {
                message: format!("item results of '{item_ref}.{occurrence}' rejected"),
                source: Some(source),
            })
    }

    /// Push the test-level outcomes to the reporter
    pub(crate) fn submit_test_results(&mut self) -> Result<()> {
        let reporter = Arc::clone(&self.reporter);
        reporter
            .submit_test_results(&self.outcomes)
            .map_err(|source| SessionError::ResultSubmission {
                message: format!("test results of '{}' rejected", self.session_id),
                source: Some(source),
            })
    }
}

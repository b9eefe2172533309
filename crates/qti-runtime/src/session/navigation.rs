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

//! Route navigation: forward, backward, jumps, branching and eligibility
//!
//! A navigation error never leaves the cursor moved: the pre-advance
//! position is restored before the error surfaces.

use super::TestSession;
use crate::config::TestSessionConfig;
use crate::error::{Result, SessionError};
use octoqti_model::{
    Expression, ItemSessionState, NavigationMode, PreCondition, SubmissionMode, TestSessionState,
    EXIT_SECTION, EXIT_TEST, EXIT_TESTPART,
};
use std::sync::Arc;
use tracing::debug;

impl TestSession {
    /// Move the candidate forward.
    ///
    /// A shown modal feedback is acknowledged first (the cursor does not
    /// move); a due feedback fires instead of moving. Otherwise the cursor
    /// advances through branch rules and preconditions, ending the session
    /// when the route is exhausted.
    pub fn move_next(&mut self) -> Result<()> {
        match self.state {
            TestSessionState::Interacting => {}
            TestSessionState::ModalFeedback => {
                self.suspend_current_item_session();
                self.state = TestSessionState::Interacting;
                return Ok(());
            }
            other => {
                return Err(SessionError::state_violation(format!(
                    "cannot move forward while the session state is {other:?}"
                )));
            }
        }
        self.suspend_current_item_session();

        if !self.modal_feedback_shown && self.must_fire_feedback()? {
            self.state = TestSessionState::ModalFeedback;
            self.modal_feedback_shown = true;
            debug!(session = %self.session_id, "modal feedback fired");
            return Ok(());
        }

        let old_position = self.route.position();
        let track_path = self.config.contains(TestSessionConfig::PATH_TRACKING);
        if track_path {
            self.path.push(old_position);
        }
        if let Err(error) = self.next_route_item(false, false) {
            self.route.set_position(old_position).ok();
            if track_path {
                self.path.pop();
            }
            return Err(error);
        }
        self.modal_feedback_shown = false;

        if self.state == TestSessionState::Interacting && !self.route.is_exhausted() {
            self.interact_with_item_session()?;
            self.test_part_visit();
        }
        Ok(())
    }

    /// Move the candidate backward, through the recorded path when tracking
    /// is on, otherwise to the previous route item
    pub fn move_back(&mut self) -> Result<()> {
        if self.state != TestSessionState::Interacting {
            return Err(SessionError::state_violation(format!(
                "cannot move backward while the session state is {:?}",
                self.state
            )));
        }
        let navigation_mode = self.route.current()?.test_part().navigation_mode;
        if navigation_mode == NavigationMode::Linear
            && !self.config.contains(TestSessionConfig::ALWAYS_ALLOW_JUMPS)
        {
            return Err(SessionError::NavigationModeViolation {
                message: "backward navigation is not allowed in linear mode".into(),
            });
        }
        self.suspend_current_item_session();
        let old_position = self.route.position();

        if self.config.contains(TestSessionConfig::PATH_TRACKING) {
            let Some(target) = self.path.pop() else {
                return Err(SessionError::state_violation(
                    "no backward history to move to",
                ));
            };
            if let Err(error) = self.route.set_position(target) {
                self.path.push(target);
                return Err(error);
            }
            if let Err(error) = self.interact_with_item_session() {
                self.route.set_position(old_position).ok();
                self.path.push(target);
                return Err(error);
            }
        } else {
            if self.route.position() == 0 {
                return Err(SessionError::state_violation(
                    "already on the first route item",
                ));
            }
            self.route.previous()?;
            if let Err(error) = self.interact_with_item_session() {
                self.route.set_position(old_position).ok();
                return Err(error);
            }
        }

        self.test_part_visit();
        Ok(())
    }

    /// Jump the cursor to `position`.
    ///
    /// Requires nonlinear navigation, unless jumps are forced by
    /// configuration. On failure the cursor (and the path) are rolled back
    /// and the previous item is re-entered.
    pub fn jump_to(&mut self, position: usize) -> Result<()> {
        if self.state != TestSessionState::Interacting {
            return Err(SessionError::state_violation(format!(
                "cannot jump while the session state is {:?}",
                self.state
            )));
        }
        let navigation_mode = self.route.current()?.test_part().navigation_mode;
        if navigation_mode == NavigationMode::Linear
            && !self.config.contains(TestSessionConfig::ALWAYS_ALLOW_JUMPS)
        {
            return Err(SessionError::NavigationModeViolation {
                message: format!(
                    "cannot jump to position {position} in linear navigation mode"
                ),
            });
        }
        if position >= self.route.count() {
            return Err(SessionError::ForbiddenJump {
                message: format!(
                    "position {position} outside a route of {} items",
                    self.route.count()
                ),
            });
        }

        self.suspend_current_item_session();
        let old_position = self.route.position();
        self.route.set_position(position)?;
        let outcome = self
            .select_eligible_items()
            .and_then(|()| self.interact_with_item_session());
        match outcome {
            Ok(()) => {
                if self.config.contains(TestSessionConfig::PATH_TRACKING) {
                    match self.path.iter().position(|&p| p == position) {
                        // a backward jump rewinds the path to the target
                        Some(index) => self.path.truncate(index),
                        // a forward jump records where we came from
                        None => self.path.push(old_position),
                    }
                }
                self.test_part_visit();
                Ok(())
            }
            Err(error) => {
                self.route.set_position(old_position).ok();
                let _ = self.interact_with_item_session();
                Err(error)
            }
        }
    }

    /// Advance past every remaining item of the current test part
    pub fn move_next_test_part(&mut self) -> Result<()> {
        if self.state != TestSessionState::Interacting {
            return Err(SessionError::state_violation(format!(
                "cannot leave the test part while the session state is {:?}",
                self.state
            )));
        }
        self.suspend_current_item_session();
        let part_id = self.route.current()?.test_part().identifier.clone();
        while self.state == TestSessionState::Interacting
            && !self.route.is_exhausted()
            && self.route.current()?.test_part().identifier == part_id
        {
            self.next_route_item(true, false)?;
        }
        if self.state == TestSessionState::Interacting && !self.route.is_exhausted() {
            self.interact_with_item_session()?;
            self.test_part_visit();
        }
        Ok(())
    }

    /// Advance past every remaining item of the current section
    pub fn move_next_assessment_section(&mut self) -> Result<()> {
        if self.state != TestSessionState::Interacting {
            return Err(SessionError::state_violation(format!(
                "cannot leave the section while the session state is {:?}",
                self.state
            )));
        }
        self.suspend_current_item_session();
        let Some(section_id) = self
            .route
            .current()?
            .innermost_section()
            .map(|s| s.identifier.clone())
        else {
            return self.move_next_test_part();
        };
        while self.state == TestSessionState::Interacting
            && !self.route.is_exhausted()
            && self
                .route
                .current()?
                .sections()
                .iter()
                .any(|s| s.identifier == section_id)
        {
            self.next_route_item(true, false)?;
        }
        if self.state == TestSessionState::Interacting && !self.route.is_exhausted() {
            self.interact_with_item_session()?;
            self.test_part_visit();
        }
        Ok(())
    }

    /// The forward algorithm: deferred submission at a simultaneous part's
    /// end, one round of branch evaluation, then precondition-driven skips
    /// until a stopping item is found or the route is exhausted.
    pub(crate) fn next_route_item(
        &mut self,
        mut ignore_branching: bool,
        ignore_preconditions: bool,
    ) -> Result<()> {
        if !self.route.is_exhausted()
            && self.route.is_last_of_test_part()?
            && self.route.current()?.test_part().submission_mode == SubmissionMode::Simultaneous
        {
            self.deferred_response_submission()?;
        }

        loop {
            if self.route.is_exhausted() {
                break;
            }

            let mut branched = false;
            if !ignore_branching {
                let current = self.route.current()?;
                let navigation_mode = current.test_part().navigation_mode;
                let rules = current.branch_rules().to_vec();
                let branching_active = navigation_mode == NavigationMode::Linear
                    || self.config.contains(TestSessionConfig::FORCE_BRANCHING);
                if !rules.is_empty() && branching_active {
                    for rule in &rules {
                        if !self.evaluate_condition(&rule.expression)? {
                            continue;
                        }
                        match rule.target.as_str() {
                            EXIT_TEST => return self.end_test_session(),
                            EXIT_TESTPART => {
                                if !self.pending.is_empty() {
                                    self.deferred_response_submission()?;
                                }
                                let end = self.route.end_of_test_part(self.route.position());
                                self.route.set_position(end)?;
                            }
                            EXIT_SECTION => {
                                let end =
                                    self.route.end_of_assessment_section(self.route.position());
                                self.route.set_position(end)?;
                            }
                            target => self.route.branch(target)?,
                        }
                        branched = true;
                        break;
                    }
                }
            }
            if !branched {
                self.route.next()?;
            }
            // branch chains are not expected: one round of branching only
            ignore_branching = true;

            if self.route.is_exhausted() || ignore_preconditions {
                break;
            }

            let current = self.route.current()?;
            let navigation_mode = current.test_part().navigation_mode;
            if navigation_mode == NavigationMode::Linear
                || self.config.contains(TestSessionConfig::FORCE_PRECONDITIONS)
            {
                let guards = current.pre_conditions().to_vec();
                if self.all_conditions_hold(&guards)? {
                    break;
                }
                debug!(session = %self.session_id, position = self.route.position(),
                       "route item skipped by precondition");
            } else {
                // nonlinear: only the test part's own preconditions gate
                // entry, and only when the part is being entered
                if self.route.is_first_of_test_part()? {
                    let part = Arc::clone(self.route.current()?.test_part());
                    if self.all_conditions_hold(&part.pre_conditions)? {
                        break;
                    }
                    let end = self.route.end_of_test_part(self.route.position());
                    self.route.set_position(end)?;
                    ignore_branching = true;
                    continue;
                }
                break;
            }
        }

        if self.route.is_exhausted() {
            if self.state == TestSessionState::Interacting {
                self.end_test_session()?;
            }
        } else {
            self.select_eligible_items()?;
        }
        Ok(())
    }

    /// Lazily materialize the item sessions the candidate may reach
    pub(crate) fn select_eligible_items(&mut self) -> Result<()> {
        if self.route.is_exhausted() {
            return Ok(());
        }
        let indices: Vec<usize> = if self
            .config
            .contains(TestSessionConfig::INITIALIZE_ALL_ITEMS)
        {
            (0..self.route.count()).collect()
        } else {
            let current_part_id = self.route.current()?.test_part().identifier.clone();
            let first_part_id = self.route.items()[0].test_part().identifier.clone();
            let test_adaptive = self.adaptivity.values().any(|&adaptive| adaptive);
            let current_part_adaptive = self
                .adaptivity
                .get(&current_part_id)
                .copied()
                .unwrap_or(false);

            if !test_adaptive && !self.visited_test_parts.contains(&first_part_id) {
                (0..self.route.count()).collect()
            } else if current_part_adaptive {
                vec![self.route.position()]
            } else if !self.visited_test_parts.contains(&current_part_id) {
                self.route
                    .items()
                    .iter()
                    .enumerate()
                    .filter(|(_, item)| item.test_part().identifier == current_part_id)
                    .map(|(index, _)| index)
                    .collect()
            } else {
                Vec::new()
            }
        };

        for index in indices {
            self.ensure_item_session(index)?;
        }
        Ok(())
    }

    fn ensure_item_session(&mut self, index: usize) -> Result<()> {
        let (ref_id, occurrence) = {
            let route_item = &self.route.items()[index];
            (
                route_item.item_ref().identifier.clone(),
                route_item.occurrence(),
            )
        };
        if self.item_sessions.has_session(&ref_id, occurrence) {
            return Ok(());
        }
        let mut session = self.build_item_session(index);
        session.set_time_reference(self.time_reference);
        session
            .begin_item_session()
            .map_err(|e| SessionError::from_item_error(&format!("{ref_id}.{occurrence}"), e))?;
        self.item_sessions.add_session(session)
    }

    /// Re-enter the item under the cursor after a move, resuming a
    /// suspended session so its clock runs again
    pub(crate) fn interact_with_item_session(&mut self) -> Result<()> {
        let route_item = self.route.current()?;
        let key = (
            route_item.item_ref().identifier.clone(),
            route_item.occurrence(),
        );
        let label = route_item.label();
        if let Some(session) = self.item_sessions.get_session_mut(&key.0, key.1) {
            if session.state() == ItemSessionState::Suspended {
                session
                    .begin_candidate_session()
                    .map_err(|e| SessionError::from_item_error(&label, e))?;
            }
        }
        Ok(())
    }

    /// Record the current test part as visited
    pub(crate) fn test_part_visit(&mut self) {
        if let Ok(route_item) = self.route.current() {
            let part_id = &route_item.test_part().identifier;
            if !self.visited_test_parts.iter().any(|p| p == part_id) {
                self.visited_test_parts.push(part_id.clone());
            }
        }
    }

    /// Evaluate a rule condition: only the single boolean `true` passes
    pub(crate) fn evaluate_condition(&self, expression: &Expression) -> Result<bool> {
        let engine = self.expression_engine();
        let value = engine.evaluate(expression, self).map_err(|e| {
            SessionError::logic(format!("rule condition evaluation failed: {e}"))
        })?;
        Ok(value.map(|v| v.is_true()).unwrap_or(false))
    }

    pub(crate) fn all_conditions_hold(
        &self,
        conditions: &[Arc<PreCondition>],
    ) -> Result<bool> {
        for condition in conditions {
            if !self.evaluate_condition(&condition.expression)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

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

//! The time model
//!
//! The engine never reads a clock; time advances only through
//! [`TestSession::set_time`] observations. Each observation credits the
//! elapsed interval to the test, the current test part and its sections,
//! propagates to every live item session, then clamps and closes any scope
//! whose maximum ran out — in that order.

use super::TestSession;
use crate::error::{Result, SessionError, TimeScope};
use chrono::{DateTime, Utc};
use octoqti_model::{
    ItemSessionState, NavigationMode, QtiDuration, TestSessionState, TimeLimits,
};
use tracing::debug;

impl TestSession {
    /// Zero-initialize the duration entries of every scope on the route
    pub(crate) fn initialize_test_durations(&mut self) {
        self.durations.set(&self.test.identifier.clone(), QtiDuration::ZERO);
        let mut scopes: Vec<String> = Vec::new();
        for item in self.route.items() {
            let part_id = &item.test_part().identifier;
            if !scopes.iter().any(|s| s == part_id) {
                scopes.push(part_id.clone());
            }
            for section in item.sections() {
                if !scopes.iter().any(|s| s == &section.identifier) {
                    scopes.push(section.identifier.clone());
                }
            }
        }
        for scope in scopes {
            self.durations.set(&scope, QtiDuration::ZERO);
        }
    }

    /// Feed a monotonic UTC clock observation
    pub fn set_time(&mut self, observation: DateTime<Utc>) -> Result<()> {
        if self.state == TestSessionState::Interacting {
            if let Some(reference) = self.time_reference {
                let delta = QtiDuration::between(reference, observation);
                self.credit_current_scopes(delta)?;
            }
        }

        for item_session in self.item_sessions.iter_mut() {
            item_session.set_time(observation);
        }

        self.enforce_max_times()?;
        self.time_reference = Some(observation);
        Ok(())
    }

    fn credit_current_scopes(&mut self, delta: QtiDuration) -> Result<()> {
        let test_id = self.test.identifier.clone();
        self.durations.add(&test_id, delta);
        if self.route.is_exhausted() {
            return Ok(());
        }
        let (part_id, section_ids) = {
            let current = self.route.current()?;
            (
                current.test_part().identifier.clone(),
                current
                    .sections()
                    .iter()
                    .map(|s| s.identifier.clone())
                    .collect::<Vec<_>>(),
            )
        };
        self.durations.add(&part_id, delta);
        for section_id in section_ids {
            self.durations.add(&section_id, delta);
        }
        Ok(())
    }

    /// Clamp every scope to its maximum and close scopes whose remaining
    /// time reached zero
    fn enforce_max_times(&mut self) -> Result<()> {
        // test scope: clamp, then close the whole session
        let test_id = self.test.identifier.clone();
        if let Some(max) = self.test.time_limits.as_ref().and_then(|tl| tl.max_time) {
            if self.durations.get(&test_id) >= max {
                self.durations.set(&test_id, max);
                if self.state == TestSessionState::Interacting
                    || self.state == TestSessionState::ModalFeedback
                {
                    debug!(session = %self.session_id, "test maximum time reached");
                    self.end_test_session()?;
                    return Ok(());
                }
            }
        }

        // part and section scopes: clamp, then close their item sessions
        let mut expired: Vec<(String, bool)> = Vec::new();
        {
            let mut seen: Vec<&str> = Vec::new();
            for item in self.route.items() {
                let part = item.test_part();
                if !seen.contains(&part.identifier.as_str()) {
                    seen.push(&part.identifier);
                    if let Some(max) = part.time_limits.as_ref().and_then(|tl| tl.max_time) {
                        if self.durations.get(&part.identifier) >= max {
                            expired.push((part.identifier.clone(), true));
                        }
                    }
                }
                for section in item.sections() {
                    if !seen.contains(&section.identifier.as_str()) {
                        seen.push(&section.identifier);
                        if let Some(max) =
                            section.time_limits.as_ref().and_then(|tl| tl.max_time)
                        {
                            if self.durations.get(&section.identifier) >= max {
                                expired.push((section.identifier.clone(), false));
                            }
                        }
                    }
                }
            }
        }

        for (scope_id, is_part) in expired {
            let max = self.scope_max_time(&scope_id, is_part);
            if let Some(max) = max {
                self.durations.set(&scope_id, max);
            }
            self.close_scope_items(&scope_id, is_part);
        }
        Ok(())
    }

    fn scope_max_time(&self, scope_id: &str, is_part: bool) -> Option<QtiDuration> {
        for item in self.route.items() {
            if is_part {
                let part = item.test_part();
                if part.identifier == scope_id {
                    return part.time_limits.as_ref().and_then(|tl| tl.max_time);
                }
            } else {
                for section in item.sections() {
                    if section.identifier == scope_id {
                        return section.time_limits.as_ref().and_then(|tl| tl.max_time);
                    }
                }
            }
        }
        None
    }

    /// Close every open item session of a part or section whose time ran out
    fn close_scope_items(&mut self, scope_id: &str, is_part: bool) {
        let keys: Vec<(String, usize)> = self
            .route
            .items()
            .iter()
            .filter(|item| {
                if is_part {
                    item.test_part().identifier == scope_id
                } else {
                    item.sections().iter().any(|s| s.identifier == scope_id)
                }
            })
            .map(|item| (item.item_ref().identifier.clone(), item.occurrence()))
            .collect();
        let mut closed_any = false;
        for (ref_id, occurrence) in keys {
            if let Some(session) = self.item_sessions.get_session_mut(&ref_id, occurrence) {
                if session.state() != ItemSessionState::Closed {
                    session.close_with_status(octoqti_model::CompletionStatus::Incomplete);
                    closed_any = true;
                }
            }
        }
        if closed_any {
            debug!(session = %self.session_id, scope = scope_id, "scope closed by time limit");
        }
    }

    /// Check the in-force time constraints of the current position.
    ///
    /// Maximum checks run at the test, part and section scopes, and at the
    /// item scope when `include_assessment_item` is set. Minimum checks run
    /// only with `include_min_time`, and only under linear navigation.
    pub fn check_time_limits(
        &self,
        include_min_time: bool,
        include_assessment_item: bool,
    ) -> Result<()> {
        let linear = !self.route.is_exhausted()
            && self.route.current()?.test_part().navigation_mode == NavigationMode::Linear;
        let check_min = include_min_time && linear;

        let test_id = &self.test.identifier;
        self.check_scope(
            TimeScope::Test,
            test_id,
            self.test.time_limits.as_ref(),
            self.durations.get(test_id),
            check_min,
        )?;

        if self.route.is_exhausted() {
            return Ok(());
        }
        let current = self.route.current()?;
        let part = current.test_part();
        self.check_scope(
            TimeScope::TestPart,
            &part.identifier,
            part.time_limits.as_ref(),
            self.durations.get(&part.identifier),
            check_min,
        )?;
        for section in current.sections() {
            self.check_scope(
                TimeScope::AssessmentSection,
                &section.identifier,
                section.time_limits.as_ref(),
                self.durations.get(&section.identifier),
                check_min,
            )?;
        }

        if include_assessment_item {
            let label = current.label();
            if let Some(session) = self
                .item_sessions
                .get_session(&current.item_ref().identifier, current.occurrence())
            {
                self.check_scope(
                    TimeScope::Item,
                    &label,
                    session.time_limits(),
                    session.duration(),
                    check_min,
                )?;
            }
        }
        Ok(())
    }

    fn check_scope(
        &self,
        scope: TimeScope,
        identifier: &str,
        limits: Option<&TimeLimits>,
        elapsed: QtiDuration,
        check_min: bool,
    ) -> Result<()> {
        let Some(limits) = limits else {
            return Ok(());
        };
        if check_min {
            if let Some(min) = limits.min_time {
                if elapsed < min {
                    return Err(SessionError::DurationUnderflow {
                        scope,
                        identifier: identifier.to_string(),
                        source: None,
                    });
                }
            }
        }
        if let Some(max) = limits.max_time {
            if elapsed >= max && !limits.allow_late_submission {
                return Err(SessionError::DurationOverflow {
                    scope,
                    identifier: identifier.to_string(),
                    source: None,
                });
            }
        }
        Ok(())
    }
}

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

//! Item session state machine
//!
//! One `ItemSession` tracks one occurrence of an item reference: its
//! variables, attempts, accumulated duration and lifecycle state. Response
//! processing runs through the injected expression engine; in simultaneous
//! submission mode the enclosing test session defers it to the end of the
//! test part via [`ItemSession::complete_deferred_attempt`].

use crate::engine::{EvaluationScope, ExpressionEngine};
use crate::error::{ItemResult, ItemSessionError};
use chrono::{DateTime, Utc};
use octoqti_model::{
    AssessmentItemRef, CompletionStatus, ItemSessionControl, ItemSessionState, NavigationMode,
    QtiDuration, ResponseProcessing, State, SubmissionMode, TimeLimits, Value, VariableKind,
};
use std::sync::Arc;
use tracing::debug;

/// Serializable projection of an item session, used by the snapshot codec
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSessionSnapshot {
    /// Lifecycle state
    pub state: ItemSessionState,
    /// Attempts taken
    pub num_attempts: u32,
    /// Accumulated duration
    pub duration: QtiDuration,
    /// Completion status
    pub completion_status: CompletionStatus,
    /// Response variable values, in declaration order
    pub responses: Vec<(String, Option<Value>)>,
    /// Outcome variable values, in declaration order
    pub outcomes: Vec<(String, Option<Value>)>,
}

/// The state machine for one item occurrence
pub struct ItemSession {
    item_ref: Arc<AssessmentItemRef>,
    occurrence: usize,
    state: ItemSessionState,
    navigation_mode: NavigationMode,
    submission_mode: SubmissionMode,
    variables: State,
    num_attempts: u32,
    completion_status: CompletionStatus,
    duration: QtiDuration,
    time_reference: Option<DateTime<Utc>>,
    item_session_control: ItemSessionControl,
    time_limits: Option<TimeLimits>,
    attempting: bool,
    engine: Arc<dyn ExpressionEngine>,
}

impl ItemSession {
    /// Create a session for `item_ref`; it stays `NotSelected` until
    /// [`begin_item_session`](Self::begin_item_session) runs
    pub fn new(
        item_ref: Arc<AssessmentItemRef>,
        navigation_mode: NavigationMode,
        submission_mode: SubmissionMode,
        engine: Arc<dyn ExpressionEngine>,
    ) -> Self {
        let variables = State::from_declarations(
            item_ref
                .response_declarations
                .iter()
                .chain(item_ref.outcome_declarations.iter())
                .chain(item_ref.template_declarations.iter())
                .map(Arc::as_ref),
        );
        Self {
            item_ref,
            occurrence: 0,
            state: ItemSessionState::NotSelected,
            navigation_mode,
            submission_mode,
            variables,
            num_attempts: 0,
            completion_status: CompletionStatus::NotAttempted,
            duration: QtiDuration::ZERO,
            time_reference: None,
            item_session_control: ItemSessionControl::default(),
            time_limits: None,
            attempting: false,
            engine,
        }
    }

    /// The referenced item
    pub fn item_ref(&self) -> &Arc<AssessmentItemRef> {
        &self.item_ref
    }

    /// Occurrence number of this session within its item reference
    pub fn occurrence(&self) -> usize {
        self.occurrence
    }

    /// Pin the occurrence number (before the session begins)
    pub fn set_occurrence(&mut self, occurrence: usize) {
        self.occurrence = occurrence;
    }

    /// Lifecycle state
    pub fn state(&self) -> ItemSessionState {
        self.state
    }

    /// Attempts taken so far
    pub fn num_attempts(&self) -> u32 {
        self.num_attempts
    }

    /// Completion status
    pub fn completion_status(&self) -> CompletionStatus {
        self.completion_status
    }

    /// Accumulated interaction time
    pub fn duration(&self) -> QtiDuration {
        self.duration
    }

    /// The session's variables
    pub fn variables(&self) -> &State {
        &self.variables
    }

    /// Navigation mode inherited from the test part
    pub fn navigation_mode(&self) -> NavigationMode {
        self.navigation_mode
    }

    /// Submission mode inherited from the test part
    pub fn submission_mode(&self) -> SubmissionMode {
        self.submission_mode
    }

    /// Session control in force
    pub fn item_session_control(&self) -> &ItemSessionControl {
        &self.item_session_control
    }

    /// Override the session control (before the session begins)
    pub fn set_item_session_control(&mut self, control: ItemSessionControl) {
        self.item_session_control = control;
    }

    /// Item-scope time limits in force
    pub fn time_limits(&self) -> Option<&TimeLimits> {
        self.time_limits.as_ref()
    }

    /// Override the time limits (before the session begins)
    pub fn set_time_limits(&mut self, limits: Option<TimeLimits>) {
        self.time_limits = limits;
    }

    /// Seed the clock reference so the first `set_time` credits nothing
    pub fn set_time_reference(&mut self, reference: Option<DateTime<Utc>>) {
        self.time_reference = reference;
    }

    /// `<itemRefId>.<occurrence>` label used in faults
    pub fn label(&self) -> String {
        format!("{}.{}", self.item_ref.identifier, self.occurrence)
    }

    /// Remaining time against the item maximum, when one is in force
    pub fn remaining_time(&self) -> Option<QtiDuration> {
        self.time_limits
            .as_ref()
            .and_then(|tl| tl.max_time)
            .map(|max| self.duration.remaining_until(max))
    }

    /// True between `begin_attempt` and the end of the attempt
    pub fn is_attempting(&self) -> bool {
        self.attempting
    }

    /// True when every response variable equals its declared correct response
    pub fn is_correct(&self) -> bool {
        let mut responses = self.variables.iter_kind(VariableKind::Response).peekable();
        if responses.peek().is_none() {
            return false;
        }
        responses.into_iter().all(|v| v.is_correct())
    }

    /// Initialize the session: apply declared defaults, enter `Initial`
    pub fn begin_item_session(&mut self) -> ItemResult<()> {
        if self.state != ItemSessionState::NotSelected {
            return Err(ItemSessionError::StateViolation {
                message: format!(
                    "cannot begin an item session twice ('{}', state {:?})",
                    self.label(),
                    self.state
                ),
            });
        }
        self.variables.apply_defaults();
        self.num_attempts = 0;
        self.duration = QtiDuration::ZERO;
        self.completion_status = CompletionStatus::NotAttempted;
        self.state = ItemSessionState::Initial;
        debug!(session = %self.label(), "item session initialized");
        Ok(())
    }

    /// Begin a new attempt
    pub fn begin_attempt(&mut self) -> ItemResult<()> {
        match self.state {
            ItemSessionState::Initial | ItemSessionState::Suspended => {}
            ItemSessionState::Closed => {
                if !self.item_ref.adaptive
                    && self.item_session_control.max_attempts_in_force()
                    && self.num_attempts >= self.item_session_control.max_attempts
                {
                    return Err(ItemSessionError::AttemptsOverflow {
                        session: self.label(),
                        max_attempts: self.item_session_control.max_attempts,
                    });
                }
                return Err(ItemSessionError::StateViolation {
                    message: format!("cannot begin an attempt on closed '{}'", self.label()),
                });
            }
            other => {
                return Err(ItemSessionError::StateViolation {
                    message: format!(
                        "cannot begin an attempt on '{}' in state {other:?}",
                        self.label()
                    ),
                });
            }
        }

        if !self.item_ref.adaptive
            && self.item_session_control.max_attempts_in_force()
            && self.num_attempts >= self.item_session_control.max_attempts
        {
            return Err(ItemSessionError::AttemptsOverflow {
                session: self.label(),
                max_attempts: self.item_session_control.max_attempts,
            });
        }

        if let Some(remaining) = self.remaining_time() {
            let allow_late = self
                .time_limits
                .as_ref()
                .is_some_and(|tl| tl.allow_late_submission);
            if remaining.is_zero() && !allow_late {
                return Err(ItemSessionError::DurationOverflow {
                    session: self.label(),
                });
            }
        }

        if self.num_attempts == 0 {
            self.completion_status = CompletionStatus::Unknown;
        }
        self.num_attempts += 1;
        self.attempting = true;
        self.state = ItemSessionState::Interacting;
        debug!(session = %self.label(), attempt = self.num_attempts, "attempt begun");
        Ok(())
    }

    /// End the current attempt: copy responses in, run response processing,
    /// update the completion status and transition to `Suspended` or
    /// `Closed`.
    ///
    /// The session is left untouched when any validation step fails.
    pub fn end_attempt(
        &mut self,
        responses: &State,
        response_processing: Option<&ResponseProcessing>,
        allow_late_submission: bool,
    ) -> ItemResult<()> {
        if self.state != ItemSessionState::Interacting {
            return Err(ItemSessionError::StateViolation {
                message: format!(
                    "cannot end an attempt on '{}' in state {:?}",
                    self.label(),
                    self.state
                ),
            });
        }
        self.check_time_limits(allow_late_submission)?;
        self.validate_responses(responses)?;
        self.apply_attempt(responses, response_processing)
    }

    /// Finish an attempt whose responses were staged for deferred
    /// submission. Validation already happened at staging time; time limits
    /// are not re-checked.
    pub fn complete_deferred_attempt(
        &mut self,
        responses: &State,
        response_processing: Option<&ResponseProcessing>,
    ) -> ItemResult<()> {
        match self.state {
            ItemSessionState::Interacting | ItemSessionState::Suspended => {
                self.apply_attempt(responses, response_processing)
            }
            other => Err(ItemSessionError::StateViolation {
                message: format!(
                    "cannot complete a deferred attempt on '{}' in state {other:?}",
                    self.label()
                ),
            }),
        }
    }

    /// Check submitted responses against the declarations without mutating
    /// the session
    pub fn validate_responses(&self, responses: &State) -> ItemResult<()> {
        for response in responses.iter() {
            let name = response.identifier();
            match self.variables.get(name) {
                Some(declared) if declared.kind() == VariableKind::Response => {
                    if let Some(value) = response.value() {
                        if value.cardinality() != declared.cardinality() {
                            return Err(ItemSessionError::InvalidResponse {
                                session: self.label(),
                                message: format!(
                                    "response '{name}' has cardinality {}, declared {}",
                                    value.cardinality(),
                                    declared.cardinality()
                                ),
                            });
                        }
                        if let Some(base_type) = value.base_type() {
                            if base_type != declared.base_type() {
                                return Err(ItemSessionError::InvalidResponse {
                                    session: self.label(),
                                    message: format!(
                                        "response '{name}' has base type {base_type}, declared {}",
                                        declared.base_type()
                                    ),
                                });
                            }
                        }
                    }
                }
                _ => {
                    return Err(ItemSessionError::InvalidResponse {
                        session: self.label(),
                        message: format!("no response variable '{name}' declared"),
                    });
                }
            }
        }

        if !self.item_session_control.allow_skipping {
            let all_null = responses.iter().all(|v| v.value().is_none());
            if all_null {
                return Err(ItemSessionError::SkippingForbidden {
                    session: self.label(),
                });
            }
        }
        Ok(())
    }

    fn check_time_limits(&self, allow_late_submission: bool) -> ItemResult<()> {
        let Some(limits) = &self.time_limits else {
            return Ok(());
        };
        if let Some(max) = limits.max_time {
            if self.duration >= max && !(allow_late_submission || limits.allow_late_submission) {
                return Err(ItemSessionError::DurationOverflow {
                    session: self.label(),
                });
            }
        }
        if self.navigation_mode == NavigationMode::Linear {
            if let Some(min) = limits.min_time {
                if self.duration < min {
                    return Err(ItemSessionError::DurationUnderflow {
                        session: self.label(),
                    });
                }
            }
        }
        Ok(())
    }

    fn apply_attempt(
        &mut self,
        responses: &State,
        response_processing: Option<&ResponseProcessing>,
    ) -> ItemResult<()> {
        for response in responses.iter() {
            self.variables
                .set_value(response.identifier(), response.value().cloned())?;
        }
        self.attempting = false;

        if let Some(rp) = response_processing {
            self.run_response_processing(rp)?;
        }

        if self.item_ref.adaptive {
            self.completion_status = self.declared_completion_status();
            if self.completion_status == CompletionStatus::Completed {
                self.close();
            } else {
                self.state = ItemSessionState::Suspended;
            }
        } else {
            self.completion_status = CompletionStatus::Completed;
            let exhausted = self.item_session_control.max_attempts_in_force()
                && self.num_attempts >= self.item_session_control.max_attempts;
            if exhausted {
                self.close();
            } else {
                self.state = ItemSessionState::Suspended;
            }
        }
        debug!(session = %self.label(), state = ?self.state, "attempt ended");
        Ok(())
    }

    fn run_response_processing(&mut self, rp: &ResponseProcessing) -> ItemResult<()> {
        let engine = Arc::clone(&self.engine);
        for rule in &rp.rules {
            let value =
                engine
                    .evaluate(&rule.expression, self)
                    .map_err(|source| ItemSessionError::ResponseProcessing {
                        session: self.label(),
                        source,
                    })?;
            match self.variables.get(&rule.target) {
                Some(v) if v.kind() == VariableKind::Outcome => {
                    self.variables.set_value(&rule.target, value)?;
                }
                _ => {
                    return Err(ItemSessionError::UnknownVariable {
                        session: self.label(),
                        identifier: rule.target.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The `completionStatus` outcome declared by adaptive items
    fn declared_completion_status(&self) -> CompletionStatus {
        let declared = self
            .variables
            .value("completionStatus")
            .flatten()
            .and_then(|v| v.as_single())
            .and_then(|v| v.as_identifier().map(str::to_owned));
        match declared.as_deref() {
            Some("completed") => CompletionStatus::Completed,
            Some("incomplete") => CompletionStatus::Incomplete,
            Some("not_attempted") => CompletionStatus::NotAttempted,
            _ => CompletionStatus::Unknown,
        }
    }

    /// Install a resolved template default
    pub fn set_template_value(&mut self, name: &str, value: Option<Value>) -> ItemResult<()> {
        match self.variables.get(name) {
            Some(v) if v.kind() == VariableKind::Template => {
                self.variables.set_value(name, value)?;
                Ok(())
            }
            _ => Err(ItemSessionError::UnknownVariable {
                session: self.label(),
                identifier: name.to_string(),
            }),
        }
    }

    /// Write a declared variable from the test-session scope
    pub fn set_variable_value(&mut self, name: &str, value: Option<Value>) -> ItemResult<()> {
        if !self.variables.contains(name) {
            return Err(ItemSessionError::UnknownVariable {
                session: self.label(),
                identifier: name.to_string(),
            });
        }
        self.variables.set_value(name, value)?;
        Ok(())
    }

    /// Pause interaction; a no-op when already suspended or not interacting
    pub fn suspend(&mut self) {
        match self.state {
            ItemSessionState::Interacting => self.state = ItemSessionState::Suspended,
            // a modal feedback stays on screen across a suspension
            ItemSessionState::ModalFeedback => {}
            _ => {}
        }
    }

    /// Resume interaction without opening a new attempt
    pub fn begin_candidate_session(&mut self) -> ItemResult<()> {
        match self.state {
            ItemSessionState::Suspended | ItemSessionState::ModalFeedback => {
                self.state = ItemSessionState::Interacting;
                Ok(())
            }
            other => Err(ItemSessionError::StateViolation {
                message: format!(
                    "cannot resume candidate session on '{}' in state {other:?}",
                    self.label()
                ),
            }),
        }
    }

    /// Pause interaction without ending the attempt
    pub fn end_candidate_session(&mut self) -> ItemResult<()> {
        if self.state != ItemSessionState::Interacting {
            return Err(ItemSessionError::StateViolation {
                message: format!(
                    "cannot end candidate session on '{}' in state {:?}",
                    self.label(),
                    self.state
                ),
            });
        }
        self.state = ItemSessionState::Suspended;
        Ok(())
    }

    /// Close the session
    pub fn end_item_session(&mut self) {
        if self.attempting {
            self.attempting = false;
            self.completion_status = CompletionStatus::Incomplete;
        } else if self.num_attempts == 0 {
            self.completion_status = CompletionStatus::NotAttempted;
        }
        self.close();
    }

    /// Close the session with an explicit completion status (used when a
    /// scope's time runs out)
    pub fn close_with_status(&mut self, status: CompletionStatus) {
        self.attempting = false;
        self.completion_status = status;
        self.close();
    }

    fn close(&mut self) {
        if self.state != ItemSessionState::Closed {
            self.state = ItemSessionState::Closed;
            debug!(session = %self.label(), status = %self.completion_status, "item session closed");
        }
    }

    /// Feed a clock observation; credits elapsed time while interacting and
    /// closes the session when the item maximum runs out
    pub fn set_time(&mut self, observation: DateTime<Utc>) {
        if self.state == ItemSessionState::Interacting {
            if let Some(reference) = self.time_reference {
                self.duration += QtiDuration::between(reference, observation);
            }
            if let Some(max) = self.time_limits.as_ref().and_then(|tl| tl.max_time) {
                if self.duration >= max {
                    self.duration = max;
                    self.close_with_status(CompletionStatus::Incomplete);
                }
            }
        }
        self.time_reference = Some(observation);
    }

    /// Capture the serializable projection of this session
    pub fn snapshot(&self) -> ItemSessionSnapshot {
        let collect = |kind| {
            self.variables
                .iter_kind(kind)
                .map(|v| (v.identifier().to_string(), v.value().cloned()))
                .collect()
        };
        ItemSessionSnapshot {
            state: self.state,
            num_attempts: self.num_attempts,
            duration: self.duration,
            completion_status: self.completion_status,
            responses: collect(VariableKind::Response),
            outcomes: collect(VariableKind::Outcome),
        }
    }

    /// Restore a serialized projection onto a freshly created session
    pub fn apply_snapshot(&mut self, snapshot: ItemSessionSnapshot) -> ItemResult<()> {
        if snapshot.state != ItemSessionState::NotSelected {
            self.variables.apply_defaults();
        }
        self.state = snapshot.state;
        self.num_attempts = snapshot.num_attempts;
        self.duration = snapshot.duration;
        self.completion_status = snapshot.completion_status;
        self.attempting = snapshot.state == ItemSessionState::Interacting;
        for (name, value) in snapshot
            .responses
            .into_iter()
            .chain(snapshot.outcomes.into_iter())
        {
            self.variables.set_value(&name, value)?;
        }
        Ok(())
    }
}

impl EvaluationScope for ItemSession {
    fn value_of(&self, identifier: &str) -> Option<Value> {
        match identifier {
            "duration" => Some(Value::duration(self.duration)),
            "numAttempts" => Some(Value::integer(self.num_attempts as i32)),
            "completionStatus" if self.variables.value("completionStatus").is_none() => {
                Some(Value::identifier(self.completion_status.as_str()))
            }
            name => self.variables.value(name).flatten().cloned(),
        }
    }
}

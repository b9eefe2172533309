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

//! The test session driver
//!
//! `TestSession` is the top-level state machine of a candidate's run through
//! an assessment test. It owns the route cursor, the item sessions, the
//! duration and pending-response stores and the global outcome variables;
//! the assessment tree itself is shared read-only.
//!
//! The driver is synchronous and single-threaded within one session.
//! Navigation lives in [`navigation`], the time model in [`timing`],
//! variable addressing in [`variables`] and outcome processing plus
//! feedback gating in [`outcome`].

mod navigation;
mod outcome;
#[cfg(test)]
mod tests;
mod timing;
mod variables;

use crate::config::TestSessionConfig;
use crate::durations::DurationStore;
use crate::engine::{
    DefaultSessionManager, ExpressionEngine, NullResultReporter, ResultReporter, SessionManager,
};
use crate::error::{Result, SessionError};
use crate::item_session::{ItemSession, ItemSessionSnapshot};
use crate::pending::{PendingResponseStore, PendingResponses};
use crate::route::{Route, RouteItem};
use crate::store::ItemSessionStore;
use chrono::{DateTime, Utc};
use octoqti_model::{
    AssessmentTest, ItemSessionState, QtiDuration, State, SubmissionMode, TestResultsSubmission,
    TestSessionState, Value,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::debug;

/// Serialized pieces of a test session, as read back from a snapshot
pub struct TestSessionRestore {
    /// The session identifier the snapshot was stored under
    pub session_id: String,
    /// Lifecycle state
    pub state: TestSessionState,
    /// The reconstructed route, cursor included
    pub route: Route,
    /// Global outcome values in declaration order
    pub outcome_values: Vec<(String, Option<Value>)>,
    /// One item-session projection per route item, in route order
    pub item_snapshots: Vec<ItemSessionSnapshot>,
    /// Duration store entries in first-seen order
    pub durations: Vec<(String, QtiDuration)>,
    /// Staged pending responses
    pub pending: PendingResponseStore,
    /// Last updated occurrence per item reference
    pub last_occurrence_update: Vec<(String, usize)>,
    /// Visited test parts in visit order
    pub visited_test_parts: Vec<String>,
    /// Recorded path positions
    pub path: Vec<usize>,
    /// Last clock observation
    pub time_reference: Option<DateTime<Utc>>,
    /// Configuration flags
    pub config: TestSessionConfig,
    /// Result submission policy
    pub results_submission: TestResultsSubmission,
}

/// The state machine driving one candidate through one assessment test
pub struct TestSession {
    session_id: String,
    test: Arc<AssessmentTest>,
    route: Route,
    state: TestSessionState,
    outcomes: State,
    item_sessions: ItemSessionStore,
    durations: DurationStore,
    pending: PendingResponseStore,
    last_occurrence_update: FxHashMap<String, usize>,
    visited_test_parts: Vec<String>,
    path: Vec<usize>,
    time_reference: Option<DateTime<Utc>>,
    /// testPart identifier → the part carries preconditions or branch rules
    adaptivity: FxHashMap<String, bool>,
    config: TestSessionConfig,
    results_submission: TestResultsSubmission,
    /// set while the pending modal feedback for the current stop was shown
    modal_feedback_shown: bool,
    engine: Arc<dyn ExpressionEngine>,
    session_manager: Arc<dyn SessionManager>,
    reporter: Arc<dyn ResultReporter>,
}

/// Builder for [`TestSession`]
pub struct TestSessionBuilder {
    session_id: String,
    test: Arc<AssessmentTest>,
    route: Route,
    engine: Arc<dyn ExpressionEngine>,
    session_manager: Option<Arc<dyn SessionManager>>,
    reporter: Arc<dyn ResultReporter>,
    config: TestSessionConfig,
    results_submission: TestResultsSubmission,
}

impl TestSessionBuilder {
    /// Start building a session over `test` and its materialized `route`
    pub fn new(
        session_id: impl Into<String>,
        test: Arc<AssessmentTest>,
        route: Route,
        engine: Arc<dyn ExpressionEngine>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            test,
            route,
            engine,
            session_manager: None,
            reporter: Arc::new(NullResultReporter),
            config: TestSessionConfig::new(),
            results_submission: TestResultsSubmission::default(),
        }
    }

    /// Use a custom item-session factory
    pub fn with_session_manager(mut self, manager: Arc<dyn SessionManager>) -> Self {
        self.session_manager = Some(manager);
        self
    }

    /// Use a custom result reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn ResultReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Set the configuration flags
    pub fn with_config(mut self, config: TestSessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the result submission policy
    pub fn with_results_submission(mut self, policy: TestResultsSubmission) -> Self {
        self.results_submission = policy;
        self
    }

    /// Build the session in its `Initial` state
    pub fn build(self) -> TestSession {
        let session_manager = self
            .session_manager
            .unwrap_or_else(|| Arc::new(DefaultSessionManager::new(Arc::clone(&self.engine))));
        let outcomes =
            State::from_declarations(self.test.outcome_declarations.iter().map(Arc::as_ref));
        let adaptivity = self
            .test
            .test_parts
            .iter()
            .map(|p| (p.identifier.clone(), p.is_adaptive()))
            .collect();
        TestSession {
            session_id: self.session_id,
            test: self.test,
            route: self.route,
            state: TestSessionState::Initial,
            outcomes,
            item_sessions: ItemSessionStore::new(),
            durations: DurationStore::new(),
            pending: PendingResponseStore::new(),
            last_occurrence_update: FxHashMap::default(),
            visited_test_parts: Vec::new(),
            path: Vec::new(),
            time_reference: None,
            adaptivity,
            config: self.config,
            results_submission: self.results_submission,
            modal_feedback_shown: false,
            engine: self.engine,
            session_manager,
            reporter: self.reporter,
        }
    }
}

impl TestSession {
    /// Rebuild a session from its serialized pieces
    pub fn restore(
        test: Arc<AssessmentTest>,
        engine: Arc<dyn ExpressionEngine>,
        session_manager: Option<Arc<dyn SessionManager>>,
        reporter: Arc<dyn ResultReporter>,
        pieces: TestSessionRestore,
    ) -> Result<Self> {
        let item_snapshots = pieces.item_snapshots;
        let mut session = TestSessionBuilder::new(
            pieces.session_id,
            test,
            pieces.route,
            engine,
        )
        .with_config(pieces.config)
        .with_results_submission(pieces.results_submission)
        .with_reporter(reporter)
        .build();
        if let Some(manager) = session_manager {
            session.session_manager = manager;
        }

        session.state = pieces.state;
        for (name, value) in pieces.outcome_values {
            if session.outcomes.contains(&name) {
                session
                    .outcomes
                    .set_value(&name, value)
                    .map_err(|e| SessionError::logic(format!("restoring outcome: {e}")))?;
            } else {
                return Err(SessionError::logic(format!(
                    "snapshot carries undeclared outcome '{name}'"
                )));
            }
        }

        if item_snapshots.len() != session.route.count() {
            return Err(SessionError::logic(format!(
                "snapshot carries {} item sessions for a route of {}",
                item_snapshots.len(),
                session.route.count()
            )));
        }
        for (index, snapshot) in item_snapshots.into_iter().enumerate() {
            if snapshot.state == ItemSessionState::NotSelected {
                continue;
            }
            let mut item_session = session.build_item_session(index);
            item_session
                .apply_snapshot(snapshot)
                .map_err(|e| SessionError::logic(format!("restoring item session: {e}")))?;
            session.item_sessions.add_session(item_session)?;
        }

        for (identifier, duration) in pieces.durations {
            session.durations.set(&identifier, duration);
        }
        session.pending = pieces.pending;
        session.last_occurrence_update = pieces.last_occurrence_update.into_iter().collect();
        session.visited_test_parts = pieces.visited_test_parts;
        session.path = pieces.path;
        session.time_reference = pieces.time_reference;
        for item_session in session.item_sessions.iter_mut() {
            item_session.set_time_reference(pieces.time_reference);
        }
        Ok(session)
    }

    /// The identifier this session is stored under
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Lifecycle state
    pub fn state(&self) -> TestSessionState {
        self.state
    }

    /// The assessment tree the session runs over
    pub fn test(&self) -> &Arc<AssessmentTest> {
        &self.test
    }

    /// The route, cursor included
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// The global outcome variables
    pub fn outcomes(&self) -> &State {
        &self.outcomes
    }

    /// The item session store
    pub fn item_sessions(&self) -> &ItemSessionStore {
        &self.item_sessions
    }

    /// The per-scope duration store
    pub fn durations(&self) -> &DurationStore {
        &self.durations
    }

    /// The staged-response store
    pub fn pending_responses(&self) -> &PendingResponseStore {
        &self.pending
    }

    /// Configuration flags
    pub fn config(&self) -> TestSessionConfig {
        self.config
    }

    /// Result submission policy
    pub fn results_submission(&self) -> TestResultsSubmission {
        self.results_submission
    }

    /// Last clock observation fed to the session
    pub fn time_reference(&self) -> Option<DateTime<Utc>> {
        self.time_reference
    }

    /// Recorded path positions, oldest first
    pub fn path(&self) -> &[usize] {
        &self.path
    }

    /// Visited test parts, in visit order
    pub fn visited_test_parts(&self) -> &[String] {
        &self.visited_test_parts
    }

    /// Last updated occurrence per item reference, sorted by identifier
    pub fn last_occurrence_updates(&self) -> Vec<(String, usize)> {
        let mut entries: Vec<_> = self
            .last_occurrence_update
            .iter()
            .map(|(k, &v)| (k.clone(), v))
            .collect();
        entries.sort();
        entries
    }

    /// True between `begin_test_session` and the session's end
    pub fn is_running(&self) -> bool {
        !matches!(
            self.state,
            TestSessionState::Initial | TestSessionState::Closed
        )
    }

    /// The route item under the cursor
    pub fn current_route_item(&self) -> Result<&RouteItem> {
        self.route.current()
    }

    /// Borrow an item session by reference identifier and occurrence
    pub fn item_session(&self, item_ref: &str, occurrence: usize) -> Option<&ItemSession> {
        self.item_sessions.get_session(item_ref, occurrence)
    }

    /// Borrow the item session under the cursor
    pub fn current_item_session(&self) -> Option<&ItemSession> {
        let route_item = self.route.current().ok()?;
        self.item_sessions.get_session(
            &route_item.item_ref().identifier,
            route_item.occurrence(),
        )
    }

    /// Begin the session: zero the duration entries, select eligible items
    /// and enter `Interacting`
    pub fn begin_test_session(&mut self) -> Result<()> {
        if self.state != TestSessionState::Initial {
            return Err(SessionError::state_violation(format!(
                "cannot begin test session '{}' twice",
                self.session_id
            )));
        }
        self.initialize_test_durations();
        if self.route.count() == 0 {
            self.state = TestSessionState::Closed;
            return Ok(());
        }
        self.select_eligible_items()?;
        self.test_part_visit();
        self.state = TestSessionState::Interacting;
        debug!(session = %self.session_id, "test session begun");
        Ok(())
    }

    /// End the session: flush pending responses, submit results per policy,
    /// close every open item session.
    ///
    /// A second call is a state violation, surfacing double-close bugs.
    pub fn end_test_session(&mut self) -> Result<()> {
        match self.state {
            TestSessionState::Interacting
            | TestSessionState::Suspended
            | TestSessionState::ModalFeedback => {}
            TestSessionState::Closed => {
                return Err(SessionError::state_violation(format!(
                    "test session '{}' is already closed",
                    self.session_id
                )));
            }
            TestSessionState::Initial => {
                return Err(SessionError::state_violation(format!(
                    "test session '{}' was never begun",
                    self.session_id
                )));
            }
        }
        if !self.pending.is_empty() {
            self.deferred_response_submission()?;
        }
        if self.results_submission == TestResultsSubmission::End {
            self.submit_test_results()?;
        }
        for item_session in self.item_sessions.iter_mut() {
            if item_session.state() != ItemSessionState::Closed {
                item_session.end_item_session();
            }
        }
        self.state = TestSessionState::Closed;
        debug!(session = %self.session_id, "test session closed");
        Ok(())
    }

    /// Begin an attempt on the current item
    pub fn begin_attempt(&mut self) -> Result<()> {
        self.begin_attempt_with(false)
    }

    /// Begin an attempt, optionally ignoring expired outer time limits
    pub fn begin_attempt_with(&mut self, allow_late_submission: bool) -> Result<()> {
        if self.state != TestSessionState::Interacting {
            return Err(SessionError::state_violation(format!(
                "cannot begin an attempt while the session state is {:?}",
                self.state
            )));
        }
        if !allow_late_submission {
            // outer scopes only; the item session checks its own limits
            self.check_time_limits(false, false)?;
        }

        let route_item = self.route.current()?;
        let item_ref = Arc::clone(route_item.item_ref());
        let occurrence = route_item.occurrence();
        let label = route_item.label();
        let part = Arc::clone(route_item.test_part());

        let never_attempted = self
            .item_sessions
            .get_session(&item_ref.identifier, occurrence)
            .map(|s| s.num_attempts() == 0)
            .ok_or_else(|| {
                SessionError::logic(format!(
                    "no item session exists for '{label}'; eligibility selection did not run"
                ))
            })?;

        // linear parts resolve template defaults right before the first
        // attempt, when the whole session scope is available
        if part.navigation_mode == octoqti_model::NavigationMode::Linear && never_attempted {
            self.apply_template_defaults(&item_ref, occurrence, &label)?;
        }

        let session = self
            .item_sessions
            .get_session_mut(&item_ref.identifier, occurrence)
            .ok_or_else(|| SessionError::logic(format!("no item session exists for '{label}'")))?;
        let result = if part.submission_mode == SubmissionMode::Simultaneous && !never_attempted {
            session.begin_candidate_session()
        } else {
            session.begin_attempt()
        };
        result.map_err(|e| SessionError::from_item_error(&label, e))
    }

    /// End the attempt on the current item with the candidate's responses
    pub fn end_attempt(&mut self, responses: State) -> Result<()> {
        self.end_attempt_with(responses, false)
    }

    /// End the attempt, optionally ignoring expired time limits
    pub fn end_attempt_with(
        &mut self,
        responses: State,
        allow_late_submission: bool,
    ) -> Result<()> {
        if self.state != TestSessionState::Interacting {
            return Err(SessionError::state_violation(format!(
                "cannot end an attempt while the session state is {:?}",
                self.state
            )));
        }
        if !allow_late_submission {
            self.check_time_limits(true, false)?;
        }

        let route_item = self.route.current()?;
        let item_ref = Arc::clone(route_item.item_ref());
        let occurrence = route_item.occurrence();
        let label = route_item.label();
        let submission_mode = route_item.test_part().submission_mode;

        match submission_mode {
            SubmissionMode::Simultaneous => {
                let session = self
                    .item_sessions
                    .get_session_mut(&item_ref.identifier, occurrence)
                    .ok_or_else(|| {
                        SessionError::logic(format!("no item session exists for '{label}'"))
                    })?;
                session
                    .validate_responses(&responses)
                    .map_err(|e| SessionError::from_item_error(&label, e))?;
                session
                    .end_candidate_session()
                    .map_err(|e| SessionError::from_item_error(&label, e))?;
                self.pending.add_pending(PendingResponses::new(
                    item_ref,
                    occurrence,
                    responses,
                ));
                Ok(())
            }
            SubmissionMode::Individual => {
                let response_processing = item_ref.response_processing.clone();
                let session = self
                    .item_sessions
                    .get_session_mut(&item_ref.identifier, occurrence)
                    .ok_or_else(|| {
                        SessionError::logic(format!("no item session exists for '{label}'"))
                    })?;
                session
                    .end_attempt(&responses, response_processing.as_ref(), allow_late_submission)
                    .map_err(|e| SessionError::from_item_error(&label, e))?;
                self.last_occurrence_update
                    .insert(item_ref.identifier.clone(), occurrence);
                self.submit_item_results(&item_ref.identifier, occurrence)?;
                self.outcome_processing()
            }
        }
    }

    /// Suspend the session; a second call is a no-op
    pub fn suspend(&mut self) -> Result<()> {
        match self.state {
            TestSessionState::Interacting => {
                self.suspend_current_item_session();
                self.state = TestSessionState::Suspended;
                Ok(())
            }
            // a shown modal feedback survives suspension; repeated
            // suspension changes nothing
            TestSessionState::ModalFeedback | TestSessionState::Suspended => Ok(()),
            other => Err(SessionError::state_violation(format!(
                "cannot suspend a session in state {other:?}"
            ))),
        }
    }

    /// Resume a suspended session
    pub fn resume(&mut self) -> Result<()> {
        if self.state != TestSessionState::Suspended {
            return Err(SessionError::state_violation(format!(
                "cannot resume a session in state {:?}",
                self.state
            )));
        }
        self.state = TestSessionState::Interacting;
        self.interact_with_item_session()
    }

    pub(crate) fn suspend_current_item_session(&mut self) {
        if let Ok(route_item) = self.route.current() {
            let key = (
                route_item.item_ref().identifier.clone(),
                route_item.occurrence(),
            );
            if let Some(session) = self.item_sessions.get_session_mut(&key.0, key.1) {
                session.suspend();
            }
        }
    }

    /// Evaluate the template defaults of `item_ref` against the session
    /// scope and install the results on the target item session
    fn apply_template_defaults(
        &mut self,
        item_ref: &Arc<octoqti_model::AssessmentItemRef>,
        occurrence: usize,
        label: &str,
    ) -> Result<()> {
        if item_ref.template_defaults.is_empty() {
            return Ok(());
        }
        let engine = Arc::clone(&self.engine);
        let mut resolved = Vec::with_capacity(item_ref.template_defaults.len());
        for template_default in &item_ref.template_defaults {
            let value = engine
                .evaluate(&template_default.expression, self)
                .map_err(|source| SessionError::OutcomeProcessing {
                    message: format!(
                        "template default '{}' of '{label}' failed",
                        template_default.template_identifier
                    ),
                    source: Some(source),
                })?;
            resolved.push((template_default.template_identifier.clone(), value));
        }
        let session = self
            .item_sessions
            .get_session_mut(&item_ref.identifier, occurrence)
            .ok_or_else(|| SessionError::logic(format!("no item session exists for '{label}'")))?;
        for (name, value) in resolved {
            session
                .set_template_value(&name, value)
                .map_err(|e| SessionError::from_item_error(label, e))?;
        }
        Ok(())
    }

    pub(crate) fn build_item_session(&self, index: usize) -> ItemSession {
        let route_item = &self.route.items()[index];
        let must_be_visible = route_item.sections().iter().all(|s| s.visible);
        let part = route_item.test_part();
        let mut session = self.session_manager.create_item_session(
            route_item.item_ref(),
            part.navigation_mode,
            part.submission_mode,
            must_be_visible,
        );
        session.set_occurrence(route_item.occurrence());
        session.set_item_session_control(route_item.item_session_control().clone());
        session.set_time_limits(route_item.time_limits().cloned());
        session
    }

    pub(crate) fn expression_engine(&self) -> Arc<dyn crate::engine::ExpressionEngine> {
        Arc::clone(&self.engine)
    }
}

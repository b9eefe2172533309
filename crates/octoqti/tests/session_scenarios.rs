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

//! End-to-end candidate walks through small assessments

mod common;

use chrono::{TimeZone, Utc};
use common::*;
use octoqti::{
    AssessmentItemRef, AssessmentTest, BranchRule, Expression, NavigationMode, OutcomeRule,
    PreCondition, QtiDuration, SessionErrorCode, SubmissionMode, TestSessionBuilder,
    TestSessionConfig, TestSessionState, TimeLimits, TestPart, Value,
};
use std::sync::Arc;

#[test]
fn linear_individual_walk_scores_one_correct_of_two() {
    let test = test_of(vec![part_of(
        "P01",
        NavigationMode::Linear,
        SubmissionMode::Individual,
        vec![scored_item("Q01"), scored_item("Q02")],
    )]);
    let test = Arc::new(AssessmentTest {
        outcome_rules: vec![OutcomeRule::new("SCORE", Expression::new("sum_scores"))],
        ..(*test).clone()
    });
    let engine = Arc::new(
        ScriptedEngine::new()
            .on("score_item", score_by_correctness)
            .on("sum_scores", sum_scores(&["Q01", "Q02"])),
    );
    let mut session =
        TestSessionBuilder::new("scenario-1", Arc::clone(&test), route_of(&test), engine).build();

    session.begin_test_session().unwrap();
    session.begin_attempt().unwrap();
    session.end_attempt(respond(Some("CHOICE_A"))).unwrap();
    session.move_next().unwrap();
    session.begin_attempt().unwrap();
    session.end_attempt(respond(Some("CHOICE_B"))).unwrap();
    session.move_next().unwrap();

    assert_eq!(session.state(), TestSessionState::Closed);
    assert_eq!(session.value("SCORE").unwrap(), Some(Value::float(1.0)));
}

#[test]
fn nonlinear_simultaneous_walk_defers_processing_to_part_end() {
    let test = test_of(vec![part_of(
        "P01",
        NavigationMode::NonLinear,
        SubmissionMode::Simultaneous,
        vec![scored_item("Q01"), scored_item("Q02")],
    )]);
    let test = Arc::new(AssessmentTest {
        outcome_rules: vec![OutcomeRule::new("SCORE", Expression::new("sum_scores"))],
        ..(*test).clone()
    });
    let engine = Arc::new(
        ScriptedEngine::new()
            .on("score_item", score_by_correctness)
            .on("sum_scores", sum_scores(&["Q01", "Q02"])),
    );
    let mut session = TestSessionBuilder::new(
        "scenario-2",
        Arc::clone(&test),
        route_of(&test),
        engine.clone(),
    )
    .build();

    session.begin_test_session().unwrap();
    session.begin_attempt().unwrap();
    session.end_attempt(respond(Some("CHOICE_A"))).unwrap();
    assert_eq!(engine.count("score_item"), 0);
    session.move_next().unwrap();
    session.begin_attempt().unwrap();
    session.end_attempt(respond(Some("CHOICE_A"))).unwrap();
    assert_eq!(engine.count("score_item"), 0);

    // crossing the end of the test part runs both stagings, in order, and
    // outcome processing exactly once
    session.move_next().unwrap();
    assert_eq!(session.state(), TestSessionState::Closed);
    assert_eq!(engine.count("score_item"), 2);
    assert_eq!(engine.count("sum_scores"), 1);
    assert_eq!(session.value("SCORE").unwrap(), Some(Value::float(2.0)));
    assert!(session.pending_responses().is_empty());
}

#[test]
fn branching_skips_to_the_target_item() {
    let q1 = Arc::new(AssessmentItemRef {
        branch_rules: vec![Arc::new(BranchRule::new(
            "Q03",
            Expression::new("q1_correct"),
        ))],
        ..(*scored_item("Q01")).clone()
    });
    let test = test_of(vec![part_of(
        "P01",
        NavigationMode::Linear,
        SubmissionMode::Individual,
        vec![q1, scored_item("Q02"), scored_item("Q03")],
    )]);
    let engine = Arc::new(
        ScriptedEngine::new()
            .on("score_item", score_by_correctness)
            .on("q1_correct", |scope: &dyn octoqti::EvaluationScope| {
                let score = scope.value_of("Q01.SCORE")?;
                Some(Value::boolean(score == Value::float(1.0)))
            }),
    );
    let mut session =
        TestSessionBuilder::new("scenario-3", Arc::clone(&test), route_of(&test), engine).build();

    session.begin_test_session().unwrap();
    session.begin_attempt().unwrap();
    session.end_attempt(respond(Some("CHOICE_A"))).unwrap();
    session.move_next().unwrap();

    assert_eq!(
        session.current_route_item().unwrap().item_ref().identifier,
        "Q03"
    );
    // Q02 was never begun
    assert!(session
        .item_session("Q02", 0)
        .map(|s| s.num_attempts() == 0)
        .unwrap_or(true));
}

#[test]
fn false_precondition_skips_the_item_without_a_session_begun() {
    let q2 = Arc::new(AssessmentItemRef {
        pre_conditions: vec![Arc::new(PreCondition::new(Expression::new("false")))],
        ..(*plain_item("Q02")).clone()
    });
    let test = test_of(vec![part_of(
        "P01",
        NavigationMode::Linear,
        SubmissionMode::Individual,
        vec![plain_item("Q01"), q2, plain_item("Q03")],
    )]);
    let engine = Arc::new(ScriptedEngine::new());
    let mut session =
        TestSessionBuilder::new("scenario-4", Arc::clone(&test), route_of(&test), engine).build();

    session.begin_test_session().unwrap();
    session.begin_attempt().unwrap();
    session.end_attempt(respond(Some("CHOICE_A"))).unwrap();
    session.move_next().unwrap();

    assert_eq!(
        session.current_route_item().unwrap().item_ref().identifier,
        "Q03"
    );
    // the skipped item never got a session
    assert!(session.item_session("Q02", 0).is_none());
}

#[test]
fn test_part_time_overflow_closes_the_part() {
    let part = Arc::new(TestPart {
        time_limits: Some(TimeLimits::with_max(QtiDuration::from_seconds(60))),
        ..(*part_of(
            "P01",
            NavigationMode::Linear,
            SubmissionMode::Individual,
            vec![plain_item("Q01"), plain_item("Q02")],
        ))
        .clone()
    });
    let test = test_of(vec![part]);
    let engine = Arc::new(ScriptedEngine::new());
    let mut session =
        TestSessionBuilder::new("scenario-5", Arc::clone(&test), route_of(&test), engine).build();
    let t0 = Utc.with_ymd_and_hms(2025, 9, 9, 10, 0, 0).unwrap();

    session.begin_test_session().unwrap();
    session.set_time(t0).unwrap();
    session.begin_attempt().unwrap();
    session.set_time(t0 + chrono::Duration::seconds(61)).unwrap();

    for route_item in session.route().items() {
        let item_session = session
            .item_session(&route_item.item_ref().identifier, route_item.occurrence())
            .unwrap();
        assert_eq!(item_session.state(), octoqti::ItemSessionState::Closed);
    }
    let err = session.end_attempt(respond(Some("CHOICE_A"))).unwrap_err();
    assert_eq!(err.code(), SessionErrorCode::TestPartDurationOverflow);
}

#[test]
fn jumps_with_path_tracking_rewind_through_the_path() {
    let test = test_of(vec![part_of(
        "P01",
        NavigationMode::NonLinear,
        SubmissionMode::Individual,
        vec![
            plain_item("Q01"),
            plain_item("Q02"),
            plain_item("Q03"),
            plain_item("Q04"),
        ],
    )]);
    let engine = Arc::new(ScriptedEngine::new());
    let mut session =
        TestSessionBuilder::new("scenario-6", Arc::clone(&test), route_of(&test), engine)
            .with_config(TestSessionConfig::PATH_TRACKING)
            .build();

    session.begin_test_session().unwrap();
    assert_eq!(session.route().position(), 0);

    session.jump_to(3).unwrap();
    assert_eq!(session.path(), [0]);
    session.jump_to(1).unwrap();
    assert_eq!(session.path(), [0, 3]);

    session.move_back().unwrap();
    assert_eq!(session.route().position(), 3);
    assert_eq!(session.path(), [0]);

    session.move_back().unwrap();
    assert_eq!(session.route().position(), 0);
    assert!(session.path().is_empty());

    assert_eq!(
        session.move_back().unwrap_err().code(),
        SessionErrorCode::StateViolation
    );
}

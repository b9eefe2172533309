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

use super::*;
use crate::error::SessionErrorCode;
use crate::route::RouteItem;
use crate::test_support::ScriptedEngine;
use chrono::TimeZone;
use octoqti_model::{
    AssessmentItemRef, AssessmentSection, BaseType, BranchRule, Cardinality, Expression,
    NavigationMode, OutcomeRule, PreCondition, SectionPart, TestPart, TimeLimits, Variable,
    VariableDeclaration,
};

fn item(id: &str) -> Arc<AssessmentItemRef> {
    Arc::new(AssessmentItemRef {
        response_declarations: vec![Arc::new(
            VariableDeclaration::response("RESPONSE", Cardinality::Single, BaseType::Identifier)
                .with_correct_response(Value::identifier("CHOICE_A")),
        )],
        outcome_declarations: vec![Arc::new(
            VariableDeclaration::outcome("SCORE", Cardinality::Single, BaseType::Float)
                .with_default(Value::float(0.0)),
        )],
        ..AssessmentItemRef::new(id, format!("{id}.xml"))
    })
}

fn test_of(parts: Vec<Arc<TestPart>>) -> Arc<AssessmentTest> {
    Arc::new(AssessmentTest {
        outcome_declarations: vec![Arc::new(
            VariableDeclaration::outcome("SCORE", Cardinality::Single, BaseType::Float)
                .with_default(Value::float(0.0)),
        )],
        test_parts: parts,
        ..AssessmentTest::new("tst")
    })
}

fn part_of(
    id: &str,
    navigation: NavigationMode,
    submission: SubmissionMode,
    items: Vec<Arc<AssessmentItemRef>>,
) -> Arc<TestPart> {
    let section = Arc::new(AssessmentSection {
        parts: items.into_iter().map(SectionPart::ItemRef).collect(),
        ..AssessmentSection::new(&format!("S-{id}"))
    });
    Arc::new(TestPart {
        sections: vec![section],
        ..TestPart::new(id, navigation, submission)
    })
}

fn route_of(test: &Arc<AssessmentTest>) -> Route {
    let mut items = Vec::new();
    for part in &test.test_parts {
        for section in &part.sections {
            for item_ref in section.item_refs() {
                items.push(RouteItem::new(
                    Arc::clone(item_ref),
                    0,
                    vec![Arc::clone(section)],
                    Arc::clone(part),
                ));
            }
        }
    }
    Route::new(items)
}

fn session_of(test: Arc<AssessmentTest>, engine: ScriptedEngine) -> TestSession {
    let route = route_of(&test);
    TestSessionBuilder::new("session-1", test, route, Arc::new(engine)).build()
}

fn linear_session(ids: &[&str]) -> TestSession {
    let test = test_of(vec![part_of(
        "P01",
        NavigationMode::Linear,
        SubmissionMode::Individual,
        ids.iter().map(|id| item(id)).collect(),
    )]);
    session_of(test, ScriptedEngine::default())
}

fn responses(value: Option<Value>) -> State {
    let mut state = State::new();
    let mut var = Variable::from_declaration(&VariableDeclaration::response(
        "RESPONSE",
        Cardinality::Single,
        BaseType::Identifier,
    ));
    var.set_value_or_null(value).unwrap();
    state.set_variable(var);
    state
}

#[test]
fn begin_initializes_every_session_of_a_non_adaptive_test() {
    let mut session = linear_session(&["Q01", "Q02", "Q03"]);
    assert_eq!(session.state(), TestSessionState::Initial);
    session.begin_test_session().unwrap();

    assert_eq!(session.state(), TestSessionState::Interacting);
    assert_eq!(session.item_sessions().len(), 3);
    assert!(session.durations().contains("tst"));
    assert!(session.durations().contains("P01"));
    assert!(session.durations().contains("S-P01"));
    assert_eq!(session.visited_test_parts(), ["P01"]);
}

#[test]
fn lifecycle_guards_double_begin_and_double_end() {
    let mut session = linear_session(&["Q01"]);
    session.begin_test_session().unwrap();
    assert_eq!(
        session.begin_test_session().unwrap_err().code(),
        SessionErrorCode::StateViolation
    );
    session.end_test_session().unwrap();
    assert_eq!(session.state(), TestSessionState::Closed);
    assert_eq!(
        session.end_test_session().unwrap_err().code(),
        SessionErrorCode::StateViolation
    );
}

#[test]
fn linear_walk_closes_the_session_and_every_item() {
    let mut session = linear_session(&["Q01", "Q02"]);
    session.begin_test_session().unwrap();

    session.begin_attempt().unwrap();
    session
        .end_attempt(responses(Some(Value::identifier("CHOICE_A"))))
        .unwrap();
    session.move_next().unwrap();
    assert_eq!(session.route().position(), 1);

    session.begin_attempt().unwrap();
    session
        .end_attempt(responses(Some(Value::identifier("CHOICE_B"))))
        .unwrap();
    session.move_next().unwrap();

    assert_eq!(session.state(), TestSessionState::Closed);
    for item_session in session.item_sessions().iter() {
        assert_eq!(item_session.state(), octoqti_model::ItemSessionState::Closed);
    }
}

#[test]
fn branch_rule_skips_to_its_target() {
    let q1 = Arc::new(AssessmentItemRef {
        branch_rules: vec![Arc::new(BranchRule::new("Q03", Expression::new("true")))],
        ..(*item("Q01")).clone()
    });
    let test = test_of(vec![part_of(
        "P01",
        NavigationMode::Linear,
        SubmissionMode::Individual,
        vec![q1, item("Q02"), item("Q03")],
    )]);
    let mut session = session_of(test, ScriptedEngine::default());
    session.begin_test_session().unwrap();

    session.begin_attempt().unwrap();
    session
        .end_attempt(responses(Some(Value::identifier("CHOICE_A"))))
        .unwrap();
    session.move_next().unwrap();

    assert_eq!(
        session.current_route_item().unwrap().item_ref().identifier,
        "Q03"
    );
}

#[test]
fn failing_precondition_skips_the_item() {
    let q2 = Arc::new(AssessmentItemRef {
        pre_conditions: vec![Arc::new(PreCondition::new(Expression::new("false")))],
        ..(*item("Q02")).clone()
    });
    let test = test_of(vec![part_of(
        "P01",
        NavigationMode::Linear,
        SubmissionMode::Individual,
        vec![item("Q01"), q2, item("Q03")],
    )]);
    let mut session = session_of(test, ScriptedEngine::default());
    session.begin_test_session().unwrap();

    session.begin_attempt().unwrap();
    session.end_attempt(responses(None)).unwrap();
    session.move_next().unwrap();

    assert_eq!(
        session.current_route_item().unwrap().item_ref().identifier,
        "Q03"
    );
}

#[test]
fn jumps_are_mode_checked_and_bounded() {
    let mut session = linear_session(&["Q01", "Q02"]);
    session.begin_test_session().unwrap();
    assert_eq!(
        session.jump_to(1).unwrap_err().code(),
        SessionErrorCode::NavigationModeViolation
    );

    let test = test_of(vec![part_of(
        "P01",
        NavigationMode::NonLinear,
        SubmissionMode::Individual,
        vec![item("Q01"), item("Q02")],
    )]);
    let mut session = session_of(test, ScriptedEngine::default());
    session.begin_test_session().unwrap();
    assert_eq!(
        session.jump_to(7).unwrap_err().code(),
        SessionErrorCode::ForbiddenJump
    );
    session.jump_to(1).unwrap();
    assert_eq!(session.route().position(), 1);
}

#[test]
fn simultaneous_mode_defers_processing_to_part_end() {
    let with_rp = |id: &str| {
        Arc::new(AssessmentItemRef {
            response_processing: Some(octoqti_model::ResponseProcessing::new(vec![
                octoqti_model::ResponseRule::new("SCORE", Expression::new("item_score")),
            ])),
            ..(*item(id)).clone()
        })
    };
    let test = test_of(vec![part_of(
        "P01",
        NavigationMode::NonLinear,
        SubmissionMode::Simultaneous,
        vec![with_rp("Q01"), with_rp("Q02")],
    )]);
    let engine = ScriptedEngine::default().on("item_score", Value::float(1.0));
    let mut session = session_of(test, engine);
    session.begin_test_session().unwrap();

    session.begin_attempt().unwrap();
    session
        .end_attempt(responses(Some(Value::identifier("CHOICE_A"))))
        .unwrap();
    // response processing has not run yet
    assert_eq!(
        session
            .item_session("Q01", 0)
            .unwrap()
            .variables()
            .value("SCORE"),
        Some(Some(&Value::float(0.0)))
    );
    assert_eq!(session.pending_responses().len(), 1);

    session.move_next().unwrap();
    session.begin_attempt().unwrap();
    session
        .end_attempt(responses(Some(Value::identifier("CHOICE_B"))))
        .unwrap();
    assert_eq!(session.pending_responses().len(), 2);

    // crossing the end of the simultaneous part flushes the queue
    session.move_next().unwrap();
    assert_eq!(session.state(), TestSessionState::Closed);
    assert!(session.pending_responses().is_empty());
    assert_eq!(
        session
            .item_session("Q01", 0)
            .unwrap()
            .variables()
            .value("SCORE"),
        Some(Some(&Value::float(1.0)))
    );
    assert_eq!(
        session
            .item_session("Q02", 0)
            .unwrap()
            .variables()
            .value("SCORE"),
        Some(Some(&Value::float(1.0)))
    );
}

#[test]
fn outcome_processing_runs_after_each_individual_attempt() {
    let test = test_of(vec![part_of(
        "P01",
        NavigationMode::Linear,
        SubmissionMode::Individual,
        vec![item("Q01")],
    )]);
    let test = Arc::new(AssessmentTest {
        outcome_rules: vec![OutcomeRule::new("SCORE", Expression::new("var(Q01.SCORE)"))],
        ..(*test).clone()
    });
    let engine = ScriptedEngine::default();
    let mut session = session_of(test, engine);
    session.begin_test_session().unwrap();

    session.begin_attempt().unwrap();
    session
        .end_attempt(responses(Some(Value::identifier("CHOICE_A"))))
        .unwrap();

    // Q01 has no response processing, its SCORE keeps the default; the
    // outcome rule copies it to the test scope
    assert_eq!(
        session.value("SCORE").unwrap(),
        Some(Value::float(0.0))
    );
}

#[test]
fn variable_addressing_reaches_items_durations_and_outcomes() {
    let mut session = linear_session(&["Q01", "Q02"]);
    session.begin_test_session().unwrap();
    session.begin_attempt().unwrap();
    session
        .end_attempt(responses(Some(Value::identifier("CHOICE_A"))))
        .unwrap();

    assert_eq!(
        session.value("Q01.RESPONSE").unwrap(),
        Some(Value::identifier("CHOICE_A"))
    );
    assert_eq!(
        session.value("Q01.1.RESPONSE").unwrap(),
        Some(Value::identifier("CHOICE_A"))
    );
    assert!(session.value("duration").unwrap().is_some());
    assert!(session.value("P01.duration").unwrap().is_some());
    assert_eq!(session.value("NOWHERE.RESPONSE").unwrap(), None);

    session.set_value("SCORE", Some(Value::float(3.5))).unwrap();
    assert_eq!(session.value("SCORE").unwrap(), Some(Value::float(3.5)));

    assert_eq!(
        session
            .set_value("MISSING", Some(Value::float(1.0)))
            .unwrap_err()
            .code(),
        SessionErrorCode::UnknownVariable
    );
    assert_eq!(
        session.unset_value("Q01.RESPONSE").unwrap_err().code(),
        SessionErrorCode::OutOfScope
    );
    session.unset_value("SCORE").unwrap();
    assert_eq!(session.value("SCORE").unwrap(), None);

    assert_eq!(
        session.value("not an identifier").unwrap_err().code(),
        SessionErrorCode::OutOfRange
    );
}

#[test]
fn suspend_is_idempotent_and_resume_restores_interaction() {
    let mut session = linear_session(&["Q01"]);
    session.begin_test_session().unwrap();
    session.begin_attempt().unwrap();

    session.suspend().unwrap();
    assert_eq!(session.state(), TestSessionState::Suspended);
    session.suspend().unwrap();
    assert_eq!(session.state(), TestSessionState::Suspended);

    session.resume().unwrap();
    assert_eq!(session.state(), TestSessionState::Interacting);
}

#[test]
fn part_time_overflow_closes_its_items_and_blocks_attempts() {
    let part = Arc::new(TestPart {
        time_limits: Some(TimeLimits::with_max(QtiDuration::from_seconds(60))),
        ..(*part_of(
            "P01",
            NavigationMode::Linear,
            SubmissionMode::Individual,
            vec![item("Q01"), item("Q02")],
        ))
        .clone()
    });
    let test = test_of(vec![part]);
    let mut session = session_of(test, ScriptedEngine::default());
    let t = |s| chrono::Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, s).unwrap();

    session.begin_test_session().unwrap();
    session.set_time(t(0)).unwrap();
    session.begin_attempt().unwrap();
    session.set_time(t(61)).unwrap();

    assert_eq!(session.durations().get("P01"), QtiDuration::from_seconds(60));
    for item_session in session.item_sessions().iter() {
        assert_eq!(item_session.state(), octoqti_model::ItemSessionState::Closed);
    }
    let err = session
        .end_attempt(responses(Some(Value::identifier("CHOICE_A"))))
        .unwrap_err();
    assert_eq!(err.code(), SessionErrorCode::TestPartDurationOverflow);
}

#[test]
fn adaptive_part_initializes_lazily() {
    let q1 = Arc::new(AssessmentItemRef {
        branch_rules: vec![Arc::new(BranchRule::new("Q03", Expression::new("false")))],
        ..(*item("Q01")).clone()
    });
    let test = test_of(vec![part_of(
        "P01",
        NavigationMode::Linear,
        SubmissionMode::Individual,
        vec![q1, item("Q02"), item("Q03")],
    )]);
    let mut session = session_of(test, ScriptedEngine::default());
    session.begin_test_session().unwrap();

    // the part carries rules: only the current item is materialized
    assert_eq!(session.item_sessions().len(), 1);
    assert!(session.item_session("Q01", 0).is_some());

    session.begin_attempt().unwrap();
    session.end_attempt(responses(None)).unwrap();
    session.move_next().unwrap();
    assert_eq!(session.item_sessions().len(), 2);
    assert!(session.item_session("Q02", 0).is_some());
}

#[test]
fn move_back_without_history_is_a_state_violation() {
    let test = test_of(vec![part_of(
        "P01",
        NavigationMode::NonLinear,
        SubmissionMode::Individual,
        vec![item("Q01"), item("Q02")],
    )]);
    let mut session = session_of(test, ScriptedEngine::default());
    session.begin_test_session().unwrap();
    assert_eq!(
        session.move_back().unwrap_err().code(),
        SessionErrorCode::StateViolation
    );
}

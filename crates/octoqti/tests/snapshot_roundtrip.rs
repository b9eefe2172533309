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

//! Snapshot persistence across a simulated delivery restart

mod common;

use chrono::{TimeZone, Utc};
use common::*;
use octoqti::{
    InMemorySessionStorage, NavigationMode, QtiDuration, Seeker, SessionCodec,
    SessionCollaborators, SessionStorage, SubmissionMode, TestSessionBuilder, TestSessionConfig,
    TestSessionState, Value,
};
use std::sync::Arc;

fn collaborators(engine: Arc<ScriptedEngine>) -> SessionCollaborators {
    SessionCollaborators {
        engine,
        session_manager: None,
        reporter: Arc::new(octoqti::NullResultReporter),
    }
}

#[test]
fn a_restored_session_continues_where_it_stopped() {
    let test = test_of(vec![part_of(
        "P01",
        NavigationMode::NonLinear,
        SubmissionMode::Individual,
        vec![
            scored_item("Q01"),
            scored_item("Q02"),
            scored_item("Q03"),
        ],
    )]);
    let seeker = Seeker::new(&test);
    let storage = InMemorySessionStorage::new();
    let codec = SessionCodec::new();
    let engine = || Arc::new(ScriptedEngine::new().on("score_item", score_by_correctness));

    let t0 = Utc.with_ymd_and_hms(2025, 11, 2, 9, 0, 0).unwrap();
    let stream = {
        let mut session = TestSessionBuilder::new(
            "cand-7",
            Arc::clone(&test),
            route_of(&test),
            engine(),
        )
        .with_config(TestSessionConfig::PATH_TRACKING)
        .build();
        session.begin_test_session().unwrap();
        session.set_time(t0).unwrap();
        session.begin_attempt().unwrap();
        session.set_time(t0 + chrono::Duration::seconds(20)).unwrap();
        session.end_attempt(respond(Some("CHOICE_A"))).unwrap();
        session.jump_to(2).unwrap();
        codec.encode(&session, &seeker).unwrap()
    };
    storage.persist_stream("cand-7", stream).unwrap();

    // "another process": decode and keep going
    let retrieved = storage.retrieval_stream("cand-7").unwrap();
    let mut session = codec
        .decode(&retrieved, "cand-7", &test, &seeker, collaborators(engine()))
        .unwrap();

    assert_eq!(session.state(), TestSessionState::Interacting);
    assert_eq!(session.route().position(), 2);
    assert_eq!(session.path(), [0]);
    assert_eq!(session.visited_test_parts(), ["P01"]);
    assert_eq!(
        session.durations().get("examination-1"),
        QtiDuration::from_seconds(20)
    );
    assert_eq!(
        session.last_occurrence_updates(),
        [("Q01".to_string(), 0)]
    );
    assert_eq!(
        session.value("Q01.RESPONSE").unwrap(),
        Some(Value::identifier("CHOICE_A"))
    );
    assert_eq!(
        session.value("Q01.SCORE").unwrap(),
        Some(Value::float(1.0))
    );

    // duration keeps accumulating after the restore
    session.set_time(t0 + chrono::Duration::seconds(35)).unwrap();
    session.set_time(t0 + chrono::Duration::seconds(50)).unwrap();
    assert_eq!(
        session.durations().get("examination-1"),
        QtiDuration::from_seconds(50)
    );

    // and the candidate can finish the test
    session.begin_attempt().unwrap();
    session.end_attempt(respond(Some("CHOICE_B"))).unwrap();
    session.move_back().unwrap();
    assert_eq!(session.route().position(), 0);
}

#[test]
fn suspend_twice_is_a_no_op_and_survives_the_codec() {
    let test = test_of(vec![part_of(
        "P01",
        NavigationMode::Linear,
        SubmissionMode::Individual,
        vec![plain_item("Q01")],
    )]);
    let seeker = Seeker::new(&test);
    let codec = SessionCodec::new();
    let engine = || Arc::new(ScriptedEngine::new());

    let mut session =
        TestSessionBuilder::new("cand-8", Arc::clone(&test), route_of(&test), engine()).build();
    session.begin_test_session().unwrap();
    session.begin_attempt().unwrap();
    session.suspend().unwrap();
    session.suspend().unwrap();
    assert_eq!(session.state(), TestSessionState::Suspended);

    let stream = codec.encode(&session, &seeker).unwrap();
    let mut restored = codec
        .decode(&stream, "cand-8", &test, &seeker, collaborators(engine()))
        .unwrap();
    assert_eq!(restored.state(), TestSessionState::Suspended);
    restored.resume().unwrap();
    assert_eq!(restored.state(), TestSessionState::Interacting);
}

#[test]
fn ending_twice_raises_a_state_violation() {
    let test = test_of(vec![part_of(
        "P01",
        NavigationMode::Linear,
        SubmissionMode::Individual,
        vec![plain_item("Q01")],
    )]);
    let engine = Arc::new(ScriptedEngine::new());
    let mut session =
        TestSessionBuilder::new("cand-9", Arc::clone(&test), route_of(&test), engine).build();
    session.begin_test_session().unwrap();
    session.end_test_session().unwrap();
    assert_eq!(
        session.end_test_session().unwrap_err().code(),
        octoqti::SessionErrorCode::StateViolation
    );
}

#[test]
fn closed_sessions_round_trip_too() {
    let test = test_of(vec![part_of(
        "P01",
        NavigationMode::Linear,
        SubmissionMode::Individual,
        vec![plain_item("Q01")],
    )]);
    let seeker = Seeker::new(&test);
    let codec = SessionCodec::new();
    let engine = || Arc::new(ScriptedEngine::new());

    let mut session =
        TestSessionBuilder::new("cand-10", Arc::clone(&test), route_of(&test), engine()).build();
    session.begin_test_session().unwrap();
    session.begin_attempt().unwrap();
    session.end_attempt(respond(None)).unwrap();
    session.move_next().unwrap();
    assert_eq!(session.state(), TestSessionState::Closed);

    let stream = codec.encode(&session, &seeker).unwrap();
    let restored = codec
        .decode(&stream, "cand-10", &test, &seeker, collaborators(engine()))
        .unwrap();
    assert_eq!(restored.state(), TestSessionState::Closed);
    assert_eq!(
        restored.item_session("Q01", 0).unwrap().state(),
        octoqti::ItemSessionState::Closed
    );
    // the stream is deterministic
    assert_eq!(codec.encode(&restored, &seeker).unwrap(), stream);
}

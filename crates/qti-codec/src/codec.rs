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

//! The session snapshot codec
//!
//! Field order is normative:
//!
//! 1. format version, session state, route position, route count (u8 each)
//! 2. per route item: the route item, then its item session
//! 3. one value per global outcome declaration, in model order
//! 4. durable extras: duration entries, pending responses, last occurrence
//!    updates, visited test parts, path, configuration, submission policy,
//!    time reference
//!
//! Values are written without type tags; the declaration resolved through
//! the seeker supplies cardinality and base type on the way back. A value
//! is prefixed by a presence flag, containers by a u16 length.

use crate::error::{CodecError, Result};
use crate::seeker::Seeker;
use crate::stream::{StreamReader, StreamWriter};
use bytes::Bytes;
use octoqti_model::{
    AssessmentItemRef, AssessmentTest, BaseType, Cardinality, ItemSessionState, ModelError,
    Point, QtiFile, QtiPair, QtiValue, State, TestResultsSubmission, TestSessionState, Value,
    Variable, VariableDeclaration,
};
use octoqti_runtime::config::TestSessionConfig;
use octoqti_runtime::engine::{ExpressionEngine, ResultReporter, SessionManager};
use octoqti_runtime::{
    ItemSessionSnapshot, PendingResponseStore, PendingResponses, Route, RouteItem, TestSession,
    TestSessionRestore,
};
use std::sync::Arc;
use tracing::debug;

/// The format version this codec writes
pub const FORMAT_VERSION: u8 = 1;

/// Collaborators a decoded session is wired to
pub struct SessionCollaborators {
    /// The expression engine rule evaluation runs through
    pub engine: Arc<dyn ExpressionEngine>,
    /// Optional item-session factory; the default factory is used when
    /// absent
    pub session_manager: Option<Arc<dyn SessionManager>>,
    /// The results pipeline
    pub reporter: Arc<dyn ResultReporter>,
}

/// Encodes test sessions to byte streams and back
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionCodec;

impl SessionCodec {
    /// A codec writing [`FORMAT_VERSION`]
    pub fn new() -> Self {
        Self
    }

    /// Serialize `session` to a self-contained byte stream
    pub fn encode(&self, session: &TestSession, seeker: &Seeker) -> Result<Bytes> {
        let mut w = StreamWriter::new();
        w.put_u8(FORMAT_VERSION);
        w.put_u8(session.state() as u8);

        let route = session.route();
        let position = route.position();
        let count = route.count();
        if position > usize::from(u8::MAX) {
            return Err(CodecError::FieldOverflow {
                what: "route position",
                value: position,
                limit: usize::from(u8::MAX),
            });
        }
        if count > usize::from(u8::MAX) {
            return Err(CodecError::FieldOverflow {
                what: "route count",
                value: count,
                limit: usize::from(u8::MAX),
            });
        }
        w.put_u8(position as u8);
        w.put_u8(count as u8);

        for route_item in route.items() {
            self.encode_route_item(&mut w, route_item, seeker)?;
            let item_session = session
                .item_session(&route_item.item_ref().identifier, route_item.occurrence());
            self.encode_item_session(
                &mut w,
                item_session.map(|s| s.snapshot()),
                route_item.item_ref(),
                seeker,
            )?;
        }

        for declaration in &session.test().outcome_declarations {
            let value = session
                .outcomes()
                .get(&declaration.identifier)
                .and_then(Variable::value);
            encode_value(&mut w, value, declaration.base_type)?;
        }

        let durations: Vec<_> = session.durations().iter().collect();
        w.put_u16(checked_u16("duration entry count", durations.len())?);
        for (identifier, duration) in durations {
            w.put_string(identifier)?;
            w.put_duration(duration)?;
        }

        let pending = session.pending_responses().all();
        w.put_u16(checked_u16("pending entry count", pending.len())?);
        for entry in pending {
            w.put_u16(checked_u16(
                "item reference index",
                seeker.index_of_item_ref(&entry.item_ref)?,
            )?);
            w.put_varint(entry.occurrence as u64);
            let variables: Vec<_> = entry.responses.iter().collect();
            w.put_u16(checked_u16("pending variable count", variables.len())?);
            for variable in variables {
                let declaration =
                    find_declaration(&entry.item_ref.response_declarations, variable.identifier())
                        .ok_or_else(|| {
                            CodecError::model_mismatch(format!(
                                "pending response '{}' has no declaration on '{}'",
                                variable.identifier(),
                                entry.item_ref.identifier
                            ))
                        })?;
                w.put_u16(checked_u16(
                    "response declaration index",
                    seeker.index_of_response_declaration(declaration)?,
                )?);
                encode_value(&mut w, variable.value(), declaration.base_type)?;
            }
        }

        let updates = session.last_occurrence_updates();
        w.put_u16(checked_u16("occurrence update count", updates.len())?);
        for (identifier, occurrence) in updates {
            let item_ref = find_item_ref(session.test(), &identifier).ok_or_else(|| {
                CodecError::model_mismatch(format!(
                    "occurrence update for unknown item '{identifier}'"
                ))
            })?;
            w.put_u16(checked_u16(
                "item reference index",
                seeker.index_of_item_ref(item_ref)?,
            )?);
            w.put_varint(occurrence as u64);
        }

        let visited = session.visited_test_parts();
        w.put_u16(checked_u16("visited part count", visited.len())?);
        for identifier in visited {
            let part = session.test().test_part(identifier).ok_or_else(|| {
                CodecError::model_mismatch(format!("visited unknown test part '{identifier}'"))
            })?;
            w.put_u16(checked_u16("test part index", seeker.index_of_test_part(part)?)?);
        }

        let path = session.path();
        w.put_u16(checked_u16("path length", path.len())?);
        for position in path {
            w.put_varint(*position as u64);
        }

        w.put_u32(session.config().bits());
        w.put_u8(session.results_submission() as u8);
        w.put_optional_instant(session.time_reference());

        debug!(session = session.session_id(), bytes = w.len(), "session encoded");
        Ok(w.into_bytes())
    }

    /// Rebuild a session from `stream`, resolving model references through
    /// `seeker` against `test`
    pub fn decode(
        &self,
        stream: &[u8],
        session_id: &str,
        test: &Arc<AssessmentTest>,
        seeker: &Seeker,
        collaborators: SessionCollaborators,
    ) -> Result<TestSession> {
        let mut r = StreamReader::new(stream);

        let version = r.get_u8("format version")?;
        if version != FORMAT_VERSION {
            return Err(CodecError::VersionMismatch {
                expected: FORMAT_VERSION,
                found: version,
            });
        }
        let state = TestSessionState::try_from(r.get_u8("session state")?)?;
        let position = usize::from(r.get_u8("route position")?);
        let count = usize::from(r.get_u8("route count")?);

        let mut route_items = Vec::with_capacity(count);
        let mut item_snapshots = Vec::with_capacity(count);
        for _ in 0..count {
            let route_item = self.decode_route_item(&mut r, seeker)?;
            let snapshot =
                self.decode_item_session(&mut r, route_item.item_ref(), seeker)?;
            route_items.push(route_item);
            item_snapshots.push(snapshot);
        }
        let mut route = Route::from_enriched(route_items);
        route.set_position(position)?;

        let mut outcome_values = Vec::with_capacity(test.outcome_declarations.len());
        for declaration in &test.outcome_declarations {
            let value = decode_value(
                &mut r,
                declaration.cardinality,
                declaration.base_type,
            )?;
            outcome_values.push((declaration.identifier.clone(), value));
        }

        let duration_count = usize::from(r.get_u16("duration entry count")?);
        let mut durations = Vec::with_capacity(duration_count);
        for _ in 0..duration_count {
            let identifier = r.get_string("duration scope")?;
            let duration = r.get_duration("duration entry")?;
            durations.push((identifier, duration));
        }

        let pending_count = usize::from(r.get_u16("pending entry count")?);
        let mut pending = PendingResponseStore::new();
        for _ in 0..pending_count {
            let item_ref =
                Arc::clone(seeker.item_ref(usize::from(r.get_u16("item reference index")?))?);
            let occurrence = r.get_varint("occurrence")? as usize;
            let variable_count = usize::from(r.get_u16("pending variable count")?);
            let mut responses = State::new();
            for _ in 0..variable_count {
                let declaration = Arc::clone(
                    seeker
                        .response_declaration(usize::from(r.get_u16("response declaration index")?))?,
                );
                let value =
                    decode_value(&mut r, declaration.cardinality, declaration.base_type)?;
                let mut variable = Variable::from_declaration(&declaration);
                variable
                    .set_value_or_null(value)
                    .map_err(CodecError::Model)?;
                responses.set_variable(variable);
            }
            pending.add_pending(PendingResponses::new(item_ref, occurrence, responses));
        }

        let update_count = usize::from(r.get_u16("occurrence update count")?);
        let mut last_occurrence_update = Vec::with_capacity(update_count);
        for _ in 0..update_count {
            let item_ref =
                seeker.item_ref(usize::from(r.get_u16("item reference index")?))?;
            let occurrence = r.get_varint("occurrence")? as usize;
            last_occurrence_update.push((item_ref.identifier.clone(), occurrence));
        }

        let visited_count = usize::from(r.get_u16("visited part count")?);
        let mut visited_test_parts = Vec::with_capacity(visited_count);
        for _ in 0..visited_count {
            let part = seeker.test_part(usize::from(r.get_u16("test part index")?))?;
            visited_test_parts.push(part.identifier.clone());
        }

        let path_length = usize::from(r.get_u16("path length")?);
        let mut path = Vec::with_capacity(path_length);
        for _ in 0..path_length {
            path.push(r.get_varint("path position")? as usize);
        }

        let config = TestSessionConfig::from_bits(r.get_u32("configuration")?);
        let results_submission = match r.get_u8("results submission policy")? {
            0 => TestResultsSubmission::End,
            1 => TestResultsSubmission::OutcomeProcessing,
            value => {
                return Err(CodecError::Model(ModelError::UnknownEnumValue {
                    what: "testResultsSubmission",
                    value,
                }));
            }
        };
        let time_reference = r.get_optional_instant("time reference")?;

        let session = TestSession::restore(
            Arc::clone(test),
            collaborators.engine,
            collaborators.session_manager,
            collaborators.reporter,
            TestSessionRestore {
                session_id: session_id.to_string(),
                state,
                route,
                outcome_values,
                item_snapshots,
                durations,
                pending,
                last_occurrence_update,
                visited_test_parts,
                path,
                time_reference,
                config,
                results_submission,
            },
        )?;
        Ok(session)
    }

    fn encode_route_item(
        &self,
        w: &mut StreamWriter,
        route_item: &RouteItem,
        seeker: &Seeker,
    ) -> Result<()> {
        w.put_u16(checked_u16(
            "test part index",
            seeker.index_of_test_part(route_item.test_part())?,
        )?);
        let sections = route_item.sections();
        w.put_u8(checked_u8("section chain length", sections.len())?);
        for section in sections {
            w.put_u16(checked_u16("section index", seeker.index_of_section(section)?)?);
        }
        w.put_u16(checked_u16(
            "item reference index",
            seeker.index_of_item_ref(route_item.item_ref())?,
        )?);
        w.put_varint(route_item.occurrence() as u64);

        let branch_rules = route_item.branch_rules();
        w.put_u8(checked_u8("branch rule count", branch_rules.len())?);
        for rule in branch_rules {
            w.put_u16(checked_u16("branch rule index", seeker.index_of_branch_rule(rule)?)?);
        }
        let pre_conditions = route_item.pre_conditions();
        w.put_u8(checked_u8("precondition count", pre_conditions.len())?);
        for guard in pre_conditions {
            w.put_u16(checked_u16(
                "precondition index",
                seeker.index_of_pre_condition(guard)?,
            )?);
        }
        Ok(())
    }

    fn decode_route_item(&self, r: &mut StreamReader<'_>, seeker: &Seeker) -> Result<RouteItem> {
        let test_part = Arc::clone(seeker.test_part(usize::from(r.get_u16("test part index")?))?);
        let section_count = usize::from(r.get_u8("section chain length")?);
        let mut sections = Vec::with_capacity(section_count);
        for _ in 0..section_count {
            sections.push(Arc::clone(
                seeker.section(usize::from(r.get_u16("section index")?))?,
            ));
        }
        let item_ref = Arc::clone(seeker.item_ref(usize::from(r.get_u16("item reference index")?))?);
        let occurrence = r.get_varint("occurrence")? as usize;

        let branch_count = usize::from(r.get_u8("branch rule count")?);
        let mut branch_rules = Vec::with_capacity(branch_count);
        for _ in 0..branch_count {
            branch_rules.push(Arc::clone(
                seeker.branch_rule(usize::from(r.get_u16("branch rule index")?))?,
            ));
        }
        let guard_count = usize::from(r.get_u8("precondition count")?);
        let mut pre_conditions = Vec::with_capacity(guard_count);
        for _ in 0..guard_count {
            pre_conditions.push(Arc::clone(
                seeker.pre_condition(usize::from(r.get_u16("precondition index")?))?,
            ));
        }

        Ok(RouteItem::from_parts(
            item_ref,
            occurrence,
            sections,
            test_part,
            pre_conditions,
            branch_rules,
        ))
    }

    fn encode_item_session(
        &self,
        w: &mut StreamWriter,
        snapshot: Option<ItemSessionSnapshot>,
        item_ref: &Arc<AssessmentItemRef>,
        seeker: &Seeker,
    ) -> Result<()> {
        let Some(snapshot) = snapshot else {
            w.put_u8(ItemSessionState::NotSelected as u8);
            return Ok(());
        };
        w.put_u8(snapshot.state as u8);
        if snapshot.state == ItemSessionState::NotSelected {
            return Ok(());
        }
        w.put_varint(u64::from(snapshot.num_attempts));
        w.put_duration(snapshot.duration)?;
        w.put_u8(snapshot.completion_status as u8);

        self.encode_session_variables(
            w,
            &snapshot.responses,
            &item_ref.response_declarations,
            seeker,
            true,
        )?;
        self.encode_session_variables(
            w,
            &snapshot.outcomes,
            &item_ref.outcome_declarations,
            seeker,
            false,
        )?;
        Ok(())
    }

    fn encode_session_variables(
        &self,
        w: &mut StreamWriter,
        variables: &[(String, Option<Value>)],
        declarations: &[Arc<VariableDeclaration>],
        seeker: &Seeker,
        response: bool,
    ) -> Result<()> {
        w.put_u16(checked_u16("variable count", variables.len())?);
        for (name, value) in variables {
            let declaration = find_declaration(declarations, name).ok_or_else(|| {
                CodecError::model_mismatch(format!("variable '{name}' has no declaration"))
            })?;
            let index = if response {
                seeker.index_of_response_declaration(declaration)?
            } else {
                seeker.index_of_outcome_declaration(declaration)?
            };
            w.put_u16(checked_u16("declaration index", index)?);
            encode_value(w, value.as_ref(), declaration.base_type)?;
        }
        Ok(())
    }

    fn decode_item_session(
        &self,
        r: &mut StreamReader<'_>,
        _item_ref: &Arc<AssessmentItemRef>,
        seeker: &Seeker,
    ) -> Result<ItemSessionSnapshot> {
        let state = ItemSessionState::try_from(r.get_u8("item session state")?)?;
        if state == ItemSessionState::NotSelected {
            return Ok(ItemSessionSnapshot {
                state,
                num_attempts: 0,
                duration: octoqti_model::QtiDuration::ZERO,
                completion_status: octoqti_model::CompletionStatus::NotAttempted,
                responses: Vec::new(),
                outcomes: Vec::new(),
            });
        }
        let num_attempts = r.get_varint("attempt count")? as u32;
        let duration = r.get_duration("item duration")?;
        let completion_status =
            octoqti_model::CompletionStatus::try_from(r.get_u8("completion status")?)?;

        let responses = self.decode_session_variables(r, seeker, true)?;
        let outcomes = self.decode_session_variables(r, seeker, false)?;
        Ok(ItemSessionSnapshot {
            state,
            num_attempts,
            duration,
            completion_status,
            responses,
            outcomes,
        })
    }

    fn decode_session_variables(
        &self,
        r: &mut StreamReader<'_>,
        seeker: &Seeker,
        response: bool,
    ) -> Result<Vec<(String, Option<Value>)>> {
        let count = usize::from(r.get_u16("variable count")?);
        let mut variables = Vec::with_capacity(count);
        for _ in 0..count {
            let index = usize::from(r.get_u16("declaration index")?);
            let declaration = if response {
                seeker.response_declaration(index)?
            } else {
                seeker.outcome_declaration(index)?
            };
            let value = decode_value(r, declaration.cardinality, declaration.base_type)?;
            variables.push((declaration.identifier.clone(), value));
        }
        Ok(variables)
    }
}

fn checked_u8(what: &'static str, value: usize) -> Result<u8> {
    u8::try_from(value).map_err(|_| CodecError::FieldOverflow {
        what,
        value,
        limit: usize::from(u8::MAX),
    })
}

fn checked_u16(what: &'static str, value: usize) -> Result<u16> {
    u16::try_from(value).map_err(|_| CodecError::FieldOverflow {
        what,
        value,
        limit: usize::from(u16::MAX),
    })
}

fn find_declaration<'a>(
    declarations: &'a [Arc<VariableDeclaration>],
    name: &str,
) -> Option<&'a Arc<VariableDeclaration>> {
    declarations.iter().find(|d| d.identifier == name)
}

fn find_item_ref<'a>(
    test: &'a AssessmentTest,
    identifier: &str,
) -> Option<&'a Arc<AssessmentItemRef>> {
    test.item_refs()
        .into_iter()
        .find(|i| i.identifier == identifier)
}

/// Write a possibly-null value; the declaration's base type fixes the
/// scalar widths
fn encode_value(w: &mut StreamWriter, value: Option<&Value>, base_type: BaseType) -> Result<()> {
    let Some(value) = value else {
        w.put_bool(false);
        return Ok(());
    };
    w.put_bool(true);
    match value {
        Value::Single(scalar) => encode_scalar(w, scalar)?,
        Value::Multiple(scalars) | Value::Ordered(scalars) => {
            w.put_u16(checked_u16("container length", scalars.len())?);
            for scalar in scalars {
                encode_scalar(w, scalar)?;
            }
        }
        Value::Record(fields) => {
            w.put_u16(checked_u16("record length", fields.len())?);
            for (key, scalar) in fields {
                w.put_string(key)?;
                encode_scalar(w, scalar)?;
            }
        }
    }
    // the base type is implied by the declaration on the way back
    debug_assert!(value.base_type().map(|bt| bt == base_type).unwrap_or(true));
    Ok(())
}

fn encode_scalar(w: &mut StreamWriter, scalar: &QtiValue) -> Result<()> {
    match scalar {
        QtiValue::Identifier(s) | QtiValue::String(s) | QtiValue::Uri(s) => w.put_string(s)?,
        QtiValue::Boolean(b) => w.put_bool(*b),
        QtiValue::Integer(i) => w.put_i32(*i),
        QtiValue::Float(f) => w.put_f64(*f),
        QtiValue::Point(p) => {
            w.put_i32(p.x);
            w.put_i32(p.y);
        }
        QtiValue::Pair(p) | QtiValue::DirectedPair(p) => {
            w.put_string(&p.first)?;
            w.put_string(&p.second)?;
        }
        QtiValue::Duration(d) => w.put_duration(*d)?,
        QtiValue::File(f) => {
            w.put_string(&f.mime_type)?;
            match &f.filename {
                Some(name) => {
                    w.put_bool(true);
                    w.put_string(name)?;
                }
                None => w.put_bool(false),
            }
            w.put_blob(&f.data)?;
        }
    }
    Ok(())
}

/// Read a possibly-null value of a declared shape
fn decode_value(
    r: &mut StreamReader<'_>,
    cardinality: Cardinality,
    base_type: BaseType,
) -> Result<Option<Value>> {
    if !r.get_bool("value presence")? {
        return Ok(None);
    }
    let value = match cardinality {
        Cardinality::Single => Value::Single(decode_scalar(r, base_type)?),
        Cardinality::Multiple => {
            let len = usize::from(r.get_u16("container length")?);
            let mut scalars = Vec::with_capacity(len);
            for _ in 0..len {
                scalars.push(decode_scalar(r, base_type)?);
            }
            Value::multiple(scalars)?
        }
        Cardinality::Ordered => {
            let len = usize::from(r.get_u16("container length")?);
            let mut scalars = Vec::with_capacity(len);
            for _ in 0..len {
                scalars.push(decode_scalar(r, base_type)?);
            }
            Value::ordered(scalars)?
        }
        Cardinality::Record => {
            let len = usize::from(r.get_u16("record length")?);
            let mut fields = Vec::with_capacity(len);
            for _ in 0..len {
                let key = r.get_string("record key")?;
                fields.push((key, decode_scalar(r, base_type)?));
            }
            Value::record(fields)?
        }
    };
    Ok(Some(value))
}

fn decode_scalar(r: &mut StreamReader<'_>, base_type: BaseType) -> Result<QtiValue> {
    Ok(match base_type {
        BaseType::Identifier => QtiValue::Identifier(r.get_string("identifier value")?),
        BaseType::Boolean => QtiValue::Boolean(r.get_bool("boolean value")?),
        BaseType::Integer => QtiValue::Integer(r.get_i32("integer value")?),
        BaseType::Float => QtiValue::Float(r.get_f64("float value")?),
        BaseType::String => QtiValue::String(r.get_string("string value")?),
        BaseType::Point => QtiValue::Point(Point::new(
            r.get_i32("point x")?,
            r.get_i32("point y")?,
        )),
        BaseType::Pair => QtiValue::Pair(QtiPair::new(
            r.get_string("pair first")?,
            r.get_string("pair second")?,
        )),
        BaseType::DirectedPair => QtiValue::DirectedPair(QtiPair::new(
            r.get_string("pair first")?,
            r.get_string("pair second")?,
        )),
        BaseType::Duration => QtiValue::Duration(r.get_duration("duration value")?),
        BaseType::File => {
            let mime_type = r.get_string("file mime type")?;
            let filename = if r.get_bool("filename presence")? {
                Some(r.get_string("filename")?)
            } else {
                None
            };
            let data = r.get_blob("file data")?;
            QtiValue::File(QtiFile {
                mime_type,
                filename,
                data,
            })
        }
        BaseType::Uri => QtiValue::Uri(r.get_string("uri value")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use octoqti_model::{
        AssessmentSection, NavigationMode, SectionPart, SubmissionMode, TestPart,
    };
    use octoqti_runtime::engine::{NullExpressionEngine, NullResultReporter};
    use octoqti_runtime::TestSessionBuilder;

    fn item(id: &str) -> Arc<AssessmentItemRef> {
        Arc::new(AssessmentItemRef {
            response_declarations: vec![Arc::new(
                VariableDeclaration::response(
                    "RESPONSE",
                    Cardinality::Single,
                    BaseType::Identifier,
                )
                .with_correct_response(Value::identifier("CHOICE_A")),
            )],
            outcome_declarations: vec![Arc::new(
                VariableDeclaration::outcome("SCORE", Cardinality::Single, BaseType::Float)
                    .with_default(Value::float(0.0)),
            )],
            ..AssessmentItemRef::new(id, format!("{id}.xml"))
        })
    }

    fn sample_test(submission: SubmissionMode) -> Arc<AssessmentTest> {
        let items = vec![item("Q01"), item("Q02")];
        let section = Arc::new(AssessmentSection {
            parts: items.into_iter().map(SectionPart::ItemRef).collect(),
            ..AssessmentSection::new("S01")
        });
        let part = Arc::new(TestPart {
            sections: vec![section],
            ..TestPart::new("P01", NavigationMode::Linear, submission)
        });
        Arc::new(AssessmentTest {
            outcome_declarations: vec![Arc::new(
                VariableDeclaration::outcome("SCORE", Cardinality::Single, BaseType::Float)
                    .with_default(Value::float(0.0)),
            )],
            test_parts: vec![part],
            ..AssessmentTest::new("tst")
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

    fn session_of(test: &Arc<AssessmentTest>) -> TestSession {
        TestSessionBuilder::new(
            "snap-1",
            Arc::clone(test),
            route_of(test),
            Arc::new(NullExpressionEngine),
        )
        .build()
    }

    fn responses(value: &str) -> State {
        let mut state = State::new();
        let mut variable = Variable::from_declaration(&VariableDeclaration::response(
            "RESPONSE",
            Cardinality::Single,
            BaseType::Identifier,
        ));
        variable.set_value(Value::identifier(value)).unwrap();
        state.set_variable(variable);
        state
    }

    fn collaborators() -> SessionCollaborators {
        SessionCollaborators {
            engine: Arc::new(NullExpressionEngine),
            session_manager: None,
            reporter: Arc::new(NullResultReporter),
        }
    }

    fn assert_sessions_equal(a: &TestSession, b: &TestSession) {
        assert_eq!(a.state(), b.state());
        assert_eq!(a.route().position(), b.route().position());
        assert_eq!(a.route().count(), b.route().count());
        assert_eq!(a.path(), b.path());
        assert_eq!(a.visited_test_parts(), b.visited_test_parts());
        assert_eq!(a.last_occurrence_updates(), b.last_occurrence_updates());
        assert_eq!(a.config(), b.config());
        assert_eq!(a.time_reference(), b.time_reference());

        let a_durations: Vec<_> = a.durations().iter().map(|(i, d)| (i.to_string(), d)).collect();
        let b_durations: Vec<_> = b.durations().iter().map(|(i, d)| (i.to_string(), d)).collect();
        assert_eq!(a_durations, b_durations);

        assert_eq!(a.outcomes(), b.outcomes());

        assert_eq!(a.item_sessions().len(), b.item_sessions().len());
        for route_item in a.route().items() {
            let key = (
                route_item.item_ref().identifier.as_str(),
                route_item.occurrence(),
            );
            let left = a.item_session(key.0, key.1).map(|s| s.snapshot());
            let right = b.item_session(key.0, key.1).map(|s| s.snapshot());
            assert_eq!(left, right, "item session {key:?} differs");
        }

        assert_eq!(a.pending_responses().len(), b.pending_responses().len());
        for entry in a.pending_responses().all() {
            let other = b
                .pending_responses()
                .get_pending(&entry.item_ref.identifier, entry.occurrence)
                .expect("pending entry lost");
            assert_eq!(entry.responses, other.responses);
        }
    }

    #[test]
    fn mid_session_snapshot_round_trips() {
        let test = sample_test(SubmissionMode::Individual);
        let seeker = Seeker::new(&test);
        let mut session = session_of(&test);

        session.begin_test_session().unwrap();
        let t0 = chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2025, 5, 5, 8, 0, 0).unwrap();
        session.set_time(t0).unwrap();
        session.begin_attempt().unwrap();
        session
            .set_time(t0 + chrono::Duration::seconds(30))
            .unwrap();
        session.end_attempt(responses("CHOICE_A")).unwrap();
        session.move_next().unwrap();

        let codec = SessionCodec::new();
        let stream = codec.encode(&session, &seeker).unwrap();
        let decoded = codec
            .decode(&stream, "snap-1", &test, &seeker, collaborators())
            .unwrap();

        assert_sessions_equal(&session, &decoded);
        // and the decoded session still encodes to the same bytes
        assert_eq!(codec.encode(&decoded, &seeker).unwrap(), stream);
    }

    #[test]
    fn pending_responses_survive_the_round_trip() {
        let test = sample_test(SubmissionMode::Simultaneous);
        let seeker = Seeker::new(&test);
        let mut session = session_of(&test);

        session.begin_test_session().unwrap();
        session.begin_attempt().unwrap();
        session.end_attempt(responses("CHOICE_B")).unwrap();
        assert_eq!(session.pending_responses().len(), 1);

        let codec = SessionCodec::new();
        let stream = codec.encode(&session, &seeker).unwrap();
        let decoded = codec
            .decode(&stream, "snap-1", &test, &seeker, collaborators())
            .unwrap();

        assert_sessions_equal(&session, &decoded);
        let entry = decoded.pending_responses().get_pending("Q01", 0).unwrap();
        assert_eq!(
            entry.responses.value("RESPONSE"),
            Some(Some(&Value::identifier("CHOICE_B")))
        );
    }

    #[test]
    fn initial_session_round_trips() {
        let test = sample_test(SubmissionMode::Individual);
        let seeker = Seeker::new(&test);
        let session = session_of(&test);

        let codec = SessionCodec::new();
        let stream = codec.encode(&session, &seeker).unwrap();
        let decoded = codec
            .decode(&stream, "snap-1", &test, &seeker, collaborators())
            .unwrap();
        assert_sessions_equal(&session, &decoded);
        assert_eq!(decoded.state(), TestSessionState::Initial);
    }

    #[test]
    fn wrong_version_is_rejected() {
        let test = sample_test(SubmissionMode::Individual);
        let seeker = Seeker::new(&test);
        let session = session_of(&test);

        let codec = SessionCodec::new();
        let mut bytes = codec.encode(&session, &seeker).unwrap().to_vec();
        bytes[0] = FORMAT_VERSION + 1;
        assert!(matches!(
            codec.decode(&bytes, "snap-1", &test, &seeker, collaborators()),
            Err(CodecError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let test = sample_test(SubmissionMode::Individual);
        let seeker = Seeker::new(&test);
        let session = session_of(&test);

        let codec = SessionCodec::new();
        let bytes = codec.encode(&session, &seeker).unwrap();
        let cut = &bytes[..bytes.len() / 2];
        assert!(matches!(
            codec.decode(cut, "snap-1", &test, &seeker, collaborators()),
            Err(CodecError::Truncated { .. })
        ));
    }
}

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

//! Shared builders and a scripted expression engine for integration tests

#![allow(dead_code)]

use octoqti::{
    AssessmentItemRef, AssessmentSection, AssessmentTest, BaseType, Cardinality, EvaluationScope,
    Expression, ExpressionEngine, ExpressionError, NavigationMode, ResponseProcessing,
    ResponseRule, Route, RouteItem, SectionPart, State, SubmissionMode, TestPart, Value, Variable,
    VariableDeclaration,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Rule = Box<dyn Fn(&dyn EvaluationScope) -> Option<Value> + Send + Sync>;

/// A table-driven expression engine.
///
/// `true`, `false` and `null` evaluate literally, `var(ID)` reads the scope,
/// anything else runs the scripted closure registered for its source (or
/// evaluates to null). Every evaluation is logged for invariant assertions.
#[derive(Default)]
pub struct ScriptedEngine {
    rules: HashMap<String, Rule>,
    log: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a closure for an expression source
    pub fn on<F>(mut self, source: &str, rule: F) -> Self
    where
        F: Fn(&dyn EvaluationScope) -> Option<Value> + Send + Sync + 'static,
    {
        self.rules.insert(source.to_string(), Box::new(rule));
        self
    }

    /// Register a constant result for an expression source
    pub fn constant(self, source: &str, value: Value) -> Self {
        self.on(source, move |_| Some(value.clone()))
    }

    /// How many times `source` was evaluated
    pub fn count(&self, source: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.as_str() == source)
            .count()
    }

    /// Every evaluated source, in order
    pub fn evaluations(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

impl ExpressionEngine for ScriptedEngine {
    fn evaluate(
        &self,
        expression: &Expression,
        scope: &dyn EvaluationScope,
    ) -> Result<Option<Value>, ExpressionError> {
        let source = expression.source();
        self.log.lock().unwrap().push(source.to_string());
        match source {
            "true" => Ok(Some(Value::boolean(true))),
            "false" => Ok(Some(Value::boolean(false))),
            "null" => Ok(None),
            _ => {
                if let Some(name) = source.strip_prefix("var(").and_then(|s| s.strip_suffix(')'))
                {
                    return Ok(scope.value_of(name));
                }
                match self.rules.get(source) {
                    Some(rule) => Ok(rule(scope)),
                    None => Ok(None),
                }
            }
        }
    }
}

/// Scores 1.0 when the item-scope RESPONSE equals `CHOICE_A`
pub fn score_by_correctness(scope: &dyn EvaluationScope) -> Option<Value> {
    let correct = scope
        .value_of("RESPONSE")
        .map(|v| v == Value::identifier("CHOICE_A"))
        .unwrap_or(false);
    Some(Value::float(if correct { 1.0 } else { 0.0 }))
}

/// An item reference with a single-identifier RESPONSE (correct answer
/// `CHOICE_A`), a float SCORE outcome and response processing that scores
/// the attempt through the `score_item` scripted rule
pub fn scored_item(id: &str) -> Arc<AssessmentItemRef> {
    Arc::new(AssessmentItemRef {
        response_declarations: vec![Arc::new(
            VariableDeclaration::response("RESPONSE", Cardinality::Single, BaseType::Identifier)
                .with_correct_response(Value::identifier("CHOICE_A")),
        )],
        outcome_declarations: vec![Arc::new(
            VariableDeclaration::outcome("SCORE", Cardinality::Single, BaseType::Float)
                .with_default(Value::float(0.0)),
        )],
        response_processing: Some(ResponseProcessing::new(vec![ResponseRule::new(
            "SCORE",
            Expression::new("score_item"),
        )])),
        ..AssessmentItemRef::new(id, format!("{id}.xml"))
    })
}

/// A bare item reference with declarations but no response processing
pub fn plain_item(id: &str) -> Arc<AssessmentItemRef> {
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

/// Wrap items into a single-section test part
pub fn part_of(
    id: &str,
    navigation: NavigationMode,
    submission: SubmissionMode,
    items: Vec<Arc<AssessmentItemRef>>,
) -> Arc<TestPart> {
    let section = Arc::new(AssessmentSection {
        parts: items.into_iter().map(SectionPart::ItemRef).collect(),
        ..AssessmentSection::new(format!("SECT-{id}"))
    });
    Arc::new(TestPart {
        sections: vec![section],
        ..TestPart::new(id, navigation, submission)
    })
}

/// A test with a float SCORE outcome (default 0) over the given parts
pub fn test_of(parts: Vec<Arc<TestPart>>) -> Arc<AssessmentTest> {
    Arc::new(AssessmentTest {
        outcome_declarations: vec![Arc::new(
            VariableDeclaration::outcome("SCORE", Cardinality::Single, BaseType::Float)
                .with_default(Value::float(0.0)),
        )],
        test_parts: parts,
        ..AssessmentTest::new("examination-1")
    })
}

/// Materialize the route in document order, one occurrence per reference
pub fn route_of(test: &Arc<AssessmentTest>) -> Route {
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

/// A single-variable response state for the ubiquitous RESPONSE identifier
pub fn respond(value: Option<&str>) -> State {
    let mut state = State::new();
    let mut variable = Variable::from_declaration(&VariableDeclaration::response(
        "RESPONSE",
        Cardinality::Single,
        BaseType::Identifier,
    ));
    variable
        .set_value_or_null(value.map(Value::identifier))
        .unwrap();
    state.set_variable(variable);
    state
}

/// Sums the SCORE outcomes of the given item identifiers; usable as a
/// test-level outcome rule
pub fn sum_scores(ids: &[&str]) -> impl Fn(&dyn EvaluationScope) -> Option<Value> {
    let ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
    move |scope: &dyn EvaluationScope| {
        let mut total = 0.0;
        for id in &ids {
            if let Some(Value::Single(scalar)) = scope.value_of(&format!("{id}.SCORE")) {
                if let Some(score) = scalar.as_float() {
                    total += score;
                }
            }
        }
        Some(Value::float(total))
    }
}

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

//! The route: the flattened sequence of item occurrences a candidate visits
//!
//! Route construction (selection and ordering expansion) happens outside the
//! runtime; constructors here accept the materialized sequence. The sequence
//! is never mutated during a session, only the cursor moves. The cursor may
//! sit one past the last item, which is the exhausted state.

use crate::error::{Result, SessionError};
use octoqti_model::{
    AssessmentItemRef, AssessmentSection, BranchRule, ItemSessionControl, PreCondition, TestPart,
    TimeLimits,
};
use std::sync::Arc;

/// One item occurrence on the route, enriched with the rules in force for it
#[derive(Clone)]
pub struct RouteItem {
    item_ref: Arc<AssessmentItemRef>,
    occurrence: usize,
    test_part: Arc<TestPart>,
    /// Containing sections, outermost first
    sections: Vec<Arc<AssessmentSection>>,
    pre_conditions: Vec<Arc<PreCondition>>,
    branch_rules: Vec<Arc<BranchRule>>,
    item_session_control: ItemSessionControl,
}

impl RouteItem {
    /// Create a route item carrying the item reference's own rules; section
    /// and part rules are attached by [`Route::new`], which knows section
    /// boundaries.
    pub fn new(
        item_ref: Arc<AssessmentItemRef>,
        occurrence: usize,
        sections: Vec<Arc<AssessmentSection>>,
        test_part: Arc<TestPart>,
    ) -> Self {
        let item_session_control = effective_control(&item_ref, &sections, &test_part);
        let pre_conditions = item_ref.pre_conditions.clone();
        let branch_rules = item_ref.branch_rules.clone();
        Self {
            item_ref,
            occurrence,
            test_part,
            sections,
            pre_conditions,
            branch_rules,
            item_session_control,
        }
    }

    /// Rebuild a route item from explicit effective rules, as decoded from a
    /// snapshot
    pub fn from_parts(
        item_ref: Arc<AssessmentItemRef>,
        occurrence: usize,
        sections: Vec<Arc<AssessmentSection>>,
        test_part: Arc<TestPart>,
        pre_conditions: Vec<Arc<PreCondition>>,
        branch_rules: Vec<Arc<BranchRule>>,
    ) -> Self {
        let item_session_control = effective_control(&item_ref, &sections, &test_part);
        Self {
            item_ref,
            occurrence,
            test_part,
            sections,
            pre_conditions,
            branch_rules,
            item_session_control,
        }
    }

    /// The referenced item
    pub fn item_ref(&self) -> &Arc<AssessmentItemRef> {
        &self.item_ref
    }

    /// Occurrence number of the item reference, dense from 0
    pub fn occurrence(&self) -> usize {
        self.occurrence
    }

    /// The containing test part
    pub fn test_part(&self) -> &Arc<TestPart> {
        &self.test_part
    }

    /// The containing sections, outermost first
    pub fn sections(&self) -> &[Arc<AssessmentSection>] {
        &self.sections
    }

    /// The innermost containing section
    pub fn innermost_section(&self) -> Option<&Arc<AssessmentSection>> {
        self.sections.last()
    }

    /// Preconditions in force for this occurrence
    pub fn pre_conditions(&self) -> &[Arc<PreCondition>] {
        &self.pre_conditions
    }

    /// Branch rules in force for this occurrence
    pub fn branch_rules(&self) -> &[Arc<BranchRule>] {
        &self.branch_rules
    }

    /// Session control in force, resolved through the section chain
    pub fn item_session_control(&self) -> &ItemSessionControl {
        &self.item_session_control
    }

    /// Item-scope time limits; section and part limits stay with their
    /// scopes and are reached through [`sections`](Self::sections) and
    /// [`test_part`](Self::test_part)
    pub fn time_limits(&self) -> Option<&TimeLimits> {
        self.item_ref.time_limits.as_ref()
    }

    /// `<itemRefId>.<occurrence>` label used in faults
    pub fn label(&self) -> String {
        format!("{}.{}", self.item_ref.identifier, self.occurrence)
    }

    /// True when the target names this occurrence's item, one of its
    /// sections, or its test part
    pub fn answers_to(&self, identifier: &str) -> bool {
        self.item_ref.identifier == identifier
            || self.test_part.identifier == identifier
            || self.sections.iter().any(|s| s.identifier == identifier)
    }
}

/// Session control resolution: the item reference wins, then the innermost
/// section, then the test part, then the QTI defaults.
fn effective_control(
    item_ref: &AssessmentItemRef,
    sections: &[Arc<AssessmentSection>],
    test_part: &TestPart,
) -> ItemSessionControl {
    if let Some(control) = &item_ref.item_session_control {
        return control.clone();
    }
    for section in sections.iter().rev() {
        if let Some(control) = &section.item_session_control {
            return control.clone();
        }
    }
    test_part
        .item_session_control
        .clone()
        .unwrap_or_default()
}

/// The ordered sequence of route items with a movable cursor
pub struct Route {
    items: Vec<RouteItem>,
    position: usize,
}

impl Route {
    /// Build a route from materialized items, attaching section and part
    /// rules to their boundary occurrences: preconditions guard the first
    /// occurrence of their scope, branch rules fire when leaving the last.
    pub fn new(mut items: Vec<RouteItem>) -> Self {
        let count = items.len();
        for i in 0..count {
            let mut extra_pre: Vec<Arc<PreCondition>> = Vec::new();
            let mut extra_branch: Vec<Arc<BranchRule>> = Vec::new();

            let part = Arc::clone(&items[i].test_part);
            let first_of_part =
                i == 0 || items[i - 1].test_part.identifier != part.identifier;
            let last_of_part =
                i + 1 == count || items[i + 1].test_part.identifier != part.identifier;
            if first_of_part {
                extra_pre.extend(part.pre_conditions.iter().cloned());
            }
            if last_of_part {
                extra_branch.extend(part.branch_rules.iter().cloned());
            }

            for section in items[i].sections.clone() {
                let in_section = |item: &RouteItem| {
                    item.sections
                        .iter()
                        .any(|s| s.identifier == section.identifier)
                };
                let first_of_section = i == 0 || !in_section(&items[i - 1]);
                let last_of_section = i + 1 == count || !in_section(&items[i + 1]);
                if first_of_section {
                    extra_pre.extend(section.pre_conditions.iter().cloned());
                }
                if last_of_section {
                    extra_branch.extend(section.branch_rules.iter().cloned());
                }
            }

            // scope rules come before the item's own
            let item = &mut items[i];
            extra_pre.extend(item.pre_conditions.drain(..));
            item.pre_conditions = extra_pre;
            extra_branch.extend(item.branch_rules.drain(..));
            item.branch_rules = extra_branch;
        }
        Self { items, position: 0 }
    }

    /// Build a route whose items already carry their effective rules
    pub fn from_enriched(items: Vec<RouteItem>) -> Self {
        Self { items, position: 0 }
    }

    /// Number of route items
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// The cursor, `0 ≤ position ≤ count`
    pub fn position(&self) -> usize {
        self.position
    }

    /// True when the cursor moved past the last item
    pub fn is_exhausted(&self) -> bool {
        self.position >= self.items.len()
    }

    /// All route items in order
    pub fn items(&self) -> &[RouteItem] {
        &self.items
    }

    /// The route item under the cursor
    pub fn current(&self) -> Result<&RouteItem> {
        self.items.get(self.position).ok_or_else(|| {
            SessionError::out_of_range(format!(
                "no route item at position {} of {}",
                self.position,
                self.items.len()
            ))
        })
    }

    /// Move the cursor forward; moving past the last item is legal once
    pub fn next(&mut self) -> Result<()> {
        if self.position >= self.items.len() {
            return Err(SessionError::out_of_range(format!(
                "cannot move forward, the route is exhausted at {}",
                self.position
            )));
        }
        self.position += 1;
        Ok(())
    }

    /// Move the cursor backward
    pub fn previous(&mut self) -> Result<()> {
        if self.position == 0 {
            return Err(SessionError::out_of_range(
                "cannot move backward from the first route item",
            ));
        }
        self.position -= 1;
        Ok(())
    }

    /// Place the cursor on `position`
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.items.len() {
            return Err(SessionError::out_of_range(format!(
                "position {position} outside a route of {} items",
                self.items.len()
            )));
        }
        self.position = position;
        Ok(())
    }

    /// True when the cursor is on the first item
    pub fn is_first(&self) -> bool {
        self.position == 0 && !self.items.is_empty()
    }

    /// True when the cursor is on the last item
    pub fn is_last(&self) -> bool {
        !self.is_exhausted() && self.position + 1 == self.items.len()
    }

    /// True when the cursor is on the first item of its test part
    pub fn is_first_of_test_part(&self) -> Result<bool> {
        let current = self.current()?;
        Ok(self.position == 0
            || self.items[self.position - 1].test_part.identifier
                != current.test_part.identifier)
    }

    /// True when the cursor is on the last item of its test part
    pub fn is_last_of_test_part(&self) -> Result<bool> {
        let current = self.current()?;
        Ok(self.position + 1 == self.items.len()
            || self.items[self.position + 1].test_part.identifier
                != current.test_part.identifier)
    }

    /// True when the cursor is on the last item of its innermost section
    pub fn is_last_of_assessment_section(&self) -> Result<bool> {
        let current = self.current()?;
        let Some(section) = current.innermost_section() else {
            return Ok(self.position + 1 == self.items.len());
        };
        Ok(self.position + 1 == self.items.len()
            || !self.items[self.position + 1]
                .sections
                .iter()
                .any(|s| s.identifier == section.identifier))
    }

    /// Route items belonging to a test part
    pub fn route_items_by_test_part(&self, identifier: &str) -> Vec<&RouteItem> {
        self.items
            .iter()
            .filter(|i| i.test_part.identifier == identifier)
            .collect()
    }

    /// Route items contained in a section
    pub fn route_items_by_assessment_section(&self, identifier: &str) -> Vec<&RouteItem> {
        self.items
            .iter()
            .filter(|i| i.sections.iter().any(|s| s.identifier == identifier))
            .collect()
    }

    /// Route items referencing an item
    pub fn route_items_by_assessment_item_ref(&self, identifier: &str) -> Vec<&RouteItem> {
        self.items
            .iter()
            .filter(|i| i.item_ref.identifier == identifier)
            .collect()
    }

    /// Route items carrying a reporting category
    pub fn route_items_by_category(&self, category: &str) -> Vec<&RouteItem> {
        self.items
            .iter()
            .filter(|i| i.item_ref.categories.iter().any(|c| c == category))
            .collect()
    }

    /// Move the cursor to the earliest route item answering to `identifier`
    /// (an item reference, section or test part identifier)
    pub fn branch(&mut self, identifier: &str) -> Result<()> {
        match self.items.iter().position(|i| i.answers_to(identifier)) {
            Some(position) => {
                self.position = position;
                Ok(())
            }
            None => Err(SessionError::out_of_range(format!(
                "no route item answers to branch target '{identifier}'"
            ))),
        }
    }

    /// Position just past the last item of the test part at `position`
    pub(crate) fn end_of_test_part(&self, position: usize) -> usize {
        let Some(part_id) = self.items.get(position).map(|i| &i.test_part.identifier) else {
            return self.items.len();
        };
        let mut end = position;
        while end < self.items.len() && &self.items[end].test_part.identifier == part_id {
            end += 1;
        }
        end
    }

    /// Position just past the last item of the innermost section at
    /// `position`
    pub(crate) fn end_of_assessment_section(&self, position: usize) -> usize {
        let Some(section_id) = self
            .items
            .get(position)
            .and_then(|i| i.innermost_section())
            .map(|s| s.identifier.clone())
        else {
            return self.end_of_test_part(position);
        };
        let mut end = position;
        while end < self.items.len()
            && self.items[end]
                .sections
                .iter()
                .any(|s| s.identifier == section_id)
        {
            end += 1;
        }
        end
    }
}

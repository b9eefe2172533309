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

//! Document-order component index over an assessment tree
//!
//! The snapshot stream refers to model components by `(class, index)`
//! rather than by name, keeping the encoding compact and order-stable. The
//! seeker assigns those indices by one depth-first walk of the tree and
//! resolves them in both directions. It is derived from a read-only tree
//! and is itself read-only and shareable.

use crate::error::{CodecError, Result};
use octoqti_model::{
    AssessmentItemRef, AssessmentSection, AssessmentTest, BranchRule, PreCondition, SectionPart,
    TestPart, VariableDeclaration,
};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// One indexed component class
struct ClassIndex<T> {
    components: Vec<Arc<T>>,
    by_ptr: FxHashMap<usize, usize>,
}

impl<T> Default for ClassIndex<T> {
    fn default() -> Self {
        Self {
            components: Vec::new(),
            by_ptr: FxHashMap::default(),
        }
    }
}

impl<T> ClassIndex<T> {
    fn push(&mut self, component: &Arc<T>) {
        let ptr = Arc::as_ptr(component) as usize;
        if self.by_ptr.contains_key(&ptr) {
            return;
        }
        self.by_ptr.insert(ptr, self.components.len());
        self.components.push(Arc::clone(component));
    }

    fn by_index(&self, class: &'static str, index: usize) -> Result<&Arc<T>> {
        self.components
            .get(index)
            .ok_or(CodecError::UnknownComponent { class, index })
    }

    fn index_of(&self, component: &Arc<T>) -> Option<usize> {
        self.by_ptr.get(&(Arc::as_ptr(component) as usize)).copied()
    }
}

/// Index of an assessment tree's components by class and document order
pub struct Seeker {
    test_parts: ClassIndex<TestPart>,
    sections: ClassIndex<AssessmentSection>,
    item_refs: ClassIndex<AssessmentItemRef>,
    outcome_declarations: ClassIndex<VariableDeclaration>,
    response_declarations: ClassIndex<VariableDeclaration>,
    branch_rules: ClassIndex<BranchRule>,
    pre_conditions: ClassIndex<PreCondition>,
}

impl Seeker {
    /// Walk `test` depth-first and index its components
    pub fn new(test: &AssessmentTest) -> Self {
        let mut seeker = Self {
            test_parts: ClassIndex::default(),
            sections: ClassIndex::default(),
            item_refs: ClassIndex::default(),
            outcome_declarations: ClassIndex::default(),
            response_declarations: ClassIndex::default(),
            branch_rules: ClassIndex::default(),
            pre_conditions: ClassIndex::default(),
        };
        for declaration in &test.outcome_declarations {
            seeker.outcome_declarations.push(declaration);
        }
        for part in &test.test_parts {
            seeker.test_parts.push(part);
            for rule in &part.branch_rules {
                seeker.branch_rules.push(rule);
            }
            for guard in &part.pre_conditions {
                seeker.pre_conditions.push(guard);
            }
            for section in &part.sections {
                seeker.index_section(section);
            }
        }
        seeker
    }

    fn index_section(&mut self, section: &Arc<AssessmentSection>) {
        self.sections.push(section);
        for rule in &section.branch_rules {
            self.branch_rules.push(rule);
        }
        for guard in &section.pre_conditions {
            self.pre_conditions.push(guard);
        }
        for part in &section.parts {
            match part {
                SectionPart::Section(nested) => self.index_section(nested),
                SectionPart::ItemRef(item_ref) => self.index_item_ref(item_ref),
            }
        }
    }

    fn index_item_ref(&mut self, item_ref: &Arc<AssessmentItemRef>) {
        self.item_refs.push(item_ref);
        for rule in &item_ref.branch_rules {
            self.branch_rules.push(rule);
        }
        for guard in &item_ref.pre_conditions {
            self.pre_conditions.push(guard);
        }
        for declaration in &item_ref.outcome_declarations {
            self.outcome_declarations.push(declaration);
        }
        for declaration in &item_ref.response_declarations {
            self.response_declarations.push(declaration);
        }
    }

    /// Test part at `index`
    pub fn test_part(&self, index: usize) -> Result<&Arc<TestPart>> {
        self.test_parts.by_index("testPart", index)
    }

    /// Index of a test part
    pub fn index_of_test_part(&self, part: &Arc<TestPart>) -> Result<usize> {
        self.test_parts
            .index_of(part)
            .ok_or_else(|| CodecError::UnindexedComponent {
                class: "testPart",
                identifier: part.identifier.clone(),
            })
    }

    /// Section at `index`
    pub fn section(&self, index: usize) -> Result<&Arc<AssessmentSection>> {
        self.sections.by_index("assessmentSection", index)
    }

    /// Index of a section
    pub fn index_of_section(&self, section: &Arc<AssessmentSection>) -> Result<usize> {
        self.sections
            .index_of(section)
            .ok_or_else(|| CodecError::UnindexedComponent {
                class: "assessmentSection",
                identifier: section.identifier.clone(),
            })
    }

    /// Item reference at `index`
    pub fn item_ref(&self, index: usize) -> Result<&Arc<AssessmentItemRef>> {
        self.item_refs.by_index("assessmentItemRef", index)
    }

    /// Index of an item reference
    pub fn index_of_item_ref(&self, item_ref: &Arc<AssessmentItemRef>) -> Result<usize> {
        self.item_refs
            .index_of(item_ref)
            .ok_or_else(|| CodecError::UnindexedComponent {
                class: "assessmentItemRef",
                identifier: item_ref.identifier.clone(),
            })
    }

    /// Outcome declaration at `index`
    pub fn outcome_declaration(&self, index: usize) -> Result<&Arc<VariableDeclaration>> {
        self.outcome_declarations.by_index("outcomeDeclaration", index)
    }

    /// Index of an outcome declaration
    pub fn index_of_outcome_declaration(
        &self,
        declaration: &Arc<VariableDeclaration>,
    ) -> Result<usize> {
        self.outcome_declarations
            .index_of(declaration)
            .ok_or_else(|| CodecError::UnindexedComponent {
                class: "outcomeDeclaration",
                identifier: declaration.identifier.clone(),
            })
    }

    /// Response declaration at `index`
    pub fn response_declaration(&self, index: usize) -> Result<&Arc<VariableDeclaration>> {
        self.response_declarations
            .by_index("responseDeclaration", index)
    }

    /// Index of a response declaration
    pub fn index_of_response_declaration(
        &self,
        declaration: &Arc<VariableDeclaration>,
    ) -> Result<usize> {
        self.response_declarations
            .index_of(declaration)
            .ok_or_else(|| CodecError::UnindexedComponent {
                class: "responseDeclaration",
                identifier: declaration.identifier.clone(),
            })
    }

    /// Branch rule at `index`
    pub fn branch_rule(&self, index: usize) -> Result<&Arc<BranchRule>> {
        self.branch_rules.by_index("branchRule", index)
    }

    /// Index of a branch rule
    pub fn index_of_branch_rule(&self, rule: &Arc<BranchRule>) -> Result<usize> {
        self.branch_rules
            .index_of(rule)
            .ok_or_else(|| CodecError::UnindexedComponent {
                class: "branchRule",
                identifier: rule.target.clone(),
            })
    }

    /// Precondition at `index`
    pub fn pre_condition(&self, index: usize) -> Result<&Arc<PreCondition>> {
        self.pre_conditions.by_index("preCondition", index)
    }

    /// Index of a precondition
    pub fn index_of_pre_condition(&self, guard: &Arc<PreCondition>) -> Result<usize> {
        self.pre_conditions
            .index_of(guard)
            .ok_or_else(|| CodecError::UnindexedComponent {
                class: "preCondition",
                identifier: guard.expression.source().to_string(),
            })
    }
}

//! The navigation sequencer.
//!
//! Owns the jump table and the response store for one delivery attempt
//! and decides which item is current. Every operation is a suspension
//! point completed in issue order; the owning session guarantees at most
//! one in-flight operation. Either a jump is fully appended or not at
//! all.

use std::sync::Arc;

use qtiforge_core::artifact::CompactTest;
use qtiforge_core::branch::{self, BranchRule, BranchRulePolicy};
use qtiforge_core::error::BranchRuleError;
use qtiforge_core::model::NavigationMode;
use qtiforge_core::responses::{response_key, NavigationParams, ResponseStore};
use qtiforge_core::traits::ItemStore;
use serde::{Deserialize, Serialize};

use crate::error::SequencerError;
use crate::jump::{Jump, JumpTable};

/// One row of the flattened test map, in document order.
#[derive(Debug, Clone)]
struct MapRow {
    item: String,
    section: String,
    part: String,
    navigation_mode: NavigationMode,
    branch_rule: Option<BranchRule>,
}

/// The document-order view of a compact test the sequencer navigates.
#[derive(Debug, Clone, Default)]
struct TestMap {
    rows: Vec<MapRow>,
}

impl TestMap {
    fn from_compact(test: &CompactTest) -> Self {
        let rows = test
            .items()
            .map(|(part, section, item)| MapRow {
                item: item.identifier.clone(),
                section: section.identifier.clone(),
                part: part.identifier.clone(),
                navigation_mode: part.navigation_mode,
                branch_rule: item.branch_rule.clone(),
            })
            .collect();
        Self { rows }
    }

    fn row_for_item(&self, item: &str) -> Option<&MapRow> {
        self.rows.iter().find(|row| row.item == item)
    }

    /// The row following `item` in document order; the first row when
    /// `item` is `None`.
    fn row_after_item(&self, item: Option<&str>) -> Option<&MapRow> {
        match item {
            None => self.rows.first(),
            Some(item) => {
                let index = self.rows.iter().position(|row| row.item == item)?;
                self.rows.get(index + 1)
            }
        }
    }

    /// The first row of the section following `section` in document
    /// order; the first row when `section` is `None`.
    fn row_of_next_section(&self, section: Option<&str>) -> Option<&MapRow> {
        match section {
            None => self.rows.first(),
            Some(section) => {
                let index = self.rows.iter().position(|row| row.section == section)?;
                self.rows[index..]
                    .iter()
                    .find(|row| row.section != section)
            }
        }
    }
}

/// The persisted position a session resumes from after an interruption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeContext {
    /// The item that was current when the session was interrupted.
    pub item: String,
    /// Its position in the jump table.
    pub position: i64,
}

/// The jump-table state machine driving one delivery attempt.
pub struct NavigationSequencer {
    map: TestMap,
    jumps: JumpTable,
    responses: ResponseStore,
    item_store: Arc<dyn ItemStore>,
    policy: BranchRulePolicy,
}

impl NavigationSequencer {
    pub fn new(
        test: &CompactTest,
        item_store: Arc<dyn ItemStore>,
        policy: BranchRulePolicy,
    ) -> Self {
        Self {
            map: TestMap::from_compact(test),
            jumps: JumpTable::new(),
            responses: ResponseStore::new(),
            item_store,
            policy,
        }
    }

    /// Seed or rebuild the jump table, and prime the response store with
    /// every item's known-correct responses so branch rules can be
    /// evaluated without a round trip to the authoring store.
    ///
    /// With an empty table and a resume context, the jumps for every item
    /// up to and including the context item are replayed; otherwise the
    /// table is seeded with just the first item.
    pub async fn init(
        &mut self,
        resume: Option<&ResumeContext>,
    ) -> Result<(), SequencerError> {
        if self.jumps.is_empty() && !self.map.rows.is_empty() {
            match resume {
                Some(context) => {
                    for row in &self.map.rows {
                        self.jumps.add_jump(&row.part, &row.section, &row.item);
                        if row.item == context.item {
                            break;
                        }
                    }
                    tracing::debug!(
                        item = %context.item,
                        replayed = self.jumps.len(),
                        "jump table rebuilt from resume context"
                    );
                }
                None => {
                    let first = &self.map.rows[0];
                    self.jumps.add_jump(&first.part, &first.section, &first.item);
                }
            }
        }

        for row in &self.map.rows {
            let data = self
                .item_store
                .get(&row.item)
                .await
                .map_err(SequencerError::ItemStore)?;
            if let Some(data) = data {
                for (response_identifier, correct) in &data.correct_responses {
                    let key = response_key(&row.item, response_identifier);
                    self.responses
                        .add_correct_response(&key, correct.iter().cloned());
                }
            }
        }
        Ok(())
    }

    /// Append a jump for an explicit position.
    pub async fn add_jump(
        &mut self,
        part: &str,
        section: &str,
        item: &str,
    ) -> Result<Jump, SequencerError> {
        Ok(self.jumps.add_jump(part, section, item).clone())
    }

    /// Truncate the jump table so `position` becomes current.
    pub async fn jump_to(&mut self, position: i64) -> Result<(), SequencerError> {
        self.jumps.jump_to(position);
        Ok(())
    }

    /// Record the responses carried by `params`, then advance: through
    /// the current item's branch rule when it has one, otherwise to the
    /// next item in document order.
    ///
    /// Returns `None` at the end of the sequence; end-of-test is a normal
    /// terminal condition, not an error.
    pub async fn jump_to_next_item(
        &mut self,
        params: &NavigationParams,
    ) -> Result<Option<Jump>, SequencerError> {
        self.responses.record_params(params);

        let current = self.jumps.last().map(|j| j.item.clone());
        let branch_rule = current
            .as_deref()
            .and_then(|item| self.map.row_for_item(item))
            .and_then(|row| row.branch_rule.clone());

        let target = match (current.as_deref(), &branch_rule) {
            (Some(item), Some(rule)) => self.branch_target(item, rule, params)?,
            _ => None,
        };

        let next = match target {
            Some(target) => self.map.row_for_item(&target).cloned(),
            None => self.map.row_after_item(current.as_deref()).cloned(),
        };

        Ok(self.append_row(next))
    }

    /// Advance to the next item in document order, ignoring branch rules.
    pub async fn jump_to_skip_item(&mut self) -> Result<Option<Jump>, SequencerError> {
        let current = self.jumps.last().map(|j| j.item.clone());
        let next = self.map.row_after_item(current.as_deref()).cloned();
        Ok(self.append_row(next))
    }

    /// Record responses and advance to the first item of the next
    /// section in document order.
    pub async fn jump_to_next_section(
        &mut self,
        params: &NavigationParams,
    ) -> Result<Option<Jump>, SequencerError> {
        self.responses.record_params(params);

        let current_section = self.jumps.last().map(|j| j.section.clone());
        let next = self.map.row_of_next_section(current_section.as_deref()).cloned();
        Ok(self.append_row(next))
    }

    /// Move back by removing the last jump. Pure pop: no branch rule is
    /// evaluated on the way back. Rejected inside linear test parts.
    pub async fn jump_to_previous_item(&mut self) -> Result<Option<Jump>, SequencerError> {
        let linear = self
            .jumps
            .last()
            .and_then(|jump| self.map.row_for_item(&jump.item))
            .is_some_and(|row| row.navigation_mode == NavigationMode::Linear);
        if linear {
            return Err(SequencerError::BackwardNotAllowed);
        }
        Ok(self.jumps.pop())
    }

    /// The current position, `None` before `init` or after full truncate.
    pub fn last_jump(&self) -> Option<&Jump> {
        self.jumps.last()
    }

    /// The visited positions in order.
    pub fn jump_table(&self) -> &[Jump] {
        self.jumps.entries()
    }

    /// The accumulated responses of this attempt.
    pub fn responses(&self) -> &ResponseStore {
        &self.responses
    }

    fn append_row(&mut self, row: Option<MapRow>) -> Option<Jump> {
        let row = row?;
        Some(
            self.jumps
                .add_jump(&row.part, &row.section, &row.item)
                .clone(),
        )
    }

    fn branch_target(
        &self,
        current: &str,
        rule: &BranchRule,
        params: &NavigationParams,
    ) -> Result<Option<String>, SequencerError> {
        match branch::evaluate(rule, current, params, &self.responses) {
            Ok(Some(target)) => {
                if self.map.row_for_item(&target).is_some() {
                    Ok(Some(target))
                } else {
                    self.malformed_rule(BranchRuleError::UnknownTarget(target))
                }
            }
            Ok(None) => Ok(None),
            Err(err) => self.malformed_rule(err),
        }
    }

    fn malformed_rule(
        &self,
        err: BranchRuleError,
    ) -> Result<Option<String>, SequencerError> {
        match self.policy {
            BranchRulePolicy::FallThrough => {
                tracing::warn!(error = %err, "branch rule ignored, falling through to document order");
                Ok(None)
            }
            BranchRulePolicy::Abort => Err(SequencerError::BranchRule(err)),
        }
    }
}

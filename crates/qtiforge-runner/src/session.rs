//! The delivery session: one test attempt from init to completion.
//!
//! A session owns its sequencer, response store and per-item state, and
//! is destroyed when the attempt ends. Navigation operations are
//! serialized: at most one may be in flight, and a second call while one
//! is outstanding is rejected rather than queued, so duplicate
//! submissions can never interleave.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use qtiforge_core::artifact::CompactTest;
use qtiforge_core::branch::BranchRulePolicy;
use qtiforge_core::responses::NavigationParams;
use qtiforge_core::traits::ItemStore;
use serde::{Deserialize, Serialize};

use crate::error::SequencerError;
use crate::jump::Jump;
use crate::sequencer::{NavigationSequencer, ResumeContext};
use crate::validation::check_responses;

/// Per-session delivery options.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Require a non-empty response before a move is accepted.
    #[serde(default)]
    pub validate_responses: bool,
    /// What to do when a malformed branch rule fails to evaluate.
    #[serde(default)]
    pub branch_rule_policy: BranchRulePolicy,
}

struct SessionState {
    sequencer: NavigationSequencer,
    item_states: HashMap<String, serde_json::Value>,
}

/// One active delivery attempt.
pub struct DeliverySession {
    state: Mutex<SessionState>,
    config: SessionConfig,
}

impl DeliverySession {
    pub fn new(
        test: &CompactTest,
        item_store: Arc<dyn ItemStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            state: Mutex::new(SessionState {
                sequencer: NavigationSequencer::new(test, item_store, config.branch_rule_policy),
                item_states: HashMap::new(),
            }),
            config,
        }
    }

    /// Initialize the session, optionally resuming from a persisted
    /// context after an interruption.
    pub async fn init(&self, resume: Option<ResumeContext>) -> Result<(), SequencerError> {
        let mut state = self.acquire()?;
        state.sequencer.init(resume.as_ref()).await
    }

    /// Move to the next item, recording the responses in `params` and
    /// honoring branch rules. `None` means end of test.
    pub async fn move_next(
        &self,
        params: NavigationParams,
    ) -> Result<Option<Jump>, SequencerError> {
        check_responses(&params, self.config.validate_responses)?;
        let mut state = self.acquire()?;
        state.sequencer.jump_to_next_item(&params).await
    }

    /// Skip to the next item, ignoring branch rules. Skipping is exempt
    /// from response validation.
    pub async fn skip(&self) -> Result<Option<Jump>, SequencerError> {
        let mut state = self.acquire()?;
        state.sequencer.jump_to_skip_item().await
    }

    /// Move to the first item of the next section.
    pub async fn next_section(
        &self,
        params: NavigationParams,
    ) -> Result<Option<Jump>, SequencerError> {
        let mut state = self.acquire()?;
        state.sequencer.jump_to_next_section(&params).await
    }

    /// Move back to the previous item.
    pub async fn move_back(&self) -> Result<Option<Jump>, SequencerError> {
        let mut state = self.acquire()?;
        state.sequencer.jump_to_previous_item().await
    }

    /// Truncate the visited sequence so `position` becomes current.
    pub async fn jump_to(&self, position: i64) -> Result<(), SequencerError> {
        let mut state = self.acquire()?;
        state.sequencer.jump_to(position).await
    }

    /// The current position, `None` before init or past a full truncate.
    pub async fn current(&self) -> Result<Option<Jump>, SequencerError> {
        let state = self.acquire()?;
        Ok(state.sequencer.last_jump().cloned())
    }

    /// A snapshot of the visited positions in order.
    pub async fn jump_table(&self) -> Result<Vec<Jump>, SequencerError> {
        let state = self.acquire()?;
        Ok(state.sequencer.jump_table().to_vec())
    }

    /// Save the opaque client-side state of an item (tool selections,
    /// partial interactions) for later restoration.
    pub async fn save_item_state(
        &self,
        item: &str,
        item_state: serde_json::Value,
    ) -> Result<(), SequencerError> {
        let mut state = self.acquire()?;
        state.item_states.insert(item.to_string(), item_state);
        Ok(())
    }

    /// The saved state of an item, if any.
    pub async fn item_state(
        &self,
        item: &str,
    ) -> Result<Option<serde_json::Value>, SequencerError> {
        let state = self.acquire()?;
        Ok(state.item_states.get(item).cloned())
    }

    /// Single-flight enforcement: a second operation while one is
    /// outstanding is rejected, never queued.
    fn acquire(&self) -> Result<MutexGuard<'_, SessionState>, SequencerError> {
        self.state.try_lock().map_err(|_| SequencerError::MoveInFlight)
    }
}

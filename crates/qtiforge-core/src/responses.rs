//! Per-attempt response accumulation.
//!
//! The [`ResponseStore`] records, for one delivery attempt, the responses a
//! candidate has given and the responses considered correct, both keyed by
//! `"{item}.{response}"`. Entries are only ever added within an attempt,
//! never removed; the store dies with the owning session.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Build the composite key a response is stored under.
pub fn response_key(item: &str, response: &str) -> String {
    format!("{item}.{response}")
}

/// Grow-only record of given and correct responses for one attempt.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ResponseStore {
    responses: HashMap<String, Vec<String>>,
    correct: HashMap<String, Vec<String>>,
}

impl ResponseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one given response identifier under a composite key.
    /// Duplicate identifiers for the same key are kept once.
    pub fn add_response(&mut self, key: &str, response_id: &str) {
        let entry = self.responses.entry(key.to_string()).or_default();
        if !entry.iter().any(|r| r == response_id) {
            entry.push(response_id.to_string());
        }
    }

    /// Record the identifiers considered correct for a composite key.
    pub fn add_correct_response<I, S>(&mut self, key: &str, response_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = self.correct.entry(key.to_string()).or_default();
        for id in response_ids {
            let id = id.into();
            if !entry.contains(&id) {
                entry.push(id);
            }
        }
    }

    /// The responses given for a composite key, empty if none yet.
    pub fn responses(&self, key: &str) -> &[String] {
        self.responses.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The responses considered correct for a composite key.
    pub fn correct_responses(&self, key: &str) -> &[String] {
        self.correct.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any response was recorded for a composite key.
    pub fn has_response(&self, key: &str) -> bool {
        self.responses.get(key).is_some_and(|r| !r.is_empty())
    }

    /// Record every response carried by in-flight navigation parameters.
    pub fn record_params(&mut self, params: &NavigationParams) {
        let Some(item) = params.item.as_deref() else {
            return;
        };
        for (response_identifier, ids) in &params.responses {
            let key = response_key(item, response_identifier);
            for id in ids {
                self.add_response(&key, id);
            }
        }
    }
}

/// Parameters carried by a navigation request: which item the candidate is
/// leaving and the responses given on it, not yet persisted anywhere.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct NavigationParams {
    /// The item the responses belong to.
    #[serde(default)]
    pub item: Option<String>,
    /// Response identifier to the list of given response ids.
    #[serde(default)]
    pub responses: HashMap<String, Vec<String>>,
}

impl NavigationParams {
    /// Params with no responses at all (a plain move).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Params for responses given on one item.
    pub fn for_item(item: &str, responses: HashMap<String, Vec<String>>) -> Self {
        Self {
            item: Some(item.to_string()),
            responses,
        }
    }

    /// Whether every carried response is empty or blank.
    pub fn is_empty_response(&self) -> bool {
        self.responses
            .values()
            .all(|ids| ids.iter().all(|id| id.trim().is_empty()))
    }
}

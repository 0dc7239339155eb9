//! Per-match, per-turn invocation identity.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Invocation;

/// Identity of one combat's simulation state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimulationKey {
    /// Match the combat belongs to
    pub match_id: String,
    /// Turn of the combat
    pub turn: u32,
}

impl SimulationKey {
    /// Creates a key.
    #[must_use]
    pub fn new(match_id: &str, turn: u32) -> Self {
        Self {
            match_id: match_id.to_string(),
            turn,
        }
    }
}

impl fmt::Display for SimulationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.match_id, self.turn)
    }
}

/// Keyed store of invocations.
///
/// Holds at most one invocation per key. Seeing a new match id clears every
/// entry; creating an entry takes display rights away from all others.
#[derive(Default)]
pub struct SimulationStore {
    match_id: Option<String>,
    entries: HashMap<SimulationKey, Arc<Invocation>>,
}

impl SimulationStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the invocation for `key`, creating it with `create` when absent.
    pub fn get_or_create<F>(&mut self, key: &SimulationKey, create: Option<F>) -> Option<Arc<Invocation>>
    where
        F: FnOnce() -> Invocation,
    {
        if self.match_id.as_deref() != Some(key.match_id.as_str()) {
            if !self.entries.is_empty() {
                debug!("New match id. Clearing instances...");
            }
            self.clear();
            self.match_id = Some(key.match_id.clone());
        }

        if let Some(existing) = self.entries.get(key) {
            return Some(Arc::clone(existing));
        }
        let invocation = Arc::new(create?());
        for other in self.entries.values() {
            other.retire();
        }
        self.entries.insert(key.clone(), Arc::clone(&invocation));
        Some(invocation)
    }

    /// Looks up an invocation without creating one.
    #[must_use]
    pub fn get(&self, key: &SimulationKey) -> Option<Arc<Invocation>> {
        self.entries.get(key).cloned()
    }

    /// Retires and drops every entry.
    pub fn clear(&mut self) {
        for invocation in self.entries.values() {
            invocation.retire();
        }
        self.entries.clear();
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the store holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for SimulationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationStore")
            .field("match_id", &self.match_id)
            .field("entries", &self.entries.len())
            .finish()
    }
}

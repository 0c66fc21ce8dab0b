use crate::compiled::RenderState;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Shares structurally equal render states.
#[derive(Default)]
pub struct StateCache {
    states: Mutex<HashMap<RenderState, Arc<RenderState>>>,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared instance equal to `state`, publishing it if new.
    pub fn share(&self, state: RenderState) -> Arc<RenderState> {
        let mut states = self.states.lock();
        if let Some(existing) = states.get(&state) {
            return Arc::clone(existing);
        }
        let shared = Arc::new(state.clone());
        states.insert(state, Arc::clone(&shared));
        shared
    }

    /// Forgets all shared states. Tiles keep theirs.
    pub fn clear(&self) -> usize {
        let mut states = self.states.lock();
        let count = states.len();
        states.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.states.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.lock().is_empty()
    }
}

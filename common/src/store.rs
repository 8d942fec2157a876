use crate::error::LookupError;
use crate::locator::StateRef;
use crate::state::{State, StateAndRef};
use std::collections::HashMap;

/// Read access to historical states. Lookups are pure reads of immutable data.
pub trait StateStore {
    fn get(&self, state_ref: &StateRef) -> Option<State>;

    fn resolve(&self, state_ref: &StateRef) -> Result<StateAndRef, LookupError> {
        self.get(state_ref)
            .map(|state| StateAndRef::new(*state_ref, state))
            .ok_or(LookupError::NotFound(*state_ref))
    }
}

impl StateStore for HashMap<StateRef, State> {
    fn get(&self, state_ref: &StateRef) -> Option<State> {
        HashMap::get(self, state_ref).cloned()
    }
}

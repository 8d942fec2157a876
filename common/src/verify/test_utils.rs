use crate::locator::StateRef;
use crate::node::FulfillmentNode;
use crate::state::State;
use crate::update::{LedgerUpdate, ResolvedUpdate};
use crate::verify::{VerificationContext, VerificationEngine};
use crate::error::VerificationError;
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use std::collections::HashMap;

pub fn signing_key() -> SigningKey {
    SigningKey::generate(&mut OsRng)
}

/// States issued together in one committed update, with a store that knows about them.
pub struct Issued {
    pub update: LedgerUpdate,
    pub store: HashMap<StateRef, State>,
}

impl Issued {
    pub fn new(nodes: Vec<FulfillmentNode>) -> Self {
        Self::from_states(nodes.into_iter().map(|node| State::new(node, vec![])).collect())
    }

    pub fn from_states(outputs: Vec<State>) -> Self {
        let update = LedgerUpdate {
            outputs,
            ..Default::default()
        };
        let store = update
            .output_states()
            .into_iter()
            .map(|s| (s.state_ref, s.state))
            .collect();
        Self { update, store }
    }

    pub fn at(&self, index: u32) -> StateRef {
        self.update.output_ref(index)
    }

    pub fn resolve(&self, update: LedgerUpdate) -> ResolvedUpdate {
        ResolvedUpdate::resolve(update, &self.store).expect("all states are issued")
    }

    pub fn verify(&self, update: LedgerUpdate) -> Result<(), VerificationError> {
        let context = VerificationContext::new(self.resolve(update))?;
        VerificationEngine::standard().verify(&context)
    }
}

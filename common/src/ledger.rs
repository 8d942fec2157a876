use crate::error::LedgerError;
use crate::locator::{StateRef, UpdateId};
use crate::state::State;
use crate::store::StateStore;
use crate::update::{ResolvedUpdate, SignedUpdate};
use crate::verify::{VerificationContext, VerificationEngine};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/*
A single-process stand-in for the ledger substrate. It accepts an update only after its
signatures check out, none of its inputs or references are already consumed, and every
contract accepts it. Committed states stay resolvable after they are consumed.
*/
#[derive(Default)]
pub struct InMemoryLedger {
    states: HashMap<StateRef, State>,
    consumed: HashSet<StateRef>,
    committed: HashSet<UpdateId>,
    engine: VerificationEngine,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine(engine: VerificationEngine) -> Self {
        Self {
            engine,
            ..Default::default()
        }
    }

    pub fn engine_mut(&mut self) -> &mut VerificationEngine {
        &mut self.engine
    }

    pub fn is_consumed(&self, state_ref: &StateRef) -> bool {
        self.consumed.contains(state_ref)
    }

    pub fn is_committed(&self, id: &UpdateId) -> bool {
        self.committed.contains(id)
    }

    pub fn commit(&mut self, signed: SignedUpdate) -> Result<UpdateId, LedgerError> {
        signed.verify_signatures()?;

        let update = signed.update;
        let id = update.id();
        if self.committed.contains(&id) {
            return Err(LedgerError::AlreadyCommitted(id));
        }

        let mut seen = HashSet::new();
        for state_ref in update.inputs.iter().chain(&update.references) {
            if !seen.insert(*state_ref) {
                return Err(LedgerError::DuplicateUse(*state_ref));
            }
            if self.consumed.contains(state_ref) {
                warn!("Update {} uses consumed state {}", id, state_ref);
                return Err(LedgerError::DoubleSpend(*state_ref));
            }
        }

        let resolved = ResolvedUpdate::resolve(update, &*self)?;
        let context = VerificationContext::new(resolved)?;
        self.engine.verify(&context)?;

        let resolved = context.into_update();
        for state_ref in resolved.input_refs() {
            self.consumed.insert(*state_ref);
        }
        for output in resolved.update.output_states() {
            self.states.insert(output.state_ref, output.state);
        }
        self.committed.insert(id);

        info!(
            "Committed update {}: {} consumed, {} created",
            id,
            resolved.inputs.len(),
            resolved.update.outputs.len()
        );
        debug!("Ledger now holds {} states", self.states.len());
        Ok(id)
    }
}

impl StateStore for InMemoryLedger {
    fn get(&self, state_ref: &StateRef) -> Option<State> {
        self.states.get(state_ref).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VerificationError;
    use crate::locator::Locator;
    use crate::node::{FulfillmentNode, NodeKind};
    use crate::update::{ClaimDirective, LedgerUpdate};
    use crate::verify::test_utils::signing_key;

    fn issue(ledger: &mut InMemoryLedger, outputs: Vec<State>) -> UpdateId {
        let key = signing_key();
        let update = LedgerUpdate {
            outputs,
            signers: vec![key.verifying_key()],
            ..Default::default()
        };
        ledger.commit(SignedUpdate::sign(update, &[&key])).unwrap()
    }

    fn plain() -> State {
        State::new(FulfillmentNode::Plain { data: vec![7] }, vec![])
    }

    #[test]
    fn test_issue_and_consume() {
        let mut ledger = InMemoryLedger::new();
        let id = issue(&mut ledger, vec![plain()]);
        let target = StateRef::new(id, 0);
        assert!(ledger.get(&target).is_some());

        let spend = LedgerUpdate {
            inputs: vec![target],
            ..Default::default()
        };
        ledger.commit(SignedUpdate::sign(spend.clone(), &[])).unwrap();
        assert!(ledger.is_consumed(&target));
        // still resolvable as history
        assert!(ledger.get(&target).is_some());

        let again = LedgerUpdate {
            outputs: vec![plain()],
            ..spend
        };
        assert_eq!(
            ledger.commit(SignedUpdate::sign(again, &[])),
            Err(LedgerError::DoubleSpend(target))
        );
    }

    #[test]
    fn test_missing_signature_rejected() {
        let mut ledger = InMemoryLedger::new();
        let update = LedgerUpdate {
            outputs: vec![plain()],
            signers: vec![signing_key().verifying_key()],
            ..Default::default()
        };
        assert!(matches!(
            ledger.commit(SignedUpdate::sign(update, &[])),
            Err(LedgerError::Signature(_))
        ));
    }

    #[test]
    fn test_unknown_state_rejected() {
        let mut ledger = InMemoryLedger::new();
        let missing = StateRef::new(UpdateId([9; 32]), 0);
        let update = LedgerUpdate {
            references: vec![missing],
            ..Default::default()
        };
        assert!(matches!(
            ledger.commit(SignedUpdate::sign(update, &[])),
            Err(LedgerError::Lookup(_))
        ));
    }

    #[test]
    fn test_rejected_update_changes_nothing() {
        let mut ledger = InMemoryLedger::new();
        let id = issue(
            &mut ledger,
            vec![
                State::new(
                    FulfillmentNode::Composite {
                        required: vec![Locator::local(1)],
                    },
                    vec![],
                ),
                plain(),
            ],
        );

        // the plain state cannot be fulfilled by reference
        let update = LedgerUpdate {
            references: vec![StateRef::new(id, 0), StateRef::new(id, 1)],
            claims: vec![ClaimDirective::new(NodeKind::Composite, vec![0, 1])],
            ..Default::default()
        };
        assert!(matches!(
            ledger.commit(SignedUpdate::sign(update, &[])),
            Err(LedgerError::Rejected(VerificationError::NodeRejected { .. }))
        ));
        assert!(!ledger.is_consumed(&StateRef::new(id, 1)));
    }

    #[test]
    fn test_duplicate_use_and_recommit() {
        let mut ledger = InMemoryLedger::new();
        let key = signing_key();
        let update = LedgerUpdate {
            outputs: vec![plain()],
            signers: vec![key.verifying_key()],
            ..Default::default()
        };
        let signed = SignedUpdate::sign(update, &[&key]);
        let id = ledger.commit(signed.clone()).unwrap();
        assert_eq!(ledger.commit(signed), Err(LedgerError::AlreadyCommitted(id)));

        let target = StateRef::new(id, 0);
        let twice = LedgerUpdate {
            inputs: vec![target],
            references: vec![target],
            ..Default::default()
        };
        assert_eq!(
            ledger.commit(SignedUpdate::sign(twice, &[])),
            Err(LedgerError::DuplicateUse(target))
        );
    }
}

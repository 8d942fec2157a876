use crate::error::InputError;
use crate::locator::StateRef;
use crate::node::NodeKind;
use crate::state::StateAndRef;
use crate::update::ResolvedUpdate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

/// Everything an update treats as fulfilled: its consumed states plus the referenced states
/// named by claim directives.
///
/// Alongside the flat set it keeps, per node kind, the states whose own rules the contract
/// of that kind must check. Every fulfilled state lands in the list of its own kind, whatever
/// directive claimed it. Whether that contract runs at all is decided by
/// [`VerificationContext::kind_participates`](crate::verify::VerificationContext::kind_participates).
#[derive(Debug, Clone, Default)]
pub struct FulfilledSet {
    all: BTreeSet<StateRef>,
    by_kind: BTreeMap<NodeKind, Vec<StateAndRef>>,
}

impl FulfilledSet {
    pub fn compute(update: &ResolvedUpdate) -> Result<Self, InputError> {
        let mut set = FulfilledSet::default();

        for input in &update.inputs {
            set.insert_checked(input);
        }

        for claim in &update.update.claims {
            for &index in &claim.indices {
                let reference = update.references.get(index as usize).ok_or(
                    InputError::ClaimIndexOutOfBounds {
                        index,
                        len: update.references.len(),
                    },
                )?;
                if !reference.state.fulfillable_by_reference {
                    trace!(
                        "Ignoring claim on {} which cannot be fulfilled by reference",
                        reference.state_ref
                    );
                    continue;
                }
                set.insert_checked(reference);
            }
        }

        trace!("Fulfilled set of {} has {} states", update.id, set.all.len());
        Ok(set)
    }

    fn insert_checked(&mut self, state: &StateAndRef) {
        self.all.insert(state.state_ref);
        let checked = self.by_kind.entry(state.kind()).or_default();
        if !checked.iter().any(|s| s.state_ref == state.state_ref) {
            checked.push(state.clone());
        }
    }

    pub fn contains(&self, state_ref: &StateRef) -> bool {
        self.all.contains(state_ref)
    }

    /// Fulfilled states of `kind` whose rules the contract for `kind` has to check.
    pub fn of_kind(&self, kind: &NodeKind) -> &[StateAndRef] {
        self.by_kind.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn kinds(&self) -> impl Iterator<Item = &NodeKind> {
        self.by_kind.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateRef> {
        self.all.iter()
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

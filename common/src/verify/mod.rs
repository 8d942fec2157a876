pub mod composite;
pub mod detached;
pub mod differentiated;
pub mod double_spend;
pub mod extension;
pub mod key_control;
pub mod multipath;
pub mod new_output;
pub mod payment;
pub mod record;
pub mod time;

use crate::error::VerificationError;
use crate::fulfilled::FulfilledSet;
use crate::locator::{Locator, StateRef};
use crate::node::NodeKind;
use crate::state::{State, StateAndRef};
use crate::update::ResolvedUpdate;
use composition_scaffold::Contract;
use std::collections::HashSet;
use tracing::{debug, warn};

pub use extension::NodeVerifier;

/// Contract object as stored by the engine.
pub type NodeContract = dyn Contract<Tag = NodeKind, Context = VerificationContext, Error = VerificationError>
    + Send
    + Sync;

/// Read-only view of one update shared by every contract run against it.
#[derive(Debug, Clone)]
pub struct VerificationContext {
    update: ResolvedUpdate,
    fulfilled: FulfilledSet,
}

impl VerificationContext {
    pub fn new(update: ResolvedUpdate) -> Result<Self, VerificationError> {
        let fulfilled = FulfilledSet::compute(&update)?;
        Ok(Self { update, fulfilled })
    }

    pub fn update(&self) -> &ResolvedUpdate {
        &self.update
    }

    pub fn fulfilled(&self) -> &FulfilledSet {
        &self.fulfilled
    }

    pub fn into_update(self) -> ResolvedUpdate {
        self.update
    }

    /// Whether a contract for `kind` has anything to look at: a state of that kind is consumed
    /// or created, or some directive claims fulfillment on behalf of that kind.
    pub fn kind_participates(&self, kind: &NodeKind) -> bool {
        self.update.inputs.iter().any(|input| &input.kind() == kind)
            || self.update.update.outputs.iter().any(|output| &output.kind() == kind)
            || self.update.update.has_claim_of(kind)
    }

    /// Outputs of `kind` paired with the StateRefs they get from this update.
    pub fn outputs_of_kind(&self, kind: &NodeKind) -> Vec<(StateRef, &State)> {
        self.update
            .update
            .outputs
            .iter()
            .enumerate()
            .filter(|(_, output)| &output.kind() == kind)
            .map(|(index, output)| (StateRef::new(self.update.id, index as u32), output))
            .collect()
    }

    /// Fails unless `locator`, read relative to `node`, is in the fulfilled set.
    pub fn require_fulfilled(
        &self,
        node: &StateAndRef,
        locator: &Locator,
    ) -> Result<(), VerificationError> {
        let target = locator.resolve(&node.state_ref)?;
        if self.fulfilled.contains(&target) {
            Ok(())
        } else {
            Err(VerificationError::NodeRejected {
                kind: node.kind(),
                node: node.state_ref,
                reason: format!("required state {} is not fulfilled", target),
            })
        }
    }
}

pub(crate) fn reject(node: &StateAndRef, reason: impl Into<String>) -> VerificationError {
    VerificationError::NodeRejected {
        kind: node.kind(),
        node: node.state_ref,
        reason: reason.into(),
    }
}

/// Runs every registered contract against an update. A single failing contract rejects the
/// whole update.
pub struct VerificationEngine {
    contracts: Vec<Box<NodeContract>>,
}

impl Default for VerificationEngine {
    fn default() -> Self {
        Self::standard()
    }
}

impl VerificationEngine {
    /// Engine with the contracts for every standard node kind.
    pub fn standard() -> Self {
        Self {
            contracts: vec![
                Box::new(composite::CompositeContract),
                Box::new(multipath::MultipathContract),
                Box::new(detached::DetachedContract),
                Box::new(double_spend::DoubleSpendPreventionContract),
                Box::new(key_control::KeyControlContract),
                Box::new(time::TimeConstrainedContract),
                Box::new(new_output::FulfilledByNewOutputContract),
                Box::new(record::FulfillmentRecordContract),
                Box::new(differentiated::DifferentiatedContract),
                Box::new(payment::PaymentClaimContract),
            ],
        }
    }

    /// Adds a verifier for a custom node kind.
    pub fn register(&mut self, kind: impl Into<String>, verifier: impl NodeVerifier + 'static) {
        self.contracts
            .push(Box::new(extension::ExtensionContract::new(kind, verifier)));
    }

    pub fn verify(&self, context: &VerificationContext) -> Result<(), VerificationError> {
        self.check_custom_kinds_known(context)?;
        for contract in &self.contracts {
            let tag = contract.tag();
            debug!("Running {} contract on update {}", tag, context.update.id);
            if let Err(e) = contract.check(context) {
                warn!("Update {} rejected: {}", context.update.id, e);
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn verify_update(&self, update: &ResolvedUpdate) -> Result<(), VerificationError> {
        self.verify(&VerificationContext::new(update.clone())?)
    }

    /// A fulfilled custom node with no verifier would otherwise pass without any rules run.
    fn check_custom_kinds_known(&self, context: &VerificationContext) -> Result<(), VerificationError> {
        let known: HashSet<NodeKind> = self.contracts.iter().map(|c| c.tag()).collect();
        for kind in context.fulfilled.kinds() {
            if let NodeKind::Custom(name) = kind {
                if !known.contains(kind) {
                    return Err(VerificationError::UnknownKind(name.clone()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_utils;

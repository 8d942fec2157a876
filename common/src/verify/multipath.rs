use crate::error::VerificationError;
use crate::locator::StateRef;
use crate::node::{FulfillmentNode, NodeKind};
use crate::verify::{reject, VerificationContext};
use composition_scaffold::Contract;
use std::collections::BTreeMap;

/// OR: a multipath is fulfilled by the one option its multipath directive says was taken.
/// The contract never searches the options itself, so fulfilling some other option gains
/// nothing.
pub struct MultipathContract;

impl MultipathContract {
    fn chosen_paths(
        context: &VerificationContext,
    ) -> Result<BTreeMap<StateRef, u32>, VerificationError> {
        let mut merged = BTreeMap::new();
        for claim in context.update().update.claims_of(&NodeKind::Multipath) {
            for (node, &option) in &claim.chosen_paths {
                if let Some(previous) = merged.insert(*node, option) {
                    if previous != option {
                        return Err(VerificationError::UpdateRejected {
                            kind: NodeKind::Multipath,
                            reason: format!(
                                "conflicting paths {} and {} declared for {}",
                                previous, option, node
                            ),
                        });
                    }
                }
            }
        }
        Ok(merged)
    }
}

impl Contract for MultipathContract {
    type Tag = NodeKind;
    type Context = VerificationContext;
    type Error = VerificationError;

    fn tag(&self) -> NodeKind {
        NodeKind::Multipath
    }

    fn participates(&self, context: &VerificationContext) -> bool {
        context.kind_participates(&NodeKind::Multipath)
    }

    fn verify(&self, context: &VerificationContext) -> Result<(), VerificationError> {
        let chosen_paths = Self::chosen_paths(context)?;
        for node in context.fulfilled().of_kind(&NodeKind::Multipath) {
            if let FulfillmentNode::Multipath { options } = &node.state.node {
                let taken = chosen_paths
                    .get(&node.state_ref)
                    .ok_or_else(|| reject(node, "no path declared"))?;
                let option = options.get(*taken as usize).ok_or_else(|| {
                    reject(
                        node,
                        format!("declared path {} but only {} options exist", taken, options.len()),
                    )
                })?;
                context.require_fulfilled(node, option)?;
            }
        }
        Ok(())
    }
}

use crate::error::VerificationError;
use crate::locator::StateRef;
use crate::node::{FulfillmentNode, NodeKind};
use crate::record::attested;
use crate::verify::{reject, VerificationContext};
use composition_scaffold::Contract;
use std::collections::HashSet;

/// A detached node is fulfilled by proof that its target was fulfilled in an earlier update:
/// a fulfillment record, present among the update's references, that attests the target.
pub struct DetachedContract;

impl Contract for DetachedContract {
    type Tag = NodeKind;
    type Context = VerificationContext;
    type Error = VerificationError;

    fn tag(&self) -> NodeKind {
        NodeKind::Detached
    }

    fn participates(&self, context: &VerificationContext) -> bool {
        context.kind_participates(&NodeKind::Detached)
    }

    fn verify(&self, context: &VerificationContext) -> Result<(), VerificationError> {
        let previously_fulfilled: HashSet<StateRef> = context
            .update()
            .references
            .iter()
            .filter_map(|reference| attested(&reference.state))
            .flatten()
            .copied()
            .collect();

        for node in context.fulfilled().of_kind(&NodeKind::Detached) {
            if let FulfillmentNode::Detached { proof_target } = &node.state.node {
                let target = proof_target.resolve(&node.state_ref)?;
                if !previously_fulfilled.contains(&target) {
                    return Err(reject(
                        node,
                        format!("no referenced fulfillment record attests {}", target),
                    ));
                }
            }
        }
        Ok(())
    }
}

use crate::error::VerificationError;
use crate::node::{FulfillmentNode, NodeKind};
use crate::verify::VerificationContext;
use composition_scaffold::Contract;

/// A differentiated state carries arbitrary data and defers to exactly one other contract,
/// which must be fulfilled alongside it.
pub struct DifferentiatedContract;

impl Contract for DifferentiatedContract {
    type Tag = NodeKind;
    type Context = VerificationContext;
    type Error = VerificationError;

    fn tag(&self) -> NodeKind {
        NodeKind::Differentiated
    }

    fn participates(&self, context: &VerificationContext) -> bool {
        context.kind_participates(&NodeKind::Differentiated)
    }

    fn verify(&self, context: &VerificationContext) -> Result<(), VerificationError> {
        for node in context.fulfilled().of_kind(&NodeKind::Differentiated) {
            if let FulfillmentNode::Differentiated { contract, .. } = &node.state.node {
                context.require_fulfilled(node, contract)?;
            }
        }
        Ok(())
    }
}

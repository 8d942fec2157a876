use crate::error::VerificationError;
use crate::node::{FulfillmentNode, NodeKind};
use crate::verify::VerificationContext;
use composition_scaffold::Contract;

/// AND: a composite is fulfilled only if every state it requires is fulfilled in the same
/// update, whether consumed or claimed as a reference.
pub struct CompositeContract;

impl Contract for CompositeContract {
    type Tag = NodeKind;
    type Context = VerificationContext;
    type Error = VerificationError;

    fn tag(&self) -> NodeKind {
        NodeKind::Composite
    }

    fn participates(&self, context: &VerificationContext) -> bool {
        context.kind_participates(&NodeKind::Composite)
    }

    fn verify(&self, context: &VerificationContext) -> Result<(), VerificationError> {
        for node in context.fulfilled().of_kind(&NodeKind::Composite) {
            if let FulfillmentNode::Composite { required } = &node.state.node {
                for locator in required {
                    context.require_fulfilled(node, locator)?;
                }
            }
        }
        Ok(())
    }
}

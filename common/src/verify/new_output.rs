use crate::error::VerificationError;
use crate::node::{FulfillmentNode, NodeKind};
use crate::verify::{reject, VerificationContext};
use composition_scaffold::Contract;

pub struct FulfilledByNewOutputContract;

impl Contract for FulfilledByNewOutputContract {
    type Tag = NodeKind;
    type Context = VerificationContext;
    type Error = VerificationError;

    fn tag(&self) -> NodeKind {
        NodeKind::FulfilledByNewOutput
    }

    fn participates(&self, context: &VerificationContext) -> bool {
        context.kind_participates(&NodeKind::FulfilledByNewOutput)
    }

    fn verify(&self, context: &VerificationContext) -> Result<(), VerificationError> {
        let outputs = &context.update().update.outputs;
        for node in context.fulfilled().of_kind(&NodeKind::FulfilledByNewOutput) {
            if let FulfillmentNode::FulfilledByNewOutput { required_shape } = &node.state.node {
                if !outputs.iter().any(|output| required_shape.matches(output)) {
                    return Err(reject(
                        node,
                        format!("no new {} output matches the required shape", required_shape.kind),
                    ));
                }
            }
        }
        Ok(())
    }
}

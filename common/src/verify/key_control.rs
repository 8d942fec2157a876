use crate::error::VerificationError;
use crate::node::{FulfillmentNode, NodeKind};
use crate::util::truncated_base32;
use crate::verify::{reject, VerificationContext};
use composition_scaffold::Contract;

/// Proof of control over a key: the owner key must be one of the update's signers. Checking
/// the signatures themselves is the substrate's job.
pub struct KeyControlContract;

impl Contract for KeyControlContract {
    type Tag = NodeKind;
    type Context = VerificationContext;
    type Error = VerificationError;

    fn tag(&self) -> NodeKind {
        NodeKind::KeyControl
    }

    fn participates(&self, context: &VerificationContext) -> bool {
        context.kind_participates(&NodeKind::KeyControl)
    }

    fn verify(&self, context: &VerificationContext) -> Result<(), VerificationError> {
        let signers = &context.update().update.signers;
        for node in context.fulfilled().of_kind(&NodeKind::KeyControl) {
            if let FulfillmentNode::KeyControl { owner_key } = &node.state.node {
                if !signers.contains(owner_key) {
                    return Err(reject(
                        node,
                        format!("{} did not sign", truncated_base32(owner_key.as_bytes())),
                    ));
                }
            }
        }
        Ok(())
    }
}

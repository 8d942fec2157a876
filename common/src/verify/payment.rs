use crate::error::VerificationError;
use crate::node::{FulfillmentNode, NodeKind};
use crate::util::truncated_base32;
use crate::verify::VerificationContext;
use composition_scaffold::Contract;

/// A payment claim records a debt of its payor, so the payor must sign the update that
/// creates it.
pub struct PaymentClaimContract;

impl Contract for PaymentClaimContract {
    type Tag = NodeKind;
    type Context = VerificationContext;
    type Error = VerificationError;

    fn tag(&self) -> NodeKind {
        NodeKind::PaymentClaim
    }

    fn participates(&self, context: &VerificationContext) -> bool {
        context.kind_participates(&NodeKind::PaymentClaim)
    }

    fn verify(&self, context: &VerificationContext) -> Result<(), VerificationError> {
        let signers = &context.update().update.signers;
        for (claim_ref, claim) in context.outputs_of_kind(&NodeKind::PaymentClaim) {
            if let FulfillmentNode::PaymentClaim { payor, .. } = &claim.node {
                if !signers.contains(payor) {
                    return Err(VerificationError::NodeRejected {
                        kind: NodeKind::PaymentClaim,
                        node: claim_ref,
                        reason: format!(
                            "payor {} did not sign",
                            truncated_base32(payor.as_bytes())
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

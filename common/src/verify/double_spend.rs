use crate::error::VerificationError;
use crate::node::{FulfillmentNode, NodeKind};
use crate::verify::{reject, VerificationContext};
use composition_scaffold::Contract;

/// Forces one-time use: every target of a fulfilled double-spend-prevention node must be
/// consumed by the update. Referencing a target, claimed or not, is never enough.
pub struct DoubleSpendPreventionContract;

impl Contract for DoubleSpendPreventionContract {
    type Tag = NodeKind;
    type Context = VerificationContext;
    type Error = VerificationError;

    fn tag(&self) -> NodeKind {
        NodeKind::DoubleSpendPrevention
    }

    fn participates(&self, context: &VerificationContext) -> bool {
        context.kind_participates(&NodeKind::DoubleSpendPrevention)
    }

    fn verify(&self, context: &VerificationContext) -> Result<(), VerificationError> {
        for node in context.fulfilled().of_kind(&NodeKind::DoubleSpendPrevention) {
            if let FulfillmentNode::DoubleSpendPrevention { targets } = &node.state.node {
                for locator in targets {
                    let target = locator.resolve(&node.state_ref)?;
                    if !context.update().is_consumed(&target) {
                        return Err(reject(node, format!("target {} is not consumed", target)));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Locator;
    use crate::update::{ClaimDirective, LedgerUpdate};
    use crate::verify::test_utils::Issued;

    fn issued() -> Issued {
        Issued::new(vec![
            FulfillmentNode::DoubleSpendPrevention {
                targets: vec![Locator::local(1)],
            },
            FulfillmentNode::Composite { required: vec![] },
        ])
    }

    #[test]
    fn test_consumed_target_accepted() {
        let issued = issued();
        let update = LedgerUpdate {
            inputs: vec![issued.at(1)],
            references: vec![issued.at(0)],
            claims: vec![ClaimDirective::new(NodeKind::DoubleSpendPrevention, vec![0])],
            ..Default::default()
        };
        assert!(issued.verify(update).is_ok());
    }

    #[test]
    fn test_referenced_target_rejected() {
        let issued = issued();
        let update = LedgerUpdate {
            references: vec![issued.at(0), issued.at(1)],
            claims: vec![
                ClaimDirective::new(NodeKind::DoubleSpendPrevention, vec![0]),
                ClaimDirective::new(NodeKind::Composite, vec![1]),
            ],
            ..Default::default()
        };
        assert!(matches!(
            issued.verify(update),
            Err(VerificationError::NodeRejected {
                kind: NodeKind::DoubleSpendPrevention,
                ..
            })
        ));
    }
}

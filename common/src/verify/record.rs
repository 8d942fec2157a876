use crate::error::VerificationError;
use crate::node::NodeKind;
use crate::record::attested;
use crate::verify::VerificationContext;
use composition_scaffold::Contract;

/// Fulfillment records are create-only receipts. A record may only be created if every
/// state it attests is in the fulfilled set of the update creating it, which is what makes
/// it usable as proof later on.
pub struct FulfillmentRecordContract;

impl Contract for FulfillmentRecordContract {
    type Tag = NodeKind;
    type Context = VerificationContext;
    type Error = VerificationError;

    fn tag(&self) -> NodeKind {
        NodeKind::FulfillmentRecord
    }

    fn participates(&self, context: &VerificationContext) -> bool {
        context.kind_participates(&NodeKind::FulfillmentRecord)
    }

    fn verify(&self, context: &VerificationContext) -> Result<(), VerificationError> {
        if let Some(consumed) = context
            .update()
            .inputs
            .iter()
            .find(|input| input.kind() == NodeKind::FulfillmentRecord)
        {
            return Err(VerificationError::UpdateRejected {
                kind: NodeKind::FulfillmentRecord,
                reason: format!("record {} cannot be consumed", consumed.state_ref),
            });
        }

        for (record_ref, record) in context.outputs_of_kind(&NodeKind::FulfillmentRecord) {
            let attested = attested(record).unwrap_or_default();
            if let Some(missing) = attested.iter().find(|id| !context.fulfilled().contains(id)) {
                return Err(VerificationError::NodeRejected {
                    kind: NodeKind::FulfillmentRecord,
                    node: record_ref,
                    reason: format!("attests {} which is not fulfilled", missing),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::FulfillmentNode;
    use crate::state::State;
    use crate::update::{ClaimDirective, LedgerUpdate};
    use crate::verify::test_utils::Issued;

    fn issued() -> Issued {
        Issued::from_states(vec![
            State::new(FulfillmentNode::Composite { required: vec![] }, vec![]),
            State::new(FulfillmentNode::Composite { required: vec![] }, vec![]),
        ])
    }

    #[test]
    fn test_record_of_fulfilled_state() {
        let issued = issued();
        let update = LedgerUpdate {
            references: vec![issued.at(0)],
            outputs: vec![State::record(vec![issued.at(0)], vec![])],
            claims: vec![ClaimDirective::new(NodeKind::Composite, vec![0])],
            ..Default::default()
        };
        assert!(issued.verify(update).is_ok());
    }

    #[test]
    fn test_forged_record_rejected() {
        let issued = issued();
        // at(1) is referenced but never claimed
        let update = LedgerUpdate {
            references: vec![issued.at(0), issued.at(1)],
            outputs: vec![State::record(vec![issued.at(0), issued.at(1)], vec![])],
            claims: vec![ClaimDirective::new(NodeKind::Composite, vec![0])],
            ..Default::default()
        };
        assert!(matches!(
            issued.verify(update),
            Err(VerificationError::NodeRejected {
                kind: NodeKind::FulfillmentRecord,
                ..
            })
        ));
    }

    #[test]
    fn test_records_cannot_be_consumed() {
        let records = Issued::from_states(vec![State::record(vec![], vec![])]);
        let update = LedgerUpdate {
            inputs: vec![records.at(0)],
            ..Default::default()
        };
        assert!(matches!(
            records.verify(update),
            Err(VerificationError::UpdateRejected { .. })
        ));
    }
}

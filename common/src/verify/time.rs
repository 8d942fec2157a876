use crate::error::VerificationError;
use crate::node::{FulfillmentNode, NodeKind, TimeDirection};
use crate::verify::{reject, VerificationContext};
use composition_scaffold::Contract;

pub struct TimeConstrainedContract;

impl Contract for TimeConstrainedContract {
    type Tag = NodeKind;
    type Context = VerificationContext;
    type Error = VerificationError;

    fn tag(&self) -> NodeKind {
        NodeKind::TimeConstrained
    }

    fn participates(&self, context: &VerificationContext) -> bool {
        context.kind_participates(&NodeKind::TimeConstrained)
    }

    fn verify(&self, context: &VerificationContext) -> Result<(), VerificationError> {
        let window = context.update().update.time_window;
        for node in context.fulfilled().of_kind(&NodeKind::TimeConstrained) {
            if let FulfillmentNode::TimeConstrained { bound, direction } = &node.state.node {
                let window = window.ok_or_else(|| reject(node, "update declares no time window"))?;
                let holds = match direction {
                    TimeDirection::Before => window.is_entirely_before(*bound),
                    TimeDirection::After => window.is_entirely_after(*bound),
                };
                if !holds {
                    return Err(reject(
                        node,
                        format!("time window is not entirely {:?} {}", direction, bound),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::update::{ClaimDirective, LedgerUpdate, TimeWindow};
    use crate::verify::test_utils::Issued;
    use chrono::{Duration, Utc};

    fn claim_with_window(issued: &Issued, time_window: Option<TimeWindow>) -> LedgerUpdate {
        LedgerUpdate {
            references: vec![issued.at(0)],
            claims: vec![ClaimDirective::new(NodeKind::TimeConstrained, vec![0])],
            time_window,
            ..Default::default()
        }
    }

    #[test]
    fn test_after() {
        let bound = Utc::now();
        let issued = Issued::new(vec![FulfillmentNode::TimeConstrained {
            bound,
            direction: TimeDirection::After,
        }]);

        let later = TimeWindow::between(bound + Duration::seconds(1), bound + Duration::hours(1));
        let straddling = TimeWindow::between(bound - Duration::seconds(1), bound + Duration::hours(1));
        assert!(issued.verify(claim_with_window(&issued, Some(later))).is_ok());
        assert!(issued.verify(claim_with_window(&issued, Some(straddling))).is_err());
        assert!(issued.verify(claim_with_window(&issued, None)).is_err());
    }

    #[test]
    fn test_before() {
        let bound = Utc::now();
        let issued = Issued::new(vec![FulfillmentNode::TimeConstrained {
            bound,
            direction: TimeDirection::Before,
        }]);

        let earlier = TimeWindow::between(bound - Duration::hours(1), bound);
        let open_ended = TimeWindow::starting(bound - Duration::hours(1));
        assert!(issued.verify(claim_with_window(&issued, Some(earlier))).is_ok());
        assert!(issued.verify(claim_with_window(&issued, Some(open_ended))).is_err());
    }
}

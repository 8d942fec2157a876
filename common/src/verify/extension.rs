use crate::error::VerificationError;
use crate::node::NodeKind;
use crate::state::StateAndRef;
use crate::verify::{reject, VerificationContext};
use composition_scaffold::Contract;

/// Rules for a custom node kind, registered with the verification engine.
pub trait NodeVerifier: Send + Sync {
    /// Checks one fulfilled node of the registered kind. The error is the rejection reason.
    fn verify_node(&self, node: &StateAndRef, context: &VerificationContext) -> Result<(), String>;
}

impl<F> NodeVerifier for F
where
    F: Fn(&StateAndRef, &VerificationContext) -> Result<(), String> + Send + Sync,
{
    fn verify_node(&self, node: &StateAndRef, context: &VerificationContext) -> Result<(), String> {
        self(node, context)
    }
}

pub(crate) struct ExtensionContract {
    kind: NodeKind,
    verifier: Box<dyn NodeVerifier>,
}

impl ExtensionContract {
    pub(crate) fn new(kind: impl Into<String>, verifier: impl NodeVerifier + 'static) -> Self {
        Self {
            kind: NodeKind::Custom(kind.into()),
            verifier: Box::new(verifier),
        }
    }
}

impl Contract for ExtensionContract {
    type Tag = NodeKind;
    type Context = VerificationContext;
    type Error = VerificationError;

    fn tag(&self) -> NodeKind {
        self.kind.clone()
    }

    fn participates(&self, context: &VerificationContext) -> bool {
        context.kind_participates(&self.kind)
    }

    fn verify(&self, context: &VerificationContext) -> Result<(), VerificationError> {
        for node in context.fulfilled().of_kind(&self.kind) {
            self.verifier
                .verify_node(node, context)
                .map_err(|reason| reject(node, reason))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::VerificationError;
    use crate::node::{FulfillmentNode, NodeKind};
    use crate::state::{State, StateAndRef};
    use crate::update::{ClaimDirective, LedgerUpdate};
    use crate::verify::test_utils::Issued;
    use crate::verify::{VerificationContext, VerificationEngine};

    fn escrow(payload: Vec<u8>) -> State {
        State::new(
            FulfillmentNode::Custom {
                kind: "escrow".to_string(),
                payload,
            },
            vec![],
        )
        .with_reference_fulfillment(true)
    }

    fn claim(issued: &Issued) -> LedgerUpdate {
        LedgerUpdate {
            references: vec![issued.at(0)],
            claims: vec![ClaimDirective::new(
                NodeKind::Custom("escrow".to_string()),
                vec![0],
            )],
            ..Default::default()
        }
    }

    fn engine() -> VerificationEngine {
        let mut engine = VerificationEngine::standard();
        engine.register(
            "escrow",
            |node: &StateAndRef, _context: &VerificationContext| match &node.state.node {
                FulfillmentNode::Custom { payload, .. } if !payload.is_empty() => Ok(()),
                _ => Err("escrow payload is empty".to_string()),
            },
        );
        engine
    }

    #[test]
    fn test_registered_verifier_runs() {
        let good = Issued::from_states(vec![escrow(vec![1])]);
        let context = VerificationContext::new(good.resolve(claim(&good))).unwrap();
        assert!(engine().verify(&context).is_ok());

        let bad = Issued::from_states(vec![escrow(vec![])]);
        let context = VerificationContext::new(bad.resolve(claim(&bad))).unwrap();
        assert!(matches!(
            engine().verify(&context),
            Err(VerificationError::NodeRejected { .. })
        ));
    }

    #[test]
    fn test_unregistered_custom_kind_rejected() {
        let issued = Issued::from_states(vec![escrow(vec![1])]);
        assert_eq!(
            issued.verify(claim(&issued)),
            Err(VerificationError::UnknownKind("escrow".to_string()))
        );
    }
}

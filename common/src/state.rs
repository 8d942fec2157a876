use crate::locator::StateRef;
use crate::node::{FulfillmentNode, NodeKind};
use composition_scaffold::CborCodec;
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

/*
States are immutable once an update creates them. They are either consumed later, or stay
available and may be referenced by any number of later updates.
*/
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct State {
    pub node: FulfillmentNode,

    /// Parties with a legitimate interest in hearing about this state's creation and consumption.
    pub participants: Vec<VerifyingKey>,

    /// Whether a claim directive may count this state as fulfilled while it is only
    /// referenced. States without the marker can satisfy requirements only by being consumed,
    /// since nothing would otherwise run their rules.
    pub fulfillable_by_reference: bool,
}

impl CborCodec for State {}

impl State {
    pub fn new(node: FulfillmentNode, participants: Vec<VerifyingKey>) -> Self {
        let fulfillable_by_reference = !matches!(
            node.kind(),
            NodeKind::Plain | NodeKind::PaymentClaim | NodeKind::Custom(_)
        );
        Self {
            node,
            participants,
            fulfillable_by_reference,
        }
    }

    pub fn with_reference_fulfillment(mut self, allowed: bool) -> Self {
        self.fulfillable_by_reference = allowed;
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.node.kind()
    }

    /// A fulfillment record attesting `attested`.
    pub fn record(attested: Vec<StateRef>, participants: Vec<VerifyingKey>) -> Self {
        Self::new(FulfillmentNode::FulfillmentRecord { attested }, participants)
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct StateAndRef {
    pub state_ref: StateRef,
    pub state: State,
}

impl StateAndRef {
    pub fn new(state_ref: StateRef, state: State) -> Self {
        Self { state_ref, state }
    }

    pub fn kind(&self) -> NodeKind {
        self.state.kind()
    }
}

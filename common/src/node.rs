use crate::locator::{Locator, StateRef};
use chrono::{DateTime, Utc};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The building blocks of composed authorization logic. Every node is the payload of a
/// ledger state and points at the states it depends on through [`Locator`]s.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub enum FulfillmentNode {
    /// AND: every required locator must be fulfilled in the same update.
    Composite { required: Vec<Locator> },

    /// OR: the option declared in the update's multipath claim must be fulfilled.
    Multipath { options: Vec<Locator> },

    /// Fulfilled by a fulfillment record, referenced in the update, attesting that the
    /// target was fulfilled in some earlier update.
    Detached { proof_target: Locator },

    /// Every target must be consumed by the update, not merely referenced.
    DoubleSpendPrevention { targets: Vec<Locator> },

    /// The owner key must be among the update's signers.
    KeyControl { owner_key: VerifyingKey },

    /// The update's declared time window must lie entirely on one side of `bound`.
    TimeConstrained {
        bound: DateTime<Utc>,
        direction: TimeDirection,
    },

    /// The update must create an output matching the shape.
    FulfilledByNewOutput { required_shape: Box<OutputShape> },

    /// Create-only receipt listing states that were fulfilled in the update creating it.
    FulfillmentRecord { attested: Vec<StateRef> },

    /// Arbitrary data whose use is governed by exactly one other contract.
    Differentiated { data: Vec<u8>, contract: Locator },

    /// Claim that `payor` owes `payee` an amount. Only the payor can create one.
    PaymentClaim {
        payor: VerifyingKey,
        payee: VerifyingKey,
        amount: u64,
        currency: String,
        memo: String,
    },

    /// A state with no fulfillment rules of its own.
    Plain { data: Vec<u8> },

    /// Node kinds outside the standard set. Verified by whatever verifier is registered
    /// for `kind`.
    Custom { kind: String, payload: Vec<u8> },
}

impl FulfillmentNode {
    pub fn kind(&self) -> NodeKind {
        match self {
            FulfillmentNode::Composite { .. } => NodeKind::Composite,
            FulfillmentNode::Multipath { .. } => NodeKind::Multipath,
            FulfillmentNode::Detached { .. } => NodeKind::Detached,
            FulfillmentNode::DoubleSpendPrevention { .. } => NodeKind::DoubleSpendPrevention,
            FulfillmentNode::KeyControl { .. } => NodeKind::KeyControl,
            FulfillmentNode::TimeConstrained { .. } => NodeKind::TimeConstrained,
            FulfillmentNode::FulfilledByNewOutput { .. } => NodeKind::FulfilledByNewOutput,
            FulfillmentNode::FulfillmentRecord { .. } => NodeKind::FulfillmentRecord,
            FulfillmentNode::Differentiated { .. } => NodeKind::Differentiated,
            FulfillmentNode::PaymentClaim { .. } => NodeKind::PaymentClaim,
            FulfillmentNode::Plain { .. } => NodeKind::Plain,
            FulfillmentNode::Custom { kind, .. } => NodeKind::Custom(kind.clone()),
        }
    }

    /// Every locator this node depends on, in declaration order.
    pub fn locators(&self) -> Vec<Locator> {
        match self {
            FulfillmentNode::Composite { required } => required.clone(),
            FulfillmentNode::Multipath { options } => options.clone(),
            FulfillmentNode::Detached { proof_target } => vec![*proof_target],
            FulfillmentNode::DoubleSpendPrevention { targets } => targets.clone(),
            FulfillmentNode::Differentiated { contract, .. } => vec![*contract],
            _ => Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimeDirection {
    Before,
    After,
}

/// Type tag of a node, used to route claim directives to the contract of that kind.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Debug)]
pub enum NodeKind {
    Composite,
    Multipath,
    Detached,
    DoubleSpendPrevention,
    KeyControl,
    TimeConstrained,
    FulfilledByNewOutput,
    FulfillmentRecord,
    Differentiated,
    PaymentClaim,
    Plain,
    Custom(String),
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Custom(kind) => write!(f, "Custom({})", kind),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Template a new output has to match to satisfy a `FulfilledByNewOutput` node.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct OutputShape {
    pub kind: NodeKind,
    /// When set, the output's node must equal this exactly.
    pub node: Option<FulfillmentNode>,
    /// Parties that must all be listed as participants of the output.
    pub participants: Vec<VerifyingKey>,
}

impl OutputShape {
    pub fn of_kind(kind: NodeKind) -> Self {
        Self {
            kind,
            node: None,
            participants: Vec::new(),
        }
    }

    pub fn exactly(node: FulfillmentNode) -> Self {
        Self {
            kind: node.kind(),
            node: Some(node),
            participants: Vec::new(),
        }
    }

    pub fn with_participants(mut self, participants: Vec<VerifyingKey>) -> Self {
        self.participants = participants;
        self
    }

    pub fn matches(&self, state: &crate::state::State) -> bool {
        if state.kind() != self.kind {
            return false;
        }
        if let Some(node) = &self.node {
            if &state.node != node {
                return false;
            }
        }
        self.participants
            .iter()
            .all(|party| state.participants.contains(party))
    }
}

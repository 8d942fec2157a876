//! Ready-made fulfillment graphs.

use crate::locator::Locator;
use crate::node::{FulfillmentNode, OutputShape, TimeDirection};
use crate::state::State;
use chrono::{DateTime, Utc};
use ed25519_dalek::VerifyingKey;

/// Index, within the template's outputs, of each node of an evolvable right.
pub mod evolvable {
    pub const MANAGER: u32 = 0;
    pub const FIRST_USE: u32 = 1;
    pub const LATER_USE: u32 = 2;
    pub const CONTROL: u32 = 3;
    pub const CONTROL_SPEND: u32 = 4;
    pub const PROOF: u32 = 5;
    pub const PROOF_SPEND: u32 = 6;
}

/*
An evolvable right can be exercised once through its original control, and after that once
more through proof that the right was exercised before:

    manager = Multipath(first use, later use)
    first use = Composite(control, DoubleSpendPrevention(control))
    later use = Composite(Detached(manager), DoubleSpendPrevention(that detached node))

The returned states are meant to be appended to an update that already has
`current_outputs` outputs; local locators are offset accordingly.
*/
pub fn evolvable_right(
    current_outputs: usize,
    control: State,
    participants: Vec<VerifyingKey>,
) -> Vec<State> {
    let base = current_outputs as u32;
    let at = |offset: u32| Locator::local(base + offset);
    let node = |node: FulfillmentNode| State::new(node, participants.clone());

    vec![
        node(FulfillmentNode::Multipath {
            options: vec![at(evolvable::FIRST_USE), at(evolvable::LATER_USE)],
        }),
        node(FulfillmentNode::Composite {
            required: vec![at(evolvable::CONTROL), at(evolvable::CONTROL_SPEND)],
        }),
        node(FulfillmentNode::Composite {
            required: vec![at(evolvable::PROOF), at(evolvable::PROOF_SPEND)],
        }),
        control,
        node(FulfillmentNode::DoubleSpendPrevention {
            targets: vec![at(evolvable::CONTROL)],
        }),
        node(FulfillmentNode::Detached {
            proof_target: at(evolvable::MANAGER),
        }),
        node(FulfillmentNode::DoubleSpendPrevention {
            targets: vec![at(evolvable::PROOF)],
        }),
    ]
}

/// Index, within the template's outputs, of each node of a funding response.
pub mod funding {
    pub const ACCEPTANCE_SIGNATURE: u32 = 0;
    pub const ACCEPTANCE_DEADLINE: u32 = 1;
    pub const OFFER_SPEND: u32 = 2;
    pub const OFFER: u32 = 3;
    pub const ACCEPTANCE: u32 = 4;
    pub const DEFAULT_SIGNATURE: u32 = 5;
    pub const TRADE_PAYMENT_DUE: u32 = 6;
    pub const ACCEPTANCE_PROOF: u32 = 7;
    pub const FUNDER_DEFAULT: u32 = 8;
    pub const CANCELLATION_SIGNATURE: u32 = 9;
    pub const CANCELLATION: u32 = 10;
    pub const TRADE_PAYMENT_PROOF: u32 = 11;
    pub const TRADE_PAYMENT_OUTPUT: u32 = 12;
    pub const TRADE_PAYMENT: u32 = 13;
    pub const FUNDER_COLLATERAL_PATHS: u32 = 14;
    pub const FUNDER_COLLATERAL_SPEND: u32 = 15;
    pub const FUNDER_COLLATERAL: u32 = 16;

    /// Nodes before the first repayment.
    pub const FIXED_LEN: u32 = 17;

    /// Offsets within the nodes of one repayment.
    pub mod repayment {
        pub const CLAIM_SIGNATURE: u32 = 0;
        pub const DUE: u32 = 1;
        pub const TRADE_PAYMENT_PROOF: u32 = 2;
        pub const SUPPLIER_DEFAULT: u32 = 3;
        pub const PAYMENT_OUTPUT: u32 = 4;
        pub const REPAYMENT: u32 = 5;
        pub const COLLATERAL_PATHS: u32 = 6;
        pub const COLLATERAL_SPEND: u32 = 7;
        pub const COLLATERAL: u32 = 8;

        pub const LEN: u32 = 9;
    }

    /// Index of the first node of repayment `n`.
    pub fn repayment_base(n: u32) -> u32 {
        FIXED_LEN + n * repayment::LEN
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Repayment {
    pub amount: u64,
    pub due: DateTime<Utc>,
}

/// Terms a funder offers a supplier for discounting a receivable.
#[derive(Debug, Clone, PartialEq)]
pub struct FundingTerms {
    pub supplier: VerifyingKey,
    pub funder: VerifyingKey,
    pub purchase_amount: u64,
    pub currency: String,
    /// The offer can only be accepted before this.
    pub expiration: DateTime<Utc>,
    /// The funder pays the supplier before this.
    pub trade_payment_due: DateTime<Utc>,
    pub repayments: Vec<Repayment>,
}

impl FundingTerms {
    fn participants(&self) -> Vec<VerifyingKey> {
        vec![self.supplier, self.funder]
    }

    /// The payment claim the funder creates to pay the supplier.
    pub fn trade_payment(&self) -> State {
        State::new(
            FulfillmentNode::PaymentClaim {
                payor: self.funder,
                payee: self.supplier,
                amount: self.purchase_amount,
                currency: self.currency.clone(),
                memo: "trade payment".to_string(),
            },
            self.participants(),
        )
    }

    /// The payment claim the supplier creates to settle repayment `n`, if there is one.
    pub fn repayment(&self, n: usize) -> Option<State> {
        let repayment = self.repayments.get(n)?;
        Some(State::new(
            FulfillmentNode::PaymentClaim {
                payor: self.supplier,
                payee: self.funder,
                amount: repayment.amount,
                currency: self.currency.clone(),
                memo: format!("repayment {}", n),
            },
            self.participants(),
        ))
    }
}

/*
A funder's response to a receivables discounting request. Before `expiration` the supplier
accepts by signing, or the funder cancels; either spends the offer. Once accepted:

    funder collateral = Multipath(
        supplier default: supplier signs after the trade payment is due, with proof of acceptance
        cancellation
        trade payment: proof of acceptance and a new payment claim from funder to supplier
    )

and for every repayment a supplier collateral:

    Multipath(
        funder default: funder signs after the repayment is due, with proof of the trade payment
        repayment: a new payment claim from supplier to funder
    )

Each collateral is a differentiated node whose contract spends its multipath, so it can only
be settled once. The acceptance and cancellation nodes reach themselves through the offer;
the resolver treats a multipath option it is already fulfilling as satisfied.
*/
pub fn funding_response(current_outputs: usize, terms: &FundingTerms) -> Vec<State> {
    use funding::*;

    let base = current_outputs as u32;
    let at = |offset: u32| Locator::local(base + offset);
    let participants = terms.participants();
    let node = |node: FulfillmentNode| State::new(node, participants.clone());
    let new_payment = |claim: State| {
        node(FulfillmentNode::FulfilledByNewOutput {
            required_shape: Box::new(
                OutputShape::exactly(claim.node).with_participants(participants.clone()),
            ),
        })
    };

    let mut states = vec![
        node(FulfillmentNode::KeyControl {
            owner_key: terms.supplier,
        }),
        node(FulfillmentNode::TimeConstrained {
            bound: terms.expiration,
            direction: TimeDirection::Before,
        }),
        node(FulfillmentNode::DoubleSpendPrevention {
            targets: vec![at(OFFER)],
        }),
        node(FulfillmentNode::Multipath {
            options: vec![at(ACCEPTANCE), at(CANCELLATION)],
        }),
        node(FulfillmentNode::Composite {
            required: vec![
                at(ACCEPTANCE_SIGNATURE),
                at(ACCEPTANCE_DEADLINE),
                at(OFFER_SPEND),
                at(OFFER),
            ],
        }),
        node(FulfillmentNode::KeyControl {
            owner_key: terms.supplier,
        }),
        node(FulfillmentNode::TimeConstrained {
            bound: terms.trade_payment_due,
            direction: TimeDirection::After,
        }),
        node(FulfillmentNode::Detached {
            proof_target: at(ACCEPTANCE),
        }),
        node(FulfillmentNode::Composite {
            required: vec![
                at(DEFAULT_SIGNATURE),
                at(TRADE_PAYMENT_DUE),
                at(ACCEPTANCE_PROOF),
            ],
        }),
        node(FulfillmentNode::KeyControl {
            owner_key: terms.funder,
        }),
        node(FulfillmentNode::Composite {
            required: vec![at(OFFER_SPEND), at(OFFER), at(CANCELLATION_SIGNATURE)],
        }),
        node(FulfillmentNode::Detached {
            proof_target: at(ACCEPTANCE),
        }),
        new_payment(terms.trade_payment()),
        node(FulfillmentNode::Composite {
            required: vec![at(TRADE_PAYMENT_PROOF), at(TRADE_PAYMENT_OUTPUT)],
        }),
        node(FulfillmentNode::Multipath {
            options: vec![at(FUNDER_DEFAULT), at(CANCELLATION), at(TRADE_PAYMENT)],
        }),
        node(FulfillmentNode::DoubleSpendPrevention {
            targets: vec![at(FUNDER_COLLATERAL_PATHS)],
        }),
        node(FulfillmentNode::Differentiated {
            data: b"funder did not make the agreed payment".to_vec(),
            contract: at(FUNDER_COLLATERAL_SPEND),
        }),
    ];

    for (n, scheduled) in terms.repayments.iter().enumerate() {
        let start = repayment_base(n as u32);
        let here = |offset: u32| at(start + offset);
        let Some(claim) = terms.repayment(n) else {
            continue;
        };
        states.extend([
            node(FulfillmentNode::KeyControl {
                owner_key: terms.funder,
            }),
            node(FulfillmentNode::TimeConstrained {
                bound: scheduled.due,
                direction: TimeDirection::After,
            }),
            node(FulfillmentNode::Detached {
                proof_target: at(TRADE_PAYMENT),
            }),
            node(FulfillmentNode::Composite {
                required: vec![
                    here(repayment::CLAIM_SIGNATURE),
                    here(repayment::DUE),
                    here(repayment::TRADE_PAYMENT_PROOF),
                ],
            }),
            new_payment(claim),
            node(FulfillmentNode::Composite {
                required: vec![here(repayment::PAYMENT_OUTPUT)],
            }),
            node(FulfillmentNode::Multipath {
                options: vec![here(repayment::SUPPLIER_DEFAULT), here(repayment::REPAYMENT)],
            }),
            node(FulfillmentNode::DoubleSpendPrevention {
                targets: vec![here(repayment::COLLATERAL_PATHS)],
            }),
            node(FulfillmentNode::Differentiated {
                data: format!("supplier did not make repayment {}", n).into_bytes(),
                contract: here(repayment::COLLATERAL_SPEND),
            }),
        ]);
    }
    states
}

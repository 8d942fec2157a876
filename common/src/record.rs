//! Fulfillment records: create-only receipts attesting what an update fulfilled.

use crate::locator::StateRef;
use crate::node::FulfillmentNode;
use crate::state::State;

/// The states a record attests, or `None` if `state` is not a fulfillment record.
pub fn attested(state: &State) -> Option<&[StateRef]> {
    match &state.node {
        FulfillmentNode::FulfillmentRecord { attested } => Some(attested),
        _ => None,
    }
}

/// Whether `state` is a record attesting `target`.
pub fn attests(state: &State, target: &StateRef) -> bool {
    attested(state).is_some_and(|attested| attested.contains(target))
}

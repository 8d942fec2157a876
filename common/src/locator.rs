use crate::error::LocatorError;
use crate::util::truncated_base32;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content hash of a committed ledger update.
#[derive(Eq, PartialEq, Hash, Serialize, Deserialize, Clone, Copy, Ord, PartialOrd)]
pub struct UpdateId(pub [u8; 32]);

impl fmt::Display for UpdateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", truncated_base32(self.0))
    }
}

impl fmt::Debug for UpdateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UpdateId({})", truncated_base32(self.0))
    }
}

/// Stable historical identifier of a state: the update that created it and its output position.
#[derive(Eq, PartialEq, Hash, Serialize, Deserialize, Clone, Copy, Ord, PartialOrd)]
pub struct StateRef {
    pub update: UpdateId,
    pub index: u32,
}

impl StateRef {
    pub fn new(update: UpdateId, index: u32) -> Self {
        Self { update, index }
    }
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.update, self.index)
    }
}

impl fmt::Debug for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateRef({}:{})", self.update, self.index)
    }
}

/*
A node can point at a state that already exists on the ledger, or at a sibling output created
in the same update as the node itself. The second form exists because a sibling's StateRef
cannot be known until the update holding both of them has been hashed.
*/
#[derive(Serialize, Deserialize, Eq, PartialEq, Hash, Clone, Copy, Debug)]
pub struct Locator {
    pub historical_ref: Option<StateRef>,
    pub local_index: Option<u32>,
}

impl Locator {
    pub fn historical(state_ref: StateRef) -> Self {
        Self {
            historical_ref: Some(state_ref),
            local_index: None,
        }
    }

    pub fn local(index: u32) -> Self {
        Self {
            historical_ref: None,
            local_index: Some(index),
        }
    }

    /// Resolves against the StateRef of the node that holds this locator. Local indices name
    /// outputs of the holder's own update.
    pub fn resolve(&self, holder: &StateRef) -> Result<StateRef, LocatorError> {
        match (self.historical_ref, self.local_index) {
            (Some(state_ref), None) => Ok(state_ref),
            (None, Some(index)) => Ok(StateRef::new(holder.update, index)),
            _ => Err(LocatorError::Malformed),
        }
    }

    /// Resolves a local index against an update that is still being assembled and has
    /// `outputs` outputs so far. Historical locators pass through unchanged.
    pub fn resolve_pending(&self, outputs: usize) -> Result<PendingTarget, LocatorError> {
        match (self.historical_ref, self.local_index) {
            (Some(state_ref), None) => Ok(PendingTarget::Committed(state_ref)),
            (None, Some(index)) if (index as usize) < outputs => Ok(PendingTarget::Output(index)),
            (None, Some(index)) => Err(LocatorError::LocalIndexOutOfRange { index, outputs }),
            _ => Err(LocatorError::Malformed),
        }
    }
}

/// Where a locator points while its update has no id yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingTarget {
    Committed(StateRef),
    Output(u32),
}

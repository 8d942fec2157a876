use crate::locator::{StateRef, UpdateId};
use crate::node::NodeKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocatorError {
    #[error("Malformed locator: exactly one of historical_ref and local_index must be set")]
    Malformed,

    #[error("Local index {index} is out of range for an update with {outputs} outputs")]
    LocalIndexOutOfRange { index: u32, outputs: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("State not found: {0}")]
    NotFound(StateRef),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("Claimed reference index {index} is out of bounds ({len} references)")]
    ClaimIndexOutOfBounds { index: u32, len: usize },
}

/// Failures while walking a fulfillment graph to build an update. None of these leave
/// anything behind: the accumulator of a failed run is simply dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("No {kind} choice supplied for node {node}")]
    UnresolvedChoice { kind: NodeKind, node: StateRef },

    #[error("Invalid {kind} choice for node {node}: {reason}")]
    InvalidChoice {
        kind: NodeKind,
        node: StateRef,
        reason: String,
    },

    #[error("Cycle detected: node {0} transitively requires itself")]
    CycleDetected(StateRef),

    #[error("Resolution exceeded the maximum depth of {0}")]
    DepthExceeded(usize),

    #[error("Time constraints leave an empty time window")]
    EmptyTimeWindow,

    #[error("Time window around the build time is out of range")]
    TimeOutOfRange,

    #[error("No reference at provisional index {0}")]
    UnknownReference(u32),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error("{kind} node {node} is not fulfilled: {reason}")]
    NodeRejected {
        kind: NodeKind,
        node: StateRef,
        reason: String,
    },

    #[error("{kind} contract rejected the update: {reason}")]
    UpdateRejected { kind: NodeKind, reason: String },

    #[error("No verifier registered for custom node kind {0}")]
    UnknownKind(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Rejected(#[from] VerificationError),

    #[error("State {0} has already been consumed")]
    DoubleSpend(StateRef),

    #[error("State {0} is listed more than once among consumed and referenced states")]
    DuplicateUse(StateRef),

    #[error("Missing or invalid signature: {0}")]
    Signature(String),

    #[error("Update {0} has already been committed")]
    AlreadyCommitted(UpdateId),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration value: {0}")]
    Invalid(String),
}

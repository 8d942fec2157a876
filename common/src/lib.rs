pub mod config;
pub mod error;
pub mod fulfilled;
pub mod ledger;
pub mod locator;
pub mod node;
pub mod record;
pub mod resolver;
pub mod state;
pub mod store;
pub mod templates;
pub mod update;
pub mod util;
pub mod verify;

pub use config::EngineConfig;
pub use fulfilled::FulfilledSet;
pub use ledger::InMemoryLedger;
pub use locator::{Locator, StateRef, UpdateId};
pub use node::{FulfillmentNode, NodeKind, OutputShape, TimeDirection};
pub use resolver::{Choices, DetachedProof, UpdateBuilder};
pub use state::{State, StateAndRef};
pub use store::StateStore;
pub use update::{ClaimDirective, LedgerUpdate, SignedUpdate, TimeWindow};
pub use verify::{VerificationContext, VerificationEngine};

#[cfg(test)]
mod proptest_tests;

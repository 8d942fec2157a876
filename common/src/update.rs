use crate::error::{LedgerError, LookupError};
use crate::locator::{StateRef, UpdateId};
use crate::node::NodeKind;
use crate::state::{State, StateAndRef};
use crate::store::StateStore;
use crate::util::{sign_struct, truncated_base32, verify_struct};
use chrono::{DateTime, Duration, Utc};
use composition_scaffold::CborCodec;
use ed25519_dalek::{Signature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A proposed change to the ledger, in the shape the substrate finalizes.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug, Default)]
pub struct LedgerUpdate {
    /// States consumed by this update.
    pub inputs: Vec<StateRef>,
    /// States read but not consumed. Only those named by a claim count as fulfilled.
    pub references: Vec<StateRef>,
    pub outputs: Vec<State>,
    pub claims: Vec<ClaimDirective>,
    pub time_window: Option<TimeWindow>,
    /// Keys that must sign the update.
    pub signers: Vec<VerifyingKey>,
}

impl CborCodec for LedgerUpdate {}

impl LedgerUpdate {
    pub fn id(&self) -> UpdateId {
        UpdateId(self.content_hash().expect("Serialization should not fail"))
    }

    pub fn output_ref(&self, index: u32) -> StateRef {
        StateRef::new(self.id(), index)
    }

    /// Outputs paired with the StateRefs they will have once committed.
    pub fn output_states(&self) -> Vec<StateAndRef> {
        let id = self.id();
        self.outputs
            .iter()
            .enumerate()
            .map(|(index, state)| StateAndRef::new(StateRef::new(id, index as u32), state.clone()))
            .collect()
    }

    pub fn claims_of<'a>(&'a self, kind: &'a NodeKind) -> impl Iterator<Item = &'a ClaimDirective> {
        self.claims.iter().filter(move |claim| &claim.kind == kind)
    }

    pub fn has_claim_of(&self, kind: &NodeKind) -> bool {
        self.claims_of(kind).next().is_some()
    }
}

/// The submitter's assertion that the referenced states at `indices` are being fulfilled,
/// addressed to the contract of `kind`.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct ClaimDirective {
    pub kind: NodeKind,
    pub indices: Vec<u32>,
    /// Option taken for each fulfilled multipath node. Only read from multipath directives.
    #[serde(default)]
    pub chosen_paths: BTreeMap<StateRef, u32>,
}

impl ClaimDirective {
    pub fn new(kind: NodeKind, indices: Vec<u32>) -> Self {
        Self {
            kind,
            indices,
            chosen_paths: BTreeMap::new(),
        }
    }

    pub fn with_paths(mut self, chosen_paths: BTreeMap<StateRef, u32>) -> Self {
        self.chosen_paths = chosen_paths;
        self
    }
}

/// Half-open interval `[from, until)` during which the update claims to happen.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct TimeWindow {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn between(from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            until: Some(until),
        }
    }

    pub fn starting(from: DateTime<Utc>) -> Self {
        Self {
            from: Some(from),
            until: None,
        }
    }

    pub fn ending(until: DateTime<Utc>) -> Self {
        Self {
            from: None,
            until: Some(until),
        }
    }

    /// `now ± tolerance`, or `None` if either end falls outside the representable range.
    pub fn around(now: DateTime<Utc>, tolerance: Duration) -> Option<Self> {
        Some(Self::between(
            now.checked_sub_signed(tolerance)?,
            now.checked_add_signed(tolerance)?,
        ))
    }

    pub fn is_entirely_after(&self, bound: DateTime<Utc>) -> bool {
        self.from.is_some_and(|from| from >= bound)
    }

    pub fn is_entirely_before(&self, bound: DateTime<Utc>) -> bool {
        self.until.is_some_and(|until| until <= bound)
    }

    pub fn is_empty(&self) -> bool {
        matches!((self.from, self.until), (Some(from), Some(until)) if from >= until)
    }
}

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct UpdateSignature {
    pub signer: VerifyingKey,
    pub signature: Signature,
}

/// An update together with signatures over its id.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct SignedUpdate {
    pub update: LedgerUpdate,
    pub signatures: Vec<UpdateSignature>,
}

impl CborCodec for SignedUpdate {}

impl SignedUpdate {
    pub fn sign(update: LedgerUpdate, signing_keys: &[&SigningKey]) -> Self {
        let id = update.id();
        let signatures = signing_keys
            .iter()
            .map(|key| UpdateSignature {
                signer: key.verifying_key(),
                signature: sign_struct(&id, key),
            })
            .collect();
        Self { update, signatures }
    }

    /// Every declared signer must have supplied a valid signature over the update id.
    pub fn verify_signatures(&self) -> Result<(), LedgerError> {
        let id = self.update.id();
        for signer in &self.update.signers {
            let entry = self
                .signatures
                .iter()
                .find(|entry| &entry.signer == signer)
                .ok_or_else(|| {
                    LedgerError::Signature(format!(
                        "no signature from {}",
                        truncated_base32(signer.as_bytes())
                    ))
                })?;
            verify_struct(&id, &entry.signature, signer).map_err(|e| {
                LedgerError::Signature(format!(
                    "bad signature from {}: {}",
                    truncated_base32(signer.as_bytes()),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

/// An update with its consumed and referenced states looked up, which is what contracts
/// are evaluated against.
#[derive(Clone, PartialEq, Debug)]
pub struct ResolvedUpdate {
    pub id: UpdateId,
    pub update: LedgerUpdate,
    pub inputs: Vec<StateAndRef>,
    pub references: Vec<StateAndRef>,
}

impl ResolvedUpdate {
    pub fn resolve(update: LedgerUpdate, store: &dyn StateStore) -> Result<Self, LookupError> {
        let inputs = update
            .inputs
            .iter()
            .map(|state_ref| store.resolve(state_ref))
            .collect::<Result<Vec<_>, _>>()?;
        let references = update
            .references
            .iter()
            .map(|state_ref| store.resolve(state_ref))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: update.id(),
            update,
            inputs,
            references,
        })
    }

    pub fn input_refs(&self) -> impl Iterator<Item = &StateRef> {
        self.inputs.iter().map(|input| &input.state_ref)
    }

    pub fn is_consumed(&self, state_ref: &StateRef) -> bool {
        self.input_refs().any(|input| input == state_ref)
    }
}

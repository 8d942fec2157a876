pub mod util;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Encoding shared by everything that is persisted on a ledger: states, updates and receipts.
pub trait CborCodec: Serialize + DeserializeOwned {
    /// Serialize to CBOR bytes using ciborium
    fn to_cbor(&self) -> Result<Vec<u8>, ciborium::ser::Error<std::io::Error>> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes)?;
        Ok(bytes)
    }

    /// Deserialize from CBOR bytes using ciborium
    fn from_cbor(bytes: &[u8]) -> Result<Self, ciborium::de::Error<std::io::Error>> {
        ciborium::de::from_reader(bytes)
    }

    /// blake3 digest of the CBOR encoding.
    fn content_hash(&self) -> Result<[u8; 32], ciborium::ser::Error<std::io::Error>> {
        Ok(util::digest(&self.to_cbor()?))
    }
}

/// A verification function the ledger substrate invokes for one kind of state.
///
/// The substrate hands every registered contract the same read-only context for an
/// update. A contract only has an opinion about updates in which its kind participates;
/// `participates` is that gate and `check` applies it before `verify`.
pub trait Contract {
    type Tag: Clone + Eq + Debug;
    type Context;
    type Error;

    /// The kind of state this contract answers for.
    fn tag(&self) -> Self::Tag;

    /// Whether anything of this contract's kind takes part in the update.
    fn participates(&self, context: &Self::Context) -> bool;

    fn verify(&self, context: &Self::Context) -> Result<(), Self::Error>;

    /// Runs `verify` only when the contract's kind participates. An update that makes no
    /// use of this kind passes vacuously.
    fn check(&self, context: &Self::Context) -> Result<(), Self::Error> {
        if !self.participates(context) {
            return Ok(());
        }
        self.verify(context)
    }
}

#[cfg(test)]
mod tests;

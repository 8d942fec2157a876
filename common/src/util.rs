use data_encoding::BASE32_NOPAD;
use ed25519_dalek::{Signature, SignatureError, Signer, SigningKey, Verifier, VerifyingKey};
use serde::Serialize;

pub fn truncated_base32<T: AsRef<[u8]>>(data: T) -> String {
    let encoded = BASE32_NOPAD.encode(data.as_ref());
    encoded.chars().take(10).collect()
}

pub fn sign_struct<T: Serialize>(message: &T, signing_key: &SigningKey) -> Signature {
    let mut data_to_sign = Vec::new();
    ciborium::ser::into_writer(message, &mut data_to_sign).expect("Serialization should not fail");
    signing_key.sign(&data_to_sign)
}

pub fn verify_struct<T: Serialize>(
    message: &T,
    signature: &Signature,
    verifying_key: &VerifyingKey,
) -> Result<(), SignatureError> {
    let mut data_to_verify = Vec::new();
    ciborium::ser::into_writer(message, &mut data_to_verify)
        .expect("Serialization should not fail");
    verifying_key.verify(&data_to_verify, signature)
}

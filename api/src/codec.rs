//! NaCl `box` payload codec used by the wallet deep-link protocol.
//!
//! Both directions share one precomputed key: X25519 agreement between the
//! peer's public key and our secret key, run through HSalsa20 (NaCl
//! `box.before`). Payloads are JSON sealed with XSalsa20-Poly1305 under a
//! fresh random 24-byte nonce. Ciphertext, nonce and keys travel as base58.

use crypto_box::aead::generic_array::GenericArray;
use crypto_box::aead::{Aead, AeadCore, OsRng};
use crypto_box::{PublicKey, SalsaBox, SecretKey};
use serde::Serialize;
use serde_json::Value;

use crate::error::CodecError;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 24;

/// A sealed payload as it appears in deep-link query strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedPayload {
    /// Base58 ciphertext (`payload` outbound, `data` inbound).
    pub data: String,
    /// Base58 24-byte nonce.
    pub nonce: String,
}

/// Precomputed shared key for one (peer public, own secret) pairing.
pub struct SharedSecret {
    salsa_box: SalsaBox,
}

impl SharedSecret {
    pub fn derive(peer_public_b58: &str, own_secret_b58: &str) -> Result<Self, CodecError> {
        let peer = PublicKey::from(decode_key("peer public key", peer_public_b58)?);
        let own = SecretKey::from(decode_key("secret key", own_secret_b58)?);
        Ok(Self {
            salsa_box: SalsaBox::new(&peer, &own),
        })
    }

    pub fn seal<T: Serialize + ?Sized>(&self, payload: &T) -> Result<EncryptedPayload, CodecError> {
        let plaintext = serde_json::to_vec(payload)
            .map_err(|e| CodecError::MalformedPayload(e.to_string()))?;
        let nonce = SalsaBox::generate_nonce(&mut OsRng);
        let ciphertext = self
            .salsa_box
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|_| CodecError::InvalidEncoding {
                field: "payload",
                reason: "payload cannot be sealed".to_string(),
            })?;
        Ok(EncryptedPayload {
            data: bs58::encode(ciphertext).into_string(),
            nonce: bs58::encode(nonce.as_slice()).into_string(),
        })
    }

    pub fn open(&self, data_b58: &str, nonce_b58: &str) -> Result<Value, CodecError> {
        let ciphertext = decode_b58("data", data_b58)?;
        let nonce_bytes = decode_b58("nonce", nonce_b58)?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(CodecError::InvalidEncoding {
                field: "nonce",
                reason: format!("expected {NONCE_LEN} bytes, got {}", nonce_bytes.len()),
            });
        }
        let plaintext = self
            .salsa_box
            .decrypt(GenericArray::from_slice(&nonce_bytes), ciphertext.as_slice())
            .map_err(|_| CodecError::Decryption)?;
        serde_json::from_slice(&plaintext).map_err(|e| CodecError::MalformedPayload(e.to_string()))
    }
}

/// Seals `payload` for the holder of `peer_public_b58`.
pub fn encrypt<T: Serialize + ?Sized>(
    payload: &T,
    peer_public_b58: &str,
    own_secret_b58: &str,
) -> Result<EncryptedPayload, CodecError> {
    SharedSecret::derive(peer_public_b58, own_secret_b58)?.seal(payload)
}

/// Opens a payload sealed by the holder of `peer_public_b58`.
pub fn decrypt(
    data_b58: &str,
    nonce_b58: &str,
    peer_public_b58: &str,
    own_secret_b58: &str,
) -> Result<Value, CodecError> {
    SharedSecret::derive(peer_public_b58, own_secret_b58)?.open(data_b58, nonce_b58)
}

pub(crate) fn decode_key(field: &'static str, b58: &str) -> Result<[u8; KEY_LEN], CodecError> {
    let bytes = decode_b58(field, b58)?;
    <[u8; KEY_LEN]>::try_from(bytes.as_slice()).map_err(|_| CodecError::InvalidEncoding {
        field,
        reason: format!("expected {KEY_LEN} bytes, got {}", bytes.len()),
    })
}

fn decode_b58(field: &'static str, b58: &str) -> Result<Vec<u8>, CodecError> {
    bs58::decode(b58)
        .into_vec()
        .map_err(|e| CodecError::InvalidEncoding {
            field,
            reason: e.to_string(),
        })
}

use crypto_box::{aead::OsRng, SecretKey};
use serde::{Deserialize, Serialize};

use crate::codec::decode_key;
use crate::consts::KEY_DAPP_KEY_PAIR;
use crate::error::StoreError;
use crate::store::{DurableStore, ResumptionStore};

/// The dapp's ephemeral X25519 key pair, both halves base58 encoded.
///
/// The wallet seals its connect response against the public half, so the
/// pair has to outlive the trip to the wallet app and the page reload that
/// follows.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DappKeyPair {
    pub public_key: String,
    pub secret_key: String,
}

impl DappKeyPair {
    pub fn generate() -> Self {
        let secret = SecretKey::generate(&mut OsRng);
        let public = secret.public_key();
        Self {
            public_key: bs58::encode(public.as_bytes()).into_string(),
            secret_key: bs58::encode(secret.to_bytes()).into_string(),
        }
    }

    fn validate(&self) -> Result<(), StoreError> {
        let corrupt = |e: crate::error::CodecError| StoreError::Corrupt {
            key: KEY_DAPP_KEY_PAIR,
            reason: e.to_string(),
        };
        let secret = decode_key("secretKey", &self.secret_key).map_err(corrupt)?;
        let public = decode_key("publicKey", &self.public_key).map_err(corrupt)?;
        if SecretKey::from(secret).public_key().as_bytes() != &public {
            return Err(StoreError::Corrupt {
                key: KEY_DAPP_KEY_PAIR,
                reason: "public key does not match secret key".to_string(),
            });
        }
        Ok(())
    }
}

// Keep the secret half out of logs.
impl std::fmt::Debug for DappKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DappKeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Returns the persisted key pair, or generates and persists a new one. A
/// stored pair that no longer decodes is replaced; only storage failures are
/// returned.
pub fn get_or_create_key_pair<S: DurableStore>(
    store: &ResumptionStore<S>,
) -> Result<DappKeyPair, StoreError> {
    let stored = store.dapp_key_pair().and_then(|stored| match stored {
        Some(key_pair) => key_pair.validate().map(|_| Some(key_pair)),
        None => Ok(None),
    });
    match stored {
        Ok(Some(key_pair)) => return Ok(key_pair),
        Ok(None) => {}
        Err(e @ (StoreError::Corrupt { .. } | StoreError::Serialization(_))) => {
            tracing::warn!("replacing unusable dapp key pair: {}", e);
        }
        Err(e) => return Err(e),
    }

    let key_pair = DappKeyPair::generate();
    store.set_dapp_key_pair(&key_pair)?;
    tracing::info!(public_key = %key_pair.public_key, "generated dapp key pair");
    Ok(key_pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn key_pair_is_stable_across_calls() {
        let store = ResumptionStore::new(MemoryStore::new());
        let first = get_or_create_key_pair(&store).unwrap();
        let second = get_or_create_key_pair(&store).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.raw().write_count(KEY_DAPP_KEY_PAIR), 1);
    }

    #[test]
    fn halves_are_32_byte_base58() {
        let key_pair = DappKeyPair::generate();
        assert_eq!(bs58::decode(&key_pair.public_key).into_vec().unwrap().len(), 32);
        assert_eq!(bs58::decode(&key_pair.secret_key).into_vec().unwrap().len(), 32);
    }

    #[test]
    fn mismatched_halves_are_replaced() {
        let store = ResumptionStore::new(MemoryStore::new());
        let mut stale = DappKeyPair::generate();
        stale.public_key = DappKeyPair::generate().public_key;
        store.set_dapp_key_pair(&stale).unwrap();

        let fresh = get_or_create_key_pair(&store).unwrap();
        assert_ne!(fresh, stale);
        assert!(fresh.validate().is_ok());
        assert_eq!(store.dapp_key_pair().unwrap(), Some(fresh.clone()));
        assert_eq!(get_or_create_key_pair(&store).unwrap(), fresh);
    }

    #[test]
    fn unparseable_pair_is_replaced() {
        let store = ResumptionStore::new(MemoryStore::new());
        store.raw().set(KEY_DAPP_KEY_PAIR, "not json").unwrap();

        let fresh = get_or_create_key_pair(&store).unwrap();
        assert_eq!(store.dapp_key_pair().unwrap(), Some(fresh));
        assert_eq!(store.raw().write_count(KEY_DAPP_KEY_PAIR), 2);
    }

    #[test]
    fn debug_hides_secret() {
        let key_pair = DappKeyPair::generate();
        let printed = format!("{key_pair:?}");
        assert!(!printed.contains(&key_pair.secret_key));
    }
}

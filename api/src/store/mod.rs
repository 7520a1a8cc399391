mod file;
mod memory;

pub use file::*;
pub use memory::*;

use std::sync::Arc;

use crate::consts::*;
use crate::error::StoreError;
use crate::keypair::DappKeyPair;
use crate::state::{ConnectSession, PendingFlow};

/// Origin-scoped key/value storage that survives a full navigation away from
/// the app and back. Only one page instance is alive at a time, so
/// implementations need no cross-process locking.
pub trait DurableStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Typed view over a [`DurableStore`]: everything the deep-link round trip
/// has to remember between leaving for the wallet and coming back.
pub struct ResumptionStore<S> {
    inner: Arc<S>,
}

impl<S> Clone for ResumptionStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: DurableStore> ResumptionStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// The underlying key/value store.
    pub fn raw(&self) -> &S {
        &self.inner
    }

    // Dapp key pair

    pub fn dapp_key_pair(&self) -> Result<Option<DappKeyPair>, StoreError> {
        match self.inner.get(KEY_DAPP_KEY_PAIR)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn set_dapp_key_pair(&self, key_pair: &DappKeyPair) -> Result<(), StoreError> {
        let json = serde_json::to_string(key_pair)?;
        self.inner.set(KEY_DAPP_KEY_PAIR, &json)
    }

    // Connect session

    /// The stored session, if all three of its parts are present.
    pub fn session(&self) -> Result<Option<ConnectSession>, StoreError> {
        let token = self.inner.get(KEY_SESSION)?;
        let wallet = self.inner.get(KEY_WALLET_PUBLIC_KEY)?;
        let peer = self.inner.get(KEY_PHANTOM_ENCRYPTION_PUBLIC_KEY)?;
        match (token, wallet, peer) {
            (Some(session_token), Some(wallet_public_key), Some(phantom_encryption_public_key)) => {
                Ok(Some(ConnectSession {
                    session_token,
                    wallet_public_key,
                    phantom_encryption_public_key,
                }))
            }
            _ => Ok(None),
        }
    }

    /// Replaces the stored session. The previous one is dropped first so a
    /// failed write never pairs new parts with a stale peer key.
    pub fn set_session(&self, session: &ConnectSession) -> Result<(), StoreError> {
        self.clear_session()?;
        self.inner.set(KEY_SESSION, &session.session_token)?;
        self.inner.set(KEY_WALLET_PUBLIC_KEY, &session.wallet_public_key)?;
        self.inner.set(
            KEY_PHANTOM_ENCRYPTION_PUBLIC_KEY,
            &session.phantom_encryption_public_key,
        )
    }

    pub fn clear_session(&self) -> Result<(), StoreError> {
        self.inner.remove(KEY_SESSION)?;
        self.inner.remove(KEY_WALLET_PUBLIC_KEY)?;
        self.inner.remove(KEY_PHANTOM_ENCRYPTION_PUBLIC_KEY)
    }

    // Pending redirect

    pub fn pending_redirect(&self) -> Result<Option<String>, StoreError> {
        self.inner.get(KEY_REDIRECT_PATH)
    }

    pub fn set_pending_redirect(&self, path: &str) -> Result<(), StoreError> {
        self.inner.set(KEY_REDIRECT_PATH, path)
    }

    pub fn clear_pending_redirect(&self) -> Result<(), StoreError> {
        self.inner.remove(KEY_REDIRECT_PATH)
    }

    // Replay guard

    pub fn replay_guard(&self) -> Result<Option<u64>, StoreError> {
        match self.inner.get(KEY_CALLBACK_GUARD)? {
            Some(raw) => raw
                .parse::<u64>()
                .map(Some)
                .map_err(|e| StoreError::Corrupt {
                    key: KEY_CALLBACK_GUARD,
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    pub fn set_replay_guard(&self, timestamp_millis: u64) -> Result<(), StoreError> {
        self.inner
            .set(KEY_CALLBACK_GUARD, &timestamp_millis.to_string())
    }

    pub fn clear_replay_guard(&self) -> Result<(), StoreError> {
        self.inner.remove(KEY_CALLBACK_GUARD)
    }

    // Last transaction

    pub fn last_transaction_id(&self) -> Result<Option<String>, StoreError> {
        self.inner.get(KEY_LAST_TRANSACTION_ID)
    }

    pub fn set_last_transaction_id(&self, signature: &str) -> Result<(), StoreError> {
        self.inner.set(KEY_LAST_TRANSACTION_ID, signature)
    }

    /// Reads and clears the last transaction id, so a page only unlocks once
    /// per confirmed payment.
    pub fn take_last_transaction_id(&self) -> Result<Option<String>, StoreError> {
        let signature = self.inner.get(KEY_LAST_TRANSACTION_ID)?;
        if signature.is_some() {
            self.inner.remove(KEY_LAST_TRANSACTION_ID)?;
        }
        Ok(signature)
    }

    // Pending flow flags

    pub fn pending_flow(&self) -> Result<PendingFlow, StoreError> {
        let game_mode = self.inner.get(KEY_PENDING_GAME_MODE)?;
        let bet_lamports = match self.inner.get(KEY_PENDING_BET_LAMPORTS)? {
            Some(raw) => Some(raw.parse::<u64>().map_err(|e| StoreError::Corrupt {
                key: KEY_PENDING_BET_LAMPORTS,
                reason: e.to_string(),
            })?),
            None => None,
        };
        Ok(PendingFlow {
            game_mode,
            bet_lamports,
        })
    }

    pub fn set_pending_flow(&self, flow: &PendingFlow) -> Result<(), StoreError> {
        match &flow.game_mode {
            Some(mode) => self.inner.set(KEY_PENDING_GAME_MODE, mode)?,
            None => self.inner.remove(KEY_PENDING_GAME_MODE)?,
        }
        match flow.bet_lamports {
            Some(lamports) => self
                .inner
                .set(KEY_PENDING_BET_LAMPORTS, &lamports.to_string()),
            None => self.inner.remove(KEY_PENDING_BET_LAMPORTS),
        }
    }

    pub fn take_pending_flow(&self) -> Result<PendingFlow, StoreError> {
        let flow = self.pending_flow()?;
        self.inner.remove(KEY_PENDING_GAME_MODE)?;
        self.inner.remove(KEY_PENDING_BET_LAMPORTS)?;
        Ok(flow)
    }

    /// Forgets everything, including the dapp key pair.
    pub fn wipe(&self) -> Result<(), StoreError> {
        for key in ALL_KEYS {
            self.inner.remove(key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ConnectSession {
        ConnectSession {
            session_token: "token".into(),
            wallet_public_key: "wallet".into(),
            phantom_encryption_public_key: "peer".into(),
        }
    }

    #[test]
    fn session_requires_all_parts() {
        let store = ResumptionStore::new(MemoryStore::new());
        store.set_session(&session()).unwrap();
        assert_eq!(store.session().unwrap(), Some(session()));

        store.raw().remove(KEY_WALLET_PUBLIC_KEY).unwrap();
        assert_eq!(store.session().unwrap(), None);
    }

    /// Fails every write to one key.
    struct FailingKey {
        inner: MemoryStore,
        key: &'static str,
    }

    impl DurableStore for FailingKey {
        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            if key == self.key {
                return Err(std::io::Error::other("disk full").into());
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn failed_reconnect_leaves_no_mixed_session() {
        let memory = MemoryStore::new();
        memory.set(KEY_SESSION, "old-token").unwrap();
        memory.set(KEY_WALLET_PUBLIC_KEY, "old-wallet").unwrap();
        memory.set(KEY_PHANTOM_ENCRYPTION_PUBLIC_KEY, "old-peer").unwrap();
        let store = ResumptionStore::new(FailingKey {
            inner: memory,
            key: KEY_PHANTOM_ENCRYPTION_PUBLIC_KEY,
        });

        assert!(store.set_session(&session()).is_err());
        assert_eq!(store.session().unwrap(), None);
    }

    #[test]
    fn clear_session_removes_every_part() {
        let store = ResumptionStore::new(MemoryStore::new());
        store.set_session(&session()).unwrap();
        store.clear_session().unwrap();
        assert!(store.raw().get(KEY_SESSION).unwrap().is_none());
        assert!(store.raw().get(KEY_PHANTOM_ENCRYPTION_PUBLIC_KEY).unwrap().is_none());
    }

    #[test]
    fn corrupt_guard_is_reported() {
        let store = ResumptionStore::new(MemoryStore::new());
        store.raw().set(KEY_CALLBACK_GUARD, "yesterday").unwrap();
        assert!(matches!(
            store.replay_guard(),
            Err(StoreError::Corrupt { key: KEY_CALLBACK_GUARD, .. })
        ));
    }

    #[test]
    fn pending_flow_is_taken_once() {
        let store = ResumptionStore::new(MemoryStore::new());
        store.set_pending_flow(&PendingFlow::new("ranked", 50_000_000)).unwrap();

        let flow = store.take_pending_flow().unwrap();
        assert_eq!(flow.game_mode.as_deref(), Some("ranked"));
        assert_eq!(flow.bet_lamports, Some(50_000_000));
        assert!(store.take_pending_flow().unwrap().is_empty());
    }

    #[test]
    fn last_transaction_id_is_taken_once() {
        let store = ResumptionStore::new(MemoryStore::new());
        store.set_last_transaction_id("sig").unwrap();
        assert_eq!(store.take_last_transaction_id().unwrap().as_deref(), Some("sig"));
        assert_eq!(store.take_last_transaction_id().unwrap(), None);
    }

    #[test]
    fn wipe_forgets_key_pair() {
        let store = ResumptionStore::new(MemoryStore::new());
        store.set_dapp_key_pair(&DappKeyPair::generate()).unwrap();
        store.set_pending_redirect("/play").unwrap();
        store.wipe().unwrap();
        assert!(store.dapp_key_pair().unwrap().is_none());
        assert!(store.pending_redirect().unwrap().is_none());
    }
}

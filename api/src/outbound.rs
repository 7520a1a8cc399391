//! Outbound half of the wallet round trip.
//!
//! Each procedure writes everything the matching callback will need into the
//! store, then returns the link to navigate to. Navigating unloads the page,
//! so nothing after that point runs.

use serde_json::json;
use url::Url;

use crate::codec::SharedSecret;
use crate::deeplink::{DeepLinkBuilder, SignMethod};
use crate::error::OutboundError;
use crate::keypair::get_or_create_key_pair;
use crate::state::PendingFlow;
use crate::store::{DurableStore, ResumptionStore};

pub struct Outbound<S> {
    store: ResumptionStore<S>,
    links: DeepLinkBuilder,
}

impl<S: DurableStore> Outbound<S> {
    pub fn new(store: ResumptionStore<S>, links: DeepLinkBuilder) -> Self {
        Self { store, links }
    }

    pub fn store(&self) -> &ResumptionStore<S> {
        &self.store
    }

    /// Starts a connect request that resumes at `redirect_path`.
    pub fn begin_connect(&self, redirect_path: &str) -> Result<Url, OutboundError> {
        let key_pair = get_or_create_key_pair(&self.store)?;
        self.store.set_pending_redirect(redirect_path)?;
        tracing::info!(redirect_path, "leaving for wallet connect");
        Ok(self.links.connect_link(&key_pair.public_key, redirect_path))
    }

    /// Starts a sign request for a serialized, unsigned transaction.
    ///
    /// `flow` is whatever the resumed page needs to pick up where the player
    /// left off (game mode, entry fee).
    pub fn begin_sign(
        &self,
        method: SignMethod,
        transaction: &[u8],
        redirect_path: &str,
        flow: &PendingFlow,
    ) -> Result<Url, OutboundError> {
        let session = self.store.session()?.ok_or(OutboundError::NotConnected)?;
        let key_pair = get_or_create_key_pair(&self.store)?;

        let shared = SharedSecret::derive(&session.phantom_encryption_public_key, &key_pair.secret_key)?;
        let payload = shared.seal(&json!({
            "transaction": bs58::encode(transaction).into_string(),
            "session": session.session_token,
        }))?;

        self.store.set_pending_redirect(redirect_path)?;
        self.store.set_pending_flow(flow)?;
        tracing::info!(%method, redirect_path, ?flow, "leaving for wallet signature");
        Ok(self
            .links
            .sign_link(method, &payload, &key_pair.public_key, redirect_path))
    }

    /// Drops the local session and returns the link that tells the wallet
    /// to forget it too.
    pub fn disconnect(&self, redirect_path: &str) -> Result<Url, OutboundError> {
        let session = self.store.session()?.ok_or(OutboundError::NotConnected)?;
        let key_pair = get_or_create_key_pair(&self.store)?;

        let shared = SharedSecret::derive(&session.phantom_encryption_public_key, &key_pair.secret_key)?;
        let payload = shared.seal(&json!({ "session": session.session_token }))?;

        self.store.clear_session()?;
        self.store.set_pending_redirect(redirect_path)?;
        tracing::info!(wallet = %session.short_address(), "disconnecting wallet");
        Ok(self
            .links
            .disconnect_link(&payload, &key_pair.public_key, redirect_path))
    }
}

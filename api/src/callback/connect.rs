use url::Url;

use crate::codec;
use crate::error::CallbackError;
use crate::state::{ConnectPayload, ConnectSession};
use crate::store::DurableStore;

use super::{CallbackHandler, CallbackOutcome, CallbackQuery, Clock, Commit};

impl<S, C> CallbackHandler<S, C>
where
    S: DurableStore + 'static,
    C: Clock,
{
    /// Handles the wallet's answer to a connect link.
    pub async fn handle_connect(&self, url: &Url) -> CallbackOutcome {
        const ROUTE: &str = "connect";
        if !self.enter(ROUTE) {
            return CallbackOutcome::Duplicate;
        }
        let query = CallbackQuery::parse(url);
        let path = self.resume_path(&query);
        let result = self.commit_connect(&query);
        self.finish(ROUTE, path, result)
    }

    fn commit_connect(&self, query: &CallbackQuery) -> Result<Commit, CallbackError> {
        if let Some(err) = query.wallet_error() {
            return Err(err);
        }
        let data = query.data()?;
        let nonce = query.nonce()?;
        let peer = query.phantom_encryption_public_key()?;

        let key_pair = self
            .store
            .dapp_key_pair()?
            .ok_or(CallbackError::MissingField("dapp key pair"))?;
        let value = codec::decrypt(data, nonce, peer, &key_pair.secret_key)?;
        let payload: ConnectPayload = serde_json::from_value(value)
            .map_err(|e| CallbackError::MalformedPayload(e.to_string()))?;

        let session = ConnectSession {
            session_token: payload.session,
            wallet_public_key: payload.public_key,
            phantom_encryption_public_key: peer.to_string(),
        };
        self.store.set_session(&session)?;
        tracing::info!(wallet = %session.short_address(), "wallet connected");
        Ok(Commit::Connected(session))
    }
}

use serde_json::Value;
use url::Url;

use crate::codec;
use crate::error::CallbackError;
use crate::relay::Relay;
use crate::store::DurableStore;

use super::{CallbackHandler, CallbackOutcome, CallbackQuery, Clock, Commit};

/// What a wallet can hand back from a sign request, in decode priority order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignResponse {
    /// Serialized transaction carrying every required signature.
    SignedTransaction(Vec<u8>),
    /// Serialized transaction returned by `signTransaction`.
    Transaction(Vec<u8>),
    /// Signature of a transaction the wallet already submitted.
    Signature(String),
}

impl SignResponse {
    /// Picks the first field present, in order `signedTransaction`,
    /// `transaction`, `signature`. A present field is never skipped in favour
    /// of a later one, even if it fails to decode.
    pub fn decode(payload: &Value) -> Result<Self, CallbackError> {
        let Some(fields) = payload.as_object() else {
            return Err(CallbackError::MalformedPayload(
                "sign response is not an object".to_string(),
            ));
        };

        if let Some(value) = fields.get("signedTransaction") {
            return transaction_bytes("signedTransaction", value).map(SignResponse::SignedTransaction);
        }
        if let Some(value) = fields.get("transaction") {
            return transaction_bytes("transaction", value).map(SignResponse::Transaction);
        }
        if let Some(value) = fields.get("signature") {
            return match value.as_str() {
                Some(signature) if !signature.is_empty() => {
                    Ok(SignResponse::Signature(signature.to_string()))
                }
                _ => Err(CallbackError::MalformedPayload(
                    "signature is not a string".to_string(),
                )),
            };
        }
        Err(CallbackError::UnrecognizedPayloadShape)
    }

    fn kind(&self) -> &'static str {
        match self {
            SignResponse::SignedTransaction(_) => "signedTransaction",
            SignResponse::Transaction(_) => "transaction",
            SignResponse::Signature(_) => "signature",
        }
    }
}

fn transaction_bytes(field: &str, value: &Value) -> Result<Vec<u8>, CallbackError> {
    let encoded = value
        .as_str()
        .ok_or_else(|| CallbackError::MalformedPayload(format!("{field} is not a string")))?;
    bs58::decode(encoded)
        .into_vec()
        .map_err(|e| CallbackError::MalformedPayload(format!("{field}: {e}")))
}

impl<S, C> CallbackHandler<S, C>
where
    S: DurableStore + 'static,
    C: Clock,
{
    /// Handles the wallet's answer to a sign link: relay or confirm whatever
    /// it returned and remember the resulting transaction id.
    pub async fn handle_sign<R>(&self, url: &Url, relay: &R) -> CallbackOutcome
    where
        R: Relay + ?Sized,
    {
        const ROUTE: &str = "sign";
        if !self.enter(ROUTE) {
            return CallbackOutcome::Duplicate;
        }
        let query = CallbackQuery::parse(url);
        let path = self.resume_path(&query);
        let result = self.commit_sign(&query, relay).await;
        self.finish(ROUTE, path, result)
    }

    async fn commit_sign<R>(&self, query: &CallbackQuery, relay: &R) -> Result<Commit, CallbackError>
    where
        R: Relay + ?Sized,
    {
        if let Some(err) = query.wallet_error() {
            return Err(err);
        }
        let data = query.data()?;
        let nonce = query.nonce()?;

        let session = self.store.session()?.ok_or(CallbackError::NotConnected)?;
        let key_pair = self
            .store
            .dapp_key_pair()?
            .ok_or(CallbackError::MissingField("dapp key pair"))?;
        let value = codec::decrypt(
            data,
            nonce,
            &session.phantom_encryption_public_key,
            &key_pair.secret_key,
        )?;

        let response = SignResponse::decode(&value)?;
        let kind = response.kind();
        let signature = match response {
            SignResponse::SignedTransaction(bytes) | SignResponse::Transaction(bytes) => {
                let signature = relay.submit_raw(&bytes).await.inspect_err(|e| {
                    tracing::error!(kind, "relay submission failed: {}", e);
                })?;
                relay.confirm(&signature).await.inspect_err(|e| {
                    tracing::error!(kind, %signature, "confirmation failed: {}", e);
                })?;
                signature
            }
            SignResponse::Signature(signature) => {
                relay.confirm(&signature).await.inspect_err(|e| {
                    tracing::error!(kind, %signature, "confirmation failed: {}", e);
                })?;
                signature
            }
        };

        self.store.set_last_transaction_id(&signature)?;
        Ok(Commit::Confirmed { signature })
    }
}

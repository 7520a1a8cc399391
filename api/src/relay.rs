use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use tokio::time::{sleep, Instant};

use crate::consts::{CONFIRM_POLL_INTERVAL_MS, CONFIRM_TIMEOUT_MS};
use crate::error::RelayError;

/// The network side of a sign callback: submit what the wallet signed and
/// wait until the cluster has it.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Submits a serialized, fully signed transaction. Returns its signature.
    async fn submit_raw(&self, transaction: &[u8]) -> Result<String, RelayError>;

    /// Waits until `signature` reaches the relay's commitment level.
    async fn confirm(&self, signature: &str) -> Result<(), RelayError>;
}

/// [`Relay`] over Solana JSON-RPC.
pub struct RpcRelay {
    rpc: RpcClient,
    timeout: Duration,
    poll_interval: Duration,
}

impl RpcRelay {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self::with_client(RpcClient::new_with_commitment(
            rpc_url.into(),
            CommitmentConfig::confirmed(),
        ))
    }

    pub fn with_client(rpc: RpcClient) -> Self {
        Self {
            rpc,
            timeout: Duration::from_millis(CONFIRM_TIMEOUT_MS),
            poll_interval: Duration::from_millis(CONFIRM_POLL_INTERVAL_MS),
        }
    }

    pub fn with_polling(mut self, timeout: Duration, poll_interval: Duration) -> Self {
        self.timeout = timeout;
        self.poll_interval = poll_interval;
        self
    }

    pub fn client(&self) -> &RpcClient {
        &self.rpc
    }
}

#[async_trait]
impl Relay for RpcRelay {
    async fn submit_raw(&self, transaction: &[u8]) -> Result<String, RelayError> {
        let transaction: VersionedTransaction = bincode::deserialize(transaction)
            .map_err(|e| RelayError::InvalidTransaction(e.to_string()))?;
        let signature = self.rpc.send_transaction(&transaction).await?;
        tracing::info!(%signature, "transaction submitted");
        Ok(signature.to_string())
    }

    async fn confirm(&self, signature: &str) -> Result<(), RelayError> {
        let parsed = Signature::from_str(signature)
            .map_err(|_| RelayError::InvalidSignature(signature.to_string()))?;
        let commitment = self.rpc.commitment();
        let deadline = Instant::now() + self.timeout;

        loop {
            let statuses = self.rpc.get_signature_statuses(&[parsed]).await?;
            if let Some(Some(status)) = statuses.value.first() {
                if let Some(err) = &status.err {
                    return Err(RelayError::Failed {
                        signature: signature.to_string(),
                        reason: err.to_string(),
                    });
                }
                if status.satisfies_commitment(commitment) {
                    tracing::info!(%signature, "transaction confirmed");
                    return Ok(());
                }
            }

            if Instant::now() + self.poll_interval > deadline {
                return Err(RelayError::Timeout(signature.to_string()));
            }
            sleep(self.poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn garbage_bytes_are_rejected_before_any_rpc_call() {
        // Unroutable endpoint: any network call would error differently.
        let relay = RpcRelay::new("http://127.0.0.1:9");
        let result = relay.submit_raw(&[1, 2, 3]).await;
        assert!(matches!(result, Err(RelayError::InvalidTransaction(_))));
    }

    #[tokio::test]
    async fn malformed_signature_is_rejected_before_any_rpc_call() {
        let relay = RpcRelay::new("http://127.0.0.1:9");
        let result = relay.confirm("abc123").await;
        assert!(matches!(result, Err(RelayError::InvalidSignature(_))));
    }
}

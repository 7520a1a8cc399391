use serde::{Deserialize, Serialize};

/// A wallet session established by a successful connect callback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectSession {
    /// Opaque token the wallet expects back on every sign request.
    pub session_token: String,

    /// The connected wallet's address (base58).
    pub wallet_public_key: String,

    /// The wallet's per-session encryption key (base58). Sign requests are
    /// sealed against this key.
    pub phantom_encryption_public_key: String,
}

impl ConnectSession {
    /// Shortened address for logs, e.g. `9xQe...Xk2p`.
    pub fn short_address(&self) -> String {
        let key = &self.wallet_public_key;
        if key.len() > 8 {
            format!("{}...{}", &key[..4], &key[key.len() - 4..])
        } else {
            key.clone()
        }
    }
}

/// What the wallet returns (encrypted) in a connect callback.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ConnectPayload {
    pub public_key: String,
    pub session: String,
}

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::codec::EncryptedPayload;
use crate::consts::*;
use crate::error::ConfigError;

/// Solana cluster the wallet should use for the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Cluster {
    MainnetBeta,
    Testnet,
    #[default]
    Devnet,
}

impl Cluster {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cluster::MainnetBeta => "mainnet-beta",
            Cluster::Testnet => "testnet",
            Cluster::Devnet => "devnet",
        }
    }
}

impl FromStr for Cluster {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet-beta" | "mainnet" => Ok(Cluster::MainnetBeta),
            "testnet" => Ok(Cluster::Testnet),
            "devnet" => Ok(Cluster::Devnet),
            other => Err(format!("unknown cluster {other}")),
        }
    }
}

/// Wallet endpoint a sign request is sent to. Determines which field the
/// wallet answers with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignMethod {
    /// Wallet signs and returns the transaction; the app relays it.
    SignTransaction,
    /// Wallet signs and submits; the app only confirms the signature.
    SignAndSendTransaction,
}

impl SignMethod {
    pub fn path(&self) -> &'static str {
        match self {
            SignMethod::SignTransaction => "signTransaction",
            SignMethod::SignAndSendTransaction => "signAndSendTransaction",
        }
    }
}

impl fmt::Display for SignMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Builds the outbound universal links that hand control to the wallet app.
#[derive(Clone, Debug)]
pub struct DeepLinkBuilder {
    wallet_base: Url,
    app_url: Url,
    cluster: Cluster,
}

impl DeepLinkBuilder {
    pub fn new(wallet_base: Url, app_url: Url, cluster: Cluster) -> Result<Self, ConfigError> {
        if wallet_base.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                name: "PHANTOM_URL",
                value: wallet_base.to_string(),
            });
        }
        if app_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl {
                name: "APP_URL",
                value: app_url.to_string(),
            });
        }
        Ok(Self {
            wallet_base,
            app_url,
            cluster,
        })
    }

    pub fn connect_link(&self, dapp_public_key: &str, redirect_path: &str) -> Url {
        let mut url = self.endpoint("connect");
        url.query_pairs_mut()
            .append_pair("app_url", self.app_origin().as_str())
            .append_pair("dapp_encryption_public_key", dapp_public_key)
            .append_pair(
                "redirect_link",
                self.redirect_link(CONNECT_CALLBACK_ROUTE, redirect_path).as_str(),
            )
            .append_pair("cluster", self.cluster.as_str());
        url
    }

    pub fn sign_link(
        &self,
        method: SignMethod,
        payload: &EncryptedPayload,
        dapp_public_key: &str,
        redirect_path: &str,
    ) -> Url {
        let mut url = self.endpoint(method.path());
        url.query_pairs_mut()
            .append_pair("app_url", self.app_origin().as_str())
            .append_pair("dapp_encryption_public_key", dapp_public_key)
            .append_pair("nonce", &payload.nonce)
            .append_pair(
                "redirect_link",
                self.redirect_link(SIGN_CALLBACK_ROUTE, redirect_path).as_str(),
            )
            .append_pair("payload", &payload.data);
        url
    }

    pub fn disconnect_link(
        &self,
        payload: &EncryptedPayload,
        dapp_public_key: &str,
        redirect_path: &str,
    ) -> Url {
        let mut url = self.endpoint("disconnect");
        url.query_pairs_mut()
            .append_pair("dapp_encryption_public_key", dapp_public_key)
            .append_pair("nonce", &payload.nonce)
            .append_pair(
                "redirect_link",
                self.redirect_link(DISCONNECT_CALLBACK_ROUTE, redirect_path).as_str(),
            )
            .append_pair("payload", &payload.data);
        url
    }

    fn endpoint(&self, method: &str) -> Url {
        let mut url = self.wallet_base.clone();
        url.set_query(None);
        // Checked in `new`: the base always has path segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(method);
        }
        url
    }

    /// Callback route on our origin, carrying the in-app path to resume as `state`.
    fn redirect_link(&self, route: &str, redirect_path: &str) -> Url {
        let mut url = self.app_url.clone();
        url.set_path(route);
        url.set_query(None);
        url.set_fragment(None);
        url.query_pairs_mut().append_pair("state", redirect_path);
        url
    }

    fn app_origin(&self) -> String {
        self.app_url.origin().ascii_serialization()
    }
}

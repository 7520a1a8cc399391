//! Full connect and sign round trips against a file-backed store, with a new
//! store, outbound and handler instance for every "page load".

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use arcade_link_api::prelude::*;
use async_trait::async_trait;
use serde_json::json;
use url::Url;

/// Stand-in for the wallet app: holds its own key pair and answers links.
struct Wallet {
    keys: DappKeyPair,
    session: String,
}

impl Wallet {
    fn new() -> Self {
        Self {
            keys: DappKeyPair::generate(),
            session: "wallet-session-1".to_string(),
        }
    }

    fn approve_connect(&self, link: &Url) -> Url {
        let query = params(link);
        let sealed = encrypt(
            &json!({"public_key": "WalletAddr1111", "session": self.session}),
            &query["dapp_encryption_public_key"],
            &self.keys.secret_key,
        )
        .unwrap();
        let mut callback = Url::parse(&query["redirect_link"]).unwrap();
        callback
            .query_pairs_mut()
            .append_pair("phantom_encryption_public_key", &self.keys.public_key)
            .append_pair("nonce", &sealed.nonce)
            .append_pair("data", &sealed.data);
        callback
    }

    fn approve_sign(&self, link: &Url, signature: &str) -> Url {
        let query = params(link);
        let request = decrypt(
            &query["payload"],
            &query["nonce"],
            &query["dapp_encryption_public_key"],
            &self.keys.secret_key,
        )
        .unwrap();
        assert_eq!(request["session"], self.session.as_str());

        let sealed = encrypt(
            &json!({ "signature": signature }),
            &query["dapp_encryption_public_key"],
            &self.keys.secret_key,
        )
        .unwrap();
        let mut callback = Url::parse(&query["redirect_link"]).unwrap();
        callback
            .query_pairs_mut()
            .append_pair("nonce", &sealed.nonce)
            .append_pair("data", &sealed.data);
        callback
    }

    fn reject(&self, link: &Url) -> Url {
        let query = params(link);
        let mut callback = Url::parse(&query["redirect_link"]).unwrap();
        callback
            .query_pairs_mut()
            .append_pair("errorCode", "4001")
            .append_pair("errorMessage", "User rejected the request.");
        callback
    }
}

#[derive(Default)]
struct ConfirmOnlyRelay {
    confirmed: Mutex<Vec<String>>,
}

#[async_trait]
impl Relay for ConfirmOnlyRelay {
    async fn submit_raw(&self, _transaction: &[u8]) -> Result<String, RelayError> {
        panic!("a bare signature must not be relayed");
    }

    async fn confirm(&self, signature: &str) -> Result<(), RelayError> {
        self.confirmed.lock().unwrap().push(signature.to_string());
        Ok(())
    }
}

fn params(url: &Url) -> HashMap<String, String> {
    url.query_pairs().into_owned().collect()
}

fn page(path: &Path) -> (Outbound<FileStore>, CallbackHandler<FileStore>) {
    let config = Config::from_lookup(|name| match name {
        "APP_URL" => Some("https://arcade.example".to_string()),
        "GUARD_RELEASE_MS" => Some("10".to_string()),
        _ => None,
    })
    .unwrap();
    let store = ResumptionStore::new(FileStore::open(path).unwrap());
    let outbound = Outbound::new(store.clone(), config.deep_links().unwrap());
    let handler = CallbackHandler::with_clock(store, SystemClock, config.handler_config());
    (outbound, handler)
}

#[tokio::test]
async fn connect_then_pay_survives_page_reloads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let wallet = Wallet::new();

    // Page 1: the player picks ranked mode and connects.
    let link = {
        let (outbound, _) = page(&path);
        outbound.begin_connect("/play/ranked").unwrap()
    };

    // Page 2: the wallet redirects back.
    let callback = wallet.approve_connect(&link);
    {
        let (_, handler) = page(&path);
        let CallbackOutcome::Navigate(navigation) = handler.handle_connect(&callback).await else {
            panic!("first connect callback must not be a duplicate");
        };
        let (resume, result) = navigation.settle().await;
        assert_eq!(resume, "/play/ranked");
        assert!(matches!(result, Ok(Commit::Connected(_))));
    }

    // Page 3: the resumed page asks the wallet to sign the entry fee.
    let link = {
        let (outbound, _) = page(&path);
        let session = outbound.store().session().unwrap().unwrap();
        assert_eq!(session.wallet_public_key, "WalletAddr1111");
        assert_eq!(session.session_token, wallet.session);
        outbound
            .begin_sign(
                SignMethod::SignAndSendTransaction,
                &[1, 2, 3],
                "/play/ranked",
                &PendingFlow::new("ranked", 10_000_000),
            )
            .unwrap()
    };
    assert_eq!(link.path(), "/ul/v1/signAndSendTransaction");

    // Page 4: the wallet returns the signature of the submitted transaction.
    let callback = wallet.approve_sign(&link, "5igSig");
    let relay = ConfirmOnlyRelay::default();
    {
        let (_, handler) = page(&path);
        let CallbackOutcome::Navigate(navigation) = handler.handle_sign(&callback, &relay).await else {
            panic!("first sign callback must not be a duplicate");
        };
        navigation.settle().await;
    }
    assert_eq!(*relay.confirmed.lock().unwrap(), vec!["5igSig".to_string()]);

    // Page 5: the game page unlocks play.
    let (outbound, _) = page(&path);
    let store = outbound.store();
    assert_eq!(store.take_last_transaction_id().unwrap().as_deref(), Some("5igSig"));
    let flow = store.take_pending_flow().unwrap();
    assert_eq!(flow.game_mode.as_deref(), Some("ranked"));
    assert_eq!(flow.bet_lamports, Some(10_000_000));
    assert!(store.pending_redirect().unwrap().is_none());
}

#[tokio::test]
async fn rejected_connect_resumes_without_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let wallet = Wallet::new();

    let link = {
        let (outbound, _) = page(&path);
        outbound.begin_connect("/play/casual").unwrap()
    };

    let (_, handler) = page(&path);
    let outcome = handler.handle_connect(&wallet.reject(&link)).await;
    let navigation = outcome.navigation().unwrap();
    assert_eq!(navigation.path, "/play/casual");
    assert!(matches!(navigation.result, Err(CallbackError::WalletReported { .. })));
    assert!(handler.store().session().unwrap().is_none());
}

#[tokio::test]
async fn duplicate_redirect_in_a_new_page_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let wallet = Wallet::new();

    let link = {
        let (outbound, _) = page(&path);
        outbound.begin_connect("/").unwrap()
    };
    let callback = wallet.approve_connect(&link);

    let (_, first) = page(&path);
    let (_, second) = page(&path);
    assert!(!first.handle_connect(&callback).await.is_duplicate());
    assert!(second.handle_connect(&callback).await.is_duplicate());
}

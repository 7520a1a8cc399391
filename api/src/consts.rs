/// Default Phantom universal-link endpoint. Method names are appended as path segments.
pub const PHANTOM_BASE_URL: &str = "https://phantom.app/ul/v1/";

/// Route on the app origin that receives the connect response.
pub const CONNECT_CALLBACK_ROUTE: &str = "/phantom/connect";

/// Route on the app origin that receives sign responses.
pub const SIGN_CALLBACK_ROUTE: &str = "/phantom/sign";

/// Route on the app origin that receives the disconnect acknowledgement.
pub const DISCONNECT_CALLBACK_ROUTE: &str = "/phantom/disconnect";

/// In-app path used when neither the callback nor the store names one.
pub const DEFAULT_ROUTE: &str = "/";

/// Window in which a second callback invocation is treated as a duplicate.
pub const REPLAY_GUARD_TTL_MS: u64 = 5_000;

/// Delay between callback completion and guard release.
pub const GUARD_RELEASE_DELAY_MS: u64 = 1_000;

/// Relay confirmation defaults.
pub const CONFIRM_TIMEOUT_MS: u64 = 60_000;
pub const CONFIRM_POLL_INTERVAL_MS: u64 = 1_000;

// Durable store keys.
pub const KEY_DAPP_KEY_PAIR: &str = "dappKeyPair";
pub const KEY_SESSION: &str = "phantomSession";
pub const KEY_WALLET_PUBLIC_KEY: &str = "phantomWalletPublicKey";
pub const KEY_PHANTOM_ENCRYPTION_PUBLIC_KEY: &str = "phantomEncryptionPublicKey";
pub const KEY_REDIRECT_PATH: &str = "phantomRedirectPath";
pub const KEY_CALLBACK_GUARD: &str = "phantomCallbackGuard";
pub const KEY_LAST_TRANSACTION_ID: &str = "lastTransactionId";
pub const KEY_PENDING_GAME_MODE: &str = "pendingGameMode";
pub const KEY_PENDING_BET_LAMPORTS: &str = "pendingBetLamports";

/// Every key this crate writes. Used when wiping local wallet state.
pub const ALL_KEYS: &[&str] = &[
    KEY_DAPP_KEY_PAIR,
    KEY_SESSION,
    KEY_WALLET_PUBLIC_KEY,
    KEY_PHANTOM_ENCRYPTION_PUBLIC_KEY,
    KEY_REDIRECT_PATH,
    KEY_CALLBACK_GUARD,
    KEY_LAST_TRANSACTION_ID,
    KEY_PENDING_GAME_MODE,
    KEY_PENDING_BET_LAMPORTS,
];

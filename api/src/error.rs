use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("invalid {field} encoding: {reason}")]
    InvalidEncoding { field: &'static str, reason: String },

    #[error("payload failed authentication")]
    Decryption,

    #[error("decrypted payload is not valid JSON: {0}")]
    MalformedPayload(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("stored value for {key} is corrupt: {reason}")]
    Corrupt { key: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("transaction bytes do not decode: {0}")]
    InvalidTransaction(String),

    #[error("invalid signature {0}")]
    InvalidSignature(String),

    #[error(transparent)]
    Client(#[from] Box<solana_client::client_error::ClientError>),

    #[error("transaction {signature} failed: {reason}")]
    Failed { signature: String, reason: String },

    #[error("transaction {0} was not confirmed in time")]
    Timeout(String),
}

impl From<solana_client::client_error::ClientError> for RelayError {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        RelayError::Client(Box::new(err))
    }
}

/// Every way a wallet callback can fail. All of them end in a navigation to
/// the resume path; none is retried.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("wallet reported error {code}: {message}")]
    WalletReported { code: String, message: String },

    #[error("callback is missing {0}")]
    MissingField(&'static str),

    #[error("callback payload failed decryption")]
    Decryption,

    #[error("callback payload is malformed: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Relay(#[from] RelayError),

    #[error("sign response carries no signedTransaction, transaction or signature")]
    UnrecognizedPayloadShape,

    #[error("no wallet session is stored")]
    NotConnected,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CodecError> for CallbackError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Decryption => CallbackError::Decryption,
            CodecError::InvalidEncoding { field, reason } => {
                CallbackError::MalformedPayload(format!("{field}: {reason}"))
            }
            CodecError::MalformedPayload(reason) => CallbackError::MalformedPayload(reason),
        }
    }
}

#[derive(Debug, Error)]
pub enum OutboundError {
    #[error("connect a wallet before signing")]
    NotConnected,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid base url: {value}")]
    InvalidUrl { name: &'static str, value: String },

    #[error("{name} has an unsupported value: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("{name} is not a valid number: {value}")]
    InvalidNumber { name: &'static str, value: String },
}

use url::Url;

use crate::error::CallbackError;

/// Query parameters the wallet appends to our redirect link.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallbackQuery {
    pub state: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub data: Option<String>,
    pub nonce: Option<String>,
    pub phantom_encryption_public_key: Option<String>,
}

impl CallbackQuery {
    pub fn parse(url: &Url) -> Self {
        let mut query = Self::default();
        for (name, value) in url.query_pairs() {
            // Empty values count as absent.
            if value.is_empty() {
                continue;
            }
            let slot = match name.as_ref() {
                "state" => &mut query.state,
                "errorCode" => &mut query.error_code,
                "errorMessage" => &mut query.error_message,
                "data" => &mut query.data,
                "nonce" => &mut query.nonce,
                "phantom_encryption_public_key" => &mut query.phantom_encryption_public_key,
                _ => continue,
            };
            *slot = Some(value.into_owned());
        }
        query
    }

    /// The wallet's own error report, if it sent one.
    pub fn wallet_error(&self) -> Option<CallbackError> {
        let code = self.error_code.as_ref()?;
        Some(CallbackError::WalletReported {
            code: code.clone(),
            message: self.error_message.clone().unwrap_or_default(),
        })
    }

    pub fn data(&self) -> Result<&str, CallbackError> {
        self.data.as_deref().ok_or(CallbackError::MissingField("data"))
    }

    pub fn nonce(&self) -> Result<&str, CallbackError> {
        self.nonce.as_deref().ok_or(CallbackError::MissingField("nonce"))
    }

    pub fn phantom_encryption_public_key(&self) -> Result<&str, CallbackError> {
        self.phantom_encryption_public_key
            .as_deref()
            .ok_or(CallbackError::MissingField("phantom_encryption_public_key"))
    }
}

/// Accepts only absolute in-app paths. `//host` and backslash tricks would
/// let a crafted `state` send the user off-site after a full page replace.
pub(crate) fn in_app_path(candidate: &str) -> Option<&str> {
    let ok = candidate.starts_with('/')
        && !candidate.starts_with("//")
        && !candidate.contains('\\')
        && !candidate.chars().any(char::is_control);
    ok.then_some(candidate)
}

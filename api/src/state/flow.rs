use serde::{Deserialize, Serialize};

/// Flags the pay-entry flow leaves behind for the page that resumes after
/// the wallet returns.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingFlow {
    /// Game mode the player picked before paying (e.g. "ranked").
    pub game_mode: Option<String>,

    /// Entry fee the player agreed to, in lamports.
    pub bet_lamports: Option<u64>,
}

impl PendingFlow {
    pub fn new(game_mode: impl Into<String>, bet_lamports: u64) -> Self {
        Self {
            game_mode: Some(game_mode.into()),
            bet_lamports: Some(bet_lamports),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.game_mode.is_none() && self.bet_lamports.is_none()
    }
}

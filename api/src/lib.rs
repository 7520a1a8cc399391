pub mod callback;
pub mod codec;
pub mod config;
pub mod consts;
pub mod deeplink;
pub mod error;
pub mod keypair;
pub mod outbound;
pub mod relay;
pub mod state;
pub mod store;

pub mod prelude {
    pub use crate::callback::*;
    pub use crate::codec::{decrypt, encrypt, EncryptedPayload, SharedSecret};
    pub use crate::config::*;
    pub use crate::consts::*;
    pub use crate::deeplink::*;
    pub use crate::error::*;
    pub use crate::keypair::*;
    pub use crate::outbound::*;
    pub use crate::relay::*;
    pub use crate::state::*;
    pub use crate::store::*;
}

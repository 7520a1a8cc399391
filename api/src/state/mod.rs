mod flow;
mod session;

pub use flow::*;
pub use session::*;

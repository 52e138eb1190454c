// gateway

mod auth_gateway;

pub use auth_gateway::*;

// store

mod attempt_store;
mod credential_store;
mod session_store;

pub use attempt_store::*;
pub use credential_store::*;
pub use session_store::*;

mod clock;

pub use clock::*;

mod attempt_store_memory;
mod auth_gateway_local;
mod clock_manual;
mod credential_store_memory;
mod session_store_memory;

pub use attempt_store_memory::*;
pub use auth_gateway_local::*;
pub use clock_manual::*;
pub use credential_store_memory::*;
pub use session_store_memory::*;

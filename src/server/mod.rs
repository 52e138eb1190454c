mod guard;
mod server;

pub use guard::*;
pub use server::*;

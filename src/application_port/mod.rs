mod auth_backend;
mod login_guard;

pub use auth_backend::*;
pub use login_guard::*;

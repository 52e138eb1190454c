mod auth_backend_impl;
mod countdown;
mod credential_hasher_argon2;
mod credential_hasher_fake;
mod login_guard_impl;
mod token_codec_jwt;

pub use auth_backend_impl::*;
pub use countdown::*;
pub use credential_hasher_argon2::*;
pub use credential_hasher_fake::*;
pub use login_guard_impl::*;
pub use token_codec_jwt::*;

mod block_status;
mod device;
mod email;
mod login;
mod user;

pub use block_status::*;
pub use device::*;
pub use email::*;
pub use login::*;
pub use user::*;

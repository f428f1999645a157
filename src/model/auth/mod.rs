mod token;
mod user;

pub use token::{AuthToken, SESSION_TOKEN_COOKIE};
pub use user::{Rights, User};

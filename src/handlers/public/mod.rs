// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Account creation and token acquisition.
pub mod user;

pub use user::create as user_create;
pub use user::token as user_token;

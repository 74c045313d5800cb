// handlers/protected/mod.rs - Protected handlers (token authentication required)
//
// Every handler here receives the acting user as `Extension<AuthUser>` and
// only ever touches rows owned by that user.
pub mod recipe;
pub mod tag;
pub mod user;

pub use recipe::create as recipe_create;
pub use recipe::delete as recipe_delete;
pub use recipe::get as recipe_get;
pub use recipe::list as recipe_list;
pub use recipe::patch as recipe_patch;
pub use recipe::put as recipe_put;

pub use tag::delete as tag_delete;
pub use tag::get as tag_get;
pub use tag::list as tag_list;
pub use tag::patch as tag_patch;
pub use tag::put as tag_put;

pub use user::get as me_get;
pub use user::patch as me_patch;
pub use user::put as me_put;

pub mod recipe;
pub mod tag;
pub mod token;
pub mod user;

pub use recipe::{NewRecipe, Recipe, RecipeChanges};
pub use tag::Tag;
pub use token::Token;
pub use user::{NewUser, User, UserChanges};

use async_trait::async_trait;

use crate::database::manager::DatabaseError;
use crate::database::models::{NewRecipe, NewUser, Recipe, RecipeChanges, Tag, Token, User, UserChanges};

/// Storage handle shared by every service.
///
/// Recipe and tag methods take the owning user's id and must never return,
/// modify or delete rows owned by anyone else; a foreign row is reported the
/// same way as a missing one (`None` / `false`).
///
/// Methods that touch several tables run as one atomic unit.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap connectivity probe used by `/health`.
    async fn ping(&self) -> Result<(), DatabaseError>;

    /// Fails with `DatabaseError::Conflict` when the email is taken.
    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError>;
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, DatabaseError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;
    /// Fails with `DatabaseError::NotFound` for an unknown id and
    /// `DatabaseError::Conflict` when the new email is taken.
    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, DatabaseError>;

    /// Returns the user's existing token, or stores `candidate_key` as a new one.
    async fn get_or_create_token(&self, user_id: i64, candidate_key: &str) -> Result<Token, DatabaseError>;
    async fn find_user_by_token(&self, key: &str) -> Result<Option<User>, DatabaseError>;

    /// Newest first.
    async fn list_recipes(&self, owner: i64) -> Result<Vec<Recipe>, DatabaseError>;
    async fn get_recipe(&self, owner: i64, id: i64) -> Result<Option<Recipe>, DatabaseError>;
    /// `tags` are get-or-created by `(owner, name)`.
    async fn create_recipe(&self, owner: i64, recipe: NewRecipe, tags: &[String]) -> Result<Recipe, DatabaseError>;
    /// `Some(tags)` replaces the whole tag set, `None` keeps it.
    async fn update_recipe(
        &self,
        owner: i64,
        id: i64,
        changes: RecipeChanges,
        tags: Option<&[String]>,
    ) -> Result<Option<Recipe>, DatabaseError>;
    async fn delete_recipe(&self, owner: i64, id: i64) -> Result<bool, DatabaseError>;

    /// Ordered by name, descending.
    async fn list_tags(&self, owner: i64) -> Result<Vec<Tag>, DatabaseError>;
    async fn get_tag(&self, owner: i64, id: i64) -> Result<Option<Tag>, DatabaseError>;
    /// Fails with `DatabaseError::Conflict` when the owner already has a tag named `name`.
    async fn rename_tag(&self, owner: i64, id: i64, name: &str) -> Result<Option<Tag>, DatabaseError>;
    async fn delete_tag(&self, owner: i64, id: i64) -> Result<bool, DatabaseError>;
}

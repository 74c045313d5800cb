use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::debug;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::{NewRecipe, NewUser, Recipe, RecipeChanges, Tag, Token, User, UserChanges};
use crate::database::store::Store;

const USER_COLUMNS: &str = "id, email, password, name, is_active, is_staff, is_superuser, created_at";
const RECIPE_COLUMNS: &str = "id, user_id, title, time_minutes, price, link, description";

/// Tag row joined with the recipe it is attached to
#[derive(Debug, FromRow)]
struct RecipeTagRow {
    recipe_id: i64,
    id: i64,
    user_id: i64,
    name: String,
}

/// Postgres-backed store. Every recipe/tag query carries `user_id = $owner`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_tags(conn: &mut PgConnection, recipes: &mut [Recipe]) -> Result<(), DatabaseError> {
        if recipes.is_empty() {
            return Ok(());
        }
        let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();

        let rows = sqlx::query_as::<_, RecipeTagRow>(
            "SELECT rt.recipe_id, t.id, t.user_id, t.name
             FROM recipe_tags rt
             JOIN tags t ON t.id = rt.tag_id
             WHERE rt.recipe_id = ANY($1)
             ORDER BY t.id",
        )
        .bind(&ids)
        .fetch_all(&mut *conn)
        .await?;

        let mut by_recipe: HashMap<i64, Vec<Tag>> = HashMap::new();
        for row in rows {
            by_recipe.entry(row.recipe_id).or_default().push(Tag {
                id: row.id,
                user_id: row.user_id,
                name: row.name,
            });
        }
        for recipe in recipes.iter_mut() {
            recipe.tags = by_recipe.remove(&recipe.id).unwrap_or_default();
        }
        Ok(())
    }

    /// Get-or-create each tag for `owner` and link it to the recipe
    async fn attach_tags(
        conn: &mut PgConnection,
        owner: i64,
        recipe_id: i64,
        names: &[String],
    ) -> Result<(), DatabaseError> {
        for name in names {
            // The no-op update makes RETURNING yield the existing row on conflict.
            let tag = sqlx::query_as::<_, Tag>(
                "INSERT INTO tags (user_id, name) VALUES ($1, $2)
                 ON CONFLICT (user_id, name) DO UPDATE SET name = EXCLUDED.name
                 RETURNING id, user_id, name",
            )
            .bind(owner)
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;

            sqlx::query(
                "INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(recipe_id)
            .bind(tag.id)
            .execute(&mut *conn)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users (email, password, name, is_staff, is_superuser)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.name)
            .bind(user.is_staff)
            .bind(user.is_superuser)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_write(e, format!("user with email {} already exists", user.email)))
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&sql).bind(email).fetch_optional(&self.pool).await?)
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, DatabaseError> {
        let sql = format!(
            "UPDATE users SET
                email = COALESCE($2, email),
                password = COALESCE($3, password),
                name = COALESCE($4, name)
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );
        let conflict = format!("user with email {} already exists", changes.email.as_deref().unwrap_or(""));
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.email)
            .bind(changes.password_hash)
            .bind(changes.name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_write(e, conflict))?
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))
    }

    async fn get_or_create_token(&self, user_id: i64, candidate_key: &str) -> Result<Token, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO tokens (key, user_id) VALUES ($1, $2)
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(candidate_key)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let token = sqlx::query_as::<_, Token>("SELECT key, user_id, created_at FROM tokens WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(user_id, created = (inserted > 0), "token issued");
        Ok(token)
    }

    async fn find_user_by_token(&self, key: &str) -> Result<Option<User>, DatabaseError> {
        let sql = "SELECT u.id, u.email, u.password, u.name, u.is_active, u.is_staff, u.is_superuser, u.created_at
                   FROM users u
                   JOIN tokens t ON t.user_id = u.id
                   WHERE t.key = $1";
        Ok(sqlx::query_as::<_, User>(sql).bind(key).fetch_optional(&self.pool).await?)
    }

    async fn list_recipes(&self, owner: i64) -> Result<Vec<Recipe>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE user_id = $1 ORDER BY id DESC");
        let mut recipes = sqlx::query_as::<_, Recipe>(&sql)
            .bind(owner)
            .fetch_all(&mut *conn)
            .await?;
        Self::load_tags(&mut conn, &mut recipes).await?;
        Ok(recipes)
    }

    async fn get_recipe(&self, owner: i64, id: i64) -> Result<Option<Recipe>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        let sql = format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND user_id = $2");
        let Some(recipe) = sqlx::query_as::<_, Recipe>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };
        let mut recipes = [recipe];
        Self::load_tags(&mut conn, &mut recipes).await?;
        let [recipe] = recipes;
        Ok(Some(recipe))
    }

    async fn create_recipe(&self, owner: i64, recipe: NewRecipe, tags: &[String]) -> Result<Recipe, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO recipes (user_id, title, time_minutes, price, link, description)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {RECIPE_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Recipe>(&sql)
            .bind(owner)
            .bind(&recipe.title)
            .bind(recipe.time_minutes)
            .bind(recipe.price)
            .bind(&recipe.link)
            .bind(&recipe.description)
            .fetch_one(&mut *tx)
            .await?;

        Self::attach_tags(&mut tx, owner, created.id, tags).await?;

        let mut recipes = [created];
        Self::load_tags(&mut tx, &mut recipes).await?;
        tx.commit().await?;

        let [created] = recipes;
        Ok(created)
    }

    async fn update_recipe(
        &self,
        owner: i64,
        id: i64,
        changes: RecipeChanges,
        tags: Option<&[String]>,
    ) -> Result<Option<Recipe>, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "UPDATE recipes SET
                title = COALESCE($3, title),
                time_minutes = COALESCE($4, time_minutes),
                price = COALESCE($5, price),
                link = COALESCE($6, link),
                description = COALESCE($7, description)
             WHERE id = $1 AND user_id = $2
             RETURNING {RECIPE_COLUMNS}"
        );
        let Some(updated) = sqlx::query_as::<_, Recipe>(&sql)
            .bind(id)
            .bind(owner)
            .bind(changes.title)
            .bind(changes.time_minutes)
            .bind(changes.price)
            .bind(changes.link)
            .bind(changes.description)
            .fetch_optional(&mut *tx)
            .await?
        else {
            // dropping the transaction rolls it back
            return Ok(None);
        };

        if let Some(names) = tags {
            sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
                .bind(updated.id)
                .execute(&mut *tx)
                .await?;
            Self::attach_tags(&mut tx, owner, updated.id, names).await?;
        }

        let mut recipes = [updated];
        Self::load_tags(&mut tx, &mut recipes).await?;
        tx.commit().await?;

        let [updated] = recipes;
        Ok(Some(updated))
    }

    async fn delete_recipe(&self, owner: i64, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_tags(&self, owner: i64) -> Result<Vec<Tag>, DatabaseError> {
        Ok(sqlx::query_as::<_, Tag>("SELECT id, user_id, name FROM tags WHERE user_id = $1 ORDER BY name DESC")
            .bind(owner)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_tag(&self, owner: i64, id: i64) -> Result<Option<Tag>, DatabaseError> {
        Ok(sqlx::query_as::<_, Tag>("SELECT id, user_id, name FROM tags WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn rename_tag(&self, owner: i64, id: i64, name: &str) -> Result<Option<Tag>, DatabaseError> {
        sqlx::query_as::<_, Tag>(
            "UPDATE tags SET name = $3 WHERE id = $1 AND user_id = $2
             RETURNING id, user_id, name",
        )
        .bind(id)
        .bind(owner)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, format!("tag {} already exists", name)))
    }

    async fn delete_tag(&self, owner: i64, id: i64) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

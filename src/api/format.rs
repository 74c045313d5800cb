//! Wire shapes for users, tags and recipes.
//!
//! Recipes render in two forms: list responses carry the summary, every
//! other action carries the detail (summary plus description).

use rust_decimal::Decimal;
use serde::Serialize;

use crate::database::models::{Recipe, Tag, User};
use crate::middleware::AuthUser;
use crate::types::Action;

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub email: String,
    pub name: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            email: user.email,
            name: user.name,
        }
    }
}

impl From<AuthUser> for UserView {
    fn from(auth: AuthUser) -> Self {
        Self {
            email: auth.email,
            name: auth.name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenView {
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagView {
    pub id: i64,
    pub name: String,
}

impl From<Tag> for TagView {
    fn from(tag: Tag) -> Self {
        Self { id: tag.id, name: tag.name }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<TagView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub summary: RecipeSummary,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RecipeView {
    Summary(RecipeSummary),
    Detail(RecipeDetail),
}

impl RecipeView {
    pub fn render(recipe: Recipe, action: Action) -> Self {
        let Recipe {
            id,
            title,
            time_minutes,
            price,
            link,
            description,
            tags,
            ..
        } = recipe;
        let summary = RecipeSummary {
            id,
            title,
            time_minutes,
            price,
            link,
            tags: tags.into_iter().map(TagView::from).collect(),
        };
        match action {
            Action::List => RecipeView::Summary(summary),
            _ => RecipeView::Detail(RecipeDetail { summary, description }),
        }
    }

    pub fn render_all(recipes: Vec<Recipe>) -> Vec<Self> {
        recipes.into_iter().map(|r| Self::render(r, Action::List)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    fn recipe() -> Recipe {
        Recipe {
            id: 7,
            user_id: 1,
            title: "Sample recipe".into(),
            time_minutes: 22,
            price: Decimal::from_str("5.25").unwrap(),
            link: "http://example.com/recipe.pdf".into(),
            description: "Sample description".into(),
            tags: vec![Tag { id: 3, user_id: 1, name: "Dinner".into() }],
        }
    }

    #[test]
    fn list_rendering_omits_description_and_owner() {
        let value = serde_json::to_value(RecipeView::render(recipe(), Action::List)).unwrap();
        assert!(value.get("description").is_none());
        assert!(value.get("user_id").is_none());
        assert_eq!(value["price"], "5.25");
        assert_eq!(value["tags"], json!([{"id": 3, "name": "Dinner"}]));
    }

    #[test]
    fn detail_rendering_includes_description() {
        let value = serde_json::to_value(RecipeView::render(recipe(), Action::Retrieve)).unwrap();
        assert_eq!(value["description"], "Sample description");
        assert_eq!(value["title"], "Sample recipe");
    }

    #[test]
    fn user_view_hides_password() {
        let user = User {
            id: 1,
            email: "test@example.com".into(),
            password: "hash".into(),
            name: "Test".into(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            created_at: chrono::Utc::now(),
        };
        let value = serde_json::to_value(UserView::from(user)).unwrap();
        assert_eq!(value, json!({"email": "test@example.com", "name": "Test"}));
    }

    #[test]
    fn user_view_from_auth_context() {
        let auth = AuthUser {
            user_id: 9,
            email: "me@example.com".into(),
            name: "Me".into(),
        };
        let value = serde_json::to_value(UserView::from(auth)).unwrap();
        assert_eq!(value, json!({"email": "me@example.com", "name": "Me"}));
    }
}

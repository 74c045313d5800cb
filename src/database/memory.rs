use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::database::manager::DatabaseError;
use crate::database::models::{NewRecipe, NewUser, Recipe, RecipeChanges, Tag, Token, User, UserChanges};
use crate::database::store::Store;

#[derive(Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<i64, User>,
    tokens: HashMap<String, Token>,
    tags: BTreeMap<i64, Tag>,
    recipes: BTreeMap<i64, Recipe>,
    /// (recipe_id, tag_id)
    recipe_tags: BTreeSet<(i64, i64)>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    fn tag_named(&self, owner: i64, name: &str) -> Option<&Tag> {
        self.tags.values().find(|t| t.user_id == owner && t.name == name)
    }

    fn with_tags(&self, recipe: &Recipe) -> Recipe {
        let mut recipe = recipe.clone();
        recipe.tags = self
            .recipe_tags
            .range((recipe.id, i64::MIN)..=(recipe.id, i64::MAX))
            .filter_map(|(_, tag_id)| self.tags.get(tag_id).cloned())
            .collect();
        recipe
    }

    fn attach_tags(&mut self, owner: i64, recipe_id: i64, names: &[String]) {
        for name in names {
            let existing = self.tag_named(owner, name).map(|t| t.id);
            let tag_id = match existing {
                Some(id) => id,
                None => {
                    let id = self.next_id();
                    self.tags.insert(
                        id,
                        Tag {
                            id,
                            user_id: owner,
                            name: name.clone(),
                        },
                    );
                    id
                }
            };
            self.recipe_tags.insert((recipe_id, tag_id));
        }
    }

    fn owned_recipe_mut(&mut self, owner: i64, id: i64) -> Option<&mut Recipe> {
        self.recipes.get_mut(&id).filter(|r| r.user_id == owner)
    }
}

/// Process-local store for tests and development runs.
///
/// Every operation holds the table lock for its whole duration, so
/// multi-step writes are atomic with respect to other requests.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&user.email, None) {
            return Err(DatabaseError::Conflict(format!("user with email {} already exists", user.email)));
        }

        let id = tables.next_id();
        let created = User {
            id,
            email: user.email,
            password: user.password_hash,
            name: user.name,
            is_active: true,
            is_staff: user.is_staff,
            is_superuser: user.is_superuser,
            created_at: Utc::now(),
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, DatabaseError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, id: i64, changes: UserChanges) -> Result<User, DatabaseError> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &changes.email {
            if tables.email_taken(email, Some(id)) {
                return Err(DatabaseError::Conflict(format!("user with email {} already exists", email)));
            }
        }

        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| DatabaseError::NotFound(format!("user {}", id)))?;
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hash) = changes.password_hash {
            user.password = hash;
        }
        if let Some(name) = changes.name {
            user.name = name;
        }
        Ok(user.clone())
    }

    async fn get_or_create_token(&self, user_id: i64, candidate_key: &str) -> Result<Token, DatabaseError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.tokens.values().find(|t| t.user_id == user_id) {
            return Ok(existing.clone());
        }
        if !tables.users.contains_key(&user_id) {
            return Err(DatabaseError::NotFound(format!("user {}", user_id)));
        }

        let token = Token {
            key: candidate_key.to_string(),
            user_id,
            created_at: Utc::now(),
        };
        tables.tokens.insert(token.key.clone(), token.clone());
        Ok(token)
    }

    async fn find_user_by_token(&self, key: &str) -> Result<Option<User>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tokens
            .get(key)
            .and_then(|t| tables.users.get(&t.user_id))
            .cloned())
    }

    async fn list_recipes(&self, owner: i64) -> Result<Vec<Recipe>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .recipes
            .values()
            .rev()
            .filter(|r| r.user_id == owner)
            .map(|r| tables.with_tags(r))
            .collect())
    }

    async fn get_recipe(&self, owner: i64, id: i64) -> Result<Option<Recipe>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .recipes
            .get(&id)
            .filter(|r| r.user_id == owner)
            .map(|r| tables.with_tags(r)))
    }

    async fn create_recipe(&self, owner: i64, recipe: NewRecipe, tags: &[String]) -> Result<Recipe, DatabaseError> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        tables.recipes.insert(
            id,
            Recipe {
                id,
                user_id: owner,
                title: recipe.title,
                time_minutes: recipe.time_minutes,
                price: recipe.price,
                link: recipe.link,
                description: recipe.description,
                tags: Vec::new(),
            },
        );
        tables.attach_tags(owner, id, tags);

        let created = &tables.recipes[&id];
        Ok(tables.with_tags(created))
    }

    async fn update_recipe(
        &self,
        owner: i64,
        id: i64,
        changes: RecipeChanges,
        tags: Option<&[String]>,
    ) -> Result<Option<Recipe>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(recipe) = tables.owned_recipe_mut(owner, id) else {
            return Ok(None);
        };
        changes.apply(recipe);

        if let Some(names) = tags {
            tables.recipe_tags.retain(|(recipe_id, _)| *recipe_id != id);
            tables.attach_tags(owner, id, names);
        }

        let updated = &tables.recipes[&id];
        Ok(Some(tables.with_tags(updated)))
    }

    async fn delete_recipe(&self, owner: i64, id: i64) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.owned_recipe_mut(owner, id).is_none() {
            return Ok(false);
        }
        tables.recipes.remove(&id);
        tables.recipe_tags.retain(|(recipe_id, _)| *recipe_id != id);
        Ok(true)
    }

    async fn list_tags(&self, owner: i64) -> Result<Vec<Tag>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut tags: Vec<Tag> = tables
            .tags
            .values()
            .filter(|t| t.user_id == owner)
            .cloned()
            .collect();
        tags.sort_by(|a, b| b.name.cmp(&a.name));
        Ok(tags)
    }

    async fn get_tag(&self, owner: i64, id: i64) -> Result<Option<Tag>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables.tags.get(&id).filter(|t| t.user_id == owner).cloned())
    }

    async fn rename_tag(&self, owner: i64, id: i64, name: &str) -> Result<Option<Tag>, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.tags.get(&id).is_some_and(|t| t.user_id == owner) {
            return Ok(None);
        }
        if tables.tag_named(owner, name).is_some_and(|t| t.id != id) {
            return Err(DatabaseError::Conflict(format!("tag {} already exists", name)));
        }

        let Some(tag) = tables.tags.get_mut(&id) else {
            return Ok(None);
        };
        tag.name = name.to_string();
        Ok(Some(tag.clone()))
    }

    async fn delete_tag(&self, owner: i64, id: i64) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        if !tables.tags.get(&id).is_some_and(|t| t.user_id == owner) {
            return Ok(false);
        }
        tables.tags.remove(&id);
        tables.recipe_tags.retain(|(_, tag_id)| *tag_id != id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let store = MemoryStore::new();
        testing::insert_user_with_email(&store, "dup@example.com").await;

        let err = store
            .insert_user(NewUser {
                email: "dup@example.com".to_string(),
                password_hash: "x".to_string(),
                name: String::new(),
                is_staff: false,
                is_superuser: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[tokio::test]
    async fn foreign_recipes_are_invisible() {
        let store = MemoryStore::new();
        let alice = testing::insert_user(&store, "alice").await;
        let bob = testing::insert_user(&store, "bob").await;
        let recipe = store.create_recipe(bob.id, testing::new_recipe("Toast"), &[]).await.unwrap();

        assert!(store.get_recipe(alice.id, recipe.id).await.unwrap().is_none());
        assert!(store
            .update_recipe(alice.id, recipe.id, RecipeChanges::default(), None)
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete_recipe(alice.id, recipe.id).await.unwrap());
        assert!(store.get_recipe(bob.id, recipe.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn deleting_tag_detaches_it_from_recipes() {
        let store = MemoryStore::new();
        let user = testing::insert_user(&store, "cook").await;
        let recipe = store
            .create_recipe(user.id, testing::new_recipe("Soup"), &["Vegan".to_string(), "Winter".to_string()])
            .await
            .unwrap();
        let vegan = recipe.tags.iter().find(|t| t.name == "Vegan").unwrap().id;

        assert!(store.delete_tag(user.id, vegan).await.unwrap());

        let reloaded = store.get_recipe(user.id, recipe.id).await.unwrap().unwrap();
        let names: Vec<&str> = reloaded.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Winter"]);
    }

    #[tokio::test]
    async fn rename_onto_existing_name_conflicts() {
        let store = MemoryStore::new();
        let user = testing::insert_user(&store, "cook").await;
        let recipe = store
            .create_recipe(user.id, testing::new_recipe("Soup"), &["Lunch".to_string(), "Dinner".to_string()])
            .await
            .unwrap();
        let lunch = recipe.tags.iter().find(|t| t.name == "Lunch").unwrap().id;

        let err = store.rename_tag(user.id, lunch, "Dinner").await.unwrap_err();
        assert!(matches!(err, DatabaseError::Conflict(_)));

        let renamed = store.rename_tag(user.id, lunch, "Brunch").await.unwrap().unwrap();
        assert_eq!(renamed.name, "Brunch");
    }
}

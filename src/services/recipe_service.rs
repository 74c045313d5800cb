use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use crate::database::manager::DatabaseError;
use crate::database::models::{NewRecipe, Recipe, RecipeChanges, Tag};
use crate::database::store::Store;
use crate::types::Action;

use super::{clean_text, FieldErrors, ServiceError, REQUIRED};

const MAX_PRICE: Decimal = Decimal::ONE_THOUSAND;

/// Recipe body for create/update. `user` and any other unknown keys are
/// dropped by serde, so ownership cannot be changed through the payload.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RecipePayload {
    pub title: Option<String>,
    pub time_minutes: Option<i64>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<TagPayload>>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TagPayload {
    pub name: Option<String>,
}

/// Validated recipe write
struct CleanRecipe {
    changes: RecipeChanges,
    tags: Option<Vec<String>>,
}

impl RecipePayload {
    /// Validate for `action`. Create and full update require title,
    /// time_minutes and price, and reset omitted link/description to "".
    fn clean(self, action: Action) -> Result<CleanRecipe, ServiceError> {
        let mut errors = FieldErrors::default();
        let require_all = !action.is_partial();
        let mut changes = RecipeChanges::default();

        match self.title {
            Some(title) => changes.title = clean_text(&mut errors, "title", title, 255, false),
            None if require_all => errors.add("title", REQUIRED),
            None => {}
        }
        match self.time_minutes {
            Some(minutes) => match i32::try_from(minutes) {
                Ok(minutes) if minutes >= 0 => changes.time_minutes = Some(minutes),
                Ok(_) => errors.add("time_minutes", "Ensure this value is greater than or equal to 0."),
                Err(_) => errors.add("time_minutes", "A valid integer is required."),
            },
            None if require_all => errors.add("time_minutes", REQUIRED),
            None => {}
        }
        match self.price {
            Some(price) => match clean_price(price) {
                Ok(price) => changes.price = Some(price),
                Err(msg) => errors.add("price", msg),
            },
            None if require_all => errors.add("price", REQUIRED),
            None => {}
        }

        changes.link = match self.link {
            Some(link) => clean_text(&mut errors, "link", link, 255, true),
            None if require_all => Some(String::new()),
            None => None,
        };
        changes.description = match self.description {
            Some(description) => Some(description),
            None if require_all => Some(String::new()),
            None => None,
        };

        let tags = self.tags.map(|tags| clean_tag_names(&mut errors, tags));

        errors.finish()?;
        Ok(CleanRecipe { changes, tags })
    }
}

/// Price must fit NUMERIC(5, 2); the result always carries two decimal places.
fn clean_price(price: Decimal) -> Result<Decimal, &'static str> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err("Ensure this value is greater than or equal to 0.");
    }
    let mut price = price.normalize();
    if price.scale() > 2 {
        return Err("Ensure that there are no more than 2 decimal places.");
    }
    if price >= MAX_PRICE {
        return Err("Ensure that there are no more than 5 digits in total.");
    }
    price.rescale(2);
    Ok(price)
}

/// Trimmed tag names, duplicates removed, first occurrence order kept
fn clean_tag_names(errors: &mut FieldErrors, tags: Vec<TagPayload>) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let Some(name) = tag.name else {
            errors.add("tags", "Each tag requires a name.");
            continue;
        };
        if let Some(name) = clean_text(errors, "tags", name, 255, false) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    names
}

/// Owner-scoped recipe and tag operations.
///
/// Every method takes the acting user's id; rows owned by someone else are
/// reported as `ServiceError::NotFound`, exactly like missing rows.
#[derive(Clone)]
pub struct RecipeService {
    store: Arc<dyn Store>,
}

impl RecipeService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_recipes(&self, owner: i64) -> Result<Vec<Recipe>, ServiceError> {
        Ok(self.store.list_recipes(owner).await?)
    }

    pub async fn get_recipe(&self, owner: i64, id: i64) -> Result<Recipe, ServiceError> {
        self.store
            .get_recipe(owner, id)
            .await?
            .ok_or(ServiceError::NotFound("recipe"))
    }

    pub async fn create_recipe(&self, owner: i64, payload: RecipePayload) -> Result<Recipe, ServiceError> {
        let CleanRecipe { changes, tags } = payload.clean(Action::Create)?;
        let recipe = NewRecipe {
            title: changes.title.unwrap_or_default(),
            time_minutes: changes.time_minutes.unwrap_or_default(),
            price: changes.price.unwrap_or_default(),
            link: changes.link.unwrap_or_default(),
            description: changes.description.unwrap_or_default(),
        };

        let created = self
            .store
            .create_recipe(owner, recipe, tags.as_deref().unwrap_or_default())
            .await?;
        info!(owner, recipe_id = created.id, tags = created.tags.len(), "recipe created");
        Ok(created)
    }

    /// `Action::Update` (PUT) or `Action::PartialUpdate` (PATCH).
    /// Supplying `tags` replaces the whole tag set.
    pub async fn update_recipe(
        &self,
        owner: i64,
        id: i64,
        payload: RecipePayload,
        action: Action,
    ) -> Result<Recipe, ServiceError> {
        let CleanRecipe { changes, tags } = payload.clean(action)?;
        let updated = self
            .store
            .update_recipe(owner, id, changes, tags.as_deref())
            .await?
            .ok_or(ServiceError::NotFound("recipe"))?;
        info!(owner, recipe_id = id, "recipe updated");
        Ok(updated)
    }

    pub async fn delete_recipe(&self, owner: i64, id: i64) -> Result<(), ServiceError> {
        if !self.store.delete_recipe(owner, id).await? {
            return Err(ServiceError::NotFound("recipe"));
        }
        info!(owner, recipe_id = id, "recipe deleted");
        Ok(())
    }

    pub async fn list_tags(&self, owner: i64) -> Result<Vec<Tag>, ServiceError> {
        Ok(self.store.list_tags(owner).await?)
    }

    pub async fn get_tag(&self, owner: i64, id: i64) -> Result<Tag, ServiceError> {
        self.store.get_tag(owner, id).await?.ok_or(ServiceError::NotFound("tag"))
    }

    /// Rename a tag. PATCH without a name leaves the tag untouched; PUT requires one.
    pub async fn update_tag(&self, owner: i64, id: i64, payload: TagPayload, action: Action) -> Result<Tag, ServiceError> {
        let current = self.get_tag(owner, id).await?;

        let mut errors = FieldErrors::default();
        let name = match payload.name {
            Some(name) => clean_text(&mut errors, "name", name, 255, false),
            None if !action.is_partial() => {
                errors.add("name", REQUIRED);
                None
            }
            None => None,
        };
        errors.finish()?;

        let Some(name) = name else {
            return Ok(current);
        };
        match self.store.rename_tag(owner, id, &name).await {
            Ok(Some(tag)) => Ok(tag),
            Ok(None) => Err(ServiceError::NotFound("tag")),
            Err(DatabaseError::Conflict(_)) => Err(ServiceError::field("name", "A tag with this name already exists.")),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn delete_tag(&self, owner: i64, id: i64) -> Result<(), ServiceError> {
        if !self.store.delete_tag(owner, id).await? {
            return Err(ServiceError::NotFound("tag"));
        }
        info!(owner, tag_id = id, "tag deleted");
        Ok(())
    }
}

//! Recipe write path and read-shape assembly. Writes validate the payload
//! up front, then replace the tag and ingredient association sets wholesale
//! inside one transaction; reads always produce the full `RecipeView`
//! regardless of which operation produced the recipe.

use crate::db::DbPool;
use crate::entities::{favorite, ingredient, recipe, recipe_ingredient, recipe_tag, shopping_cart, tag, user};
use crate::error::ApiError;
use crate::models::{IngredientAmount, IngredientInRecipeView, RecipeView, RecipeWriteRequest, TagView, UserView};
use crate::services::relations;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use sea_orm::ActiveValue::{Set, Unchanged};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait,
};
use std::collections::HashSet;

/// Listing filters; `is_favorited` / `is_in_shopping_cart` are relative to
/// the viewing user.
#[derive(Debug, Clone, Default)]
pub struct RecipeFilters {
    pub author: Option<i64>,
    pub tag_slugs: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

pub fn validate_write(req: &RecipeWriteRequest) -> Result<(), ApiError> {
    if req.tags.is_empty() {
        return Err(ApiError::validation("Tags are required for recipes"));
    }
    let mut seen_tags = HashSet::new();
    for tag_id in &req.tags {
        if !seen_tags.insert(*tag_id) {
            return Err(ApiError::validation("Tags must be unique"));
        }
    }

    if req.ingredients.is_empty() {
        return Err(ApiError::validation("Ingredients are required for recipes"));
    }
    let mut seen_ingredients = HashSet::new();
    for item in &req.ingredients {
        if item.id < 0 {
            return Err(ApiError::validation("Ingredient id cannot be negative"));
        }
        if item.amount < 1 {
            return Err(ApiError::validation("Ingredient amount must be at least 1"));
        }
        if !seen_ingredients.insert(item.id) {
            return Err(ApiError::validation("Ingredients must be unique"));
        }
    }

    if req.cooking_time < 1 {
        return Err(ApiError::validation(
            "Cooking time must be at least one minute",
        ));
    }
    Ok(())
}

/// Decodes a `data:image/...;base64,` payload into raw bytes.
pub fn decode_image(data: &str) -> Result<Vec<u8>, ApiError> {
    if !data.starts_with("data:image") {
        return Err(ApiError::validation("Invalid image payload"));
    }
    let encoded = data
        .split_once(";base64,")
        .map(|(_, rest)| rest)
        .ok_or_else(|| ApiError::validation("Invalid image payload"))?;
    BASE64
        .decode(encoded)
        .map_err(|_| ApiError::validation("Invalid base64 image data"))
}

async fn fetch_tags(db: &DbPool, ids: &[i64]) -> Result<Vec<tag::Model>, ApiError> {
    let tags = tag::Entity::find()
        .filter(tag::Column::Id.is_in(ids.to_vec()))
        .all(db)
        .await?;
    if tags.len() != ids.len() {
        return Err(ApiError::validation("No such tag exists"));
    }
    Ok(tags)
}

async fn fetch_ingredients(
    db: &DbPool,
    items: &[IngredientAmount],
) -> Result<Vec<ingredient::Model>, ApiError> {
    let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    let found = ingredient::Entity::find()
        .filter(ingredient::Column::Id.is_in(ids))
        .all(db)
        .await?;
    if found.len() != items.len() {
        return Err(ApiError::IngredientNotFound);
    }
    Ok(found)
}

/// Creates a recipe for `author` (always the acting user, regardless of the
/// request body) and returns the full read shape.
pub async fn create_recipe(
    db: &DbPool,
    author: &user::Model,
    req: &RecipeWriteRequest,
) -> Result<RecipeView, ApiError> {
    validate_write(req)?;
    let image = decode_image(&req.image)?;
    fetch_tags(db, &req.tags).await?;
    fetch_ingredients(db, &req.ingredients).await?;

    let txn = db.begin().await?;

    let created = recipe::ActiveModel {
        author_id: Set(author.id),
        name: Set(req.name.clone()),
        text: Set(req.text.clone()),
        cooking_time: Set(req.cooking_time),
        image: Set(image),
        pub_date: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    recipe_tag::Entity::insert_many(req.tags.iter().map(|tag_id| recipe_tag::ActiveModel {
        recipe_id: Set(created.id),
        tag_id: Set(*tag_id),
        ..Default::default()
    }))
    .exec(&txn)
    .await?;

    recipe_ingredient::Entity::insert_many(req.ingredients.iter().map(|item| {
        recipe_ingredient::ActiveModel {
            recipe_id: Set(created.id),
            ingredient_id: Set(item.id),
            amount: Set(item.amount),
            ..Default::default()
        }
    }))
    .exec(&txn)
    .await?;

    txn.commit().await?;

    build_recipe_view(db, created, Some(author.id)).await
}

/// Updates a recipe, replacing the tag and ingredient sets wholesale.
/// A failure anywhere in the sequence rolls back to the prior sets.
pub async fn update_recipe(
    db: &DbPool,
    acting_user_id: i64,
    recipe_id: i64,
    req: &RecipeWriteRequest,
) -> Result<RecipeView, ApiError> {
    let existing = recipe::Entity::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or(ApiError::RecipeNotFound)?;
    if existing.author_id != acting_user_id {
        return Err(ApiError::Forbidden);
    }

    validate_write(req)?;
    let image = decode_image(&req.image)?;
    fetch_tags(db, &req.tags).await?;
    fetch_ingredients(db, &req.ingredients).await?;

    let txn = db.begin().await?;

    let updated = recipe::ActiveModel {
        id: Unchanged(existing.id),
        author_id: Unchanged(existing.author_id),
        name: Set(req.name.clone()),
        text: Set(req.text.clone()),
        cooking_time: Set(req.cooking_time),
        image: Set(image),
        pub_date: Unchanged(existing.pub_date),
    }
    .update(&txn)
    .await?;

    recipe_tag::Entity::delete_many()
        .filter(recipe_tag::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    recipe_tag::Entity::insert_many(req.tags.iter().map(|tag_id| recipe_tag::ActiveModel {
        recipe_id: Set(recipe_id),
        tag_id: Set(*tag_id),
        ..Default::default()
    }))
    .exec(&txn)
    .await?;

    recipe_ingredient::Entity::delete_many()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe_id))
        .exec(&txn)
        .await?;
    recipe_ingredient::Entity::insert_many(req.ingredients.iter().map(|item| {
        recipe_ingredient::ActiveModel {
            recipe_id: Set(recipe_id),
            ingredient_id: Set(item.id),
            amount: Set(item.amount),
            ..Default::default()
        }
    }))
    .exec(&txn)
    .await?;

    txn.commit().await?;

    build_recipe_view(db, updated, Some(acting_user_id)).await
}

pub async fn delete_recipe(
    db: &DbPool,
    acting_user_id: i64,
    recipe_id: i64,
) -> Result<(), ApiError> {
    let existing = recipe::Entity::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or(ApiError::RecipeNotFound)?;
    if existing.author_id != acting_user_id {
        return Err(ApiError::Forbidden);
    }
    recipe::Entity::delete_by_id(recipe_id).exec(db).await?;
    Ok(())
}

pub async fn get_recipe_view(
    db: &DbPool,
    recipe_id: i64,
    viewer: Option<i64>,
) -> Result<RecipeView, ApiError> {
    let recipe = recipe::Entity::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or(ApiError::RecipeNotFound)?;
    build_recipe_view(db, recipe, viewer).await
}

/// Assembles the full read shape for one recipe: expanded author, tags and
/// ingredient rows, plus the viewer-scoped relation flags.
pub async fn build_recipe_view(
    db: &DbPool,
    recipe: recipe::Model,
    viewer: Option<i64>,
) -> Result<RecipeView, ApiError> {
    let author = user::Entity::find_by_id(recipe.author_id)
        .one(db)
        .await?
        .ok_or(ApiError::UserNotFound)?;
    let is_subscribed = relations::is_subscribed(db, viewer, author.id).await?;

    let tag_rows = recipe_tag::Entity::find()
        .filter(recipe_tag::Column::RecipeId.eq(recipe.id))
        .find_also_related(tag::Entity)
        .all(db)
        .await?;
    let tags = tag_rows
        .into_iter()
        .filter_map(|(_, tag)| tag)
        .map(TagView::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let ingredient_rows = recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.eq(recipe.id))
        .find_also_related(ingredient::Entity)
        .all(db)
        .await?;
    let ingredients = ingredient_rows
        .into_iter()
        .filter_map(|(row, ing)| {
            ing.map(|ing| IngredientInRecipeView {
                id: ing.id,
                name: ing.name,
                measurement_unit: ing.measurement_unit,
                amount: row.amount,
            })
        })
        .collect();

    let is_favorited = relations::is_favorited(db, viewer, recipe.id).await?;
    let is_in_shopping_cart = relations::is_in_shopping_cart(db, viewer, recipe.id).await?;

    Ok(RecipeView {
        id: recipe.id,
        tags,
        author: UserView::new(author, is_subscribed),
        ingredients,
        is_favorited,
        is_in_shopping_cart,
        name: recipe.name,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        image: BASE64.encode(&recipe.image),
    })
}

/// Newest-first listing with the optional author / tag / relation filters.
pub async fn list_recipes(
    db: &DbPool,
    viewer: Option<i64>,
    filters: &RecipeFilters,
    page: u64,
    limit: u64,
) -> Result<Vec<RecipeView>, ApiError> {
    let mut query = recipe::Entity::find().order_by_desc(recipe::Column::PubDate);

    if let Some(author) = filters.author {
        query = query.filter(recipe::Column::AuthorId.eq(author));
    }

    if !filters.tag_slugs.is_empty() {
        let tag_ids: Vec<i64> = tag::Entity::find()
            .filter(tag::Column::Slug.is_in(filters.tag_slugs.clone()))
            .all(db)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        let recipe_ids: Vec<i64> = recipe_tag::Entity::find()
            .filter(recipe_tag::Column::TagId.is_in(tag_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|rt| rt.recipe_id)
            .collect();
        query = query.filter(recipe::Column::Id.is_in(recipe_ids));
    }

    if filters.is_favorited {
        let recipe_ids: Vec<i64> = match viewer {
            Some(user_id) => favorite::Entity::find()
                .filter(favorite::Column::UserId.eq(user_id))
                .all(db)
                .await?
                .into_iter()
                .map(|f| f.recipe_id)
                .collect(),
            None => Vec::new(),
        };
        query = query.filter(recipe::Column::Id.is_in(recipe_ids));
    }

    if filters.is_in_shopping_cart {
        let recipe_ids: Vec<i64> = match viewer {
            Some(user_id) => shopping_cart::Entity::find()
                .filter(shopping_cart::Column::UserId.eq(user_id))
                .all(db)
                .await?
                .into_iter()
                .map(|c| c.recipe_id)
                .collect(),
            None => Vec::new(),
        };
        query = query.filter(recipe::Column::Id.is_in(recipe_ids));
    }

    let offset = page.saturating_sub(1).saturating_mul(limit);
    let recipes = query.limit(limit).offset(offset).all(db).await?;

    let mut views = Vec::with_capacity(recipes.len());
    for recipe in recipes {
        views.push(build_recipe_view(db, recipe, viewer).await?);
    }
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::subscription;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn write_request() -> RecipeWriteRequest {
        RecipeWriteRequest {
            tags: vec![1],
            ingredients: vec![IngredientAmount { id: 1, amount: 5 }],
            name: "Pancakes".to_string(),
            text: "Mix and fry".to_string(),
            cooking_time: 20,
            image: "data:image/png;base64,aGVsbG8=".to_string(),
        }
    }

    fn sample_author() -> user::Model {
        user::Model {
            id: 1,
            email: "a@example.com".to_string(),
            username: "a".to_string(),
            first_name: "A".to_string(),
            last_name: "A".to_string(),
            password_hash: String::new(),
            is_active: true,
            is_staff: false,
            created_at: Utc::now(),
        }
    }

    fn sample_tag() -> tag::Model {
        tag::Model {
            id: 1,
            name: "breakfast".to_string(),
            color: "#e26c2d".to_string(),
            slug: "breakfast".to_string(),
        }
    }

    fn sample_ingredient() -> ingredient::Model {
        ingredient::Model {
            id: 1,
            name: "Flour".to_string(),
            measurement_unit: "g".to_string(),
        }
    }

    fn exec_ok(last_insert_id: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id,
            rows_affected: 1,
        }
    }

    #[test]
    fn valid_payload_passes() {
        assert!(validate_write(&write_request()).is_ok());
    }

    #[test]
    fn empty_tags_rejected() {
        let mut req = write_request();
        req.tags.clear();
        assert!(matches!(
            validate_write(&req),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn duplicate_tags_rejected() {
        let mut req = write_request();
        req.tags = vec![1, 1];
        assert!(validate_write(&req).is_err());
    }

    #[test]
    fn empty_ingredients_rejected() {
        let mut req = write_request();
        req.ingredients.clear();
        assert!(validate_write(&req).is_err());
    }

    #[test]
    fn duplicate_ingredients_rejected() {
        let mut req = write_request();
        req.ingredients = vec![
            IngredientAmount { id: 1, amount: 5 },
            IngredientAmount { id: 1, amount: 2 },
        ];
        assert!(validate_write(&req).is_err());
    }

    #[test]
    fn zero_amount_rejected() {
        let mut req = write_request();
        req.ingredients[0].amount = 0;
        assert!(validate_write(&req).is_err());
    }

    #[test]
    fn zero_cooking_time_rejected() {
        let mut req = write_request();
        req.cooking_time = 0;
        assert!(validate_write(&req).is_err());
    }

    #[test]
    fn data_url_decodes_to_bytes() {
        let bytes = decode_image("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn non_image_payload_rejected() {
        assert!(decode_image("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(decode_image("just text").is_err());
        assert!(decode_image("data:image/png;base64,!!!").is_err());
    }

    #[tokio::test]
    async fn create_with_unknown_ingredient_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![sample_tag()]])
            .append_query_results([Vec::<ingredient::Model>::new()])
            .into_connection();

        let err = create_recipe(&db, &sample_author(), &write_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::IngredientNotFound));
    }

    #[tokio::test]
    async fn update_by_non_author_is_forbidden() {
        let existing = recipe::Model {
            id: 7,
            author_id: 1,
            name: "Pancakes".to_string(),
            text: "Mix and fry".to_string(),
            cooking_time: 20,
            image: vec![0],
            pub_date: Utc::now(),
        };
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![existing]])
            .into_connection();

        let err = update_recipe(&db, 2, 7, &write_request()).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
    }

    #[tokio::test]
    async fn create_returns_full_read_shape() {
        let created = recipe::Model {
            id: 7,
            author_id: 1,
            name: "Pancakes".to_string(),
            text: "Mix and fry".to_string(),
            cooking_time: 20,
            image: b"hello".to_vec(),
            pub_date: Utc::now(),
        };
        let tag_link = recipe_tag::Model {
            id: 10,
            recipe_id: 7,
            tag_id: 1,
        };
        let ingredient_link = recipe_ingredient::Model {
            id: 20,
            recipe_id: 7,
            ingredient_id: 1,
            amount: 5,
        };
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![sample_tag()]])
            .append_query_results([vec![sample_ingredient()]])
            .append_query_results([vec![created]])
            .append_query_results([vec![sample_author()]])
            .append_query_results([Vec::<subscription::Model>::new()])
            .append_query_results([vec![(tag_link, sample_tag())]])
            .append_query_results([vec![(ingredient_link, sample_ingredient())]])
            .append_query_results([Vec::<favorite::Model>::new()])
            .append_query_results([Vec::<shopping_cart::Model>::new()])
            .append_exec_results([exec_ok(7), exec_ok(10), exec_ok(20)])
            .into_connection();

        let view = create_recipe(&db, &sample_author(), &write_request())
            .await
            .unwrap();
        assert_eq!(view.id, 7);
        assert_eq!(view.name, "Pancakes");
        assert_eq!(view.cooking_time, 20);
        assert_eq!(view.image, "aGVsbG8=");
        assert_eq!(view.author.email, "a@example.com");
        assert_eq!(view.tags.len(), 1);
        assert_eq!(view.tags[0].id, 1);
        assert_eq!(view.ingredients.len(), 1);
        assert_eq!(view.ingredients[0].id, 1);
        assert_eq!(view.ingredients[0].amount, 5);
        assert!(!view.is_favorited);
        assert!(!view.is_in_shopping_cart);
    }

    #[tokio::test]
    async fn update_replaces_association_sets_in_one_transaction() {
        let existing = recipe::Model {
            id: 7,
            author_id: 1,
            name: "Pancakes".to_string(),
            text: "Mix and fry".to_string(),
            cooking_time: 20,
            image: vec![0],
            pub_date: Utc::now(),
        };
        let updated = recipe::Model {
            name: "Crepes".to_string(),
            image: b"hello".to_vec(),
            ..existing.clone()
        };
        let tag_link = recipe_tag::Model {
            id: 11,
            recipe_id: 7,
            tag_id: 1,
        };
        let ingredient_link = recipe_ingredient::Model {
            id: 21,
            recipe_id: 7,
            ingredient_id: 1,
            amount: 5,
        };
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![existing]])
            .append_query_results([vec![sample_tag()]])
            .append_query_results([vec![sample_ingredient()]])
            .append_query_results([vec![updated]])
            .append_query_results([vec![sample_author()]])
            .append_query_results([Vec::<subscription::Model>::new()])
            .append_query_results([vec![(tag_link, sample_tag())]])
            .append_query_results([vec![(ingredient_link, sample_ingredient())]])
            .append_query_results([Vec::<favorite::Model>::new()])
            .append_query_results([Vec::<shopping_cart::Model>::new()])
            .append_exec_results([
                exec_ok(0),
                exec_ok(0),
                exec_ok(11),
                exec_ok(0),
                exec_ok(21),
            ])
            .into_connection();

        let mut req = write_request();
        req.name = "Crepes".to_string();
        let view = update_recipe(&db, 1, 7, &req).await.unwrap();
        assert_eq!(view.name, "Crepes");
        assert_eq!(view.tags.len(), 1);
        assert_eq!(view.ingredients.len(), 1);

        // Old association rows must be cleared before the new sets go in,
        // and the whole replacement must sit between BEGIN and COMMIT.
        let log = format!("{:?}", db.into_transaction_log());
        let begin = log.find("BEGIN").unwrap();
        let delete_tags = log.find("DELETE FROM `recipe_tags`").unwrap();
        let insert_tags = log.find("INSERT INTO `recipe_tags`").unwrap();
        let delete_ingredients = log.find("DELETE FROM `recipe_ingredients`").unwrap();
        let insert_ingredients = log.find("INSERT INTO `recipe_ingredients`").unwrap();
        let commit = log.find("COMMIT").unwrap();
        assert!(begin < delete_tags);
        assert!(delete_tags < insert_tags);
        assert!(insert_tags < delete_ingredients);
        assert!(delete_ingredients < insert_ingredients);
        assert!(insert_ingredients < commit);
    }
}

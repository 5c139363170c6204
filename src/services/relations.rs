//! The toggle protocol shared by favorite, shopping cart and subscribe:
//! add fails if the pair exists, remove fails if it does not. Neither
//! direction is idempotent; callers needing that must read first. The
//! unique pair key in the store is the atomicity boundary for races.

use crate::db::DbPool;
use crate::entities::{favorite, recipe, shopping_cart, subscription, user};
use crate::error::ApiError;
use chrono::Utc;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, Set};

pub async fn add_favorite(
    db: &DbPool,
    user_id: i64,
    recipe_id: i64,
) -> Result<recipe::Model, ApiError> {
    let recipe = recipe::Entity::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or(ApiError::RecipeNotFound)?;

    let existing = favorite::Entity::find()
        .filter(
            Condition::all()
                .add(favorite::Column::UserId.eq(user_id))
                .add(favorite::Column::RecipeId.eq(recipe_id)),
        )
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::AlreadyFavorite);
    }

    favorite::Entity::insert(favorite::ActiveModel {
        user_id: Set(user_id),
        recipe_id: Set(recipe_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    })
    .exec(db)
    .await?;

    Ok(recipe)
}

pub async fn remove_favorite(db: &DbPool, user_id: i64, recipe_id: i64) -> Result<(), ApiError> {
    recipe::Entity::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or(ApiError::RecipeNotFound)?;

    let existing = favorite::Entity::find()
        .filter(
            Condition::all()
                .add(favorite::Column::UserId.eq(user_id))
                .add(favorite::Column::RecipeId.eq(recipe_id)),
        )
        .one(db)
        .await?
        .ok_or(ApiError::NotFavorite)?;

    favorite::Entity::delete_by_id(existing.id).exec(db).await?;
    Ok(())
}

pub async fn add_to_cart(
    db: &DbPool,
    user_id: i64,
    recipe_id: i64,
) -> Result<recipe::Model, ApiError> {
    let recipe = recipe::Entity::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or(ApiError::RecipeNotFound)?;

    let existing = shopping_cart::Entity::find()
        .filter(
            Condition::all()
                .add(shopping_cart::Column::UserId.eq(user_id))
                .add(shopping_cart::Column::RecipeId.eq(recipe_id)),
        )
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::AlreadyInCart);
    }

    shopping_cart::Entity::insert(shopping_cart::ActiveModel {
        user_id: Set(user_id),
        recipe_id: Set(recipe_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    })
    .exec(db)
    .await?;

    Ok(recipe)
}

pub async fn remove_from_cart(db: &DbPool, user_id: i64, recipe_id: i64) -> Result<(), ApiError> {
    recipe::Entity::find_by_id(recipe_id)
        .one(db)
        .await?
        .ok_or(ApiError::RecipeNotFound)?;

    let existing = shopping_cart::Entity::find()
        .filter(
            Condition::all()
                .add(shopping_cart::Column::UserId.eq(user_id))
                .add(shopping_cart::Column::RecipeId.eq(recipe_id)),
        )
        .one(db)
        .await?
        .ok_or(ApiError::NotInCart)?;

    shopping_cart::Entity::delete_by_id(existing.id)
        .exec(db)
        .await?;
    Ok(())
}

pub async fn subscribe(
    db: &DbPool,
    follower_id: i64,
    following_id: i64,
) -> Result<user::Model, ApiError> {
    if follower_id == following_id {
        return Err(ApiError::validation("You cannot subscribe to yourself."));
    }

    let following = user::Entity::find_by_id(following_id)
        .one(db)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    let existing = subscription::Entity::find()
        .filter(
            Condition::all()
                .add(subscription::Column::FollowerId.eq(follower_id))
                .add(subscription::Column::FollowingId.eq(following_id)),
        )
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::AlreadyFollower);
    }

    subscription::Entity::insert(subscription::ActiveModel {
        follower_id: Set(follower_id),
        following_id: Set(following_id),
        created_at: Set(Utc::now()),
        ..Default::default()
    })
    .exec(db)
    .await?;

    Ok(following)
}

pub async fn unsubscribe(db: &DbPool, follower_id: i64, following_id: i64) -> Result<(), ApiError> {
    user::Entity::find_by_id(following_id)
        .one(db)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    let existing = subscription::Entity::find()
        .filter(
            Condition::all()
                .add(subscription::Column::FollowerId.eq(follower_id))
                .add(subscription::Column::FollowingId.eq(following_id)),
        )
        .one(db)
        .await?
        .ok_or(ApiError::NotFollower)?;

    subscription::Entity::delete_by_id(existing.id)
        .exec(db)
        .await?;
    Ok(())
}

/// True iff the viewing user has favorited this specific recipe. The filter
/// is always (viewer, recipe); an anonymous viewer sees `false`.
pub async fn is_favorited(
    db: &DbPool,
    viewer: Option<i64>,
    recipe_id: i64,
) -> Result<bool, ApiError> {
    match viewer {
        Some(user_id) => Ok(favorite::Entity::find()
            .filter(
                Condition::all()
                    .add(favorite::Column::UserId.eq(user_id))
                    .add(favorite::Column::RecipeId.eq(recipe_id)),
            )
            .one(db)
            .await?
            .is_some()),
        None => Ok(false),
    }
}

pub async fn is_in_shopping_cart(
    db: &DbPool,
    viewer: Option<i64>,
    recipe_id: i64,
) -> Result<bool, ApiError> {
    match viewer {
        Some(user_id) => Ok(shopping_cart::Entity::find()
            .filter(
                Condition::all()
                    .add(shopping_cart::Column::UserId.eq(user_id))
                    .add(shopping_cart::Column::RecipeId.eq(recipe_id)),
            )
            .one(db)
            .await?
            .is_some()),
        None => Ok(false),
    }
}

pub async fn is_subscribed(
    db: &DbPool,
    viewer: Option<i64>,
    following_id: i64,
) -> Result<bool, ApiError> {
    match viewer {
        Some(follower_id) => Ok(subscription::Entity::find()
            .filter(
                Condition::all()
                    .add(subscription::Column::FollowerId.eq(follower_id))
                    .add(subscription::Column::FollowingId.eq(following_id)),
            )
            .one(db)
            .await?
            .is_some()),
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn recipe_row(id: i64, author_id: i64) -> recipe::Model {
        recipe::Model {
            id,
            author_id,
            name: "Borscht".to_string(),
            text: "Beet soup".to_string(),
            cooking_time: 60,
            image: vec![1, 2, 3],
            pub_date: Utc::now(),
        }
    }

    fn favorite_row(id: i64, user_id: i64, recipe_id: i64) -> favorite::Model {
        favorite::Model {
            id,
            user_id,
            recipe_id,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn add_favorite_inserts_when_absent() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![recipe_row(7, 1)]])
            .append_query_results([Vec::<favorite::Model>::new()])
            .append_exec_results([MockExecResult {
                last_insert_id: 1,
                rows_affected: 1,
            }])
            .into_connection();

        let recipe = add_favorite(&db, 2, 7).await.unwrap();
        assert_eq!(recipe.id, 7);
    }

    #[tokio::test]
    async fn add_favorite_twice_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![recipe_row(7, 1)]])
            .append_query_results([vec![favorite_row(3, 2, 7)]])
            .into_connection();

        let err = add_favorite(&db, 2, 7).await.unwrap_err();
        assert!(matches!(err, ApiError::AlreadyFavorite));
    }

    #[tokio::test]
    async fn add_favorite_missing_recipe_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([Vec::<recipe::Model>::new()])
            .into_connection();

        let err = add_favorite(&db, 2, 999).await.unwrap_err();
        assert!(matches!(err, ApiError::RecipeNotFound));
    }

    #[tokio::test]
    async fn remove_favorite_without_prior_add_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![recipe_row(7, 1)]])
            .append_query_results([Vec::<favorite::Model>::new()])
            .into_connection();

        let err = remove_favorite(&db, 2, 7).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFavorite));
    }

    #[tokio::test]
    async fn remove_from_cart_when_absent_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![recipe_row(7, 1)]])
            .append_query_results([Vec::<shopping_cart::Model>::new()])
            .into_connection();

        let err = remove_from_cart(&db, 2, 7).await.unwrap_err();
        assert!(matches!(err, ApiError::NotInCart));
    }

    #[tokio::test]
    async fn self_subscription_is_rejected_before_any_query() {
        let db = MockDatabase::new(DatabaseBackend::MySql).into_connection();
        let err = subscribe(&db, 5, 5).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn is_favorited_filters_by_viewer_and_recipe() {
        // Viewer 2 has the row, so the flag is true for them
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([vec![favorite_row(3, 2, 7)]])
            .into_connection();
        assert!(is_favorited(&db, Some(2), 7).await.unwrap());

        // The author (or anyone else) without a row sees false
        let db = MockDatabase::new(DatabaseBackend::MySql)
            .append_query_results([Vec::<favorite::Model>::new()])
            .into_connection();
        assert!(!is_favorited(&db, Some(1), 7).await.unwrap());

        // Anonymous viewers never hit the store
        let db = MockDatabase::new(DatabaseBackend::MySql).into_connection();
        assert!(!is_favorited(&db, None, 7).await.unwrap());
    }
}

use crate::auth::{hash_password, verify_password, AuthenticatedUser};
use crate::db::DbPool;
use crate::entities::{recipe, subscription, user};
use crate::error::ApiError;
use crate::models::{
    CompactRecipeView, RegisterRequest, RegisteredUser, SetPasswordRequest, SubscriptionView,
    UserView,
};
use crate::services::relations;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    Set,
};
use serde::Deserialize;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct PageQuery {
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 20)]
    pub limit: Option<u64>,
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = RegisteredUser),
        (status = 400, description = "Duplicate email or username")
    ),
    tag = "users"
)]
pub async fn register(
    req: web::Json<RegisterRequest>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let existing = user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Email.eq(&req.email))
                .add(user::Column::Username.eq(&req.username)),
        )
        .one(pool.get_ref())
        .await?;
    if existing.is_some() {
        return Err(ApiError::validation(
            "A user with that email or username already exists.",
        ));
    }

    let password_hash = hash_password(&req.password)?;

    let created = user::Entity::insert(user::ActiveModel {
        email: Set(req.email.clone()),
        username: Set(req.username.clone()),
        first_name: Set(req.first_name.clone()),
        last_name: Set(req.last_name.clone()),
        password_hash: Set(password_hash),
        is_active: Set(true),
        is_staff: Set(false),
        created_at: Set(Utc::now()),
        ..Default::default()
    })
    .exec_with_returning(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(RegisteredUser::from(created)))
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)")
    ),
    responses(
        (status = 200, description = "List of users", body = Vec<UserView>)
    ),
    tag = "users"
)]
pub async fn list_users(
    viewer: Option<AuthenticatedUser>,
    pool: web::Data<DbPool>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let viewer_id = viewer.map(|u| u.user_id);
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(20);
    let offset = page.saturating_sub(1).saturating_mul(limit);

    let users = user::Entity::find()
        .order_by_asc(user::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(pool.get_ref())
        .await?;

    let mut views = Vec::with_capacity(users.len());
    for user in users {
        let is_subscribed = relations::is_subscribed(pool.get_ref(), viewer_id, user.id).await?;
        views.push(UserView::new(user, is_subscribed));
    }
    Ok(HttpResponse::Ok().json(views))
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Own profile", body = UserView),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn me(
    acting: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let user = acting.fetch_user(pool.get_ref()).await?;
    let is_subscribed =
        relations::is_subscribed(pool.get_ref(), Some(acting.user_id), user.id).await?;
    Ok(HttpResponse::Ok().json(UserView::new(user, is_subscribed)))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, description = "User profile", body = UserView),
        (status = 404, description = "User not found")
    ),
    tag = "users"
)]
pub async fn retrieve_user(
    path: web::Path<i64>,
    viewer: Option<AuthenticatedUser>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    let viewer_id = viewer.map(|u| u.user_id);

    let user = user::Entity::find_by_id(user_id)
        .one(pool.get_ref())
        .await?
        .ok_or(ApiError::UserNotFound)?;
    let is_subscribed = relations::is_subscribed(pool.get_ref(), viewer_id, user.id).await?;
    Ok(HttpResponse::Ok().json(UserView::new(user, is_subscribed)))
}

#[utoipa::path(
    post,
    path = "/api/users/set_password",
    request_body = SetPasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 401, description = "Current password does not match")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn set_password(
    req: web::Json<SetPasswordRequest>,
    acting: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let user = acting.fetch_user(pool.get_ref()).await?;

    if !verify_password(&req.current_password, &user.password_hash)? {
        return Err(ApiError::IncorrectPassword);
    }

    let password_hash = hash_password(&req.new_password)?;
    let mut active: user::ActiveModel = user.into();
    active.password_hash = Set(password_hash);
    active.update(pool.get_ref()).await?;

    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/subscribe",
    params(("id" = i64, Path, description = "User to follow")),
    responses(
        (status = 201, description = "Subscribed", body = UserView),
        (status = 400, description = "Already subscribed or self-subscription"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn subscribe_user(
    path: web::Path<i64>,
    acting: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let following_id = path.into_inner();
    let following = relations::subscribe(pool.get_ref(), acting.user_id, following_id).await?;
    Ok(HttpResponse::Created().json(UserView::new(following, true)))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}/subscribe",
    params(("id" = i64, Path, description = "User to unfollow")),
    responses(
        (status = 204, description = "Unsubscribed"),
        (status = 400, description = "Not subscribed"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn unsubscribe_user(
    path: web::Path<i64>,
    acting: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let following_id = path.into_inner();
    relations::unsubscribe(pool.get_ref(), acting.user_id, following_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/users/subscriptions",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)")
    ),
    responses(
        (status = 200, description = "Followed users with their recipes", body = Vec<SubscriptionView>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn subscriptions(
    acting: AuthenticatedUser,
    pool: web::Data<DbPool>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(20);
    let offset = page.saturating_sub(1).saturating_mul(limit);

    let follows = subscription::Entity::find()
        .filter(subscription::Column::FollowerId.eq(acting.user_id))
        .order_by_asc(subscription::Column::Id)
        .limit(limit)
        .offset(offset)
        .all(pool.get_ref())
        .await?;

    let mut views = Vec::with_capacity(follows.len());
    for follow in follows {
        let Some(followed) = user::Entity::find_by_id(follow.following_id)
            .one(pool.get_ref())
            .await?
        else {
            continue;
        };
        let recipes = recipe::Entity::find()
            .filter(recipe::Column::AuthorId.eq(followed.id))
            .order_by_desc(recipe::Column::PubDate)
            .all(pool.get_ref())
            .await?;
        let recipes_count = recipes.len() as i64;
        views.push(SubscriptionView {
            email: followed.email,
            id: followed.id,
            username: followed.username,
            first_name: followed.first_name,
            last_name: followed.last_name,
            is_subscribed: true,
            recipes: recipes.into_iter().map(CompactRecipeView::from).collect(),
            recipes_count,
        });
    }
    Ok(HttpResponse::Ok().json(views))
}

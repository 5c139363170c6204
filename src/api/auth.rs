use crate::auth::{create_token, verify_password, Claims};
use crate::config::Config;
use crate::db::DbPool;
use crate::entities::user;
use crate::error::ApiError;
use crate::models::{TokenRequest, TokenResponse};
use actix_web::{web, HttpResponse};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

#[utoipa::path(
    post,
    path = "/api/auth/token/login",
    request_body = TokenRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 403, description = "Wrong password or inactive account"),
        (status = 404, description = "No user with this email")
    ),
    tag = "auth"
)]
pub async fn obtain_token(
    req: web::Json<TokenRequest>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let user = user::Entity::find()
        .filter(user::Column::Email.eq(&req.email))
        .one(pool.get_ref())
        .await?
        .ok_or(ApiError::UserNotFound)?;

    if !user.is_active {
        return Err(ApiError::TokenForbidden);
    }
    if !verify_password(&req.password, &user.password_hash)? {
        return Err(ApiError::TokenForbidden);
    }

    let claims = Claims::new(user.id, user.email.clone(), config.jwt.expiration_hours);
    let auth_token = create_token(&claims, &config.jwt.secret)?;

    Ok(HttpResponse::Ok().json(TokenResponse { auth_token }))
}

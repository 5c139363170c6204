use crate::auth::verify_token;
use crate::config::Config;
use crate::db::DbPool;
use crate::entities::user;
use crate::error::ApiError;
use actix_web::{web, Error, FromRequest, HttpRequest};
use sea_orm::EntityTrait;
use std::future::{ready, Ready};

/// The acting user, resolved from the `Authorization: Bearer` header.
/// Every domain operation takes this explicitly; there is no ambient
/// request-user state below the handler layer.
pub struct AuthenticatedUser {
    pub user_id: i64,
    #[allow(dead_code)]
    pub email: String,
}

impl AuthenticatedUser {
    /// Loads the full user row for handlers that need profile fields.
    pub async fn fetch_user(&self, db: &DbPool) -> Result<user::Model, ApiError> {
        user::Entity::find_by_id(self.user_id)
            .one(db)
            .await?
            .ok_or(ApiError::UserNotFound)
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        let auth_header = req.headers().get("Authorization");

        if let Some(header_value) = auth_header {
            if let Ok(header_str) = header_value.to_str() {
                if let Some(token) = header_str.strip_prefix("Bearer ") {
                    let config = req.app_data::<web::Data<Config>>();
                    if let Some(config) = config {
                        match verify_token(token, &config.jwt.secret) {
                            Ok(claims) => {
                                if let Some(user_id) = claims.user_id() {
                                    return ready(Ok(AuthenticatedUser {
                                        user_id,
                                        email: claims.email,
                                    }));
                                }
                            }
                            Err(_) => {
                                return ready(Err(actix_web::error::ErrorUnauthorized(
                                    "Invalid token",
                                )));
                            }
                        }
                    }
                }
            }
        }

        ready(Err(actix_web::error::ErrorUnauthorized(
            "Missing or invalid authorization header",
        )))
    }
}

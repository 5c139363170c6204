use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Domain error taxonomy. Raised at the point of detection inside service
/// code and translated to an HTTP response here, at the boundary.
///
/// Body key conventions follow the original API: `detail` for
/// not-found/auth-class failures, `errors` for domain-rule failures,
/// `auth_error` for token issuance refusals.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Page not found.")]
    UserNotFound,
    #[error("Recipe not found.")]
    RecipeNotFound,
    #[error("No such ingredient exists.")]
    IngredientNotFound,
    #[error("Tag not found.")]
    TagNotFound,

    #[error("Already favorited.")]
    AlreadyFavorite,
    #[error("Recipe is not in favorites.")]
    NotFavorite,
    #[error("Already in shopping cart.")]
    AlreadyInCart,
    #[error("Recipe is not in the shopping cart.")]
    NotInCart,
    #[error("Already subscribed.")]
    AlreadyFollower,
    #[error("Not subscribed.")]
    NotFollower,

    #[error("Incorrect password.")]
    IncorrectPassword,
    #[error("Token issuance refused.")]
    TokenForbidden,
    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("{0}")]
    Validation(String),

    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),
    #[error("Internal server error")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::Validation(msg.into())
    }

    fn body_key(&self) -> &'static str {
        match self {
            ApiError::UserNotFound
            | ApiError::RecipeNotFound
            | ApiError::IngredientNotFound
            | ApiError::TagNotFound
            | ApiError::IncorrectPassword
            | ApiError::Forbidden
            | ApiError::Database(_)
            | ApiError::Internal(_) => "detail",
            ApiError::TokenForbidden => "auth_error",
            _ => "errors",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::UserNotFound
            | ApiError::RecipeNotFound
            | ApiError::IngredientNotFound
            | ApiError::TagNotFound => StatusCode::NOT_FOUND,
            ApiError::AlreadyFavorite
            | ApiError::NotFavorite
            | ApiError::AlreadyInCart
            | ApiError::NotInCart
            | ApiError::AlreadyFollower
            | ApiError::NotFollower
            | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::IncorrectPassword => StatusCode::UNAUTHORIZED,
            ApiError::TokenForbidden | ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Database(e) => {
                log::error!("Database error: {:?}", e);
                return HttpResponse::InternalServerError()
                    .json(json!({"detail": "Internal server error"}));
            }
            ApiError::Internal(e) => {
                log::error!("Internal error: {:?}", e);
                return HttpResponse::InternalServerError()
                    .json(json!({"detail": "Internal server error"}));
            }
            _ => {}
        }
        HttpResponse::build(self.status_code()).json(json!({self.body_key(): self.to_string()}))
    }
}

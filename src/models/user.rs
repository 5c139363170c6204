use crate::entities::user;
use crate::models::CompactRecipeView;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Registration echo: profile fields only, never a token and never the hash.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisteredUser {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<user::Model> for RegisteredUser {
    fn from(user: user::Model) -> Self {
        RegisteredUser {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub auth_token: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetPasswordRequest {
    pub new_password: String,
    pub current_password: String,
}

/// Profile read shape; `is_subscribed` is computed for the viewing user.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserView {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

impl UserView {
    pub fn new(user: user::Model, is_subscribed: bool) -> Self {
        UserView {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

/// Entry in the subscriptions listing: the followed user plus their recipes.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubscriptionView {
    pub email: String,
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub recipes: Vec<CompactRecipeView>,
    pub recipes_count: i64,
}

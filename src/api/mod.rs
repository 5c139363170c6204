pub mod auth;
pub mod catalog;
pub mod recipes;
pub mod users;

use crate::models::{
    CompactRecipeView, IngredientAmount, IngredientInRecipeView, IngredientView, RecipeView,
    RecipeWriteRequest, RegisterRequest, RegisteredUser, SetPasswordRequest, SubscriptionView,
    TagView, TokenRequest, TokenResponse, UserView,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        // Auth endpoints
        auth::obtain_token,
        // User endpoints
        users::register,
        users::list_users,
        users::me,
        users::retrieve_user,
        users::set_password,
        users::subscribe_user,
        users::unsubscribe_user,
        users::subscriptions,
        // Recipe endpoints
        recipes::list_recipes,
        recipes::create_recipe,
        recipes::retrieve_recipe,
        recipes::update_recipe,
        recipes::delete_recipe,
        recipes::add_favorite,
        recipes::remove_favorite,
        recipes::add_to_cart,
        recipes::remove_from_cart,
        recipes::download_shopping_cart,
        // Catalog endpoints
        catalog::list_tags,
        catalog::retrieve_tag,
        catalog::list_ingredients,
        catalog::retrieve_ingredient,
    ),
    components(schemas(
        // Auth schemas
        TokenRequest,
        TokenResponse,
        // User schemas
        RegisterRequest,
        RegisteredUser,
        SetPasswordRequest,
        UserView,
        SubscriptionView,
        // Recipe schemas
        RecipeWriteRequest,
        IngredientAmount,
        RecipeView,
        IngredientInRecipeView,
        CompactRecipeView,
        // Catalog schemas
        TagView,
        IngredientView,
        // Query schemas
        users::PageQuery,
        recipes::RecipeListQuery,
        catalog::TagListQuery,
        catalog::IngredientListQuery,
    )),
    tags(
        (name = "auth", description = "Token issuance"),
        (name = "users", description = "Registration, profiles and subscriptions"),
        (name = "recipes", description = "Recipes, favorites and the shopping cart"),
        (name = "catalog", description = "Read-only tag and ingredient reference data"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

use utoipa::Modify;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

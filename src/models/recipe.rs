use crate::entities::recipe;
use crate::models::{TagView, UserView};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct IngredientAmount {
    pub id: i64,
    #[schema(minimum = 1)]
    pub amount: i32,
}

/// Write shape for recipe create/update. The author is never part of this
/// payload; it is always the acting user.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecipeWriteRequest {
    pub tags: Vec<i64>,
    pub ingredients: Vec<IngredientAmount>,
    pub name: String,
    pub text: String,
    #[schema(minimum = 1)]
    pub cooking_time: i32,
    /// `data:image/...;base64,` payload, decoded server-side.
    pub image: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngredientInRecipeView {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Full read shape, returned by every recipe endpoint including writes.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecipeView {
    pub id: i64,
    pub tags: Vec<TagView>,
    pub author: UserView,
    pub ingredients: Vec<IngredientInRecipeView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    /// Stored image bytes, base64-encoded.
    pub image: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CompactRecipeView {
    pub id: i64,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<recipe::Model> for CompactRecipeView {
    fn from(recipe: recipe::Model) -> Self {
        CompactRecipeView {
            id: recipe.id,
            name: recipe.name,
            image: BASE64.encode(&recipe.image),
            cooking_time: recipe.cooking_time,
        }
    }
}

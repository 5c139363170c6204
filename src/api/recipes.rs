use crate::auth::AuthenticatedUser;
use crate::db::DbPool;
use crate::error::ApiError;
use crate::models::{CompactRecipeView, RecipeWriteRequest};
use crate::services::{recipes, relations, shopping_list};
use crate::services::recipes::RecipeFilters;
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RecipeListQuery {
    #[schema(example = 1)]
    pub page: Option<u64>,
    #[schema(example = 20)]
    pub limit: Option<u64>,
    pub author: Option<i64>,
    pub is_favorited: Option<String>,
    pub is_in_shopping_cart: Option<String>,
}

/// `tags` may repeat (`?tags=breakfast&tags=dinner`), which `web::Query`
/// cannot express, so the slugs are pulled from the raw query string.
fn tag_slugs_from_query(query: &str) -> Vec<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .filter(|(key, _)| *key == "tags")
        .map(|(_, value)| value.to_string())
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/recipes",
    params(
        ("page" = Option<u64>, Query, description = "Page number (default: 1)"),
        ("limit" = Option<u64>, Query, description = "Items per page (default: 20)"),
        ("author" = Option<i64>, Query, description = "Filter by author id"),
        ("tags" = Option<String>, Query, description = "Filter by tag slug, repeatable"),
        ("is_favorited" = Option<String>, Query, description = "1 = only own favorites"),
        ("is_in_shopping_cart" = Option<String>, Query, description = "1 = only own cart")
    ),
    responses(
        (status = 200, description = "List of recipes", body = Vec<RecipeView>)
    ),
    tag = "recipes"
)]
pub async fn list_recipes(
    req: HttpRequest,
    viewer: Option<AuthenticatedUser>,
    pool: web::Data<DbPool>,
    query: web::Query<RecipeListQuery>,
) -> Result<HttpResponse, ApiError> {
    let viewer_id = viewer.map(|u| u.user_id);
    let filters = RecipeFilters {
        author: query.author,
        tag_slugs: tag_slugs_from_query(req.query_string()),
        is_favorited: query.is_favorited.as_deref() == Some("1"),
        is_in_shopping_cart: query.is_in_shopping_cart.as_deref() == Some("1"),
    };
    let page = query.page.unwrap_or(1);
    let limit = query.limit.unwrap_or(20);

    let views = recipes::list_recipes(pool.get_ref(), viewer_id, &filters, page, limit).await?;
    Ok(HttpResponse::Ok().json(views))
}

#[utoipa::path(
    post,
    path = "/api/recipes",
    request_body = RecipeWriteRequest,
    responses(
        (status = 201, description = "Recipe created", body = RecipeView),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown ingredient")
    ),
    security(("bearer_auth" = [])),
    tag = "recipes"
)]
pub async fn create_recipe(
    req: web::Json<RecipeWriteRequest>,
    acting: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let author = acting.fetch_user(pool.get_ref()).await?;
    let view = recipes::create_recipe(pool.get_ref(), &author, &req).await?;
    Ok(HttpResponse::Created().json(view))
}

#[utoipa::path(
    get,
    path = "/api/recipes/{id}",
    params(("id" = i64, Path, description = "Recipe id")),
    responses(
        (status = 200, description = "Recipe", body = RecipeView),
        (status = 404, description = "Recipe not found")
    ),
    tag = "recipes"
)]
pub async fn retrieve_recipe(
    path: web::Path<i64>,
    viewer: Option<AuthenticatedUser>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let viewer_id = viewer.map(|u| u.user_id);
    let view = recipes::get_recipe_view(pool.get_ref(), path.into_inner(), viewer_id).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[utoipa::path(
    patch,
    path = "/api/recipes/{id}",
    params(("id" = i64, Path, description = "Recipe id")),
    request_body = RecipeWriteRequest,
    responses(
        (status = 200, description = "Recipe updated", body = RecipeView),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearer_auth" = [])),
    tag = "recipes"
)]
pub async fn update_recipe(
    path: web::Path<i64>,
    req: web::Json<RecipeWriteRequest>,
    acting: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let view =
        recipes::update_recipe(pool.get_ref(), acting.user_id, path.into_inner(), &req).await?;
    Ok(HttpResponse::Ok().json(view))
}

#[utoipa::path(
    delete,
    path = "/api/recipes/{id}",
    params(("id" = i64, Path, description = "Recipe id")),
    responses(
        (status = 204, description = "Recipe deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearer_auth" = [])),
    tag = "recipes"
)]
pub async fn delete_recipe(
    path: web::Path<i64>,
    acting: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    recipes::delete_recipe(pool.get_ref(), acting.user_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/recipes/{id}/favorite",
    params(("id" = i64, Path, description = "Recipe id")),
    responses(
        (status = 201, description = "Added to favorites", body = CompactRecipeView),
        (status = 400, description = "Already favorited"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearer_auth" = [])),
    tag = "recipes"
)]
pub async fn add_favorite(
    path: web::Path<i64>,
    acting: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let recipe = relations::add_favorite(pool.get_ref(), acting.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Created().json(CompactRecipeView::from(recipe)))
}

#[utoipa::path(
    delete,
    path = "/api/recipes/{id}/favorite",
    params(("id" = i64, Path, description = "Recipe id")),
    responses(
        (status = 204, description = "Removed from favorites"),
        (status = 400, description = "Not in favorites"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearer_auth" = [])),
    tag = "recipes"
)]
pub async fn remove_favorite(
    path: web::Path<i64>,
    acting: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    relations::remove_favorite(pool.get_ref(), acting.user_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    post,
    path = "/api/recipes/{id}/shopping_cart",
    params(("id" = i64, Path, description = "Recipe id")),
    responses(
        (status = 201, description = "Added to cart", body = CompactRecipeView),
        (status = 400, description = "Already in cart"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearer_auth" = [])),
    tag = "recipes"
)]
pub async fn add_to_cart(
    path: web::Path<i64>,
    acting: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let recipe = relations::add_to_cart(pool.get_ref(), acting.user_id, path.into_inner()).await?;
    Ok(HttpResponse::Created().json(CompactRecipeView::from(recipe)))
}

#[utoipa::path(
    delete,
    path = "/api/recipes/{id}/shopping_cart",
    params(("id" = i64, Path, description = "Recipe id")),
    responses(
        (status = 204, description = "Removed from cart"),
        (status = 400, description = "Not in cart"),
        (status = 404, description = "Recipe not found")
    ),
    security(("bearer_auth" = [])),
    tag = "recipes"
)]
pub async fn remove_from_cart(
    path: web::Path<i64>,
    acting: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    relations::remove_from_cart(pool.get_ref(), acting.user_id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/recipes/download_shopping_cart",
    responses(
        (status = 200, description = "Plain-text shopping list attachment"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "recipes"
)]
pub async fn download_shopping_cart(
    acting: AuthenticatedUser,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let user = acting.fetch_user(pool.get_ref()).await?;
    let report = shopping_list::build_shopping_list(pool.get_ref(), &user).await?;
    let filename = shopping_list::attachment_filename(&user.username);

    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .append_header((
            "Content-Disposition",
            format!("attachment; filename={}", filename),
        ))
        .body(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_tags_params_are_all_collected() {
        let slugs = tag_slugs_from_query("tags=breakfast&page=1&tags=dinner");
        assert_eq!(slugs, vec!["breakfast", "dinner"]);
    }

    #[test]
    fn no_tags_param_yields_empty() {
        assert!(tag_slugs_from_query("page=2&limit=5").is_empty());
        assert!(tag_slugs_from_query("").is_empty());
    }
}

use crate::db::DbPool;
use crate::entities::{ingredient, tag};
use crate::error::ApiError;
use crate::models::{IngredientView, TagView};
use actix_web::{web, HttpResponse};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Deserialize;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct TagListQuery {
    pub slug: Option<String>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct IngredientListQuery {
    pub name: Option<String>,
}

/// Decodes `%xx` escapes. Only applied when the raw value starts with a
/// literal `%`, which survives an extra round of client-side encoding.
fn decode_percent_escapes(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn normalize_name_query(raw: &str) -> String {
    if raw.starts_with('%') {
        decode_percent_escapes(raw)
    } else {
        raw.to_string()
    }
}

#[utoipa::path(
    get,
    path = "/api/tags",
    params(("slug" = Option<String>, Query, description = "Exact slug filter")),
    responses((status = 200, description = "List of tags", body = Vec<TagView>)),
    tag = "catalog"
)]
pub async fn list_tags(
    pool: web::Data<DbPool>,
    query: web::Query<TagListQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut find = tag::Entity::find().order_by_asc(tag::Column::Id);
    if let Some(slug) = &query.slug {
        find = find.filter(tag::Column::Slug.eq(slug));
    }
    let tags = find.all(pool.get_ref()).await?;
    let views = tags
        .into_iter()
        .map(TagView::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HttpResponse::Ok().json(views))
}

#[utoipa::path(
    get,
    path = "/api/tags/{id}",
    params(("id" = i64, Path, description = "Tag id")),
    responses(
        (status = 200, description = "Tag", body = TagView),
        (status = 404, description = "Tag not found")
    ),
    tag = "catalog"
)]
pub async fn retrieve_tag(
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let tag = tag::Entity::find_by_id(path.into_inner())
        .one(pool.get_ref())
        .await?
        .ok_or(ApiError::TagNotFound)?;
    Ok(HttpResponse::Ok().json(TagView::try_from(tag)?))
}

#[utoipa::path(
    get,
    path = "/api/ingredients",
    params(("name" = Option<String>, Query, description = "Case-insensitive name search")),
    responses((status = 200, description = "List of ingredients", body = Vec<IngredientView>)),
    tag = "catalog"
)]
pub async fn list_ingredients(
    pool: web::Data<DbPool>,
    query: web::Query<IngredientListQuery>,
) -> Result<HttpResponse, ApiError> {
    let mut find = ingredient::Entity::find().order_by_asc(ingredient::Column::Name);
    if let Some(name) = &query.name {
        let name = normalize_name_query(name);
        if !name.is_empty() {
            find = find.filter(ingredient::Column::Name.contains(&name));
        }
    }
    let ingredients = find.all(pool.get_ref()).await?;
    let views: Vec<IngredientView> = ingredients.into_iter().map(IngredientView::from).collect();
    Ok(HttpResponse::Ok().json(views))
}

#[utoipa::path(
    get,
    path = "/api/ingredients/{id}",
    params(("id" = i64, Path, description = "Ingredient id")),
    responses(
        (status = 200, description = "Ingredient", body = IngredientView),
        (status = 404, description = "Ingredient not found")
    ),
    tag = "catalog"
)]
pub async fn retrieve_ingredient(
    path: web::Path<i64>,
    pool: web::Data<DbPool>,
) -> Result<HttpResponse, ApiError> {
    let ingredient = ingredient::Entity::find_by_id(path.into_inner())
        .one(pool.get_ref())
        .await?
        .ok_or(ApiError::IngredientNotFound)?;
    Ok(HttpResponse::Ok().json(IngredientView::from(ingredient)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(normalize_name_query("salt"), "salt");
        assert_eq!(normalize_name_query("Red onion"), "Red onion");
    }

    #[test]
    fn leading_percent_triggers_decoding() {
        assert_eq!(normalize_name_query("%20salt"), " salt");
        assert_eq!(normalize_name_query("%25"), "%");
    }

    #[test]
    fn bare_percent_is_kept_literally() {
        assert_eq!(normalize_name_query("%"), "%");
        assert_eq!(normalize_name_query("%zz"), "%zz");
    }
}

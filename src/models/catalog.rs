use crate::entities::{ingredient, tag};
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TagView {
    pub id: i64,
    pub name: String,
    /// Normalized `#rrggbb`, lowercase.
    pub color: String,
    pub slug: String,
}

/// Expands `#abc` to `#aabbcc` and lowercases; `None` for anything that is
/// not a real hex color.
pub fn normalize_hex_color(raw: &str) -> Option<String> {
    let hex = raw.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let mut out = String::with_capacity(7);
            out.push('#');
            for c in hex.chars() {
                let c = c.to_ascii_lowercase();
                out.push(c);
                out.push(c);
            }
            Some(out)
        }
        6 => Some(format!("#{}", hex.to_ascii_lowercase())),
        _ => None,
    }
}

impl TryFrom<tag::Model> for TagView {
    type Error = ApiError;

    fn try_from(tag: tag::Model) -> Result<Self, ApiError> {
        let color = normalize_hex_color(&tag.color)
            .ok_or_else(|| ApiError::validation("No such color exists"))?;
        Ok(TagView {
            id: tag.id,
            name: tag.name,
            color,
            slug: tag.slug,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IngredientView {
    pub id: i64,
    pub name: String,
    pub measurement_unit: String,
}

impl From<ingredient::Model> for IngredientView {
    fn from(ingredient: ingredient::Model) -> Self {
        IngredientView {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
        }
    }
}

//! Shopping-list aggregation: every ingredient referenced by a recipe in
//! the user's cart, summed across recipes and grouped by ingredient
//! identity (name + measurement unit), rendered as a flat text report.
//! Lines are sorted alphabetically by name so the output is deterministic.

use crate::db::DbPool;
use crate::entities::{ingredient, recipe_ingredient, shopping_cart, user};
use crate::error::ApiError;
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use std::collections::BTreeMap;

const DATE_FORMAT: &str = "%d-%m-%Y %H:%M";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

/// Groups (name, unit, amount) rows by ingredient identity and sums the
/// amounts. The BTreeMap key gives the stable alphabetical order.
pub fn aggregate_items<I>(rows: I) -> Vec<ShoppingItem>
where
    I: IntoIterator<Item = (String, String, i64)>,
{
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for (name, unit, amount) in rows {
        *totals.entry((name, unit)).or_insert(0) += amount;
    }
    totals
        .into_iter()
        .map(|((name, measurement_unit), total)| ShoppingItem {
            name,
            measurement_unit,
            total,
        })
        .collect()
}

pub fn render_report(
    first_name: &str,
    last_name: &str,
    generated_at: DateTime<Utc>,
    items: &[ShoppingItem],
) -> String {
    let mut report = format!(
        "Shopping list for:\n\n{} {}\n{}\n",
        first_name,
        last_name,
        generated_at.format(DATE_FORMAT)
    );
    for item in items {
        report.push_str(&format!(
            "{}: {} {}\n",
            item.name, item.total, item.measurement_unit
        ));
    }
    report.push_str("\nGenerated by Recipebook");
    report
}

/// Materializes the shopping list text for one user.
pub async fn build_shopping_list(db: &DbPool, user: &user::Model) -> Result<String, ApiError> {
    let recipe_ids: Vec<i64> = shopping_cart::Entity::find()
        .filter(shopping_cart::Column::UserId.eq(user.id))
        .all(db)
        .await?
        .into_iter()
        .map(|entry| entry.recipe_id)
        .collect();

    let rows = recipe_ingredient::Entity::find()
        .filter(recipe_ingredient::Column::RecipeId.is_in(recipe_ids))
        .find_also_related(ingredient::Entity)
        .all(db)
        .await?;

    let items = aggregate_items(rows.into_iter().filter_map(|(row, ing)| {
        ing.map(|ing| (ing.name, ing.measurement_unit, row.amount as i64))
    }));

    Ok(render_report(
        &user.first_name,
        &user.last_name,
        Utc::now(),
        &items,
    ))
}

pub fn attachment_filename(username: &str) -> String {
    format!("{}_buy_list.txt", username)
}

use bpg_common::Money;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::db_types::MenuItem;

/// Fetches the catalog rows for the given ids. Missing ids are simply absent from the result.
pub async fn items_by_ids(ids: &[i64], conn: &mut SqliteConnection) -> Result<Vec<MenuItem>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut builder = QueryBuilder::new("SELECT * FROM menu_items WHERE id IN (");
    let mut values = builder.separated(", ");
    for id in ids {
        values.push_bind(id);
    }
    builder.push(")");
    let items = builder.build_query_as::<MenuItem>().fetch_all(conn).await?;
    Ok(items)
}

/// Inserts a catalog row. Catalog maintenance is owned by the menu collaborator; this is the seed
/// path used by deployments and tests.
pub async fn insert_menu_item(
    name: &str,
    price: Money,
    is_available: bool,
    is_active: bool,
    conn: &mut SqliteConnection,
) -> Result<MenuItem, sqlx::Error> {
    let item = sqlx::query_as(
        r#"
            INSERT INTO menu_items (name, price, is_available, is_active)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(name)
    .bind(price.value())
    .bind(is_available)
    .bind(is_active)
    .fetch_one(conn)
    .await?;
    Ok(item)
}

/// Flips the availability flag on a catalog row.
pub async fn set_item_availability(
    id: i64,
    is_available: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<MenuItem>, sqlx::Error> {
    let item = sqlx::query_as(
        "UPDATE menu_items SET is_available = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *",
    )
    .bind(is_available)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(item)
}

//! Database operations for the `pricelist` table.

use dff_core::PriceInputs;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A full row from the `pricelist` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PricelistRow {
    pub id: i64,
    pub category: String,
    pub product_name: String,
    pub package_name: Option<String>,
    pub description: Option<String>,
    pub retail_sales_price: Decimal,
    /// Stored token, `"each"` or `"lbs"`; parsed by the pricing calculator.
    pub dff_unit_of_measure: String,
    pub lowest_weight: Option<Decimal>,
    pub highest_weight: Option<Decimal>,
    pub num_of_items: Option<i32>,
    /// LocalLine product id used for inventory updates.
    pub local_line_product_id: Option<i64>,
    /// LocalLine product id the price sync patches.
    pub local_line_connected_vendor_product_id: Option<i64>,
    pub available_on_ll: bool,
    pub visible: bool,
    pub track_inventory: bool,
    pub stock_inventory: i32,
}

impl PricelistRow {
    /// Borrows the fields the pricing calculator needs.
    #[must_use]
    pub fn price_inputs(&self) -> PriceInputs<'_> {
        PriceInputs {
            unit_of_measure: &self.dff_unit_of_measure,
            retail_sales_price: self.retail_sales_price,
            lowest_weight: self.lowest_weight,
            highest_weight: self.highest_weight,
        }
    }
}

/// The inventory projection served to the inventory page.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InventoryRow {
    pub id: i64,
    pub category: String,
    pub product_name: String,
    pub package_name: Option<String>,
    pub description: Option<String>,
    pub local_line_product_id: Option<i64>,
    pub available_on_ll: bool,
    pub visible: bool,
    pub track_inventory: bool,
    pub stock_inventory: i32,
}

/// Caller-supplied predicate for the price sync's candidate query.
///
/// Rows without a connected-vendor product id are never candidates.
#[derive(Debug, Clone, Copy, Default)]
pub struct CandidateFilter<'a> {
    pub category: Option<&'a str>,
    pub limit: Option<i64>,
}

/// Fields the inventory page may change on a single row.
///
/// `None` for `description` or `product_name` leaves the stored value as is.
#[derive(Debug, Clone, Copy)]
pub struct InventoryUpdate<'a> {
    pub visible: bool,
    pub track_inventory: bool,
    pub stock_inventory: i32,
    pub description: Option<&'a str>,
    pub product_name: Option<&'a str>,
}

const PRICELIST_COLUMNS: &str = "id, category, product_name, package_name, description, \
     retail_sales_price, dff_unit_of_measure, lowest_weight, highest_weight, num_of_items, \
     local_line_product_id, local_line_connected_vendor_product_id, available_on_ll, \
     visible, track_inventory, stock_inventory";

const INVENTORY_COLUMNS: &str = "id, category, product_name, package_name, description, \
     local_line_product_id, available_on_ll, visible, track_inventory, stock_inventory";

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Returns rows linked to a LocalLine connected-vendor product, optionally
/// restricted to one category and capped at `limit` rows, in `id` order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_candidates(
    pool: &PgPool,
    filter: CandidateFilter<'_>,
) -> Result<Vec<PricelistRow>, DbError> {
    let sql = format!(
        "SELECT {PRICELIST_COLUMNS} FROM pricelist \
         WHERE local_line_connected_vendor_product_id IS NOT NULL \
           AND ($1::text IS NULL OR category = $1) \
         ORDER BY id \
         LIMIT $2"
    );

    let rows = sqlx::query_as::<_, PricelistRow>(&sql)
        .bind(filter.category)
        .bind(filter.limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}

/// Returns every row ordered by category, then product name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_pricelist(pool: &PgPool) -> Result<Vec<PricelistRow>, DbError> {
    let sql = format!(
        "SELECT {PRICELIST_COLUMNS} FROM pricelist ORDER BY category, product_name, id"
    );
    let rows = sqlx::query_as::<_, PricelistRow>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Returns the inventory projection of rows offered on LocalLine, ordered by
/// category, then product name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_available_inventory(pool: &PgPool) -> Result<Vec<InventoryRow>, DbError> {
    let sql = format!(
        "SELECT {INVENTORY_COLUMNS} FROM pricelist \
         WHERE available_on_ll IS TRUE \
         ORDER BY category, product_name, id"
    );
    let rows = sqlx::query_as::<_, InventoryRow>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Returns the inventory projection of a single row, if it exists.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_inventory_item(pool: &PgPool, id: i64) -> Result<Option<InventoryRow>, DbError> {
    let sql = format!("SELECT {INVENTORY_COLUMNS} FROM pricelist WHERE id = $1");
    let row = sqlx::query_as::<_, InventoryRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Updates visibility, tracking, stock and (optionally) name/description of
/// one row by primary key.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has `id`, or [`DbError::Sqlx`] if
/// the update fails.
pub async fn update_inventory(
    pool: &PgPool,
    id: i64,
    update: &InventoryUpdate<'_>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE pricelist SET \
             visible         = $1, \
             track_inventory = $2, \
             stock_inventory = $3, \
             description     = COALESCE($4, description), \
             product_name    = COALESCE($5, product_name), \
             updated_at      = NOW() \
         WHERE id = $6",
    )
    .bind(update.visible)
    .bind(update.track_inventory)
    .bind(update.stock_inventory)
    .bind(update.description)
    .bind(update.product_name)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

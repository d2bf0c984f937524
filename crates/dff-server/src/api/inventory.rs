//! Inventory page routes: list offered products and edit one.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use dff_db::{InventoryRow, InventoryUpdate};
use dff_localline::ProductUpdate;
use serde::{Deserialize, Serialize};

use super::{map_db_error, ApiError, ApiResponse, AppState};
use crate::inventory_log::InventoryLogRecord;
use crate::middleware::{AuthUser, RequestId};

#[derive(Debug, Serialize)]
pub(super) struct InventoryItem {
    id: i64,
    category: String,
    product_name: String,
    package_name: Option<String>,
    description: Option<String>,
    local_line_product_id: Option<i64>,
    visible: bool,
    track_inventory: bool,
    stock_inventory: i32,
}

impl From<InventoryRow> for InventoryItem {
    fn from(row: InventoryRow) -> Self {
        Self {
            id: row.id,
            category: row.category,
            product_name: row.product_name,
            package_name: row.package_name,
            description: row.description,
            local_line_product_id: row.local_line_product_id,
            visible: row.visible,
            track_inventory: row.track_inventory,
            stock_inventory: row.stock_inventory,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateInventoryBody {
    visible: bool,
    track_inventory: bool,
    stock_inventory: i32,
    #[serde(default, alias = "productName")]
    product_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(super) struct UpdateStatus {
    id: i64,
    product_name: String,
    database_update: bool,
    local_line_update: bool,
}

pub(super) async fn list_inventory(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = dff_db::list_available_inventory(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let items: Vec<InventoryItem> = rows.into_iter().map(InventoryItem::from).collect();
    Ok(Json(ApiResponse::new(req_id.0, items)))
}

pub(super) async fn update_inventory(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateInventoryBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.stock_inventory < 0 {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "stock_inventory must not be negative",
        ));
    }

    let existing = dff_db::get_inventory_item(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "product not found"))?;

    let update = InventoryUpdate {
        visible: body.visible,
        track_inventory: body.track_inventory,
        stock_inventory: body.stock_inventory,
        description: body.description.as_deref(),
        product_name: body.product_name.as_deref(),
    };
    dff_db::update_inventory(&state.pool, id, &update)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    tracing::info!(
        id,
        user_id = user.0,
        visible = body.visible,
        track_inventory = body.track_inventory,
        stock_inventory = body.stock_inventory,
        "inventory row updated"
    );

    let record = InventoryLogRecord::now(
        id,
        &existing.product_name,
        existing.package_name.as_deref(),
        body.visible,
        body.track_inventory,
        body.stock_inventory,
    );
    if let Err(e) = state.inventory_log.append(&record).await {
        tracing::error!(id, error = %e, "failed to append inventory log");
    }

    let local_line_update = match existing.local_line_product_id {
        Some(product_id) => {
            let patch = ProductUpdate::from_inventory(
                body.visible,
                body.track_inventory,
                body.stock_inventory,
                body.description.as_deref(),
                body.product_name.as_deref(),
            );
            push_to_localline(&state, product_id, &patch).await
        }
        None => {
            tracing::error!(id, "row has no LocalLine product id; LocalLine not updated");
            false
        }
    };

    Ok(Json(ApiResponse::new(
        req_id.0,
        UpdateStatus {
            id,
            product_name: body.product_name.unwrap_or(existing.product_name),
            database_update: true,
            local_line_update,
        },
    )))
}

/// Pushes `patch` to LocalLine. Failures are logged and reported as `false`;
/// the database change stands either way.
async fn push_to_localline(state: &AppState, product_id: i64, patch: &ProductUpdate) -> bool {
    let token = match state
        .localline
        .authenticate(&state.config.ll_username, &state.config.ll_password)
        .await
    {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(product_id, error = %e, "LocalLine authentication failed");
            return false;
        }
    };

    match state.localline.update_product(&token, product_id, patch).await {
        Ok(()) => {
            tracing::info!(product_id, "LocalLine product updated");
            true
        }
        Err(e) => {
            tracing::error!(product_id, error = %e, "LocalLine product update failed");
            false
        }
    }
}

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::error::BridgeError;
use crate::middleware::{TenantErp, ValidJson, ValidQuery};
use crate::router::AppState;
use crate::service::products;
use crate::types::ErpList;
use crate::types::product::{CreateProductInput, CreatedProduct, EditProductInput, Product, ProductListQuery};

fn product_not_found() -> BridgeError {
    BridgeError::NotFound("Product not found".into())
}

pub async fn create(
    TenantErp { erp, .. }: TenantErp,
    ValidJson(input): ValidJson<CreateProductInput>,
) -> Result<(StatusCode, Json<CreatedProduct>), BridgeError> {
    let created = products::create(&erp, input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    TenantErp { erp, .. }: TenantErp,
    Path(id): Path<String>,
    ValidJson(input): ValidJson<EditProductInput>,
) -> Result<Json<Value>, BridgeError> {
    products::update(&erp, &id, input).await?;
    Ok(Json(json!({ "message": "Product updated" })))
}

pub async fn delete(
    TenantErp { erp, .. }: TenantErp,
    Path(id): Path<String>,
) -> Result<Json<Value>, BridgeError> {
    products::delete(&erp, &id).await?;
    Ok(Json(json!({ "message": "Product deleted" })))
}

pub async fn get(
    TenantErp { erp, .. }: TenantErp,
    Path(id): Path<String>,
) -> Result<Json<Product>, BridgeError> {
    products::get(&erp, &id)
        .await?
        .map(Json)
        .ok_or_else(product_not_found)
}

pub async fn stock(
    TenantErp { erp, .. }: TenantErp,
    Path(id): Path<String>,
) -> Result<Json<Value>, BridgeError> {
    let quantity = products::stock(&erp, &id).await?;
    Ok(Json(json!({ "item_code": id, "actual_qty": quantity })))
}

pub async fn list(
    TenantErp { erp, .. }: TenantErp,
    ValidQuery(query): ValidQuery<ProductListQuery>,
) -> Result<Json<ErpList<Product>>, BridgeError> {
    Ok(Json(products::list(&erp, &query).await?))
}

/// Unauthenticated lookup scoped by the tenant id in the path.
pub async fn public_by_barcode(
    State(state): State<AppState>,
    Path((tenant_id, barcode)): Path<(String, String)>,
) -> Result<Json<Product>, BridgeError> {
    if state.storage.find_user(&tenant_id).await?.is_none() {
        return Err(product_not_found());
    }
    let erp = state.connections.client_for_user(&tenant_id).await?;
    products::find_by_barcode(&erp, &barcode)
        .await?
        .map(Json)
        .ok_or_else(product_not_found)
}

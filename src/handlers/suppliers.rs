use axum::Json;
use axum::extract::Path;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::error::BridgeError;
use crate::middleware::{TenantErp, ValidJson, ValidQuery};
use crate::service::suppliers;
use crate::types::ErpList;
use crate::types::supplier::{CreateSupplierInput, EditSupplierInput, SupplierListQuery};

pub async fn create(
    TenantErp { erp, .. }: TenantErp,
    ValidJson(input): ValidJson<CreateSupplierInput>,
) -> Result<(StatusCode, Json<Value>), BridgeError> {
    suppliers::create(&erp, input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Supplier created" }))))
}

pub async fn update(
    TenantErp { erp, .. }: TenantErp,
    Path(id): Path<String>,
    ValidJson(input): ValidJson<EditSupplierInput>,
) -> Result<Json<Value>, BridgeError> {
    suppliers::update(&erp, &id, input).await?;
    Ok(Json(json!({ "message": "Supplier updated" })))
}

pub async fn delete(
    TenantErp { erp, .. }: TenantErp,
    Path(id): Path<String>,
) -> Result<Json<Value>, BridgeError> {
    suppliers::delete(&erp, &id).await?;
    Ok(Json(json!({ "message": "Supplier deleted" })))
}

pub async fn get(
    TenantErp { erp, .. }: TenantErp,
    Path(id): Path<String>,
) -> Result<Json<Value>, BridgeError> {
    Ok(Json(suppliers::get(&erp, &id).await?))
}

pub async fn list(
    TenantErp { erp, .. }: TenantErp,
    ValidQuery(query): ValidQuery<SupplierListQuery>,
) -> Result<Json<ErpList<Value>>, BridgeError> {
    Ok(Json(suppliers::list(&erp, &query).await?))
}

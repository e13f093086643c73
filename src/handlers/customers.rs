use axum::Json;
use axum::extract::Path;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::error::BridgeError;
use crate::middleware::{TenantErp, ValidJson};
use crate::service::customers;
use crate::types::customer::{CreateCustomerInput, EditCustomerInput};

pub async fn create(
    TenantErp { erp, .. }: TenantErp,
    ValidJson(input): ValidJson<CreateCustomerInput>,
) -> Result<(StatusCode, Json<Value>), BridgeError> {
    customers::create(&erp, input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Customer created" }))))
}

pub async fn update(
    TenantErp { erp, .. }: TenantErp,
    Path(id): Path<String>,
    ValidJson(input): ValidJson<EditCustomerInput>,
) -> Result<Json<Value>, BridgeError> {
    customers::update(&erp, &id, input).await?;
    Ok(Json(json!({ "message": "Customer updated" })))
}

pub async fn delete(
    TenantErp { erp, .. }: TenantErp,
    Path(id): Path<String>,
) -> Result<Json<Value>, BridgeError> {
    customers::delete(&erp, &id).await?;
    Ok(Json(json!({ "message": "Customer deleted" })))
}

pub async fn get(
    TenantErp { erp, .. }: TenantErp,
    Path(id): Path<String>,
) -> Result<Json<Value>, BridgeError> {
    Ok(Json(customers::get(&erp, &id).await?))
}

pub async fn list(TenantErp { erp, .. }: TenantErp) -> Result<Json<Vec<Value>>, BridgeError> {
    Ok(Json(customers::list(&erp).await?))
}

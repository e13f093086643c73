use axum::Json;
use axum::extract::Path;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::error::BridgeError;
use crate::middleware::{TenantErp, ValidJson};
use crate::service::invoices;
use crate::types::ErpList;
use crate::types::invoice::{CreatePurchaseInput, CreateSalesInput};

pub async fn create_sale(
    TenantErp { erp, .. }: TenantErp,
    ValidJson(input): ValidJson<CreateSalesInput>,
) -> Result<(StatusCode, Json<Value>), BridgeError> {
    invoices::create_sale(&erp, input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "Sales entry created" }))))
}

pub async fn list_sales(TenantErp { erp, .. }: TenantErp) -> Result<Json<ErpList<Value>>, BridgeError> {
    Ok(Json(invoices::list_sales(&erp).await?))
}

pub async fn get_sale(
    TenantErp { erp, .. }: TenantErp,
    Path(id): Path<String>,
) -> Result<Json<Value>, BridgeError> {
    Ok(Json(invoices::get_sale(&erp, &id).await?))
}

pub async fn create_purchase(
    TenantErp { erp, .. }: TenantErp,
    ValidJson(input): ValidJson<CreatePurchaseInput>,
) -> Result<(StatusCode, Json<Value>), BridgeError> {
    invoices::create_purchase(&erp, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Purchase entry created" })),
    ))
}

pub async fn list_purchases(
    TenantErp { erp, .. }: TenantErp,
) -> Result<Json<ErpList<Value>>, BridgeError> {
    Ok(Json(invoices::list_purchases(&erp).await?))
}

pub async fn get_purchase(
    TenantErp { erp, .. }: TenantErp,
    Path(id): Path<String>,
) -> Result<Json<Value>, BridgeError> {
    Ok(Json(invoices::get_purchase(&erp, &id).await?))
}

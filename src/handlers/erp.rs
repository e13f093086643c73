use axum::Json;
use serde_json::{Value, json};

use crate::error::BridgeError;
use crate::middleware::TenantErp;
use crate::service::masters::{self, Masters};

pub async fn test_connection(TenantErp { erp, .. }: TenantErp) -> Result<Json<Value>, BridgeError> {
    let check = erp.test_connection().await;
    if !check.success {
        return Err(BridgeError::ConnectionTest(
            check
                .error
                .unwrap_or_else(|| "Failed to connect to ERPNext".into()),
        ));
    }
    Ok(Json(json!({
        "success": true,
        "connectedUser": check.connected_user,
        "message": "ERP connection successful",
    })))
}

pub async fn masters(TenantErp { erp, .. }: TenantErp) -> Json<Masters> {
    Json(masters::fetch(&erp).await)
}

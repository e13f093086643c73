use axum::Json;
use serde::Deserialize;
use validator::Validate;

use crate::api::StockLevel;
use crate::error::BridgeError;
use crate::middleware::{TenantErp, ValidQuery};
use crate::service::dashboard::{self, DashboardSummary};

#[derive(Debug, Deserialize, Validate)]
pub struct LowStockQuery {
    #[serde(default = "default_threshold")]
    #[validate(range(min = 0.0))]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    dashboard::LOW_STOCK_QUANTITY
}

pub async fn summary(TenantErp { erp, .. }: TenantErp) -> Result<Json<DashboardSummary>, BridgeError> {
    Ok(Json(dashboard::summary(&erp).await?))
}

pub async fn low_stock(
    TenantErp { erp, .. }: TenantErp,
    ValidQuery(query): ValidQuery<LowStockQuery>,
) -> Result<Json<Vec<StockLevel>>, BridgeError> {
    Ok(Json(dashboard::low_stock(&erp, query.threshold).await?))
}

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::api::ErpNextClient;
use crate::error::BridgeError;

/// Reference lists the UI needs to build invoices.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Masters {
    pub companies: Vec<Value>,
    pub warehouses: Vec<Value>,
    pub suppliers: Vec<Value>,
    pub customers: Vec<Value>,
}

fn settled(kind: &str, result: Result<Vec<Value>, BridgeError>) -> Vec<Value> {
    result.unwrap_or_else(|e| {
        warn!(master = kind, error = %e, "master list unavailable");
        Vec::new()
    })
}

/// Fetches all four lists concurrently; a failed list comes back empty.
pub async fn fetch(erp: &ErpNextClient) -> Masters {
    let (companies, warehouses, suppliers, customers) = tokio::join!(
        erp.get_companies(),
        erp.get_warehouses(),
        erp.get_suppliers(),
        erp.get_customers(),
    );
    Masters {
        companies: settled("companies", companies),
        warehouses: settled("warehouses", warehouses),
        suppliers: settled("suppliers", suppliers),
        customers: settled("customers", customers),
    }
}

use serde::Serialize;
use serde_json::Value;

use crate::api::{ErpNextClient, ItemQuery, StockLevel};
use crate::error::BridgeError;
use crate::types::invoice::InvoicePage;
use crate::types::product::Product;

/// Invoices considered per side of the summary.
const SUMMARY_INVOICE_LIMIT: u32 = 100;
/// Items below this quantity count as low stock, as do items with no quantity.
pub const LOW_STOCK_QUANTITY: f64 = 15.0;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_sales: f64,
    pub total_purchase: f64,
    pub profit: f64,
    pub loss: f64,
    pub low_stock_count: usize,
    pub low_stock_items: Vec<Product>,
}

impl DashboardSummary {
    pub fn compute(sales: &[Value], purchases: &[Value], items: Vec<Product>) -> Self {
        let total_sales = sum_grand_total(sales);
        let total_purchase = sum_grand_total(purchases);
        let profit = total_sales - total_purchase;
        let low_stock_items: Vec<Product> = items
            .into_iter()
            .filter(|item| item.quantity_f64().is_none_or(|q| q < LOW_STOCK_QUANTITY))
            .collect();

        Self {
            total_sales,
            total_purchase,
            profit,
            loss: if profit < 0.0 { profit.abs() } else { 0.0 },
            low_stock_count: low_stock_items.len(),
            low_stock_items,
        }
    }
}

fn sum_grand_total(invoices: &[Value]) -> f64 {
    invoices
        .iter()
        .filter_map(|inv| inv.get("grand_total").and_then(Value::as_f64))
        .sum()
}

/// All three ERP reads run concurrently; any failure fails the summary.
pub async fn summary(erp: &ErpNextClient) -> Result<DashboardSummary, BridgeError> {
    let page = InvoicePage {
        limit: Some(SUMMARY_INVOICE_LIMIT),
        offset: None,
    };
    let item_query = ItemQuery::default();
    let (sales, purchases, items) = futures::try_join!(
        erp.get_sales_invoices(page),
        erp.get_purchase_invoices(page),
        erp.get_items(&item_query),
    )?;
    Ok(DashboardSummary::compute(&sales.data, &purchases.data, items.data))
}

pub async fn low_stock(erp: &ErpNextClient, threshold: f64) -> Result<Vec<StockLevel>, BridgeError> {
    erp.get_low_stock_items(threshold).await
}

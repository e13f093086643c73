use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

fn valid_lines<T: Validate>(items: &[T]) -> Result<(), ValidationError> {
    if items.iter().all(|item| item.validate().is_ok()) {
        Ok(())
    } else {
        Err(ValidationError::new("items").with_message("invalid invoice line".into()))
    }
}

fn sales_lines(input: &CreateSalesInput) -> Result<(), ValidationError> {
    valid_lines(&input.items)
}

fn purchase_lines(input: &CreatePurchaseInput) -> Result<(), ValidationError> {
    input.items.as_deref().map_or(Ok(()), valid_lines)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SalesItemInput {
    #[validate(length(min = 1))]
    pub item_code: String,
    #[validate(range(exclusive_min = 0.0))]
    pub qty: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub rate: Option<f64>,
    #[validate(length(min = 1))]
    pub warehouse: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "sales_lines"))]
pub struct CreateSalesInput {
    #[validate(length(min = 1))]
    pub customer_name: String,
    pub posting_date: String,
    #[validate(length(min = 1))]
    pub company: String,
    #[validate(length(min = 1))]
    pub items: Vec<SalesItemInput>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PurchaseItemInput {
    pub item_code: String,
    #[validate(range(exclusive_min = 0.0))]
    pub qty: f64,
    pub warehouse: String,
    #[validate(range(exclusive_min = 0.0))]
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "purchase_lines"))]
pub struct CreatePurchaseInput {
    pub supplier_name: String,
    pub posting_date: String,
    pub company: String,
    pub items: Option<Vec<PurchaseItemInput>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SalesInvoiceItem {
    pub item_code: String,
    pub qty: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    pub warehouse: String,
}

/// Body of `POST /api/resource/Sales Invoice`; stock moves on submit.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SalesInvoicePayload {
    pub customer: String,
    pub posting_date: String,
    pub company: String,
    pub update_stock: u8,
    pub items: Vec<SalesInvoiceItem>,
}

impl From<CreateSalesInput> for SalesInvoicePayload {
    fn from(input: CreateSalesInput) -> Self {
        Self {
            customer: input.customer_name,
            posting_date: input.posting_date,
            company: input.company,
            update_stock: 1,
            items: input
                .items
                .into_iter()
                .map(|item| SalesInvoiceItem {
                    item_code: item.item_code,
                    qty: item.qty,
                    rate: item.rate,
                    warehouse: item.warehouse,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PurchaseInvoiceItem {
    pub item_code: String,
    pub qty: f64,
    pub accepted_warehouse: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PurchaseInvoicePayload {
    pub supplier: String,
    pub posting_date: String,
    pub company: String,
    pub update_stock: u8,
    pub items: Vec<PurchaseInvoiceItem>,
}

impl From<CreatePurchaseInput> for PurchaseInvoicePayload {
    fn from(input: CreatePurchaseInput) -> Self {
        Self {
            supplier: input.supplier_name,
            posting_date: input.posting_date,
            company: input.company,
            update_stock: 1,
            items: input
                .items
                .unwrap_or_default()
                .into_iter()
                .map(|item| PurchaseInvoiceItem {
                    item_code: item.item_code,
                    qty: item.qty,
                    accepted_warehouse: item.warehouse,
                    rate: item.rate,
                })
                .collect(),
        }
    }
}

/// Paging for invoice listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvoicePage {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sales_payload_updates_stock() {
        let input: CreateSalesInput = serde_json::from_value(json!({
            "customer_name": "Acme",
            "posting_date": "2024-04-01",
            "company": "My Co",
            "items": [
                { "item_code": "SKU-1", "qty": 2, "warehouse": "Main" },
                { "item_code": "SKU-2", "qty": 1, "rate": 99.5, "warehouse": "Main" }
            ]
        }))
        .unwrap();
        assert!(input.validate().is_ok());

        let value = serde_json::to_value(SalesInvoicePayload::from(input)).unwrap();
        assert_eq!(value["customer"], "Acme");
        assert_eq!(value["update_stock"], 1);
        assert!(value["items"][0].get("rate").is_none());
        assert_eq!(value["items"][1]["rate"], 99.5);
    }

    #[test]
    fn sales_require_items_with_positive_qty() {
        let empty: CreateSalesInput = serde_json::from_value(json!({
            "customer_name": "Acme", "posting_date": "2024-04-01",
            "company": "My Co", "items": []
        }))
        .unwrap();
        assert!(empty.validate().is_err());

        let zero_qty: CreateSalesInput = serde_json::from_value(json!({
            "customer_name": "Acme", "posting_date": "2024-04-01", "company": "My Co",
            "items": [{ "item_code": "SKU-1", "qty": 0, "warehouse": "Main" }]
        }))
        .unwrap();
        assert!(zero_qty.validate().is_err());
    }

    #[test]
    fn purchase_payload_uses_accepted_warehouse() {
        let input: CreatePurchaseInput = serde_json::from_value(json!({
            "supplier_name": "Loom Works",
            "posting_date": "2024-04-01",
            "company": "My Co",
            "items": [{ "item_code": "SKU-1", "qty": 10, "warehouse": "Stores", "rate": 40 }]
        }))
        .unwrap();
        assert!(input.validate().is_ok());
        let value = serde_json::to_value(PurchaseInvoicePayload::from(input)).unwrap();
        assert_eq!(value["supplier"], "Loom Works");
        assert_eq!(value["items"][0]["accepted_warehouse"], "Stores");
        assert!(value["items"][0].get("warehouse").is_none());
    }

    #[test]
    fn purchase_lines_need_positive_qty() {
        let input: CreatePurchaseInput = serde_json::from_value(json!({
            "supplier_name": "Loom Works", "posting_date": "2024-04-01", "company": "My Co",
            "items": [{ "item_code": "SKU-1", "qty": -2, "warehouse": "Stores" }]
        }))
        .unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn purchase_without_items_sends_empty_list() {
        let input: CreatePurchaseInput = serde_json::from_value(json!({
            "supplier_name": "Loom Works", "posting_date": "2024-04-01", "company": "My Co"
        }))
        .unwrap();
        assert!(input.validate().is_ok());
        let payload = PurchaseInvoicePayload::from(input);
        assert!(payload.items.is_empty());
    }
}

use serde_json::Value;

use crate::api::ErpNextClient;
use crate::error::BridgeError;
use crate::types::ErpList;
use crate::types::invoice::{
    CreatePurchaseInput, CreateSalesInput, InvoicePage, PurchaseInvoicePayload,
    SalesInvoicePayload,
};

/// Page size of the sales and purchase listings.
pub const LIST_LIMIT: u32 = 20;

pub async fn create_sale(erp: &ErpNextClient, input: CreateSalesInput) -> Result<Value, BridgeError> {
    erp.create_sales_invoice(&SalesInvoicePayload::from(input))
        .await
}

pub async fn list_sales(erp: &ErpNextClient) -> Result<ErpList<Value>, BridgeError> {
    erp.get_sales_invoices(InvoicePage {
        limit: Some(LIST_LIMIT),
        offset: None,
    })
    .await
}

pub async fn get_sale(erp: &ErpNextClient, id: &str) -> Result<Value, BridgeError> {
    erp.get_sales_invoice(id).await
}

pub async fn create_purchase(erp: &ErpNextClient, input: CreatePurchaseInput) -> Result<Value, BridgeError> {
    erp.create_purchase_invoice(&PurchaseInvoicePayload::from(input))
        .await
}

pub async fn list_purchases(erp: &ErpNextClient) -> Result<ErpList<Value>, BridgeError> {
    erp.get_purchase_invoices(InvoicePage {
        limit: Some(LIST_LIMIT),
        offset: None,
    })
    .await
}

pub async fn get_purchase(erp: &ErpNextClient, id: &str) -> Result<Value, BridgeError> {
    erp.get_purchase_invoice(id).await
}

use chrono::Utc;
use rand::Rng;
use serde_json::json;

use crate::api::{ErpNextClient, ItemQuery};
use crate::error::BridgeError;
use crate::types::ErpList;
use crate::types::product::{
    CreateProductInput, CreatedProduct, EditProductInput, ErpItemPayload, ErpItemUpdate, Product,
    ProductListQuery,
};

/// `PRD-<epoch millis>-<4 random digits>`.
pub fn generate_barcode(prefix: &str) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(1000..=9999);
    format!("{prefix}-{}-{suffix}", Utc::now().timestamp_millis())
}

pub async fn create(erp: &ErpNextClient, mut input: CreateProductInput) -> Result<CreatedProduct, BridgeError> {
    let barcode = match input.barcode.take().filter(|b| !b.is_empty()) {
        Some(barcode) => barcode,
        None => generate_barcode("PRD"),
    };
    input.barcode = Some(barcode.clone());
    erp.create_item(&ErpItemPayload::from(input)).await?;
    Ok(CreatedProduct {
        message: "Product created",
        barcode,
    })
}

pub async fn update(erp: &ErpNextClient, item_code: &str, input: EditProductInput) -> Result<(), BridgeError> {
    erp.update_item(item_code, &ErpItemUpdate::from(input)).await?;
    Ok(())
}

pub async fn delete(erp: &ErpNextClient, item_code: &str) -> Result<(), BridgeError> {
    erp.delete_item(item_code).await?;
    Ok(())
}

pub async fn get(erp: &ErpNextClient, item_code: &str) -> Result<Option<Product>, BridgeError> {
    let list = erp
        .get_items(&ItemQuery::by_field("item_code", item_code))
        .await?;
    Ok(list.data.into_iter().next())
}

pub async fn find_by_barcode(erp: &ErpNextClient, barcode: &str) -> Result<Option<Product>, BridgeError> {
    let list = erp
        .get_items(&ItemQuery::by_field("custom_barcode", barcode))
        .await?;
    Ok(list.data.into_iter().next())
}

pub async fn list(erp: &ErpNextClient, query: &ProductListQuery) -> Result<ErpList<Product>, BridgeError> {
    let or_filters = query.search.as_deref().filter(|s| !s.is_empty()).map(|term| {
        let pattern = format!("%{term}%");
        json!([
            ["item_name", "like", pattern],
            ["item_code", "like", pattern]
        ])
    });
    erp.get_items(&ItemQuery {
        filters: None,
        or_filters,
        limit_start: Some((query.page.max(1) - 1) * query.limit),
        limit_page_length: Some(query.limit),
    })
    .await
}

pub async fn stock(erp: &ErpNextClient, item_code: &str) -> Result<f64, BridgeError> {
    erp.get_item_stock(item_code).await
}

use serde::{Deserialize, Serialize};
use serde_json::Number;
use validator::Validate;

use super::{default_page, present};

/// Internal product field → ERPNext `Item` field.
pub const ITEM_FIELD_MAP: &[(&str, &str)] = &[
    ("item_code", "item_code"),
    ("name", "item_name"),
    ("description", "description"),
    ("item_group", "item_group"),
    ("image", "image"),
    ("size", "custom_size"),
    ("colour", "custom_colour"),
    ("quantity", "custom_quantity"),
    ("UOM", "stock_uom"),
    ("warehouse", "custom_warehouse"),
    ("floor", "custom_floor"),
    ("rack_no", "custom_rack_no"),
    ("MRP", "custom_mrp"),
    ("barcode", "custom_barcode"),
    ("comment", "custom_comment"),
];

pub fn erp_item_field(internal: &str) -> Option<&'static str> {
    ITEM_FIELD_MAP
        .iter()
        .find(|(from, _)| *from == internal)
        .map(|(_, to)| *to)
}

/// ERPNext field names requested when listing items.
pub fn erp_item_fields() -> Vec<&'static str> {
    ITEM_FIELD_MAP.iter().map(|(_, to)| *to).collect()
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(max = 140))]
    pub item_code: String,
    #[validate(length(min = 2, max = 100))]
    pub name: String,
    pub description: Option<String>,
    pub item_group: String,
    #[validate(url)]
    pub image: String,
    pub size: String,
    pub colour: Option<String>,
    #[validate(range(min = 0))]
    pub quantity: i64,
    #[serde(rename = "UOM")]
    pub uom: String,
    pub warehouse: String,
    pub floor: String,
    pub rack_no: String,
    #[serde(rename = "MRP")]
    pub mrp: Option<f64>,
    pub barcode: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct EditProductInput {
    #[validate(length(max = 140))]
    pub item_code: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub item_group: Option<String>,
    #[validate(url)]
    pub image: Option<String>,
    pub size: Option<String>,
    pub colour: Option<String>,
    #[validate(range(min = 0))]
    pub quantity: Option<i64>,
    #[serde(rename = "UOM")]
    pub uom: Option<String>,
    pub warehouse: Option<String>,
    pub floor: Option<String>,
    pub rack_no: Option<String>,
    #[serde(rename = "MRP")]
    pub mrp: Option<f64>,
    pub barcode: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductListQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u32,
    #[serde(default = "default_product_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u32,
    pub search: Option<String>,
}

fn default_product_limit() -> u32 {
    20
}

/// Body of `POST /api/resource/Item`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErpItemPayload {
    pub item_code: String,
    pub item_name: String,
    pub description: String,
    pub item_group: String,
    pub image: String,
    pub custom_size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_colour: Option<String>,
    pub custom_quantity: i64,
    pub stock_uom: String,
    pub custom_warehouse: String,
    pub custom_floor: String,
    pub custom_rack_no: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_mrp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_barcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_comment: Option<String>,
}

impl From<CreateProductInput> for ErpItemPayload {
    fn from(input: CreateProductInput) -> Self {
        Self {
            custom_colour: present(&input.colour),
            custom_mrp: input.mrp.filter(|mrp| *mrp != 0.0),
            custom_barcode: present(&input.barcode),
            custom_comment: present(&input.comment),
            item_code: input.item_code,
            item_name: input.name,
            description: input.description.unwrap_or_default(),
            item_group: input.item_group,
            image: input.image,
            custom_size: input.size,
            custom_quantity: input.quantity,
            stock_uom: input.uom,
            custom_warehouse: input.warehouse,
            custom_floor: input.floor,
            custom_rack_no: input.rack_no,
        }
    }
}

/// Body of `PUT /api/resource/Item/<code>`. The item code and barcode are
/// fixed once created.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ErpItemUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_colour: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_uom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_warehouse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_floor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_rack_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_mrp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_comment: Option<String>,
}

impl From<EditProductInput> for ErpItemUpdate {
    fn from(input: EditProductInput) -> Self {
        Self {
            item_name: input.name,
            description: input.description,
            item_group: input.item_group,
            image: input.image,
            custom_size: input.size,
            custom_colour: input.colour,
            custom_quantity: input.quantity,
            stock_uom: input.uom,
            custom_warehouse: input.warehouse,
            custom_floor: input.floor,
            custom_rack_no: input.rack_no,
            custom_mrp: input.mrp,
            custom_comment: input.comment,
        }
    }
}

/// An `Item` row as ERPNext returns it for the translated field list.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErpItem {
    pub item_code: Option<String>,
    pub item_name: Option<String>,
    pub description: Option<String>,
    pub item_group: Option<String>,
    pub image: Option<String>,
    pub custom_size: Option<String>,
    pub custom_colour: Option<String>,
    pub custom_quantity: Option<Number>,
    pub stock_uom: Option<String>,
    pub custom_warehouse: Option<String>,
    pub custom_floor: Option<String>,
    pub custom_rack_no: Option<String>,
    pub custom_mrp: Option<Number>,
    pub custom_barcode: Option<String>,
    pub custom_comment: Option<String>,
}

/// Product in the internal vocabulary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Product {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Number>,
    #[serde(rename = "UOM", skip_serializing_if = "Option::is_none")]
    pub uom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rack_no: Option<String>,
    #[serde(rename = "MRP", skip_serializing_if = "Option::is_none")]
    pub mrp: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl From<ErpItem> for Product {
    fn from(item: ErpItem) -> Self {
        // ERPNext copies the item name into an empty description.
        let description = if item.description == item.item_name {
            Some(String::new())
        } else {
            item.description
        };
        Self {
            item_code: item.item_code,
            name: item.item_name,
            description,
            item_group: item.item_group,
            image: item.image,
            size: item.custom_size,
            colour: item.custom_colour,
            quantity: item.custom_quantity,
            uom: item.stock_uom,
            warehouse: item.custom_warehouse,
            floor: item.custom_floor,
            rack_no: item.custom_rack_no,
            mrp: item.custom_mrp,
            barcode: item.custom_barcode,
            comment: item.custom_comment,
        }
    }
}

impl Product {
    pub fn quantity_f64(&self) -> Option<f64> {
        self.quantity.as_ref().and_then(Number::as_f64)
    }
}

/// Response to a successful product create.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedProduct {
    pub message: &'static str,
    pub barcode: String,
}

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::party::{AddressFields, ContactFields};
use super::{default_country, default_gst_category, default_page, present};

fn default_supplier_type() -> String {
    "Company".to_string()
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSupplierInput {
    pub gstin: Option<String>,
    #[validate(length(min = 2))]
    pub supplier_name: String,
    #[serde(default = "default_supplier_type")]
    pub supplier_type: String,
    #[serde(default = "default_gst_category")]
    pub gst_category: String,
    pub phone_no: Option<String>,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub mobile_no: Option<String>,

    pub pincode: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
}

impl CreateSupplierInput {
    pub fn address(&self) -> AddressFields {
        AddressFields {
            address_line1: self.address_line1.clone(),
            address_line2: self.address_line2.clone(),
            pincode: self.pincode.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            country: Some(self.country.clone()),
        }
    }

    pub fn contact(&self) -> ContactFields {
        ContactFields {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            mobile_no: self.mobile_no.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct EditSupplierInput {
    pub gstin: Option<String>,
    #[validate(length(min = 2))]
    pub supplier_name: Option<String>,
    pub supplier_type: Option<String>,
    pub gst_category: Option<String>,
    pub phone_no: Option<String>,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub mobile_no: Option<String>,

    pub pincode: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl EditSupplierInput {
    pub fn address(&self) -> AddressFields {
        AddressFields {
            address_line1: self.address_line1.clone(),
            address_line2: self.address_line2.clone(),
            pincode: self.pincode.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            country: self.country.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SupplierListQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: u32,
    #[serde(default = "default_supplier_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u32,
    pub search: Option<String>,
}

fn default_supplier_limit() -> u32 {
    20
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErpSupplierPayload {
    pub supplier_name: String,
    pub supplier_type: String,
    pub gst_category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gstin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_phone_no: Option<String>,
}

impl From<&CreateSupplierInput> for ErpSupplierPayload {
    fn from(input: &CreateSupplierInput) -> Self {
        Self {
            supplier_name: input.supplier_name.clone(),
            supplier_type: input.supplier_type.clone(),
            gst_category: input.gst_category.clone(),
            gstin: present(&input.gstin),
            custom_phone_no: present(&input.phone_no),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ErpSupplierUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gstin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gst_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_phone_no: Option<String>,
}

impl From<&EditSupplierInput> for ErpSupplierUpdate {
    fn from(input: &EditSupplierInput) -> Self {
        Self {
            supplier_name: present(&input.supplier_name),
            gstin: present(&input.gstin),
            gst_category: present(&input.gst_category),
            custom_phone_no: present(&input.phone_no),
        }
    }
}

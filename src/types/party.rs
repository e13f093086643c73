//! Address and contact sub-records shared by customers and suppliers.

use serde::Serialize;

use super::present;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DynamicLink {
    pub link_doctype: String,
    pub link_name: String,
}

impl DynamicLink {
    pub fn new(doctype: &str, name: &str) -> Self {
        Self {
            link_doctype: doctype.to_string(),
            link_name: name.to_string(),
        }
    }
}

/// Address lines as entered on a customer or supplier form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFields {
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub pincode: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl AddressFields {
    /// An address is written only when its first line is filled in.
    pub fn line1(&self) -> Option<String> {
        present(&self.address_line1)
    }

    fn country_or_default(&self) -> String {
        present(&self.country).unwrap_or_else(|| "India".to_string())
    }
}

/// Body of `POST /api/resource/Address`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AddressPayload {
    pub address_title: String,
    pub address_type: &'static str,
    pub address_line1: String,
    pub address_line2: String,
    pub pincode: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub is_primary_address: u8,
    pub is_shipping_address: u8,
    pub links: Vec<DynamicLink>,
}

impl AddressPayload {
    /// `None` when the fields carry no first address line.
    pub fn billing(title: &str, fields: &AddressFields, link: DynamicLink) -> Option<Self> {
        let address_line1 = fields.line1()?;
        Some(Self {
            address_title: title.to_string(),
            address_type: "Billing",
            address_line1,
            address_line2: present(&fields.address_line2).unwrap_or_default(),
            pincode: present(&fields.pincode).unwrap_or_default(),
            city: present(&fields.city).unwrap_or_default(),
            state: present(&fields.state).unwrap_or_default(),
            country: fields.country_or_default(),
            is_primary_address: 1,
            is_shipping_address: 1,
            links: vec![link],
        })
    }
}

/// Body of `PUT /api/resource/Address/<name>`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AddressUpdate {
    pub address_line1: String,
    pub address_line2: String,
    pub pincode: String,
    pub city: String,
    pub state: String,
    pub country: String,
}

impl AddressUpdate {
    pub fn from_fields(fields: &AddressFields) -> Option<Self> {
        Some(Self {
            address_line1: fields.line1()?,
            address_line2: present(&fields.address_line2).unwrap_or_default(),
            pincode: present(&fields.pincode).unwrap_or_default(),
            city: present(&fields.city).unwrap_or_default(),
            state: present(&fields.state).unwrap_or_default(),
            country: fields.country_or_default(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub mobile_no: Option<String>,
}

/// Body of `POST /api/resource/Contact`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContactPayload {
    pub first_name: String,
    pub last_name: String,
    pub email_id: String,
    pub mobile_no: String,
    pub is_primary_contact: u8,
    pub links: Vec<DynamicLink>,
}

impl ContactPayload {
    /// `None` unless a first name, email or mobile number is given.
    pub fn primary(fields: &ContactFields, link: DynamicLink) -> Option<Self> {
        let wanted = present(&fields.first_name).is_some()
            || present(&fields.email).is_some()
            || present(&fields.mobile_no).is_some();
        if !wanted {
            return None;
        }
        Some(Self {
            first_name: present(&fields.first_name).unwrap_or_default(),
            last_name: present(&fields.last_name).unwrap_or_default(),
            email_id: present(&fields.email).unwrap_or_default(),
            mobile_no: present(&fields.mobile_no).unwrap_or_default(),
            is_primary_contact: 1,
            links: vec![link],
        })
    }
}

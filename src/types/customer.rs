use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::party::{AddressFields, ContactFields};
use super::{default_country, default_gst_category, present};

fn company_only(value: &str) -> Result<(), ValidationError> {
    if value == "Company" {
        Ok(())
    } else {
        Err(ValidationError::new("customer_type").with_message("customer_type must be Company".into()))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCustomerInput {
    pub gstin: Option<String>,
    #[validate(length(min = 2))]
    pub customer_name: String,
    #[validate(custom(function = "company_only"))]
    pub customer_type: String,
    #[serde(default = "default_gst_category")]
    pub gst_category: String,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub mobile_no: Option<String>,

    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub pincode: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[serde(default = "default_country")]
    pub country: String,
}

impl CreateCustomerInput {
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
pub struct EditCustomerInput {
    pub gstin: Option<String>,
    #[validate(length(min = 2))]
    pub customer_name: Option<String>,
    #[validate(custom(function = "company_only"))]
    pub customer_type: Option<String>,
    pub gst_category: Option<String>,

    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub mobile_no: Option<String>,

    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub pincode: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

impl EditCustomerInput {
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

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErpCustomerPayload {
    pub customer_name: String,
    pub customer_type: String,
    pub gst_category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gstin: Option<String>,
}

impl From<&CreateCustomerInput> for ErpCustomerPayload {
    fn from(input: &CreateCustomerInput) -> Self {
        Self {
            customer_name: input.customer_name.clone(),
            customer_type: input.customer_type.clone(),
            gst_category: input.gst_category.clone(),
            gstin: present(&input.gstin),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ErpCustomerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gstin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gst_category: Option<String>,
}

impl From<&EditCustomerInput> for ErpCustomerUpdate {
    fn from(input: &EditCustomerInput) -> Self {
        Self {
            customer_name: present(&input.customer_name),
            gstin: present(&input.gstin),
            gst_category: present(&input.gst_category),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_applies_defaults() {
        let input: CreateCustomerInput = serde_json::from_value(json!({
            "customer_name": "Acme Traders",
            "customer_type": "Company"
        }))
        .unwrap();
        assert!(input.validate().is_ok());
        assert_eq!(input.country, "India");

        let value = serde_json::to_value(ErpCustomerPayload::from(&input)).unwrap();
        assert_eq!(
            value,
            json!({
                "customer_name": "Acme Traders",
                "customer_type": "Company",
                "gst_category": "Unregistered"
            })
        );
    }

    #[test]
    fn only_company_customers_are_accepted() {
        let input: CreateCustomerInput = serde_json::from_value(json!({
            "customer_name": "Jane",
            "customer_type": "Individual"
        }))
        .unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn bad_contact_email_is_rejected() {
        let input: CreateCustomerInput = serde_json::from_value(json!({
            "customer_name": "Acme",
            "customer_type": "Company",
            "email": "nope"
        }))
        .unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn edit_skips_empty_values() {
        let input: EditCustomerInput = serde_json::from_value(json!({
            "customer_name": "",
            "gstin": "27AAAAA0000A1Z5"
        }))
        .unwrap();
        let value = serde_json::to_value(ErpCustomerUpdate::from(&input)).unwrap();
        assert_eq!(value, json!({ "gstin": "27AAAAA0000A1Z5" }));
    }
}

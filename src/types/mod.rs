//! Wire types: request inputs, ERPNext payloads and the conversions between
//! them.

pub mod customer;
pub mod invoice;
pub mod party;
pub mod product;
pub mod supplier;
pub mod upload;
pub mod user;

use serde::{Deserialize, Deserializer, Serialize};

/// ERPNext list envelope, `{"data": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErpList<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Default for ErpList<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

/// Returns `Some` only for a non-empty string; mirrors the truthiness checks
/// the ERP mappers apply to optional text.
pub(crate) fn present(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.is_empty()).cloned()
}

/// `""` deserializes as `None`.
pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

pub(crate) fn default_page() -> u32 {
    1
}

pub(crate) fn default_country() -> String {
    "India".to_string()
}

pub(crate) fn default_gst_category() -> String {
    "Unregistered".to_string()
}

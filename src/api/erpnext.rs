use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::borrow::Cow;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::messages::{list_error_message, parse_server_messages};
use crate::error::BridgeError;
use crate::types::ErpList;
use crate::types::customer::{ErpCustomerPayload, ErpCustomerUpdate};
use crate::types::invoice::{InvoicePage, PurchaseInvoicePayload, SalesInvoicePayload};
use crate::types::party::{AddressPayload, AddressUpdate, ContactPayload};
use crate::types::product::{ErpItem, ErpItemPayload, ErpItemUpdate, Product, erp_item_fields};
use crate::types::supplier::{ErpSupplierPayload, ErpSupplierUpdate};

const CONNECTION_TEST_TIMEOUT: Duration = Duration::from_secs(10);
const ADDRESS_FIELDS: [&str; 11] = [
    "name",
    "address_title",
    "address_type",
    "address_line1",
    "address_line2",
    "city",
    "state",
    "pincode",
    "country",
    "is_primary_address",
    "is_shipping_address",
];

/// Plaintext credentials of one tenant.
#[derive(Clone, PartialEq, Eq)]
pub struct ErpCredentials {
    pub erp_domain: String,
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for ErpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErpCredentials")
            .field("erp_domain", &self.erp_domain)
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Trailing `/` dropped, `https://` assumed when no scheme is given.
pub fn normalize_base_url(domain: &str) -> Result<Url, url::ParseError> {
    let trimmed = domain.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("https://{trimmed}"))
    }
}

/// Query for `GET /api/resource/Item`.
#[derive(Debug, Clone, Default)]
pub struct ItemQuery {
    pub filters: Option<Value>,
    pub or_filters: Option<Value>,
    pub limit_start: Option<u32>,
    pub limit_page_length: Option<u32>,
}

impl ItemQuery {
    pub fn by_field(field: &str, value: &str) -> Self {
        Self {
            filters: Some(json!([["Item", field, "=", value]])),
            limit_page_length: Some(1),
            ..Default::default()
        }
    }
}

/// A `Bin` row: stock of one item in one warehouse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockLevel {
    pub item_code: Option<String>,
    pub warehouse: Option<String>,
    #[serde(default)]
    pub actual_qty: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConnectionCheck {
    pub success: bool,
    pub connected_user: Option<String>,
    pub error: Option<String>,
}

impl ConnectionCheck {
    fn failed(error: &str) -> Self {
        Self {
            success: false,
            connected_user: None,
            error: Some(error.to_string()),
        }
    }
}

/// How a non-2xx ERPNext answer becomes a [`BridgeError`].
#[derive(Debug, Clone)]
struct OnFailure {
    status: StatusCode,
    message: Cow<'static, str>,
    detail: Detail,
}

#[derive(Debug, Clone, Copy)]
enum Detail {
    Fixed,
    ServerMessages,
    ListBody,
}

impl OnFailure {
    /// ERPNext refused a write; its own message is surfaced.
    fn rejected(default: &'static str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: Cow::Borrowed(default),
            detail: Detail::ServerMessages,
        }
    }

    fn list(default: &'static str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: Cow::Borrowed(default),
            detail: Detail::ListBody,
        }
    }

    fn fixed(status: StatusCode, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: Detail::Fixed,
        }
    }

    fn message_for(&self, body: &Value) -> String {
        match self.detail {
            Detail::Fixed => self.message.to_string(),
            Detail::ServerMessages => {
                parse_server_messages(body.get("_server_messages"), &self.message)
            }
            Detail::ListBody => list_error_message(body, &self.message),
        }
    }
}

/// ERPNext REST client bound to a single tenant.
#[derive(Clone)]
pub struct ErpNextClient {
    http: reqwest::Client,
    base: Url,
    authorization: HeaderValue,
}

impl fmt::Debug for ErpNextClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErpNextClient")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

impl ErpNextClient {
    pub fn new(http: reqwest::Client, credentials: &ErpCredentials) -> Result<Self, BridgeError> {
        let base = normalize_base_url(&credentials.erp_domain)?;
        if base.cannot_be_a_base() {
            return Err(BridgeError::Internal(format!(
                "ERP domain `{}` is not a base URL",
                credentials.erp_domain
            )));
        }
        let mut authorization = HeaderValue::from_str(&format!(
            "token {}:{}",
            credentials.api_key, credentials.api_secret
        ))
        .map_err(|_| BridgeError::ErpClientInit)?;
        authorization.set_sensitive(true);

        Ok(Self {
            http,
            base,
            authorization,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // `new` rejects cannot-be-a-base URLs, so segments are always available.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn resource_url(&self, doctype: &str, name: Option<&str>) -> Url {
        match name {
            Some(name) => self.endpoint(&["api", "resource", doctype, name]),
            None => self.endpoint(&["api", "resource", doctype]),
        }
    }

    fn method_url(&self, method: &str) -> Url {
        self.endpoint(&["api", "method", method])
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(AUTHORIZATION, self.authorization.clone())
            .header(ACCEPT, "application/json")
    }

    async fn execute(&self, req: RequestBuilder, on_failure: OnFailure) -> Result<Value, BridgeError> {
        let resp = req.send().await.inspect_err(|e| {
            warn!(error = %e, base = %self.base, "ERPNext request did not complete");
        })?;
        let status = resp.status();
        let url = resp.url().clone();
        let bytes = resp.bytes().await?;

        if status.is_success() {
            debug!(status = status.as_u16(), url = %url, "ERPNext request succeeded");
            if bytes.is_empty() {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let body: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        let message = on_failure.message_for(&body);
        warn!(
            status = status.as_u16(),
            url = %url,
            erp_message = %message,
            "ERPNext API error"
        );
        Err(BridgeError::erp(on_failure.status, message))
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: &B,
        on_failure: OnFailure,
    ) -> Result<Value, BridgeError> {
        let req = self
            .request(method, url)
            .header(CONTENT_TYPE, "application/json")
            .json(body);
        self.execute(req, on_failure).await
    }

    async fn get(&self, url: Url, on_failure: OnFailure) -> Result<Value, BridgeError> {
        self.execute(self.request(Method::GET, url), on_failure).await
    }

    async fn get_as<T: DeserializeOwned>(&self, url: Url, on_failure: OnFailure) -> Result<T, BridgeError> {
        Ok(serde_json::from_value(self.get(url, on_failure).await?)?)
    }

    /// List of every record of `doctype`, returning the bare `data` array.
    async fn fetch_resource(&self, doctype: &'static str) -> Result<Vec<Value>, BridgeError> {
        let url = self.resource_url(doctype, None);
        let list: ErpList<Value> = self
            .get_as(
                url,
                OnFailure::fixed(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to fetch {doctype}"),
                ),
            )
            .await?;
        Ok(list.data)
    }

    // Items

    pub async fn create_item(&self, payload: &ErpItemPayload) -> Result<Value, BridgeError> {
        let url = self.resource_url("Item", None);
        self.send_json(
            Method::POST,
            url,
            payload,
            OnFailure::rejected("Failed to create item in ERPNext"),
        )
        .await
    }

    pub async fn update_item(&self, item_code: &str, payload: &ErpItemUpdate) -> Result<Value, BridgeError> {
        let url = self.resource_url("Item", Some(item_code));
        self.send_json(
            Method::PUT,
            url,
            payload,
            OnFailure::rejected("Failed to update item in ERPNext"),
        )
        .await
    }

    pub async fn delete_item(&self, item_code: &str) -> Result<Value, BridgeError> {
        let url = self.resource_url("Item", Some(item_code));
        self.execute(
            self.request(Method::DELETE, url),
            OnFailure::rejected("Failed to delete item in ERPNext"),
        )
        .await
    }

    /// Items with the translated field list, mapped to [`Product`]s.
    pub async fn get_items(&self, query: &ItemQuery) -> Result<ErpList<Product>, BridgeError> {
        let mut url = self.resource_url("Item", None);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("fields", &serde_json::to_string(&erp_item_fields())?);
            if let Some(filters) = &query.filters {
                pairs.append_pair("filters", &filters.to_string());
            }
            if let Some(or_filters) = &query.or_filters {
                pairs.append_pair("or_filters", &or_filters.to_string());
            }
            if let Some(start) = query.limit_start {
                pairs.append_pair("limit_start", &start.to_string());
            }
            if let Some(len) = query.limit_page_length {
                pairs.append_pair("limit_page_length", &len.to_string());
            }
        }

        let list: ErpList<ErpItem> = self
            .get_as(url, OnFailure::list("Failed to fetch items from ERPNext"))
            .await?;
        Ok(ErpList {
            data: list.data.into_iter().map(Product::from).collect(),
        })
    }

    /// Sum of `actual_qty` over every warehouse holding the item.
    pub async fn get_item_stock(&self, item_code: &str) -> Result<f64, BridgeError> {
        let mut url = self.resource_url("Bin", None);
        url.query_pairs_mut()
            .append_pair("filters", &json!([["item_code", "=", item_code]]).to_string())
            .append_pair("fields", &json!(["actual_qty"]).to_string());

        let bins: ErpList<StockLevel> = self
            .get_as(
                url,
                OnFailure::fixed(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch stock"),
            )
            .await?;
        Ok(bins.data.iter().map(|bin| bin.actual_qty).sum())
    }

    pub async fn get_low_stock_items(&self, threshold: f64) -> Result<Vec<StockLevel>, BridgeError> {
        let mut url = self.resource_url("Bin", None);
        url.query_pairs_mut()
            .append_pair("filters", &json!([["actual_qty", "<=", threshold]]).to_string())
            .append_pair(
                "fields",
                &json!(["item_code", "warehouse", "actual_qty"]).to_string(),
            );

        let bins: ErpList<StockLevel> = self
            .get_as(
                url,
                OnFailure::fixed(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to fetch low stock items",
                ),
            )
            .await?;
        Ok(bins.data)
    }

    // Customers

    pub async fn create_customer(&self, payload: &ErpCustomerPayload) -> Result<Value, BridgeError> {
        let url = self.resource_url("Customer", None);
        self.send_json(
            Method::POST,
            url,
            payload,
            OnFailure::rejected("Failed to create customer in ERPNext"),
        )
        .await
    }

    pub async fn update_customer(&self, name: &str, payload: &ErpCustomerUpdate) -> Result<Value, BridgeError> {
        let url = self.resource_url("Customer", Some(name));
        self.send_json(
            Method::PUT,
            url,
            payload,
            OnFailure::rejected("Failed to update customer in ERPNext"),
        )
        .await
    }

    pub async fn delete_customer(&self, name: &str) -> Result<Value, BridgeError> {
        let url = self.resource_url("Customer", Some(name));
        self.execute(
            self.request(Method::DELETE, url),
            OnFailure::rejected("Failed to delete customer in ERPNext"),
        )
        .await
    }

    pub async fn get_customer(&self, name: &str) -> Result<Value, BridgeError> {
        let url = self.resource_url("Customer", Some(name));
        self.get(url, OnFailure::fixed(StatusCode::NOT_FOUND, "Customer not found"))
            .await
    }

    pub async fn get_customers(&self) -> Result<Vec<Value>, BridgeError> {
        self.fetch_resource("Customer").await
    }

    // Suppliers

    pub async fn create_supplier(&self, payload: &ErpSupplierPayload) -> Result<Value, BridgeError> {
        let url = self.resource_url("Supplier", None);
        self.send_json(
            Method::POST,
            url,
            payload,
            OnFailure::rejected("Failed to create supplier in ERPNext"),
        )
        .await
    }

    pub async fn update_supplier(&self, name: &str, payload: &ErpSupplierUpdate) -> Result<Value, BridgeError> {
        let url = self.resource_url("Supplier", Some(name));
        self.send_json(
            Method::PUT,
            url,
            payload,
            OnFailure::rejected("Failed to update supplier in ERPNext"),
        )
        .await
    }

    pub async fn delete_supplier(&self, name: &str) -> Result<Value, BridgeError> {
        let url = self.resource_url("Supplier", Some(name));
        self.execute(
            self.request(Method::DELETE, url),
            OnFailure::rejected("Failed to delete supplier in ERPNext"),
        )
        .await
    }

    pub async fn get_supplier(&self, name: &str) -> Result<Value, BridgeError> {
        let url = self.resource_url("Supplier", Some(name));
        self.get(url, OnFailure::fixed(StatusCode::NOT_FOUND, "Supplier not found"))
            .await
    }

    pub async fn get_suppliers(&self) -> Result<Vec<Value>, BridgeError> {
        self.fetch_resource("Supplier").await
    }

    /// Paged supplier list; `search` matches the supplier name.
    pub async fn list_suppliers(
        &self,
        limit_start: u32,
        limit_page_length: u32,
        search: Option<&str>,
    ) -> Result<ErpList<Value>, BridgeError> {
        let mut url = self.resource_url("Supplier", None);
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair(
                    "fields",
                    &json!(["name", "supplier_name", "supplier_type", "gst_category"]).to_string(),
                )
                .append_pair("limit_start", &limit_start.to_string())
                .append_pair("limit_page_length", &limit_page_length.to_string());
            if let Some(term) = search.filter(|s| !s.is_empty()) {
                pairs.append_pair(
                    "filters",
                    &json!([["supplier_name", "like", format!("%{term}%")]]).to_string(),
                );
            }
        }
        self.get_as(url, OnFailure::list("Failed to fetch suppliers from ERPNext"))
            .await
    }

    // Addresses and contacts

    pub async fn create_address(&self, payload: &AddressPayload) -> Result<Value, BridgeError> {
        let url = self.resource_url("Address", None);
        self.send_json(
            Method::POST,
            url,
            payload,
            OnFailure::rejected("Failed to create address in ERPNext"),
        )
        .await
    }

    pub async fn update_address(&self, name: &str, payload: &AddressUpdate) -> Result<Value, BridgeError> {
        let url = self.resource_url("Address", Some(name));
        self.send_json(
            Method::PUT,
            url,
            payload,
            OnFailure::rejected("Failed to update address in ERPNext"),
        )
        .await
    }

    /// Addresses linked to a record through their `Dynamic Link` table.
    pub async fn get_addresses(&self, link_doctype: &str, link_name: &str) -> Result<ErpList<Value>, BridgeError> {
        let mut url = self.resource_url("Address", None);
        url.query_pairs_mut()
            .append_pair(
                "filters",
                &json!([
                    ["Dynamic Link", "link_doctype", "=", link_doctype],
                    ["Dynamic Link", "link_name", "=", link_name]
                ])
                .to_string(),
            )
            .append_pair("fields", &json!(ADDRESS_FIELDS).to_string());
        self.get_as(url, OnFailure::list("Failed to fetch addresses from ERPNext"))
            .await
    }

    pub async fn create_contact(&self, payload: &ContactPayload) -> Result<Value, BridgeError> {
        let url = self.resource_url("Contact", None);
        self.send_json(
            Method::POST,
            url,
            payload,
            OnFailure::rejected("Failed to create contact in ERPNext"),
        )
        .await
    }

    // Invoices

    pub async fn create_sales_invoice(&self, payload: &SalesInvoicePayload) -> Result<Value, BridgeError> {
        let url = self.resource_url("Sales Invoice", None);
        self.send_json(
            Method::POST,
            url,
            payload,
            OnFailure::rejected("Failed to create sales invoice in ERPNext"),
        )
        .await
    }

    pub async fn get_sales_invoices(&self, page: InvoicePage) -> Result<ErpList<Value>, BridgeError> {
        let url = self.invoice_list_url("Sales Invoice", "customer", page);
        self.get_as(
            url,
            OnFailure::fixed(StatusCode::UNAUTHORIZED, "Failed to fetch sales invoices"),
        )
        .await
    }

    pub async fn get_sales_invoice(&self, name: &str) -> Result<Value, BridgeError> {
        let url = self.resource_url("Sales Invoice", Some(name));
        self.get(url, OnFailure::fixed(StatusCode::NOT_FOUND, "Sales invoice not found"))
            .await
    }

    pub async fn create_purchase_invoice(&self, payload: &PurchaseInvoicePayload) -> Result<Value, BridgeError> {
        let url = self.resource_url("Purchase Invoice", None);
        self.send_json(
            Method::POST,
            url,
            payload,
            OnFailure::rejected("Failed to create purchase invoice in ERPNext"),
        )
        .await
    }

    pub async fn get_purchase_invoices(&self, page: InvoicePage) -> Result<ErpList<Value>, BridgeError> {
        let url = self.invoice_list_url("Purchase Invoice", "supplier", page);
        self.get_as(
            url,
            OnFailure::fixed(StatusCode::UNAUTHORIZED, "Failed to fetch purchase invoices"),
        )
        .await
    }

    pub async fn get_purchase_invoice(&self, name: &str) -> Result<Value, BridgeError> {
        let url = self.resource_url("Purchase Invoice", Some(name));
        self.get(
            url,
            OnFailure::fixed(StatusCode::NOT_FOUND, "Purchase invoice not found"),
        )
        .await
    }

    fn invoice_list_url(&self, doctype: &str, party_field: &str, page: InvoicePage) -> Url {
        let mut url = self.resource_url(doctype, None);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair(
                "fields",
                &json!(["name", party_field, "posting_date", "grand_total", "status"]).to_string(),
            );
            if let Some(limit) = page.limit {
                pairs.append_pair("limit_page_length", &limit.to_string());
            }
            if let Some(offset) = page.offset.filter(|o| *o > 0) {
                pairs.append_pair("limit_start", &offset.to_string());
            }
        }
        url
    }

    // Masters

    pub async fn get_companies(&self) -> Result<Vec<Value>, BridgeError> {
        self.fetch_resource("Company").await
    }

    pub async fn get_warehouses(&self) -> Result<Vec<Value>, BridgeError> {
        self.fetch_resource("Warehouse").await
    }

    /// Calls `frappe.auth.get_logged_user`; failures are classified, never
    /// returned as errors.
    pub async fn test_connection(&self) -> ConnectionCheck {
        let url = self.method_url("frappe.auth.get_logged_user");
        let resp = match self
            .request(Method::GET, url.clone())
            .timeout(CONNECTION_TEST_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                let error = if e.is_timeout() {
                    "Connection timeout - ERPNext server not responding"
                } else if e.is_connect() || e.is_request() {
                    "Network error - unable to reach ERPNext server"
                } else {
                    "Failed to connect to ERPNext server"
                };
                warn!(error = %e, url = %url, "ERPNext connection test error");
                return ConnectionCheck::failed(error);
            }
        };

        let status = resp.status();
        if !status.is_success() {
            let error = match status.as_u16() {
                401 | 403 => "Invalid ERP credentials",
                404 => "ERPNext endpoint not found - check domain URL",
                s if s >= 500 => "ERPNext server error",
                _ => "Connection test failed",
            };
            warn!(status = status.as_u16(), url = %url, "ERPNext connection test failed");
            return ConnectionCheck::failed(error);
        }

        let body: Value = match resp.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, url = %url, "ERPNext connection test returned unreadable body");
                return ConnectionCheck::failed("Failed to connect to ERPNext server");
            }
        };
        let user = match body.get("message") {
            Some(Value::String(user)) => user.clone(),
            Some(other) => other
                .get("email")
                .and_then(Value::as_str)
                .unwrap_or("Unknown user")
                .to_string(),
            None => "Unknown user".to_string(),
        };
        ConnectionCheck {
            success: true,
            connected_user: Some(user),
            error: None,
        }
    }
}

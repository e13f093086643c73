use serde_json::Value;
use tracing::warn;

use super::parties::{attach_addresses, created_name, upsert_primary_address};
use crate::api::ErpNextClient;
use crate::error::BridgeError;
use crate::types::ErpList;
use crate::types::party::{AddressPayload, ContactPayload, DynamicLink};
use crate::types::supplier::{
    CreateSupplierInput, EditSupplierInput, ErpSupplierPayload, ErpSupplierUpdate,
    SupplierListQuery,
};

const DOCTYPE: &str = "Supplier";

/// Creates the supplier. Address and contact failures are logged; the
/// supplier itself stays created.
pub async fn create(erp: &ErpNextClient, input: CreateSupplierInput) -> Result<Value, BridgeError> {
    let resp = erp
        .create_supplier(&ErpSupplierPayload::from(&input))
        .await?;
    let name = created_name(&resp, &input.supplier_name);

    if let Some(address) = AddressPayload::billing(
        &input.supplier_name,
        &input.address(),
        DynamicLink::new(DOCTYPE, &name),
    ) && let Err(e) = erp.create_address(&address).await
    {
        warn!(supplier = %name, error = %e, "failed to create address for supplier");
    }

    if let Some(contact) = ContactPayload::primary(&input.contact(), DynamicLink::new(DOCTYPE, &name))
        && let Err(e) = erp.create_contact(&contact).await
    {
        warn!(supplier = %name, error = %e, "failed to create contact for supplier");
    }

    Ok(resp)
}

pub async fn update(erp: &ErpNextClient, id: &str, input: EditSupplierInput) -> Result<Value, BridgeError> {
    let resp = erp
        .update_supplier(id, &ErpSupplierUpdate::from(&input))
        .await?;
    if let Err(e) = upsert_primary_address(erp, DOCTYPE, id, &input.address()).await {
        warn!(supplier = id, error = %e, "failed to update address for supplier");
    }
    Ok(resp)
}

pub async fn delete(erp: &ErpNextClient, id: &str) -> Result<Value, BridgeError> {
    erp.delete_supplier(id).await
}

pub async fn get(erp: &ErpNextClient, id: &str) -> Result<Value, BridgeError> {
    let mut supplier = erp.get_supplier(id).await?;
    attach_addresses(erp, DOCTYPE, id, &mut supplier).await;
    Ok(supplier)
}

pub async fn list(erp: &ErpNextClient, query: &SupplierListQuery) -> Result<ErpList<Value>, BridgeError> {
    let start = (query.page.max(1) - 1) * query.limit;
    erp.list_suppliers(start, query.limit, query.search.as_deref())
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErpCredentials;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn erp(server: &MockServer) -> ErpNextClient {
        ErpNextClient::new(
            reqwest::Client::new(),
            &ErpCredentials {
                erp_domain: server.uri(),
                api_key: "k".into(),
                api_secret: "s".into(),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn sub_record_failures_do_not_fail_create() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/resource/Supplier"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "name": "SUP-1" } })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/resource/Address"))
            .respond_with(ResponseTemplate::new(417))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/resource/Contact"))
            .respond_with(ResponseTemplate::new(417))
            .expect(1)
            .mount(&server)
            .await;

        let input: CreateSupplierInput = serde_json::from_value(json!({
            "supplier_name": "Loom Works",
            "address_line1": "2 Mill Rd",
            "mobile_no": "98765"
        }))
        .unwrap();
        let resp = create(&erp(&server), input).await.unwrap();
        assert_eq!(resp["data"]["name"], "SUP-1");
    }

    #[tokio::test]
    async fn supplier_rejection_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/resource/Supplier"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({})))
            .mount(&server)
            .await;

        let input: CreateSupplierInput =
            serde_json::from_value(json!({ "supplier_name": "Loom Works" })).unwrap();
        let err = create(&erp(&server), input).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to create supplier in ERPNext");
    }

    #[tokio::test]
    async fn list_honours_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/resource/Supplier"))
            .and(query_param("limit_start", "10"))
            .and(query_param("limit_page_length", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "name": "SUP-11" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let query = SupplierListQuery {
            page: 2,
            limit: 10,
            search: None,
        };
        let page = list(&erp(&server), &query).await.unwrap();
        assert_eq!(page.data.len(), 1);
    }
}

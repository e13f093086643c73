use serde_json::Value;
use tracing::warn;

use super::parties::{attach_addresses, created_name, upsert_primary_address};
use crate::api::ErpNextClient;
use crate::error::BridgeError;
use crate::types::customer::{
    CreateCustomerInput, EditCustomerInput, ErpCustomerPayload, ErpCustomerUpdate,
};
use crate::types::party::{AddressPayload, ContactPayload, DynamicLink};

const DOCTYPE: &str = "Customer";

/// Creates the customer, then its billing address and primary contact when
/// the form carries them. Sub-record failures abort the request.
pub async fn create(erp: &ErpNextClient, input: CreateCustomerInput) -> Result<Value, BridgeError> {
    let resp = erp
        .create_customer(&ErpCustomerPayload::from(&input))
        .await?;
    let name = created_name(&resp, &input.customer_name);

    if let Some(address) =
        AddressPayload::billing(&name, &input.address(), DynamicLink::new(DOCTYPE, &name))
    {
        erp.create_address(&address).await?;
    }
    if let Some(contact) = ContactPayload::primary(&input.contact(), DynamicLink::new(DOCTYPE, &name)) {
        erp.create_contact(&contact).await?;
    }
    Ok(resp)
}

pub async fn update(erp: &ErpNextClient, id: &str, input: EditCustomerInput) -> Result<Value, BridgeError> {
    let resp = erp
        .update_customer(id, &ErpCustomerUpdate::from(&input))
        .await?;
    if let Err(e) = upsert_primary_address(erp, DOCTYPE, id, &input.address()).await {
        warn!(customer = id, error = %e, "failed to update address for customer");
    }
    Ok(resp)
}

pub async fn delete(erp: &ErpNextClient, id: &str) -> Result<Value, BridgeError> {
    erp.delete_customer(id).await
}

pub async fn get(erp: &ErpNextClient, id: &str) -> Result<Value, BridgeError> {
    let mut customer = erp.get_customer(id).await?;
    attach_addresses(erp, DOCTYPE, id, &mut customer).await;
    Ok(customer)
}

pub async fn list(erp: &ErpNextClient) -> Result<Vec<Value>, BridgeError> {
    erp.get_customers().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErpCredentials;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
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
    async fn create_links_address_and_contact_to_erp_name() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/resource/Customer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "name": "CUST-0001" } })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/resource/Address"))
            .and(body_partial_json(json!({
                "address_title": "CUST-0001",
                "links": [{ "link_doctype": "Customer", "link_name": "CUST-0001" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/resource/Contact"))
            .and(body_partial_json(json!({ "email_id": "ops@acme.test" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .expect(1)
            .mount(&server)
            .await;

        let input: CreateCustomerInput = serde_json::from_value(json!({
            "customer_name": "Acme",
            "customer_type": "Company",
            "address_line1": "1 Main St",
            "email": "ops@acme.test"
        }))
        .unwrap();
        let resp = create(&erp(&server), input).await.unwrap();
        assert_eq!(resp["data"]["name"], "CUST-0001");
    }

    #[tokio::test]
    async fn create_without_sub_records_only_posts_customer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/resource/Customer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "name": "Acme" } })))
            .expect(1)
            .mount(&server)
            .await;

        let input: CreateCustomerInput = serde_json::from_value(json!({
            "customer_name": "Acme",
            "customer_type": "Company"
        }))
        .unwrap();
        create(&erp(&server), input).await.unwrap();
    }

    #[tokio::test]
    async fn get_attaches_addresses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/resource/Customer/Acme"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "name": "Acme" } })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/resource/Address"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "name": "Acme-Billing", "city": "Pune" }]
            })))
            .mount(&server)
            .await;

        let customer = get(&erp(&server), "Acme").await.unwrap();
        assert_eq!(customer["data"]["addresses"][0]["city"], "Pune");
    }

    #[tokio::test]
    async fn get_survives_address_lookup_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/resource/Customer/Acme"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "name": "Acme" } })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/resource/Address"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let customer = get(&erp(&server), "Acme").await.unwrap();
        assert!(customer["data"].get("addresses").is_none());
    }
}

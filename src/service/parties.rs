//! Address bookkeeping shared by customers and suppliers.

use serde_json::Value;
use tracing::warn;

use crate::api::ErpNextClient;
use crate::error::BridgeError;
use crate::types::party::{AddressFields, AddressPayload, AddressUpdate, DynamicLink};

/// Name ERPNext assigned to a created record, or `fallback`.
pub(crate) fn created_name(resp: &Value, fallback: &str) -> String {
    resp.pointer("/data/name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Updates the first linked address, or creates a billing address when the
/// record has none. No-op without a first address line.
pub(crate) async fn upsert_primary_address(
    erp: &ErpNextClient,
    doctype: &str,
    name: &str,
    fields: &AddressFields,
) -> Result<(), BridgeError> {
    let Some(update) = AddressUpdate::from_fields(fields) else {
        return Ok(());
    };
    let existing = erp.get_addresses(doctype, name).await?;
    let primary = existing
        .data
        .first()
        .and_then(|addr| addr.get("name"))
        .and_then(Value::as_str);

    match primary {
        Some(address_name) => {
            erp.update_address(address_name, &update).await?;
        }
        None => {
            if let Some(payload) =
                AddressPayload::billing(name, fields, DynamicLink::new(doctype, name))
            {
                erp.create_address(&payload).await?;
            }
        }
    }
    Ok(())
}

/// Best effort: sets `data.addresses` on a fetched record.
pub(crate) async fn attach_addresses(erp: &ErpNextClient, doctype: &str, name: &str, record: &mut Value) {
    match erp.get_addresses(doctype, name).await {
        Ok(addresses) => {
            if let Some(data) = record.get_mut("data").and_then(Value::as_object_mut) {
                data.insert("addresses".into(), Value::Array(addresses.data));
            }
        }
        Err(e) => warn!(doctype, record = name, error = %e, "failed to fetch linked addresses"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErpCredentials;
    use serde_json::json;
    use wiremock::matchers::{method, path};
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

    fn fields() -> AddressFields {
        AddressFields {
            address_line1: Some("2 Mill Rd".into()),
            ..Default::default()
        }
    }

    #[test]
    fn created_name_prefers_erp_value() {
        assert_eq!(created_name(&json!({ "data": { "name": "SUP-7" } }), "x"), "SUP-7");
        assert_eq!(created_name(&json!({}), "Loom Works"), "Loom Works");
    }

    #[tokio::test]
    async fn existing_address_is_updated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/resource/Address"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{ "name": "SUP-7-Billing" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/resource/Address/SUP-7-Billing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .expect(1)
            .mount(&server)
            .await;

        upsert_primary_address(&erp(&server), "Supplier", "SUP-7", &fields())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn missing_address_is_created() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/resource/Address"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/resource/Address"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .expect(1)
            .mount(&server)
            .await;

        upsert_primary_address(&erp(&server), "Supplier", "SUP-7", &fields())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn nothing_happens_without_first_line() {
        let server = MockServer::start().await;
        upsert_primary_address(&erp(&server), "Supplier", "SUP-7", &AddressFields::default())
            .await
            .unwrap();
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}

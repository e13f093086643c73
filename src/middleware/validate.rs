use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::{StatusCode, request::Parts};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::BridgeError;

/// JSON body that has been deserialized and passed its `validator` rules.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = BridgeError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                    BridgeError::PayloadTooLarge
                } else {
                    BridgeError::Validation(rejection.body_text())
                }
            })?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Query string counterpart of [`ValidJson`].
#[derive(Debug, Clone)]
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = BridgeError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| BridgeError::Validation(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header::CONTENT_TYPE;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Named {
        #[validate(length(min = 3))]
        name: String,
        #[serde(default)]
        #[validate(range(min = 1, max = 5))]
        level: Option<u8>,
    }

    fn json_request(body: &str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn accepts_valid_body() {
        let ValidJson(named) = ValidJson::<Named>::from_request(json_request(r#"{"name":"abc"}"#), &())
            .await
            .unwrap();
        assert_eq!(named.name, "abc");
    }

    #[tokio::test]
    async fn rule_violations_are_bad_requests() {
        let err = ValidJson::<Named>::from_request(json_request(r#"{"name":"ab"}"#), &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = ValidJson::<Named>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn query_rules_apply() {
        let (mut parts, _) = Request::builder()
            .uri("/?name=abcd&level=9")
            .body(())
            .unwrap()
            .into_parts();
        let err = ValidQuery::<Named>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
    }
}

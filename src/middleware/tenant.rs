use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;

use super::auth::AuthUser;
use crate::api::ErpNextClient;
use crate::error::BridgeError;
use crate::service::{ErpConnections, SessionKeys};

/// ERPNext client bound to the authenticated caller's stored connection.
pub struct TenantErp {
    pub user: AuthUser,
    pub erp: ErpNextClient,
}

impl<S> FromRequestParts<S> for TenantErp
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
    ErpConnections: FromRef<S>,
{
    type Rejection = BridgeError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        let erp = ErpConnections::from_ref(state)
            .client_for_user(&user.user_id)
            .await?;
        Ok(Self { user, erp })
    }
}

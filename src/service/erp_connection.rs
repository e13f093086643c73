use std::sync::Arc;
use tracing::error;

use crate::api::{ErpCredentials, ErpNextClient};
use crate::crypto::CredentialCipher;
use crate::db::Storage;
use crate::db::models::{ConnectionChanges, DbErpConnection, NewErpConnection};
use crate::error::BridgeError;
use crate::types::user::ErpCredentialInput;

/// Resolves a tenant's stored connection into a ready [`ErpNextClient`].
#[derive(Clone)]
pub struct ErpConnections {
    storage: Storage,
    cipher: Arc<CredentialCipher>,
    http: reqwest::Client,
}

impl ErpConnections {
    pub fn new(storage: Storage, cipher: Arc<CredentialCipher>, http: reqwest::Client) -> Self {
        Self {
            storage,
            cipher,
            http,
        }
    }

    /// Loads the user's connection row, opens both secrets and binds a client.
    pub async fn client_for_user(&self, user_id: &str) -> Result<ErpNextClient, BridgeError> {
        let conn = self
            .storage
            .find_connection(user_id)
            .await?
            .ok_or_else(|| BridgeError::NotFound("ERP connection not found".into()))?;
        let credentials = self.open(&conn)?;
        ErpNextClient::new(self.http.clone(), &credentials).map_err(|e| {
            error!(user_id, domain = %conn.erp_domain, error = %e, "failed to build ERPNext client");
            BridgeError::ErpClientInit
        })
    }

    fn open(&self, conn: &DbErpConnection) -> Result<ErpCredentials, BridgeError> {
        let decrypt = |field: &str, stored: &str| {
            if stored.is_empty() {
                error!(user_id = %conn.user_id, field, "stored ERP credential is empty");
                return Err(BridgeError::ErpClientInit);
            }
            self.cipher.open(stored).map_err(|e| {
                error!(
                    user_id = %conn.user_id,
                    domain = %conn.erp_domain,
                    field,
                    error = %e,
                    "failed to decrypt ERPNext credentials"
                );
                BridgeError::ErpClientInit
            })
        };
        Ok(ErpCredentials {
            erp_domain: conn.erp_domain.clone(),
            api_key: decrypt("api_key", &conn.encrypted_api_key)?,
            api_secret: decrypt("api_secret", &conn.encrypted_api_secret)?,
        })
    }

    /// Encrypts a full credential set for storage.
    pub fn seal(&self, input: &ErpCredentialInput) -> Result<NewErpConnection, BridgeError> {
        Ok(NewErpConnection {
            erp_domain: input.erp_domain.clone(),
            encrypted_api_key: self.cipher.seal(&input.api_key)?,
            encrypted_api_secret: self.cipher.seal(&input.api_secret)?,
        })
    }

    /// Encrypts whichever credential fields are present.
    pub fn seal_changes(
        &self,
        erp_domain: Option<String>,
        api_key: Option<&str>,
        api_secret: Option<&str>,
    ) -> Result<ConnectionChanges, BridgeError> {
        Ok(ConnectionChanges {
            erp_domain,
            encrypted_api_key: api_key.map(|k| self.cipher.seal(k)).transpose()?,
            encrypted_api_secret: api_secret.map(|s| self.cipher.seal(s)).transpose()?,
        })
    }

    /// Whether [`Self::apply_changes`] would write anything for this user.
    pub async fn can_apply(&self, user_id: &str, changes: &ConnectionChanges) -> Result<bool, BridgeError> {
        if changes.is_empty() {
            return Ok(false);
        }
        if changes.is_complete() {
            return Ok(true);
        }
        Ok(self.storage.find_connection(user_id).await?.is_some())
    }

    /// Writes changes to the existing row, or creates one when all three
    /// fields are present. Returns `false` when nothing could be written.
    pub async fn apply_changes(&self, user_id: &str, changes: ConnectionChanges) -> Result<bool, BridgeError> {
        if changes.is_empty() {
            return Ok(false);
        }
        if self.storage.update_connection(user_id, changes.clone()).await? {
            return Ok(true);
        }
        match changes.into_complete() {
            Some(conn) => {
                self.storage.upsert_connection(user_id, conn).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

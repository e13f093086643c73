use tracing::info;

use super::erp_connection::ErpConnections;
use super::session::{SessionKeys, hash_password, verify_password};
use crate::db::Storage;
use crate::db::models::{NewUser, PublicUser, UserChanges};
use crate::error::BridgeError;
use crate::types::user::{CreateUserInput, EditUserInput, LoginInput, UserListQuery};

/// Accounts, sessions and the ERP connection attached to each account.
#[derive(Clone)]
pub struct UserService {
    storage: Storage,
    connections: ErpConnections,
    session: SessionKeys,
}

impl UserService {
    pub fn new(storage: Storage, connections: ErpConnections, session: SessionKeys) -> Self {
        Self {
            storage,
            connections,
            session,
        }
    }

    /// Returns a signed access token.
    pub async fn login(&self, input: LoginInput) -> Result<String, BridgeError> {
        let user = self
            .storage
            .find_user_by_email(&input.email)
            .await?
            .ok_or(BridgeError::InvalidCredentials)?;
        if !verify_password(input.password, user.password_hash).await? {
            return Err(BridgeError::InvalidCredentials);
        }
        info!(user_id = %user.id, role = %user.role, "user logged in");
        self.session.sign(&user.id, user.role)
    }

    pub async fn create_user(&self, input: CreateUserInput) -> Result<String, BridgeError> {
        if self.storage.find_user_by_email(&input.email).await?.is_some() {
            return Err(BridgeError::Conflict("User already exists".into()));
        }
        let connection = input
            .erp_credentials()
            .map(|creds| self.connections.seal(&creds))
            .transpose()?;
        let password_hash = hash_password(input.password).await?;

        let id = self
            .storage
            .create_user(
                NewUser {
                    email: input.email,
                    password_hash,
                    role: input.role,
                },
                connection,
            )
            .await?;
        info!(user_id = %id, role = %input.role, "user created");
        Ok(id)
    }

    pub async fn get(&self, id: &str) -> Result<PublicUser, BridgeError> {
        self.storage
            .find_user(id)
            .await?
            .ok_or_else(|| BridgeError::NotFound("User not found".into()))
    }

    pub async fn list(&self, query: &UserListQuery) -> Result<Vec<PublicUser>, BridgeError> {
        self.storage
            .list_users(query.page, query.limit, query.search.as_deref())
            .await
    }

    /// Partial update of the profile and, when ERP fields are given, its
    /// connection.
    pub async fn update(&self, id: &str, input: EditUserInput) -> Result<(), BridgeError> {
        if self.storage.find_user(id).await?.is_none() {
            return Err(BridgeError::NotFound("User not found".into()));
        }

        let erp_changes = if input.touches_erp() {
            let changes = self.connections.seal_changes(
                input.erp_domain.clone(),
                input.api_key.as_deref(),
                input.api_secret.as_deref(),
            )?;
            if !self.connections.can_apply(id, &changes).await? {
                return Err(BridgeError::Validation(
                    "ERP domain, API key, and API secret are required to create an ERP connection"
                        .into(),
                ));
            }
            Some(changes)
        } else {
            None
        };

        let password_hash = match input.password {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };
        self.storage
            .update_user(
                id,
                UserChanges {
                    email: input.email,
                    password_hash,
                    role: input.role,
                },
            )
            .await?;

        if let Some(changes) = erp_changes {
            self.connections.apply_changes(id, changes).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CredentialCipher;
    use crate::db::models::UserRole;
    use std::sync::Arc;

    async fn service() -> (tempfile::TempDir, Storage, UserService) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("users.db").display());
        let storage = Storage::connect(&url).await.unwrap();
        let connections = ErpConnections::new(
            storage.clone(),
            Arc::new(CredentialCipher::new([3u8; 32])),
            reqwest::Client::new(),
        );
        let svc = UserService::new(
            storage.clone(),
            connections,
            SessionKeys::new("test-session-secret"),
        );
        (dir, storage, svc)
    }

    fn client_input(email: &str) -> CreateUserInput {
        CreateUserInput {
            email: email.into(),
            password: "correct-horse".into(),
            role: UserRole::Client,
            erp_domain: Some("erp.example.com".into()),
            api_key: Some("key".into()),
            api_secret: Some("secret".into()),
        }
    }

    #[tokio::test]
    async fn create_then_login() {
        let (_dir, storage, svc) = service().await;
        let id = svc.create_user(client_input("c@example.com")).await.unwrap();
        let conn = storage.find_connection(&id).await.unwrap().unwrap();
        assert_ne!(conn.encrypted_api_secret, "secret");

        let token = svc
            .login(LoginInput {
                email: "c@example.com".into(),
                password: "correct-horse".into(),
            })
            .await
            .unwrap();
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let (_dir, _storage, svc) = service().await;
        svc.create_user(client_input("c@example.com")).await.unwrap();
        let err = svc
            .login(LoginInput {
                email: "c@example.com".into(),
                password: "nope-nope".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidCredentials));

        let err = svc
            .login(LoginInput {
                email: "ghost@example.com".into(),
                password: "whatever".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidCredentials));
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let (_dir, _storage, svc) = service().await;
        svc.create_user(client_input("dup@example.com")).await.unwrap();
        let err = svc
            .create_user(client_input("dup@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_rehashes_password_and_rotates_key() {
        let (_dir, storage, svc) = service().await;
        let id = svc.create_user(client_input("c@example.com")).await.unwrap();
        let before = storage.find_connection(&id).await.unwrap().unwrap();

        svc.update(
            &id,
            EditUserInput {
                password: Some("brand-new-password".into()),
                api_key: Some("rotated".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let after = storage.find_connection(&id).await.unwrap().unwrap();
        assert_ne!(before.encrypted_api_key, after.encrypted_api_key);
        assert_eq!(before.encrypted_api_secret, after.encrypted_api_secret);
        assert!(
            svc.login(LoginInput {
                email: "c@example.com".into(),
                password: "brand-new-password".into(),
            })
            .await
            .is_ok()
        );
    }

    #[tokio::test]
    async fn rejected_erp_change_leaves_profile_untouched() {
        let (_dir, storage, svc) = service().await;
        let id = svc
            .create_user(CreateUserInput {
                email: "a@example.com".into(),
                password: "correct-horse".into(),
                role: UserRole::Admin,
                erp_domain: None,
                api_key: None,
                api_secret: None,
            })
            .await
            .unwrap();

        let err = svc
            .update(
                &id,
                EditUserInput {
                    password: Some("brand-new-password".into()),
                    api_key: Some("only-key".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
        assert!(storage.find_connection(&id).await.unwrap().is_none());

        let login = |password: &str| LoginInput {
            email: "a@example.com".into(),
            password: password.into(),
        };
        assert!(svc.login(login("correct-horse")).await.is_ok());
        assert!(svc.login(login("brand-new-password")).await.is_err());
    }

    #[tokio::test]
    async fn update_of_unknown_user_is_not_found() {
        let (_dir, _storage, svc) = service().await;
        let err = svc
            .update("missing", EditUserInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::NotFound(_)));
    }
}

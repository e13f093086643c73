use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

use crate::db::models::UserRole;
use crate::error::BridgeError;
use crate::service::session::{ACCESS_TOKEN_TTL_MINUTES, SessionKeys};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// The caller behind a valid `access_token` cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: String,
    pub role: UserRole,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = BridgeError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let Some(token) = jar
            .get(ACCESS_TOKEN_COOKIE)
            .map(|c| c.value().to_owned())
            .filter(|t| !t.is_empty())
        else {
            return Err(BridgeError::MissingSession);
        };

        let claims = SessionKeys::from_ref(state).verify(&token)?;
        Ok(Self {
            user_id: claims.user_id,
            role: claims.role,
        })
    }
}

/// [`AuthUser`] that must hold the admin role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthUser);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
    SessionKeys: FromRef<S>,
{
    type Rejection = BridgeError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != UserRole::Admin {
            return Err(BridgeError::Forbidden);
        }
        Ok(Self(user))
    }
}

fn base_cookie(value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((ACCESS_TOKEN_COOKIE, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Strict)
        .build()
}

/// Max-Age runs one minute past the token's own expiry.
pub fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(token, secure);
    cookie.set_max_age(Duration::minutes(ACCESS_TOKEN_TTL_MINUTES + 1));
    cookie
}

pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    let mut cookie = base_cookie(String::new(), secure);
    cookie.set_max_age(Duration::ZERO);
    cookie
}

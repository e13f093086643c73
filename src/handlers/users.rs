use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum_extra::extract::cookie::CookieJar;
use serde_json::{Value, json};

use crate::db::PublicUser;
use crate::db::models::UserRole;
use crate::error::BridgeError;
use crate::middleware::auth::{clear_session_cookie, session_cookie};
use crate::middleware::{AuthUser, RequireAdmin, ValidJson, ValidQuery};
use crate::router::AppState;
use crate::types::user::{CreateUserInput, EditUserInput, LoginInput, UserListQuery};

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(input): ValidJson<LoginInput>,
) -> Result<(CookieJar, Json<Value>), BridgeError> {
    let token = state.users.login(input).await?;
    let jar = jar.add(session_cookie(token, state.secure_cookies));
    Ok((jar, Json(json!({ "message": "Login successful" }))))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = jar.add(clear_session_cookie(state.secure_cookies));
    (jar, Json(json!({ "message": "Logged out" })))
}

pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ValidJson(input): ValidJson<CreateUserInput>,
) -> Result<(StatusCode, Json<Value>), BridgeError> {
    state.users.create_user(input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": "User created" }))))
}

pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ValidQuery(query): ValidQuery<UserListQuery>,
) -> Result<Json<Vec<PublicUser>>, BridgeError> {
    Ok(Json(state.users.list(&query).await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
) -> Result<Json<PublicUser>, BridgeError> {
    Ok(Json(state.users.get(&id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<String>,
    ValidJson(input): ValidJson<EditUserInput>,
) -> Result<Json<Value>, BridgeError> {
    state.users.update(&id, input).await?;
    Ok(Json(json!({ "message": "User updated" })))
}

pub async fn my_profile(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<PublicUser>, BridgeError> {
    Ok(Json(state.users.get(&user.user_id).await?))
}

/// Only admins may change their own role.
pub async fn update_my_profile(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(mut input): ValidJson<EditUserInput>,
) -> Result<Json<Value>, BridgeError> {
    if user.role != UserRole::Admin {
        input.role = None;
    }
    state.users.update(&user.user_id, input).await?;
    Ok(Json(json!({ "message": "Profile updated" })))
}

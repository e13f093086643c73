use axum::Json;
use axum::extract::State;

use crate::error::BridgeError;
use crate::middleware::{AuthUser, ValidJson};
use crate::router::AppState;
use crate::service::image_upload;
use crate::types::upload::{UploadUrl, UploadUrlInput};

pub async fn upload_url(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(input): ValidJson<UploadUrlInput>,
) -> Result<Json<UploadUrl>, BridgeError> {
    let url = image_upload::upload_url(state.presigner.as_ref(), &user.user_id, &input)?;
    Ok(Json(url))
}

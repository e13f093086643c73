use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

const IMAGE_SUBTYPES: [&str; 4] = ["jpeg", "png", "jpg", "webp"];

fn image_content_type(value: &str) -> Result<(), ValidationError> {
    let ok = value
        .split_once('/')
        .filter(|(kind, _)| kind.eq_ignore_ascii_case("image"))
        .is_some_and(|(_, sub)| IMAGE_SUBTYPES.iter().any(|s| sub.eq_ignore_ascii_case(s)));
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new("fileType").with_message("Invalid image type".into()))
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrlInput {
    #[validate(length(min = 1, message = "fileName is required"))]
    pub file_name: String,
    #[validate(custom(function = "image_content_type"))]
    pub file_type: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrl {
    pub message: &'static str,
    pub upload_url: String,
    pub public_url: String,
    pub key: String,
}

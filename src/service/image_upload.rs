use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use tracing::error;

use crate::config::Config;
use crate::error::BridgeError;
use crate::types::upload::{UploadUrl, UploadUrlInput};

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of an upload URL, in seconds.
pub const UPLOAD_URL_TTL_SECS: u64 = 300;

/// Query-string SigV4 signer for S3 object URLs.
#[derive(Clone)]
pub struct S3Presigner {
    access_key_id: String,
    secret_access_key: String,
    bucket: String,
    region: String,
    host: String,
}

impl S3Presigner {
    pub fn new(access_key_id: &str, secret_access_key: &str, bucket: &str, region: &str) -> Self {
        Self {
            access_key_id: access_key_id.to_string(),
            secret_access_key: secret_access_key.to_string(),
            bucket: bucket.to_string(),
            region: region.to_string(),
            host: format!("{bucket}.s3.{region}.amazonaws.com"),
        }
    }

    /// `None` until all four S3 settings are present.
    pub fn from_config(cfg: &Config) -> Option<Self> {
        cfg.s3_configured().then(|| {
            Self::new(
                &cfg.aws_access_key_id,
                &cfg.aws_secret_access_key,
                &cfg.s3_bucket_name,
                &cfg.s3_region,
            )
        })
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn public_url(&self, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com{}",
            self.bucket,
            self.region,
            canonical_uri(key)
        )
    }

    /// Presigned URL for `method` on `key`. When `content_type` is given the
    /// uploader must send the same `Content-Type`.
    pub fn presign(
        &self,
        method: &str,
        key: &str,
        content_type: Option<&str>,
        expires_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<String, BridgeError> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();
        let scope = format!("{date}/{}/s3/aws4_request", self.region);
        let signed_headers = if content_type.is_some() {
            "content-type;host"
        } else {
            "host"
        };

        let mut params = [
            ("X-Amz-Algorithm", "AWS4-HMAC-SHA256".to_string()),
            (
                "X-Amz-Credential",
                format!("{}/{scope}", self.access_key_id),
            ),
            ("X-Amz-Date", amz_date.clone()),
            ("X-Amz-Expires", expires_secs.to_string()),
            ("X-Amz-SignedHeaders", signed_headers.to_string()),
        ];
        params.sort_by(|a, b| a.0.cmp(b.0));
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", uri_encode(k, true), uri_encode(v, true)))
            .collect::<Vec<_>>()
            .join("&");

        let mut headers = String::new();
        if let Some(ct) = content_type {
            let _ = writeln!(headers, "content-type:{}", ct.trim());
        }
        let _ = writeln!(headers, "host:{}", self.host);

        let uri = canonical_uri(key);
        let canonical_request =
            format!("{method}\n{uri}\n{query}\n{headers}\n{signed_headers}\nUNSIGNED-PAYLOAD");
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{amz_date}\n{scope}\n{}",
            hex::encode(Sha256::digest(canonical_request.as_bytes()))
        );

        let signing_key = [date.as_str(), self.region.as_str(), "s3", "aws4_request"]
            .iter()
            .try_fold(
                format!("AWS4{}", self.secret_access_key).into_bytes(),
                |key, part| hmac_sha256(&key, part.as_bytes()),
            )?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        Ok(format!(
            "https://{}{uri}?{query}&X-Amz-Signature={signature}",
            self.host
        ))
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, BridgeError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| BridgeError::Upload(format!("invalid signing key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// RFC 3986 encoding as SigV4 expects it; `/` kept when `encode_slash` is
/// false.
fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b'/' if !encode_slash => out.push('/'),
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}

fn canonical_uri(key: &str) -> String {
    format!("/{}", uri_encode(key.trim_start_matches('/'), false))
}

/// Object key for an upload: `user-<id>/<epoch millis>-<file name>`.
pub fn object_key(user_id: &str, file_name: &str, now: DateTime<Utc>) -> String {
    format!("user-{user_id}/{}-{file_name}", now.timestamp_millis())
}

pub fn upload_url(
    presigner: Option<&S3Presigner>,
    user_id: &str,
    input: &UploadUrlInput,
) -> Result<UploadUrl, BridgeError> {
    let presigner = presigner.ok_or_else(|| {
        error!("S3 upload requested but AWS settings are incomplete");
        BridgeError::Upload("AWS configuration incomplete".into())
    })?;
    let now = Utc::now();
    let key = object_key(user_id, &input.file_name, now);
    let upload_url = presigner.presign(
        "PUT",
        &key,
        Some(&input.file_type),
        UPLOAD_URL_TTL_SECS,
        now,
    )?;
    Ok(UploadUrl {
        message: "Upload URL generated",
        upload_url,
        public_url: presigner.public_url(&key),
        key,
    })
}

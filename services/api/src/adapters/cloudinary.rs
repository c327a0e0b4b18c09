//! services/api/src/adapters/cloudinary.rs
//!
//! This module contains the adapter for the media host. It implements the
//! `MediaStorageService` port from the `core` crate by talking to Cloudinary's
//! signed upload API over HTTPS.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use learnstake_core::domain::StoredMedia;
use learnstake_core::ports::{MediaStorageService, PortError, PortResult};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{error, info, warn};

use crate::config::CloudinaryConfig;

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Deserialize)]
struct DestroyResponse {
    result: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `MediaStorageService` against Cloudinary's video API.
#[derive(Clone)]
pub struct CloudinaryMediaAdapter {
    client: reqwest::Client,
    config: CloudinaryConfig,
}

impl CloudinaryMediaAdapter {
    pub fn new(client: reqwest::Client, config: CloudinaryConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/video/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            action
        )
    }

    /// Reads the upstream error message out of a failed response.
    async fn upstream_error(response: reqwest::Response) -> PortError {
        let status = response.status();
        let message = match response.json::<ErrorEnvelope>().await {
            Ok(envelope) => envelope.error.message,
            Err(_) => format!("media host answered with status {}", status),
        };
        error!("Media host request failed ({}): {}", status, message);
        PortError::Upstream(message)
    }
}

/// Signs a set of request parameters the way the media host expects: the
/// parameters sorted by name, joined as `k=v` pairs with `&`, with the API
/// secret appended, then SHA-1 hashed and hex encoded.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

//=========================================================================================
// `MediaStorageService` Trait Implementation
//=========================================================================================

#[async_trait]
impl MediaStorageService for CloudinaryMediaAdapter {
    async fn upload_video(
        &self,
        data: Bytes,
        file_name: &str,
        public_id: &str,
        content_type: &str,
    ) -> PortResult<StoredMedia> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[
                ("folder", self.config.folder.as_str()),
                ("public_id", public_id),
                ("timestamp", timestamp.as_str()),
            ],
            &self.config.api_secret,
        );

        let size = data.len();
        let file = Part::stream_with_length(data, size as u64)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let form = Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", self.config.folder.clone())
            .text("public_id", public_id.to_string())
            .text("signature", signature);

        info!("Uploading {} ({} bytes) to the media host", file_name, size);
        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!("Media upload request failed: {}", e);
                PortError::Upstream(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| PortError::Upstream(format!("unreadable upload response: {}", e)))?;
        info!("Stored media {}", uploaded.public_id);

        Ok(StoredMedia {
            secure_url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }

    async fn delete_video(&self, public_id: &str) -> PortResult<()> {
        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            &self.config.api_secret,
        );

        let form = Form::new()
            .text("public_id", public_id.to_string())
            .text("timestamp", timestamp)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature);

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                error!("Media delete request failed: {}", e);
                PortError::Upstream(e.to_string())
            })?;

        if !response.status().is_success() {
            return Err(Self::upstream_error(response).await);
        }

        let outcome: DestroyResponse = response
            .json()
            .await
            .map_err(|e| PortError::Upstream(format!("unreadable destroy response: {}", e)))?;
        match outcome.result.as_str() {
            "ok" => {
                info!("Deleted media {}", public_id);
                Ok(())
            }
            "not found" => {
                warn!("Media {} was already gone", public_id);
                Err(PortError::NotFound(format!("Media {} not found", public_id)))
            }
            other => Err(PortError::Upstream(format!(
                "media host refused to delete {}: {}",
                public_id, other
            ))),
        }
    }
}

use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

lazy_static! {
    static ref ALLOWED_IMAGE_TYPES: HashSet<&'static str> =
        ["image/jpeg", "image/png", "image/webp", "image/gif"]
            .into_iter()
            .collect();
}

/// A locally-held file reference, the thing a user picked in the upload
/// panel.
#[derive(Clone, Debug)]
pub struct ImageFile {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Upload acknowledgment, also the wire shape of a successful
/// `/api/upload-image` response.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadResult {
    pub success: bool,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    pub filename: String,
    pub size: u64,
    #[serde(rename = "uploadedAt")]
    pub uploaded_at: String,
}

/// The boundary constraint: only the allow-listed image kinds, capped at
/// 10 MiB. Enforced where the upload is received, never pre-checked by the
/// caller, so a rejection always round-trips.
pub fn validate_image(content_type: &str, size: u64) -> Result<()> {
    if !ALLOWED_IMAGE_TYPES.contains(content_type) {
        bail!("unsupported image type: {content_type}");
    }
    if size > MAX_IMAGE_BYTES {
        bail!(
            "image is too large: {size} bytes (limit {} bytes)",
            MAX_IMAGE_BYTES
        );
    }
    Ok(())
}

/// One image upload round trip yielding an acknowledgment.
#[async_trait]
pub trait ImageUploadService: Send + Sync {
    async fn upload_image(&self, file: &ImageFile) -> Result<UploadResult>;
}

const MOCK_UPLOAD_DELAY: Duration = Duration::from_millis(1500);

/// Validates the file, then fabricates a placeholder URL instead of
/// persisting anything. An artificial delay emulates backend latency.
pub struct MockUploadService {
    delay: Duration,
}

impl MockUploadService {
    pub fn new() -> Self {
        MockUploadService {
            delay: MOCK_UPLOAD_DELAY,
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        MockUploadService { delay }
    }
}

#[async_trait]
impl ImageUploadService for MockUploadService {
    async fn upload_image(&self, file: &ImageFile) -> Result<UploadResult> {
        validate_image(&file.content_type, file.size())?;
        tokio::time::sleep(self.delay).await;
        Ok(UploadResult {
            success: true,
            image_url: format!(
                "https://images.wayfarer.dev/uploads/{}/{}",
                Uuid::new_v4(),
                file.filename
            ),
            filename: file.filename.clone(),
            size: file.size(),
            uploaded_at: Utc::now().to_rfc3339(),
        })
    }
}

/// Talks to a real backend over HTTP, multipart `POST
/// {base_url}/api/upload-image` with the file under the `image` field.
pub struct HttpUploadService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUploadService {
    pub fn new(base_url: &str) -> Self {
        HttpUploadService {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageUploadService for HttpUploadService {
    async fn upload_image(&self, file: &ImageFile) -> Result<UploadResult> {
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)?;
        let form = reqwest::multipart::Form::new().part("image", part);
        let response = self
            .client
            .post(format!("{}/api/upload-image", self.base_url))
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            bail!("image upload failed: HTTP {}", response.status());
        }
        Ok(response.json().await?)
    }
}

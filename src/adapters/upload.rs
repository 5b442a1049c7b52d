use crate::utils::error::{AdminError, Result};
use std::path::Path;

pub const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// A validated part image ready to be attached to a multipart form.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    file_name: String,
    mime: &'static str,
    bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn from_bytes(file_name: &str, bytes: Vec<u8>) -> Result<Self> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        let mime = match extension.as_deref() {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            _ => {
                return Err(AdminError::UploadError {
                    message: format!("{} is not a JPEG or PNG image", file_name),
                })
            }
        };

        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(AdminError::UploadError {
                message: format!(
                    "{} is {} bytes, limit is {} bytes",
                    file_name,
                    bytes.len(),
                    MAX_IMAGE_BYTES
                ),
            });
        }

        Ok(Self {
            file_name: file_name.to_string(),
            mime,
            bytes,
        })
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| AdminError::UploadError {
                message: format!("{} has no usable file name", path.display()),
            })?
            .to_string();
        let bytes = tokio::fs::read(path).await?;
        Self::from_bytes(&file_name, bytes)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime(&self) -> &str {
        self.mime
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn into_part(self) -> Result<reqwest::multipart::Part> {
        reqwest::multipart::Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str(self.mime)
            .map_err(|e| AdminError::UploadError {
                message: e.to_string(),
            })
    }
}

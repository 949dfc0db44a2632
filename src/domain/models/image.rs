#[cfg(test)]
#[path = "image_test.rs"]
mod tests;

use std::path;

use anyhow::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_derive::Deserialize;
use serde_derive::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::DesignError;

const IMAGE_EXTENSIONS: [(&str, &str); 8] = [
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
];

/// A single raster image held as inline base64 data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageState {
    pub base64: String,
    pub mime_type: String,
}

impl ImageState {
    pub fn new(base64: &str, mime_type: &str) -> ImageState {
        return ImageState {
            base64: base64.to_string(),
            mime_type: mime_type.to_string(),
        };
    }

    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Result<ImageState> {
        if !mime_type.starts_with("image/") {
            return Err(DesignError::InvalidImage.into());
        }

        return Ok(ImageState::new(&STANDARD.encode(bytes), mime_type));
    }

    pub async fn from_file(file_path: &path::Path) -> Result<ImageState> {
        let mime_type = match ImageState::mime_type_for_path(file_path) {
            Some(mime_type) => mime_type,
            None => return Err(DesignError::InvalidImage.into()),
        };

        let bytes = fs::read(file_path).await?;
        return ImageState::from_bytes(&bytes, mime_type);
    }

    pub fn mime_type_for_path(file_path: &path::Path) -> Option<&'static str> {
        let ext = file_path.extension()?.to_string_lossy().to_lowercase();
        return IMAGE_EXTENSIONS
            .iter()
            .find(|(known, _)| return *known == ext)
            .map(|(_, mime_type)| return *mime_type);
    }

    /// File extension matching the MIME type, falling back to the subtype.
    pub fn extension(&self) -> String {
        if let Some((ext, _)) = IMAGE_EXTENSIONS
            .iter()
            .find(|(_, mime_type)| return *mime_type == self.mime_type)
        {
            return ext.to_string();
        }

        return self
            .mime_type
            .split('/')
            .last()
            .unwrap_or("img")
            .to_string();
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        return Ok(STANDARD.decode(&self.base64)?);
    }

    pub async fn write_to(&self, dir: &path::Path, stem: &str) -> Result<path::PathBuf> {
        if !dir.exists() {
            fs::create_dir_all(dir).await?;
        }

        let file_path = dir.join(format!("{stem}.{}", self.extension()));
        let mut file = fs::File::create(&file_path).await?;
        file.write_all(&self.to_bytes()?).await?;

        return Ok(file_path);
    }
}

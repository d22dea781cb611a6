//! Caller-side description of a user turn
//!
//! A turn is text, an image, or both. Images come in three forms and the
//! caller must say which one it holds, because only raw base64 needs the
//! data-URL prefix added before it goes upstream.

use super::models::{ContentPart, ImageDetail};
use crate::error::{Result, ServiceError};

/// Where an image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Complete `data:<mime>;base64,<payload>` URL, sent unchanged
    DataUrl(String),

    /// Bare base64 payload; the prefix is built from `mime`
    Base64 { data: String, mime: String },

    /// Externally hosted image
    Remote(String),
}

impl ImageSource {
    /// Bare base64 PNG payload
    pub fn base64_png(data: impl Into<String>) -> Self {
        ImageSource::Base64 {
            data: data.into(),
            mime: "image/png".to_string(),
        }
    }

    /// URL to put in the `image_url` part
    pub fn to_url(&self) -> Result<String> {
        match self {
            ImageSource::DataUrl(url) => {
                if !url.starts_with("data:") || !url.contains(";base64,") {
                    return Err(ServiceError::validation("Image data URL must look like data:<mime>;base64,<payload>"));
                }
                Ok(url.clone())
            }
            ImageSource::Base64 { data, mime } => {
                let data = data.trim();
                if data.is_empty() {
                    return Err(ServiceError::validation("Image payload is empty"));
                }
                Ok(format!("data:{};base64,{}", mime, data))
            }
            ImageSource::Remote(url) => {
                let parsed = url::Url::parse(url)
                    .map_err(|e| ServiceError::validation(format!("Invalid image URL: {}", e)))?;
                match parsed.scheme() {
                    "http" | "https" => Ok(url.clone()),
                    other => Err(ServiceError::validation(format!("Unsupported image URL scheme: {}", other))),
                }
            }
        }
    }
}

/// Content of one user turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageInput {
    /// Instruction or payload text
    pub text: Option<String>,

    /// Attached image
    pub image: Option<ImageSource>,
}

impl MessageInput {
    /// Text-only turn
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }

    /// Image-only turn
    pub fn image(image: ImageSource) -> Self {
        Self {
            text: None,
            image: Some(image),
        }
    }

    /// Text plus image
    pub fn text_and_image(text: impl Into<String>, image: ImageSource) -> Self {
        Self {
            text: Some(text.into()),
            image: Some(image),
        }
    }

    /// Content parts in upstream order: text first, then image
    pub fn to_parts(&self, detail: ImageDetail) -> Result<Vec<ContentPart>> {
        let mut parts = Vec::with_capacity(2);

        if let Some(text) = self.text.as_deref().filter(|t| !t.trim().is_empty()) {
            parts.push(ContentPart::text(text));
        }

        if let Some(image) = &self.image {
            parts.push(ContentPart::image(image.to_url()?, detail));
        }

        if parts.is_empty() {
            return Err(ServiceError::validation("A message needs text, an image, or both"));
        }

        Ok(parts)
    }
}

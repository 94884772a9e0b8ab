use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;

/// Image payload envelope: base64-encoded PNG with the wire casing tool
/// clients expect (`mimeType`).
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ImageContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub data: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
}

impl ImageContent {
    pub fn png(bytes: &[u8]) -> Self {
        ImageContent {
            content_type: "image".to_string(),
            data: STANDARD.encode(bytes),
            mime_type: "image/png".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_png_envelope_round_trips() {
        let content = ImageContent::png(b"fake png bytes");
        assert_eq!(content.content_type, "image");
        assert_eq!(content.mime_type, "image/png");
        assert_eq!(
            STANDARD.decode(&content.data).unwrap(),
            b"fake png bytes"
        );
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(ImageContent::png(b"x")).unwrap();
        assert!(json.get("type").is_some());
        assert!(json.get("mimeType").is_some());
        assert!(json.get("data").is_some());
    }
}

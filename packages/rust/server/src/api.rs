//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};

use webclip_shared::{ExtractedPage, Template};

/// Body of `POST /convert`. Both fields are validated by the handler so
/// missing values produce specific error codes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConvertRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub template: Option<Template>,
}

/// Successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub success: bool,
    pub markdown: String,
    pub metadata: PageSummary,
}

impl ConvertResponse {
    pub fn new(markdown: String, page: &ExtractedPage) -> Self {
        Self {
            success: true,
            markdown,
            metadata: PageSummary::from(page),
        }
    }
}

/// Page metadata echoed back with a conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    pub domain: String,
    pub word_count: usize,
}

impl From<&ExtractedPage> for PageSummary {
    fn from(page: &ExtractedPage) -> Self {
        Self {
            title: page.title.clone(),
            author: page.author.clone(),
            published_date: page.published.clone(),
            domain: page.domain.clone(),
            word_count: page.word_count,
        }
    }
}

/// Machine-readable failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidUrl,
    InvalidRequest,
    FetchError,
    TemplateError,
    ExtractionError,
}

/// Body of every failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: ErrorCode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Service description returned by `GET /`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexResponse {
    pub name: String,
    pub version: String,
    pub endpoints: Endpoints,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoints {
    pub convert: String,
    pub health: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_serialize_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::InvalidUrl).unwrap();
        assert_eq!(json, "\"INVALID_URL\"");
        let json = serde_json::to_string(&ErrorCode::ExtractionError).unwrap();
        assert_eq!(json, "\"EXTRACTION_ERROR\"");
    }

    #[test]
    fn summary_uses_camel_case_and_omits_missing() {
        let page = ExtractedPage {
            title: "T".into(),
            published: Some("2024-01-01".into()),
            domain: "example.com".into(),
            word_count: 3,
            ..Default::default()
        };
        let value = serde_json::to_value(PageSummary::from(&page)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "title": "T",
                "publishedDate": "2024-01-01",
                "domain": "example.com",
                "wordCount": 3
            })
        );
    }

    #[test]
    fn request_fields_are_optional() {
        let req: ConvertRequest = serde_json::from_str("{}").unwrap();
        assert!(req.url.is_none());
        assert!(req.template.is_none());

        let req: ConvertRequest = serde_json::from_str(
            r#"{"url": "https://example.com", "template": {"properties": [], "extra": 1}}"#,
        )
        .unwrap();
        assert_eq!(req.url.as_deref(), Some("https://example.com"));
        assert!(req.template.unwrap().properties.is_empty());
    }
}

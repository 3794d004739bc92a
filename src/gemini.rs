//! Client for the Google Generative Language streaming endpoint.

use crate::config::Config;
use crate::model::{FragmentStream, GenerationError, GenerationRequest, GenerativeModel};
use crate::sse::SseEvents;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures::{Stream, StreamExt};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::io::Cursor;

/// Content filter categories the service can block on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HarmCategory {
    Hate,
    Harassment,
    Sexual,
    Dangerous,
}

impl HarmCategory {
    pub const ALL: [HarmCategory; 4] = [
        HarmCategory::Hate,
        HarmCategory::Harassment,
        HarmCategory::Sexual,
        HarmCategory::Dangerous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HarmCategory::Hate => "HARM_CATEGORY_HATE_SPEECH",
            HarmCategory::Harassment => "HARM_CATEGORY_HARASSMENT",
            HarmCategory::Sexual => "HARM_CATEGORY_SEXUALLY_EXPLICIT",
            HarmCategory::Dangerous => "HARM_CATEGORY_DANGEROUS_CONTENT",
        }
    }
}

const BLOCK_NONE: &str = "BLOCK_NONE";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

/// Returns the image as the service expects it: PNG, JPEG and WebP go
/// through untouched, anything else the decoder understands is re-encoded
/// as PNG.
fn inline_image(bytes: &[u8]) -> Result<InlineData, GenerationError> {
    let format = image::guess_format(bytes)
        .map_err(|e| GenerationError::UnsupportedImage(e.to_string()))?;

    if matches!(format, ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP) {
        return Ok(InlineData {
            mime_type: format.to_mime_type(),
            data: STANDARD.encode(bytes),
        });
    }

    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| GenerationError::UnsupportedImage(e.to_string()))?;
    let mut png = Vec::new();
    decoded
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| GenerationError::UnsupportedImage(e.to_string()))?;

    log::debug!("Re-encoded {:?} input as PNG ({} bytes)", format, png.len());
    Ok(InlineData {
        mime_type: ImageFormat::Png.to_mime_type(),
        data: STANDARD.encode(&png),
    })
}

impl<'a> GenerateContentRequest<'a> {
    fn new(request: &'a GenerationRequest) -> Result<Self, GenerationError> {
        let inline_data = inline_image(&request.image)?;

        Ok(Self {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![
                    RequestPart::Text {
                        text: &request.prompt,
                    },
                    RequestPart::InlineData { inline_data },
                ],
            }],
            safety_settings: HarmCategory::ALL
                .iter()
                .map(|category| SafetySetting {
                    category: category.as_str(),
                    threshold: BLOCK_NONE,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerateContentResponse {
    /// Text carried by this chunk, or an error when the service withheld it.
    fn text(&self) -> Result<String, GenerationError> {
        let Some(candidate) = self.candidates.first() else {
            return match self.prompt_feedback.as_ref().and_then(|f| f.block_reason.clone()) {
                Some(reason) => Err(GenerationError::Blocked(reason)),
                None => Ok(String::new()),
            };
        };

        let text: String = candidate
            .content
            .iter()
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .collect();

        match candidate.finish_reason.as_deref() {
            Some(reason) if text.is_empty() && !matches!(reason, "STOP" | "MAX_TOKENS") => {
                Err(GenerationError::Blocked(reason.to_string()))
            }
            _ => Ok(text),
        }
    }
}

fn api_error(status: u16, body: &str) -> GenerationError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string());
    GenerationError::Api { status, message }
}

/// Streams answers from a Gemini model.
#[derive(Clone, Debug)]
pub struct GeminiModel {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl GeminiModel {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            api_base: config.api_base.clone(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.api_base, model
        )
    }
}

fn fragments(
    client: reqwest::Client,
    api_key: String,
    url: String,
    request: GenerationRequest,
) -> impl Stream<Item = Result<String, GenerationError>> + Send + 'static {
    async_stream::try_stream! {
        let body = GenerateContentRequest::new(&request)?;
        log::debug!("Opening stream to {}", url);

        let response = client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            Err::<(), _>(api_error(status.as_u16(), &text))?;
        } else {
            let mut events = SseEvents::new(Box::pin(response.bytes_stream()));
            while let Some(data) = events.next().await {
                let chunk: GenerateContentResponse = serde_json::from_str(&data?)?;
                let text = chunk.text()?;
                if !text.is_empty() {
                    yield text;
                }
            }
        }
    }
}

impl GenerativeModel for GeminiModel {
    fn stream(&mut self, request: GenerationRequest) -> FragmentStream {
        let url = self.endpoint(&request.model);
        Box::pin(fragments(
            self.client.clone(),
            self.api_key.clone(),
            url,
            request,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    fn chunk(json: &str) -> GenerateContentResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_request_body_layout() {
        let request = GenerationRequest {
            image: PNG_MAGIC.to_vec(),
            prompt: "what is this?".to_string(),
            model: "gemini-test".to_string(),
        };
        let body = serde_json::to_value(GenerateContentRequest::new(&request).unwrap()).unwrap();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(parts[0]["text"], "what is this?");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/png");
        assert_eq!(parts[1]["inlineData"]["data"], STANDARD.encode(PNG_MAGIC));

        let settings = body["safetySettings"].as_array().unwrap();
        assert_eq!(settings.len(), 4);
        assert!(settings.iter().all(|s| s["threshold"] == "BLOCK_NONE"));
        assert_eq!(settings[3]["category"], "HARM_CATEGORY_DANGEROUS_CONTENT");
    }

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::DynamicImage::new_rgb8(width, height)
            .write_to(&mut Cursor::new(&mut bytes), format)
            .unwrap();
        bytes
    }

    #[test]
    fn test_bmp_is_sent_as_png() {
        let inline = inline_image(&encoded(4, 4, ImageFormat::Bmp)).unwrap();
        assert_eq!(inline.mime_type, "image/png");

        let png = STANDARD.decode(&inline.data).unwrap();
        assert_eq!(image::guess_format(&png).unwrap(), ImageFormat::Png);
        assert_eq!(image::load_from_memory(&png).unwrap().width(), 4);
    }

    #[test]
    fn test_jpeg_passes_through_unchanged() {
        let jpeg = encoded(8, 8, ImageFormat::Jpeg);
        let inline = inline_image(&jpeg).unwrap();
        assert_eq!(inline.mime_type, "image/jpeg");
        assert_eq!(inline.data, STANDARD.encode(&jpeg));
    }

    #[test]
    fn test_truncated_bmp_is_unsupported() {
        let bmp = encoded(4, 4, ImageFormat::Bmp);
        assert!(matches!(
            inline_image(&bmp[..20]),
            Err(GenerationError::UnsupportedImage(_))
        ));
    }

    #[test]
    fn test_unknown_image_format() {
        let request = GenerationRequest {
            image: b"plain text".to_vec(),
            prompt: String::new(),
            model: "m".to_string(),
        };
        assert!(matches!(
            GenerateContentRequest::new(&request),
            Err(GenerationError::UnsupportedImage(_))
        ));
    }

    #[test]
    fn test_chunk_text_joins_parts() {
        let c = chunk(r#"{"candidates":[{"content":{"parts":[{"text":"Hel"},{"text":"lo"}],"role":"model"}}]}"#);
        assert_eq!(c.text().unwrap(), "Hello");
    }

    #[test]
    fn test_final_chunk_without_text() {
        let c = chunk(r#"{"candidates":[{"content":{"parts":[]},"finishReason":"STOP"}],"usageMetadata":{}}"#);
        assert_eq!(c.text().unwrap(), "");
    }

    #[test]
    fn test_blocked_chunks() {
        let c = chunk(r#"{"promptFeedback":{"blockReason":"OTHER"}}"#);
        assert!(matches!(c.text(), Err(GenerationError::Blocked(r)) if r == "OTHER"));

        let c = chunk(r#"{"candidates":[{"finishReason":"RECITATION"}]}"#);
        assert!(matches!(c.text(), Err(GenerationError::Blocked(r)) if r == "RECITATION"));
    }

    #[test]
    fn test_api_error_message() {
        let err = api_error(400, r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#);
        assert_eq!(err.to_string(), "service returned 400: API key not valid.");

        let err = api_error(502, "bad gateway\n");
        assert_eq!(err.to_string(), "service returned 502: bad gateway");
    }

    #[test]
    fn test_endpoint() {
        let model = GeminiModel::new(&Config {
            api_key: "k".to_string(),
            api_base: "http://localhost:9".to_string(),
        });
        assert_eq!(
            model.endpoint("gemini-1.5-flash-latest"),
            "http://localhost:9/v1beta/models/gemini-1.5-flash-latest:streamGenerateContent?alt=sse"
        );
    }
}

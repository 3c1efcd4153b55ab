use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::{Config, DEMO_KEY};
use crate::models::ReferenceImage;
use crate::schema::canonical_timings;
use crate::services::{ImageService, ServiceError, StrategyService};

// Helper function to truncate base64 data in JSON for cleaner logging
fn truncate_base64_in_json(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let Value::String(s) = val {
                        let total = s.chars().count();
                        if total > 100 {
                            let head: String = s.chars().take(50).collect();
                            *val = Value::String(format!("{}...[truncated {} chars]", head, total - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

fn loggable(value: &Value) -> String {
    let mut copy = value.clone();
    truncate_base64_in_json(&mut copy);
    serde_json::to_string(&copy).unwrap_or_default()
}

fn preview(data: &str) -> String {
    let total = data.chars().count();
    if total > 50 {
        format!("{}...[{} chars total]", data.chars().take(50).collect::<String>(), total)
    } else {
        data.to_string()
    }
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    strategy_model: String,
    image_model: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.api_base.trim_end_matches('/').to_string(),
            strategy_model: config.strategy_model.clone(),
            image_model: config.image_model.clone(),
        }
    }

    fn is_demo(&self) -> bool {
        self.api_key == DEMO_KEY
    }

    async fn generate_content(&self, model: &str, body: &Value) -> Result<GeminiResponse, ServiceError> {
        let url = format!("{}/models/{}:generateContent?key={}", self.base_url, model, self.api_key);

        info!("🔗 Making request to: {}", url.replace(&self.api_key, "***"));
        info!("📤 Request body: {}", loggable(body));

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);

        let response_text = response.text().await.map_err(|e| ServiceError::Http(e.to_string()))?;
        if !status.is_success() {
            error!("❌ API Error response: {}", response_text);
            return Err(ServiceError::Provider { status: status.as_u16(), body: response_text });
        }

        let parsed: GeminiResponse =
            serde_json::from_str(&response_text).map_err(|e| ServiceError::Parse(e.to_string()))?;
        if let Ok(value) = serde_json::from_str::<Value>(&response_text) {
            info!("📥 Raw Gemini API response: {}", loggable(&value));
        }
        Ok(parsed)
    }

    fn placeholder_image(prompt: &str) -> String {
        let colors = ["#1A73E8", "#EA4335", "#FBBC05", "#34A853"];
        let color = colors[prompt.len() % colors.len()];
        let svg = format!(
            r#"<svg width="360" height="640" xmlns="http://www.w3.org/2000/svg">
            <defs>
                <linearGradient id="grad" x1="0%" y1="0%" x2="0%" y2="100%">
                    <stop offset="0%" style="stop-color:{color};stop-opacity:1" />
                    <stop offset="100%" style="stop-color:{color};stop-opacity:0.5" />
                </linearGradient>
            </defs>
            <rect width="360" height="640" fill="url(#grad)" />
            <text x="180" y="320" font-family="Arial, sans-serif" font-size="24" font-weight="bold"
                  text-anchor="middle" fill="white">Visual Reference</text>
            <text x="180" y="356" font-family="Arial, sans-serif" font-size="12"
                  text-anchor="middle" fill="white" opacity="0.8">9:16 demo placeholder</text>
        </svg>"#
        );
        format!(
            "data:image/svg+xml;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(svg.as_bytes())
        )
    }

    fn demo_strategy() -> Value {
        let beats = [
            ("Creator stares into the camera, mid-frustration", "Okay, I have to tell you what happened."),
            ("Close-up of the problem the product solves", "This was me three days ago."),
            ("Product reveal in hand, quick unboxing", "Then I tried this."),
            ("Before/after side-by-side", "Look at the difference. No filter."),
            ("Creator points at the link in the caption", "Link's right there. Thank me later."),
        ];
        let storyboard: Vec<Value> = canonical_timings()
            .into_iter()
            .zip(beats)
            .map(|(timing, (visual, audio))| {
                json!({
                    "timing": timing,
                    "visual": visual,
                    "cameraAngle": "Handheld selfie",
                    "moodLighting": "Natural window light",
                    "text": audio,
                    "audio": audio,
                    "creatorInstruction": "Keep it unpolished and talk like you would to a friend."
                })
            })
            .collect();
        json!({
            "purpose": {
                "core": "A real result, told honestly",
                "goal": "Drive first purchases from cold audiences",
                "tone": "Candid and energetic",
                "creatorPersona": "The Honest Everyday Reviewer"
            },
            "authenticityChecklist": [
                "Film on your phone, not a camera",
                "Leave your real room in the background",
                "Do one take without a script"
            ],
            "storyboard": storyboard,
            "imagePrompt": "Creator holding the product in a sunlit apartment, candid smile",
            "cta": {
                "copy": "Try it yourself",
                "linkPlacement": "Pinned comment and bio link",
                "exampleLink": "https://example.com/product"
            },
            "tips": [
                "Test three different hooks on the first scene",
                "Run the best performer as a whitelisted creator ad",
                "Cut a 6-second version for retargeting"
            ]
        })
    }
}

#[async_trait]
impl StrategyService for GeminiClient {
    async fn generate_strategy(&self, prompt: &str, schema: &Value) -> Result<String, ServiceError> {
        if self.is_demo() {
            info!("Using demo mode - returning canned strategy");
            return Ok(Self::demo_strategy().to_string());
        }

        info!("🎯 Generating strategy with {} (prompt {} chars)", self.strategy_model, prompt.len());
        let body = json!({
            "contents": [{
                "parts": [{"text": prompt}]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": schema
            }
        });

        let parsed = self.generate_content(&self.strategy_model, &body).await?;
        let text = parsed.first_text().ok_or(ServiceError::EmptyResponse("text"))?;
        info!("✅ Strategy response received ({} chars)", text.len());
        Ok(text)
    }
}

#[async_trait]
impl ImageService for GeminiClient {
    async fn generate_image(&self, prompt: &str, reference: Option<&ReferenceImage>) -> Result<String, ServiceError> {
        if self.is_demo() {
            info!("Using demo mode - no real images generated");
            let placeholder = Self::placeholder_image(prompt);
            info!("📦 Generated placeholder image: {}", preview(&placeholder));
            return Ok(placeholder);
        }

        info!("Generating image with {}...", self.image_model);
        let mut parts = Vec::new();
        if let Some(image) = reference {
            parts.push(json!({ "inlineData": { "mimeType": image.mime_type, "data": image.data } }));
        }
        parts.push(json!({ "text": prompt }));
        let body = json!({
            "contents": [{ "parts": parts }],
            "generationConfig": {
                "responseModalities": ["IMAGE"],
                "imageConfig": { "aspectRatio": "9:16" }
            }
        });

        let parsed = self.generate_content(&self.image_model, &body).await?;
        let image = parsed.first_image().ok_or(ServiceError::EmptyResponse("image data"))?;
        info!("🖼️ Extracted {} image from API response: {}", image.mime_type, preview(&image.data));
        Ok(format!("data:{};base64,{}", image.mime_type, image.data))
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Debug, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
    #[allow(dead_code)]
    Other(Value),
}

#[derive(Debug, Deserialize, Clone)]
struct InlineData {
    data: String,
    #[serde(rename = "mimeType", default = "default_mime")]
    mime_type: String,
}

fn default_mime() -> String {
    "image/png".to_string()
}

impl GeminiResponse {
    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.candidates.iter().flat_map(|c| c.content.parts.iter())
    }

    fn first_text(&self) -> Option<String> {
        self.parts().find_map(|p| match p {
            Part::Text { text } if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => None,
        })
    }

    fn first_image(&self) -> Option<InlineData> {
        self.parts().find_map(|p| match p {
            Part::Inline { inline_data } => Some(inline_data.clone()),
            _ => None,
        })
    }
}

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Blank(&'static str),
    #[error("product link is not a valid http(s) URL: {0}")]
    InvalidLink(String),
    #[error("a UGC production style is required for UGC ads")]
    MissingUgcStyle,
    #[error("reference image is invalid: {0}")]
    ReferenceImage(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdType {
    #[serde(rename = "UGC")]
    Ugc,
    Testimonial,
    Demo,
    Lifestyle,
    Explainer,
    Review,
    #[serde(rename = "Before/After")]
    BeforeAfter,
}

impl AdType {
    pub fn label(&self) -> &'static str {
        match self {
            AdType::Ugc => "UGC",
            AdType::Testimonial => "Testimonial",
            AdType::Demo => "Demo",
            AdType::Lifestyle => "Lifestyle",
            AdType::Explainer => "Explainer",
            AdType::Review => "Review",
            AdType::BeforeAfter => "Before/After",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UgcStyle {
    #[serde(rename = "Green Screen React")]
    GreenScreen,
    #[serde(rename = "Problem / Solution")]
    ProblemSolution,
    #[serde(rename = "Unboxing & First Impression")]
    Unboxing,
    #[serde(rename = "Aesthetic Vlog / GRWM")]
    AestheticVlog,
    #[serde(rename = "Stitch / Reply Style")]
    StitchBait,
    #[serde(rename = "Day in the Life")]
    DayInTheLife,
    #[serde(rename = "Educational Tutorial")]
    Tutorial,
    #[serde(rename = "Product Haul")]
    Haul,
    #[serde(rename = "POV / Roleplay")]
    Pov,
    #[serde(rename = "Tips & Hidden Tricks")]
    TipsTricks,
    #[serde(rename = "Storytime / Life Hack")]
    Storytime,
}

impl UgcStyle {
    pub fn label(&self) -> &'static str {
        match self {
            UgcStyle::GreenScreen => "Green Screen React",
            UgcStyle::ProblemSolution => "Problem / Solution",
            UgcStyle::Unboxing => "Unboxing & First Impression",
            UgcStyle::AestheticVlog => "Aesthetic Vlog / GRWM",
            UgcStyle::StitchBait => "Stitch / Reply Style",
            UgcStyle::DayInTheLife => "Day in the Life",
            UgcStyle::Tutorial => "Educational Tutorial",
            UgcStyle::Haul => "Product Haul",
            UgcStyle::Pov => "POV / Roleplay",
            UgcStyle::TipsTricks => "Tips & Hidden Tricks",
            UgcStyle::Storytime => "Storytime / Life Hack",
        }
    }

    /// Style-specific filming direction appended to the strategy prompt.
    pub fn directive(&self) -> Option<&'static str> {
        match self {
            UgcStyle::GreenScreen => Some("Include visual directions for pointing at background elements/product screenshots."),
            UgcStyle::Unboxing => Some("Focus on ASMR sounds of packaging and genuine \"wow\" moments."),
            UgcStyle::AestheticVlog => Some("Focus on soft lighting, relaxed pacing, and voiceover while the creator performs a routine (like skincare or morning prep)."),
            UgcStyle::StitchBait => Some("Start with a high-tension reaction or a split-screen vibe that invites engagement."),
            UgcStyle::DayInTheLife => Some("Show product integration into a busy, realistic daily routine."),
            UgcStyle::TipsTricks => Some("Start with \"Did you know...?\" and show a fast-paced montage of unexpected benefits or features."),
            UgcStyle::Storytime => Some("Deliver a direct-to-camera confessional about a specific problem the product solved."),
            UgcStyle::ProblemSolution | UgcStyle::Tutorial | UgcStyle::Haul | UgcStyle::Pov => None,
        }
    }
}

/// An uploaded reference photo, stored as bare base64 plus its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub mime_type: String,
    pub data: String,
}

impl ReferenceImage {
    /// Accepts a `data:<mime>;base64,<payload>` URL or bare base64.
    pub fn parse(payload: &str) -> Result<Self, ValidationError> {
        let payload = payload.trim();
        let (declared, data) = match payload.strip_prefix("data:") {
            Some(rest) => {
                let (meta, data) = rest
                    .split_once(',')
                    .ok_or_else(|| ValidationError::ReferenceImage("data URL has no payload".into()))?;
                let mime = meta
                    .strip_suffix(";base64")
                    .ok_or_else(|| ValidationError::ReferenceImage("data URL is not base64 encoded".into()))?;
                (Some(mime.to_string()).filter(|m| !m.is_empty()), data)
            }
            None => (None, payload),
        };

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| ValidationError::ReferenceImage(e.to_string()))?;
        if bytes.is_empty() {
            return Err(ValidationError::ReferenceImage("payload is empty".into()));
        }

        let mime_type = image::guess_format(&bytes)
            .ok()
            .map(|format| format.to_mime_type().to_string())
            .or(declared)
            .unwrap_or_else(|| "image/png".to_string());

        Ok(Self { mime_type, data: data.to_string() })
    }
}

/// Form submission as sent by the presentation layer.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub experience: String,
    pub category: String,
    pub product_link: String,
    pub ad_type: AdType,
    #[serde(default)]
    pub ugc_style: Option<UgcStyle>,
    #[serde(default)]
    pub image_file: Option<String>, // data URL or bare base64
}

/// Validated input for one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInput {
    pub experience: String,
    pub category: String,
    pub product_link: String,
    pub ad_type: AdType,
    pub ugc_style: Option<UgcStyle>,
    pub reference_image: Option<ReferenceImage>,
}

fn required(value: String, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank(field));
    }
    Ok(trimmed.to_string())
}

impl TryFrom<GenerateRequest> for UserInput {
    type Error = ValidationError;

    fn try_from(req: GenerateRequest) -> Result<Self, Self::Error> {
        let experience = required(req.experience, "experience")?;
        let category = required(req.category, "category")?;
        let product_link = required(req.product_link, "product link")?;

        let url = reqwest::Url::parse(&product_link)
            .map_err(|_| ValidationError::InvalidLink(product_link.clone()))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ValidationError::InvalidLink(product_link));
        }

        let ugc_style = match req.ad_type {
            AdType::Ugc => Some(req.ugc_style.ok_or(ValidationError::MissingUgcStyle)?),
            _ => None,
        };

        let reference_image = req
            .image_file
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(ReferenceImage::parse)
            .transpose()?;

        Ok(Self {
            experience,
            category,
            product_link,
            ad_type: req.ad_type,
            ugc_style,
            reference_image,
        })
    }
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Purpose {
    pub core: String,
    pub goal: String,
    pub tone: String,
    #[serde(default)]
    pub creator_persona: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoryboardScene {
    pub timing: String,
    pub visual: String,
    pub camera_angle: String,
    pub mood_lighting: String,
    pub text: String,  // on-screen caption
    pub audio: String, // spoken script
    #[serde(default)]
    pub creator_instruction: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CallToAction {
    pub copy: String,
    pub link_placement: String,
    pub example_link: String,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CampaignStrategy {
    pub purpose: Purpose,
    #[serde(default)]
    pub ugc_style: Option<String>,
    pub authenticity_checklist: Vec<String>,
    pub storyboard: Vec<StoryboardScene>,
    pub image_prompt: String,
    pub cta: CallToAction,
    pub tips: Vec<String>,
}

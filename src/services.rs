use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::ReferenceImage;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("provider returned {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("could not parse provider response: {0}")]
    Parse(String),
    #[error("provider response contained no {0}")]
    EmptyResponse(&'static str),
}

/// Produces the raw strategy document for a prompt. Validation happens on
/// the caller's side.
#[async_trait]
pub trait StrategyService: Send + Sync {
    async fn generate_strategy(&self, prompt: &str, schema: &Value) -> Result<String, ServiceError>;
}

/// Renders a reference image and returns it as a `data:` URL.
#[async_trait]
pub trait ImageService: Send + Sync {
    async fn generate_image(&self, prompt: &str, reference: Option<&ReferenceImage>) -> Result<String, ServiceError>;
}

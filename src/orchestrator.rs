//! Campaign generation state machine.
//!
//! One orchestrator owns one `GenerationState` and is its only writer.
//! Observers read snapshots or subscribe to the watch channel. Every attempt
//! gets a fresh id stored in the state; a write is applied only while the
//! state still carries that id, so responses from a superseded or reset
//! attempt are dropped on arrival.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::Timeouts;
use crate::models::{CampaignStrategy, UserInput};
use crate::prompt::{build_image_prompt, build_strategy_prompt};
use crate::schema::{parse_strategy, response_schema, SchemaError};
use crate::services::{ImageService, ServiceError, StrategyService};

const FALLBACK_ERROR: &str = "The agency engine encountered a strategic error. Please refine your inputs.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Idle,
    GeneratingStrategy,
    StrategyReady,
    GeneratingImage,
    Complete,
    Failed,
}

impl Phase {
    pub fn is_generating(self) -> bool {
        matches!(self, Phase::GeneratingStrategy | Phase::StrategyReady | Phase::GeneratingImage)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationState {
    pub attempt: u64,
    pub phase: Phase,
    pub strategy: Option<Arc<CampaignStrategy>>,
    pub image_url: Option<String>,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl GenerationState {
    fn idle(attempt: u64) -> Self {
        Self {
            attempt,
            phase: Phase::Idle,
            strategy: None,
            image_url: None,
            error_message: None,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("the strategy service did not answer within {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("the strategy service failed: {0}")]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// How one `start_generation` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Complete { attempt: u64, with_image: bool },
    Failed { attempt: u64, message: String },
    /// A reset or newer attempt took over before this one finished.
    Discarded { attempt: u64 },
}

pub struct CampaignOrchestrator {
    strategy_service: Arc<dyn StrategyService>,
    image_service: Arc<dyn ImageService>,
    timeouts: Timeouts,
    state: watch::Sender<GenerationState>,
}

async fn bounded<T, E>(limit: Duration, call: impl Future<Output = Result<T, E>>) -> Option<Result<T, E>> {
    tokio::time::timeout(limit, call).await.ok()
}

impl CampaignOrchestrator {
    pub fn new(
        strategy_service: Arc<dyn StrategyService>,
        image_service: Arc<dyn ImageService>,
        timeouts: Timeouts,
    ) -> Self {
        let (state, _) = watch::channel(GenerationState::idle(0));
        Self { strategy_service, image_service, timeouts, state }
    }

    pub fn state(&self) -> GenerationState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationState> {
        self.state.subscribe()
    }

    /// Returns to `idle`, dropping strategy, image and error. Outstanding
    /// remote calls keep running but their results will be discarded.
    pub fn reset(&self) {
        self.state.send_modify(|state| {
            *state = GenerationState::idle(state.attempt + 1);
        });
        info!("🔄 Campaign state reset");
    }

    fn begin_attempt(&self) -> u64 {
        let mut attempt = 0;
        self.state.send_modify(|state| {
            attempt = state.attempt + 1;
            *state = GenerationState {
                phase: Phase::GeneratingStrategy,
                ..GenerationState::idle(attempt)
            };
        });
        attempt
    }

    /// Applies `update` only if `attempt` is still current.
    fn apply(&self, attempt: u64, update: impl FnOnce(&mut GenerationState)) -> bool {
        self.state.send_if_modified(|state| {
            if state.attempt != attempt {
                return false;
            }
            update(state);
            state.updated_at = Utc::now();
            true
        })
    }

    async fn request_strategy(&self, input: &UserInput) -> Result<CampaignStrategy, StrategyError> {
        let prompt = build_strategy_prompt(input);
        let schema = response_schema();
        let limit = self.timeouts.strategy;
        let raw = bounded(limit, self.strategy_service.generate_strategy(&prompt, &schema))
            .await
            .ok_or(StrategyError::Timeout(limit))??;
        Ok(parse_strategy(&raw)?)
    }

    /// Moves `attempt` to `failed` if it is still current.
    fn fail_attempt(&self, attempt: u64, message: String) -> AttemptOutcome {
        let applied = self.apply(attempt, |state| {
            state.phase = Phase::Failed;
            state.error_message = Some(message.clone());
        });
        if applied {
            AttemptOutcome::Failed { attempt, message }
        } else {
            AttemptOutcome::Discarded { attempt }
        }
    }

    /// Runs one attempt end to end: strategy first, then the reference image.
    /// Only a strategy failure fails the attempt. The attempt runs on its own
    /// task: dropping the returned future does not stop it, and a task that
    /// dies before writing a terminal phase leaves the attempt `failed`.
    pub async fn start_generation(self: Arc<Self>, input: UserInput) -> AttemptOutcome {
        let attempt = self.begin_attempt();
        let task = tokio::spawn({
            let this = self.clone();
            async move { this.run_attempt(attempt, input).await }
        });
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(attempt, "❌ Generation task aborted: {}", e);
                self.fail_attempt(attempt, FALLBACK_ERROR.to_string())
            }
        }
    }

    async fn run_attempt(&self, attempt: u64, input: UserInput) -> AttemptOutcome {
        info!(attempt, ad_type = input.ad_type.label(), "🚀 Generating campaign strategy");

        let strategy = match self.request_strategy(&input).await {
            Ok(strategy) => Arc::new(strategy),
            Err(e) => {
                error!(attempt, "❌ Strategy generation failed: {}", e);
                let message = Some(e.to_string())
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_ERROR.to_string());
                return self.fail_attempt(attempt, message);
            }
        };

        let ready = self.apply(attempt, |state| {
            state.phase = Phase::StrategyReady;
            state.strategy = Some(strategy.clone());
        });
        if !ready {
            info!(attempt, "Discarding strategy for superseded attempt");
            return AttemptOutcome::Discarded { attempt };
        }
        info!(attempt, scenes = strategy.storyboard.len(), "✅ Strategy ready");

        if !self.apply(attempt, |state| state.phase = Phase::GeneratingImage) {
            return AttemptOutcome::Discarded { attempt };
        }

        let prompt = build_image_prompt(&strategy.image_prompt);
        let limit = self.timeouts.image;
        let image_url = match bounded(limit, self.image_service.generate_image(&prompt, input.reference_image.as_ref())).await {
            Some(Ok(url)) => Some(url),
            Some(Err(e)) => {
                warn!(attempt, "Visual generation failed, proceeding with script only: {}", e);
                None
            }
            None => {
                warn!(attempt, "Visual generation timed out after {}s, proceeding with script only", limit.as_secs());
                None
            }
        };

        let with_image = image_url.is_some();
        let applied = self.apply(attempt, |state| {
            state.phase = Phase::Complete;
            state.image_url = image_url;
        });
        if !applied {
            info!(attempt, "Discarding image for superseded attempt");
            return AttemptOutcome::Discarded { attempt };
        }
        info!(attempt, with_image, "🎬 Campaign complete");
        AttemptOutcome::Complete { attempt, with_image }
    }
}

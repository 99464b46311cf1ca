//! External language-model scoring source.
//!
//! A [`ModelSource`] wraps one [`AnalysisProvider`] (prompt in, free text out)
//! behind a hard timeout and turns its answers into estimates via the response
//! parser. Every provider failure becomes a soft [`SourceError`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{EstimateContext, ScoringSource, SourceError, SourceEstimate, SourceKind};
use crate::axes::{Axis, AxisMask, ScoreVector, TypeCode};
use crate::gateway::{Attribution, ChatGateway, ChatModel, ChatRequest, ProviderError};
use crate::parser::{parse_response, parse_verdict, TypeOrigin, Verdict};
use crate::prompts::{estimate_prompt, refine_prompt, validate_prompt, PromptInstance};
use crate::subject::Subject;

/// Per-call deadline for a model source.
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(20);

pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const VALIDATION_MAX_TOKENS: u32 = 200;

// =============================================================================
// Provider seam
// =============================================================================

/// `analyze(prompt) -> text | error`.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analyze(
        &self,
        prompt: &PromptInstance,
        attribution: Attribution,
    ) -> Result<String, ProviderError>;
}

/// Provider backed by a chat-completions gateway and one model.
pub struct GatewayAnalysisProvider {
    gateway: Arc<dyn ChatGateway>,
    model: ChatModel,
    temperature: f32,
    max_tokens: u32,
}

impl GatewayAnalysisProvider {
    pub fn new(gateway: Arc<dyn ChatGateway>, model: ChatModel) -> Self {
        Self {
            gateway,
            model,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn model(&self) -> &ChatModel {
        &self.model
    }
}

#[async_trait]
impl AnalysisProvider for GatewayAnalysisProvider {
    async fn analyze(
        &self,
        prompt: &PromptInstance,
        attribution: Attribution,
    ) -> Result<String, ProviderError> {
        let max_tokens = if attribution.caller == VALIDATE_CALLER {
            self.max_tokens.min(VALIDATION_MAX_TOKENS)
        } else {
            self.max_tokens
        };
        let request = ChatRequest::new(self.model.clone(), prompt.to_messages(), attribution)
            .temperature(self.temperature)
            .max_tokens(max_tokens);
        let response = self.gateway.chat(request).await?;
        Ok(response.content)
    }
}

// =============================================================================
// Model source
// =============================================================================

const ESTIMATE_CALLER: &str = "model_source::estimate";
const REFINE_CALLER: &str = "model_source::refine";
const VALIDATE_CALLER: &str = "model_source::validate";

/// One independently configured external analysis source.
#[derive(Clone)]
pub struct ModelSource {
    id: String,
    provider: Arc<dyn AnalysisProvider>,
    timeout: Duration,
}

impl std::fmt::Debug for ModelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSource")
            .field("id", &self.id)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ModelSource {
    pub fn new(id: impl Into<String>, provider: Arc<dyn AnalysisProvider>) -> Self {
        Self {
            id: id.into(),
            provider,
            timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }

    /// Convenience constructor for a gateway-backed model.
    pub fn from_gateway(gateway: Arc<dyn ChatGateway>, model_id: &str) -> Self {
        let provider = GatewayAnalysisProvider::new(gateway, ChatModel::openrouter(model_id));
        Self::new(model_id, Arc::new(provider))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn call(
        &self,
        prompt: PromptInstance,
        caller: &'static str,
        subject: &Subject,
        ctx: &EstimateContext,
    ) -> Result<String, SourceError> {
        let mut attribution = Attribution::new(caller).with_subject(subject.name.clone());
        if let Some(batch_id) = ctx.batch_id {
            attribution = attribution.with_batch(batch_id);
        }

        let outcome = timeout(self.timeout, self.provider.analyze(&prompt, attribution)).await;
        match outcome {
            Err(_) => {
                warn!(
                    source = %self.id,
                    caller,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "model source timed out"
                );
                Err(SourceError::Timeout {
                    source_id: self.id.clone(),
                    after: self.timeout,
                })
            }
            Ok(Err(err)) => {
                warn!(
                    source = %self.id,
                    caller,
                    error = %err,
                    code = err.code(),
                    "model source unavailable"
                );
                Err(match err {
                    ProviderError::Timeout(after, _) => SourceError::Timeout {
                        source_id: self.id.clone(),
                        after,
                    },
                    other => SourceError::Unavailable {
                        source_id: self.id.clone(),
                        code: other.code(),
                        message: other.to_string(),
                    },
                })
            }
            Ok(Ok(text)) => Ok(text),
        }
    }

    fn to_estimate(&self, text: &str, keep: AxisMask) -> SourceEstimate {
        let parsed = parse_response(text);
        let matched = parsed.matched.intersect(keep);

        // Axes outside the request stay at zero so they cannot leak into a merge.
        let mut scores = ScoreVector::ZERO;
        for axis in matched.axes() {
            scores.set(axis, parsed.scores.get(axis));
        }

        if matched.is_empty() {
            debug!(source = %self.id, "model response had no readable axis scores");
        }

        SourceEstimate {
            source_id: self.id.clone(),
            kind: SourceKind::Model,
            scores,
            matched,
            type_hint: (parsed.type_origin == TypeOrigin::Explicit).then_some(parsed.type_code),
            rationale: parsed.rationale,
        }
    }

    /// Full four-axis estimate.
    pub async fn estimate_all(
        &self,
        subject: &Subject,
        ctx: &EstimateContext,
    ) -> Result<SourceEstimate, SourceError> {
        let text = self
            .call(estimate_prompt(subject), ESTIMATE_CALLER, subject, ctx)
            .await?;
        Ok(self.to_estimate(&text, AxisMask::ALL))
    }

    /// Re-score only `axes`, given the heuristic baseline. An empty axis list
    /// makes no call.
    pub async fn refine(
        &self,
        subject: &Subject,
        baseline: &ScoreVector,
        axes: &[Axis],
        ctx: &EstimateContext,
    ) -> Result<SourceEstimate, SourceError> {
        let requested = AxisMask::from_axes(axes.iter().copied());
        if requested.is_empty() {
            return Ok(SourceEstimate {
                source_id: self.id.clone(),
                kind: SourceKind::Model,
                scores: ScoreVector::ZERO,
                matched: AxisMask::NONE,
                type_hint: None,
                rationale: String::new(),
            });
        }
        let text = self
            .call(refine_prompt(subject, baseline, axes), REFINE_CALLER, subject, ctx)
            .await?;
        Ok(self.to_estimate(&text, requested))
    }

    /// Ask whether `code` fits the subject.
    pub async fn validate(
        &self,
        subject: &Subject,
        code: TypeCode,
        ctx: &EstimateContext,
    ) -> Result<Verdict, SourceError> {
        let text = self
            .call(validate_prompt(subject, code), VALIDATE_CALLER, subject, ctx)
            .await?;
        Ok(parse_verdict(&text))
    }
}

#[async_trait]
impl ScoringSource for ModelSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Model
    }

    async fn estimate(
        &self,
        subject: &Subject,
        ctx: &EstimateContext,
    ) -> Result<SourceEstimate, SourceError> {
        self.estimate_all(subject, ctx).await
    }
}

//! Usage tracking via the UsageSink trait.
//!
//! The gateway logs all calls through a UsageSink. This decouples the gateway
//! from any specific storage backend:
//! - The CLI uses MemoryUsageSink and folds a summary into the batch report
//! - TracingUsageSink emits one structured event per call
//! - Tests use NoopUsageSink or MemoryUsageSink

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Status of a provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Success,
    Error,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Success => "success",
            CallStatus::Error => "error",
        }
    }
}

/// Record of a provider API call for logging.
#[derive(Debug, Clone)]
pub struct ProviderCallRecord {
    /// Provider name, e.g. "openrouter".
    pub provider: &'static str,
    /// Endpoint, e.g. "chat/completions".
    pub endpoint: &'static str,
    /// Model used.
    pub model: String,
    pub input_tokens: i32,
    pub output_tokens: i32,
    /// Cost in nanodollars (1e-9 USD).
    pub cost_nanodollars: i64,
    /// Batch run this call belongs to (if any).
    pub batch_id: Option<Uuid>,
    /// Subject being classified (if known).
    pub subject: Option<String>,
    pub latency_ms: i32,
    pub status: CallStatus,
    /// Error code if status is Error.
    pub error_code: Option<String>,
    /// Which code path made this call.
    pub caller: &'static str,
    /// Provider request ID (for debugging).
    pub request_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProviderCallRecord {
    /// Create a new record with required fields, defaulting others.
    pub fn new(
        provider: &'static str,
        endpoint: &'static str,
        model: impl Into<String>,
        caller: &'static str,
    ) -> Self {
        Self {
            provider,
            endpoint,
            model: model.into(),
            input_tokens: 0,
            output_tokens: 0,
            cost_nanodollars: 0,
            batch_id: None,
            subject: None,
            latency_ms: 0,
            status: CallStatus::Success,
            error_code: None,
            caller,
            request_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn tokens(mut self, input: i32, output: i32) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self
    }

    pub fn cost(mut self, nanodollars: i64) -> Self {
        self.cost_nanodollars = nanodollars;
        self
    }

    pub fn batch(mut self, batch_id: Option<Uuid>) -> Self {
        self.batch_id = batch_id;
        self
    }

    pub fn subject(mut self, subject: Option<String>) -> Self {
        self.subject = subject;
        self
    }

    pub fn latency(mut self, ms: i32) -> Self {
        self.latency_ms = ms;
        self
    }

    pub fn error(mut self, code: impl Into<String>) -> Self {
        self.status = CallStatus::Error;
        self.error_code = Some(code.into());
        self
    }

    pub fn request_id(mut self, id: Option<String>) -> Self {
        self.request_id = id;
        self
    }
}

/// Trait for recording provider call usage.
///
/// Implement this trait to customize where usage data is stored.
#[async_trait]
pub trait UsageSink: Send + Sync {
    /// Record a provider call. This should be fire-and-forget:
    /// failures should be logged but not propagated.
    async fn record(&self, record: ProviderCallRecord);
}

/// No-op usage sink that discards all records.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUsageSink;

#[async_trait]
impl UsageSink for NoopUsageSink {
    async fn record(&self, _record: ProviderCallRecord) {}
}

/// Usage sink that emits one `tracing` event per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingUsageSink;

#[async_trait]
impl UsageSink for TracingUsageSink {
    async fn record(&self, record: ProviderCallRecord) {
        info!(
            target: "archetype::usage",
            provider = record.provider,
            model = %record.model,
            caller = record.caller,
            subject = record.subject.as_deref().unwrap_or(""),
            tokens = record.input_tokens + record.output_tokens,
            cost_nanos = record.cost_nanodollars,
            latency_ms = record.latency_ms,
            status = record.status.as_str(),
            error_code = record.error_code.as_deref().unwrap_or(""),
            "provider call"
        );
    }
}

/// Aggregate usage over a set of calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub calls: usize,
    pub errors: usize,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_nanodollars: i64,
}

/// Usage sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemoryUsageSink {
    records: Mutex<Vec<ProviderCallRecord>>,
}

impl MemoryUsageSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ProviderCallRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn summary(&self) -> UsageSummary {
        self.records()
            .iter()
            .fold(UsageSummary::default(), |mut acc, r| {
                acc.calls += 1;
                if r.status == CallStatus::Error {
                    acc.errors += 1;
                }
                acc.input_tokens += i64::from(r.input_tokens);
                acc.output_tokens += i64::from(r.output_tokens);
                acc.cost_nanodollars += r.cost_nanodollars;
                acc
            })
    }
}

#[async_trait]
impl UsageSink for MemoryUsageSink {
    async fn record(&self, record: ProviderCallRecord) {
        match self.records.lock() {
            Ok(mut guard) => guard.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}

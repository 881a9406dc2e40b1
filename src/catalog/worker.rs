use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use super::CatalogError;

/// Quality/speed class of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Cheap, low-latency workers
    Fast,
    /// Middle ground
    #[default]
    Balanced,
    /// Highest quality, usually slowest and most expensive
    Quality,
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Tier::Fast),
            "balanced" => Ok(Tier::Balanced),
            "quality" => Ok(Tier::Quality),
            _ => Err(format!("Unknown tier: {}", s)),
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Fast => write!(f, "fast"),
            Tier::Balanced => write!(f, "balanced"),
            Tier::Quality => write!(f, "quality"),
        }
    }
}

/// How a worker charges for a unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CostModel {
    /// USD per 1K input and output tokens
    PerToken {
        input_per_1k: f64,
        output_per_1k: f64,
    },
    /// Fixed USD per invocation (agents, tools)
    Flat { per_call: f64 },
}

impl CostModel {
    /// Estimated USD cost for the given token volume.
    pub fn estimate(&self, tokens: TokenEstimate) -> f64 {
        match *self {
            CostModel::PerToken {
                input_per_1k,
                output_per_1k,
            } => {
                (tokens.input as f64 / 1000.0) * input_per_1k
                    + (tokens.output as f64 / 1000.0) * output_per_1k
            }
            CostModel::Flat { per_call } => per_call,
        }
    }

    fn validate(&self) -> Result<(), String> {
        let valid = |rate: f64| rate.is_finite() && rate >= 0.0;
        let ok = match *self {
            CostModel::PerToken {
                input_per_1k,
                output_per_1k,
            } => valid(input_per_1k) && valid(output_per_1k),
            CostModel::Flat { per_call } => valid(per_call),
        };
        if !ok {
            return Err("cost rates must be finite and >= 0".to_string());
        }
        Ok(())
    }
}

/// Expected token volume of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenEstimate {
    pub input: u32,
    pub output: u32,
}

impl TokenEstimate {
    pub fn new(input: u32, output: u32) -> Self {
        Self { input, output }
    }
}

impl Default for TokenEstimate {
    /// 500 input tokens, output estimated at half the input.
    fn default() -> Self {
        Self {
            input: 500,
            output: 250,
        }
    }
}

/// Advertised latency profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performance {
    pub avg_latency_ms: u32,
    pub p95_latency_ms: u32,
}

impl Default for Performance {
    fn default() -> Self {
        Self {
            avg_latency_ms: 1000,
            p95_latency_ms: 2000,
        }
    }
}

/// A unit of execution capacity: a model behind a provider, or an agent.
///
/// Identity, pricing and capabilities are fixed at registration. Load and
/// observed latency are runtime counters updated through the [`Catalog`].
///
/// # Examples
///
/// ```
/// use relay::catalog::{CostModel, Tier, TokenEstimate, Worker};
///
/// let worker = Worker::new(
///     "gpt-mini",
///     "openai",
///     Tier::Fast,
///     CostModel::PerToken { input_per_1k: 0.001, output_per_1k: 0.002 },
/// )
/// .with_capabilities(["chat", "code"]);
///
/// assert!(worker.supports("code"));
/// let cost = worker.cost_estimate(TokenEstimate::new(1000, 1000));
/// assert!((cost - 0.003).abs() < 1e-9);
/// ```
///
/// [`Catalog`]: super::Catalog
#[derive(Debug)]
pub struct Worker {
    /// Unique identifier
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Provider or agent family (e.g. "anthropic", "local")
    pub provider: String,
    /// Capability tags the worker can serve
    pub capabilities: BTreeSet<String>,
    pub tier: Tier,
    pub cost: CostModel,
    /// Advertised latency profile
    pub performance: Performance,
    /// Relative quality score (0.0-1.0)
    pub quality_score: f64,
    /// Maximum in-flight invocations
    pub max_concurrent: u32,

    current_load: AtomicU32,
    observed_latency_ms: AtomicU32,
}

impl Worker {
    pub fn new(
        id: impl Into<String>,
        provider: impl Into<String>,
        tier: Tier,
        cost: CostModel,
    ) -> Self {
        let id = id.into();
        let performance = Performance::default();
        Self {
            name: id.clone(),
            id,
            provider: provider.into(),
            capabilities: BTreeSet::new(),
            tier,
            cost,
            performance,
            quality_score: default_quality(tier),
            max_concurrent: 4,
            current_load: AtomicU32::new(0),
            observed_latency_ms: AtomicU32::new(performance.avg_latency_ms),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = capabilities.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_performance(mut self, avg_latency_ms: u32, p95_latency_ms: u32) -> Self {
        self.performance = Performance {
            avg_latency_ms,
            p95_latency_ms,
        };
        self.observed_latency_ms = AtomicU32::new(avg_latency_ms);
        self
    }

    pub fn with_quality(mut self, quality_score: f64) -> Self {
        self.quality_score = quality_score;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: u32) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Estimated USD cost for the given token volume.
    pub fn cost_estimate(&self, tokens: TokenEstimate) -> f64 {
        self.cost.estimate(tokens)
    }

    pub fn supports(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// True when every required capability is present.
    pub fn supports_all<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required.iter().all(|c| self.supports(c.as_ref()))
    }

    pub fn current_load(&self) -> u32 {
        self.current_load.load(Ordering::SeqCst)
    }

    pub fn has_capacity(&self) -> bool {
        self.current_load() < self.max_concurrent
    }

    /// Running average latency, seeded from the advertised average.
    pub fn avg_latency_ms(&self) -> u32 {
        self.observed_latency_ms.load(Ordering::Relaxed)
    }

    /// Check-and-increment load. Returns false when already at capacity.
    pub(crate) fn try_acquire(&self) -> bool {
        loop {
            let current = self.current_load.load(Ordering::SeqCst);
            if current >= self.max_concurrent {
                return false;
            }
            if self
                .current_load
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return true;
            }
        }
    }

    pub(crate) fn release(&self) {
        let _ = self
            .current_load
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_sub(1));
    }

    /// Fold a new latency sample into the running average (EMA, alpha = 0.2).
    pub(crate) fn observe_latency(&self, latency_ms: u32) {
        let _ = self
            .observed_latency_ms
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |avg| {
                Some(((avg as u64 * 4 + latency_ms as u64) / 5) as u32)
            });
    }

    pub(crate) fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |message: String| CatalogError::InvalidWorker {
            id: self.id.clone(),
            message,
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id cannot be empty".to_string()));
        }
        if self.max_concurrent == 0 {
            return Err(invalid("max_concurrent must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.quality_score) {
            return Err(invalid(format!(
                "quality_score must be 0.0-1.0, got {}",
                self.quality_score
            )));
        }
        self.cost.validate().map_err(invalid)
    }

    /// Serializable point-in-time view.
    pub fn view(&self) -> WorkerView {
        WorkerView {
            id: self.id.clone(),
            name: self.name.clone(),
            provider: self.provider.clone(),
            capabilities: self.capabilities.iter().cloned().collect(),
            tier: self.tier,
            cost: self.cost,
            performance: self.performance,
            observed_latency_ms: self.avg_latency_ms(),
            quality_score: self.quality_score,
            max_concurrent: self.max_concurrent,
            current_load: self.current_load(),
        }
    }
}

fn default_quality(tier: Tier) -> f64 {
    match tier {
        Tier::Fast => 0.7,
        Tier::Balanced => 0.82,
        Tier::Quality => 0.95,
    }
}

/// Snapshot of a worker for output and logging.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerView {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub capabilities: Vec<String>,
    pub tier: Tier,
    pub cost: CostModel,
    pub performance: Performance,
    pub observed_latency_ms: u32,
    pub quality_score: f64,
    pub max_concurrent: u32,
    pub current_load: u32,
}

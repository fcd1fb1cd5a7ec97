//! Configuration management.
//!
//! Supports configuration from:
//! - TOML config files
//! - Environment variables (`STAKESIM_*`)
//!
//! Every cadence, threshold and capacity used by the tick loop lives here so
//! that runs can be tuned without touching the core.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Tick loop configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Per-actor runtime configuration
    #[serde(default)]
    pub actor: ActorConfig,

    /// Batching, pooling, retry and circuit-breaker configuration
    #[serde(default)]
    pub resilience: ResilienceConfig,

    /// Reasoning provider configuration
    #[serde(default)]
    pub reasoning: ReasoningConfig,

    /// Emergence, sentiment and coalition thresholds
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Persistence configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| SimError::Config(format!("Failed to read config file: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| SimError::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `STAKESIM_*` environment overrides on top of this config
    pub fn with_env_overrides(mut self) -> Self {
        // Scheduler settings
        if let Some(val) = env_parse("STAKESIM_MAX_TICKS") {
            self.scheduler.max_ticks = Some(val);
        }
        if let Some(val) = env_parse("STAKESIM_MAX_FAILURES") {
            self.scheduler.max_consecutive_failures = Some(val);
        }
        if let Some(val) = env_parse("STAKESIM_SPEED") {
            self.scheduler.speed_multiplier = val;
        }
        if let Some(val) = env_parse("STAKESIM_SEED") {
            self.scheduler.seed = Some(val);
        }
        if let Some(val) = env_parse("STAKESIM_PARALLEL") {
            self.scheduler.parallel_reasoning = val;
        }

        // Reasoning settings
        if let Ok(provider) = std::env::var("STAKESIM_PROVIDER") {
            self.reasoning.provider = provider;
        }
        if let Ok(url) = std::env::var("STAKESIM_BASE_URL") {
            self.reasoning.base_url = url;
        }
        if let Ok(model) = std::env::var("STAKESIM_MODEL") {
            self.reasoning.model = model;
        }

        // Storage settings
        if let Ok(dir) = std::env::var("STAKESIM_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Ok(backend) = std::env::var("STAKESIM_STORAGE") {
            self.storage.backend = backend;
        }

        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Tick loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Virtual seconds added to the clock per tick
    pub tick_seconds: f64,

    /// Metrics/sentiment/emergence/stage cadence (ticks)
    pub metrics_interval: u64,

    /// Coalition and social event cadence (ticks)
    pub social_interval: u64,

    /// Checkpoint cadence (ticks)
    pub checkpoint_interval: u64,

    /// Stop after this many ticks
    pub max_ticks: Option<u64>,

    /// Stop after this many consecutive actor failures
    pub max_consecutive_failures: Option<u32>,

    /// Real-time pacing: ticks per wall-clock second (0 = unpaced)
    pub speed_multiplier: f64,

    /// Run actor reasoning calls concurrently within a tick
    pub parallel_reasoning: bool,

    /// Multiplicative per-tick relationship decay
    pub relationship_decay: f64,

    /// Seed for random world events
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 1.0,
            metrics_interval: 10,
            social_interval: 50,
            checkpoint_interval: 100,
            max_ticks: None,
            max_consecutive_failures: None,
            speed_multiplier: 1.0,
            parallel_reasoning: false,
            relationship_decay: 0.995,
            seed: None,
        }
    }
}

/// Per-actor runtime configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Maximum memory entries before eviction
    pub memory_capacity: usize,

    /// Maximum queued inbound messages
    pub inbox_capacity: usize,

    /// Steps between difficulty increases
    pub difficulty_interval: u64,

    /// Difficulty increment
    pub difficulty_step: f64,

    /// Difficulty upper bound
    pub max_difficulty: f64,

    /// Steps between reflective memories
    pub reflection_interval: u64,

    /// Fraction of oldest memories collapsed on eviction
    pub eviction_ratio: f64,

    /// Memory entries kept per actor in checkpoints
    pub checkpoint_memory_tail: usize,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            memory_capacity: 50,
            inbox_capacity: 20,
            difficulty_interval: 20,
            difficulty_step: 0.1,
            max_difficulty: 3.0,
            reflection_interval: 10,
            eviction_ratio: 0.3,
            checkpoint_memory_tail: 20,
        }
    }
}

/// Batching, pooling, retry and circuit-breaker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    /// Buffered interactions before a forced flush
    pub batch_size: usize,

    /// Maximum age of buffered interactions (ms)
    pub flush_interval_ms: u64,

    /// Active-set size when pooling actors
    pub pool_max_active: usize,

    /// Provider retries on transient failure
    pub max_retries: u32,

    /// Base backoff (ms)
    pub backoff_ms: u64,

    /// Backoff cap (ms)
    pub max_backoff_ms: u64,

    /// Consecutive provider failures that open the circuit
    pub circuit_threshold: u32,

    /// How long the circuit stays open (ms)
    pub circuit_reset_ms: u64,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            flush_interval_ms: 5000,
            pool_max_active: 20,
            max_retries: 3,
            backoff_ms: 1000,
            max_backoff_ms: 30_000,
            circuit_threshold: 5,
            circuit_reset_ms: 30_000,
        }
    }
}

/// Reasoning provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Provider kind: "mock" or "openai"
    pub provider: String,

    /// OpenAI-compatible API base URL
    pub base_url: String,

    /// Model name
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Sampling temperature
    pub temperature: f32,

    /// Completion token limit
    pub max_tokens: u32,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model: "meta-llama/llama-3.3-70b-instruct".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            timeout_secs: 60,
            temperature: 0.7,
            max_tokens: 512,
        }
    }
}

/// Emergence, sentiment and coalition thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Emergence sliding window size
    pub window_size: usize,

    /// Single-action share that flags dominance
    pub dominance_ratio: f64,

    /// Unique/total ratio below which diversity has collapsed
    pub diversity_ratio: f64,

    /// Relative frequency change that flags a top-action shift
    pub shift_multiplier: f64,

    /// Sentiment history kept per actor
    pub history_limit: usize,

    /// Sentiment moving-average window
    pub window: usize,

    /// Half-window difference that counts as a trend
    pub trend_delta: f64,

    /// Alliance strength needed to join a coalition
    pub alliance_threshold: f64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            dominance_ratio: 0.6,
            diversity_ratio: 0.15,
            shift_multiplier: 2.0,
            history_limit: 200,
            window: 10,
            trend_delta: 0.15,
            alliance_threshold: 0.3,
        }
    }
}

/// Persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend: "memory" or "file"
    pub backend: String,

    /// Root directory for the file backend
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "file".to_string(),
            data_dir: dirs::data_dir()
                .map(|p| p.join("stakesim"))
                .unwrap_or_else(|| PathBuf::from(".stakesim")),
        }
    }
}

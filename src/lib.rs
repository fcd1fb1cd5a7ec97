//! # Stakesim - Stakeholder Tick Simulation
//!
//! Simulates how a startup's stakeholders (customers, investors, regulators,
//! competitors, critics, employees, partners) react to a venture over
//! virtual time. Each actor reasons through an LLM provider once per tick;
//! the scheduler turns their actions into relationships, coalitions,
//! emergence signals, sentiment and business metrics.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────── TickScheduler ────────────────┐
//!  ControlHandle ─┤ lifecycle: idle → running ⇄ paused → stopped  │
//!                 │                                               │
//!                 │  WorldSnapshot ──> Actor::run_step (× pool)   │──> ReasoningProvider
//!                 │        ^                 │                    │
//!                 │        │           InteractionLog             │
//!                 │        │                 v                    │
//!                 │  metrics, flags,  BatchWriter ───────────────>│──> Storage
//!                 │  sentiment        RelationshipGraph           │
//!                 │                   EmergenceDetector           │
//!                 │                   SentimentTracker            │
//!                 └──────────────────────────┬────────────────────┘
//!                                            v
//!                                        EventBus ──> observers
//! ```
//!
//! ## Cadences
//!
//! | Work | Default interval (ticks) |
//! |------|--------------------------|
//! | Actor steps, decay, `tick` event | 1 |
//! | Metrics, sentiment, emergence flags, stage check | 10 |
//! | Coalitions, ally conversations, rival debate | 50 |
//! | Checkpoint | 100 |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stakesim::{Config, MemoryStorage, MockProvider, SimulationEntity, Stage, TickScheduler};
//!
//! let sim = SimulationEntity::new("Acme", "fintech", Stage::Mvp);
//! let mut scheduler = TickScheduler::create(
//!     sim,
//!     Config::default(),
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(MockProvider::new(42)),
//! )?;
//! scheduler.spawn_default_roster()?;
//! let report = scheduler.run(Some(200)).await?;
//! println!("{}", report.render());
//! ```

pub mod actor;
pub mod analytics;
pub mod config;
pub mod economics;
pub mod error;
pub mod events;
pub mod model;
pub mod reasoning;
pub mod resilience;
pub mod scenario;
pub mod scheduler;
pub mod social;
pub mod storage;
pub mod world;

// Re-exports for convenience
pub use actor::{default_roster, Actor, Invariant, MemoryEntry, MemoryKind};
pub use analytics::{EmergenceDetector, EmergenceFlag, SentimentTracker};
pub use config::Config;
pub use economics::{EconomicParams, MetricSet, PhaseManager};
pub use error::{Result, SimError};
pub use events::{Event, EventBus, EventKind, HandlerError};
pub use model::{
    ActorEntity, InteractionLog, MetricSnapshot, SimulationEntity, Stage, StakeholderKind,
};
pub use reasoning::{CompletionRequest, MockProvider, ReasoningProvider, ScriptedProvider};
pub use scheduler::{Command, ControlHandle, Lifecycle, RunOutcome, RunReport, TickScheduler};
pub use social::{Coalition, CoalitionDetector, RelationshipGraph};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use world::WorldSnapshot;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

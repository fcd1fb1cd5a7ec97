//! Per-actor run-step state machine.
//!
//! ```text
//! run_step(world, t)
//!   │  steps += 1, difficulty ramps every `difficulty_interval` steps
//!   │  compact memory via the provider if the log is full
//!   ▼
//! perceive ── drain inbox into the perception
//!   ▼
//! reason ──── the only suspension point; malformed output ⇒ `wait`
//!   ▼
//! act ─────── build the InteractionLog (or none)
//!   ▼
//! check ───── every invariant; a failure is a hard per-actor error
//!   ▼
//! reflect ─── every `reflection_interval` steps
//! ```
//!
//! Publishing the produced interaction, routing `send_message` payloads and
//! feeding derived subsystems are the scheduler's job, done sequentially
//! after all actor steps of a tick complete.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::decision::Decision;
use super::invariant::Invariant;
use super::memory::{summarize_rule_based, MemoryEntry, MemoryKind, MemoryLog};
use super::prompts::{self, DecisionContext};
use super::role::RoleDescriptor;
use crate::config::ActorConfig;
use crate::error::Result;
use crate::model::{ActorEntity, InteractionLog};
use crate::reasoning::{CompletionRequest, ReasoningProvider};
use crate::world::WorldSnapshot;

/// Baseline difficulty
pub const BASE_DIFFICULTY: f64 = 1.0;

/// A goal with priority and progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Goal text
    pub goal: String,
    /// Priority (higher first)
    pub priority: f64,
    /// Progress in [0, 1]
    pub progress: f64,
}

/// A message from another actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxMessage {
    /// Sender id
    pub sender_id: String,
    /// Sender display name
    pub sender_name: String,
    /// Message text
    pub content: String,
    /// Virtual send time
    pub timestamp: f64,
}

/// What the actor perceives at the start of a step
#[derive(Debug, Clone)]
pub struct Perception<'w> {
    /// Shared world view
    pub world: &'w WorldSnapshot,
    /// Messages drained from the inbox
    pub messages: Vec<InboxMessage>,
}

/// Configuration-driven stakeholder actor
pub struct Actor {
    entity: ActorEntity,
    role: &'static RoleDescriptor,
    config: ActorConfig,
    memory: MemoryLog,
    inbox: VecDeque<InboxMessage>,
    goals: Vec<Goal>,
    strategy: String,
    difficulty: f64,
    steps: u64,
    invariants: Vec<Invariant>,
    provider: Arc<dyn ReasoningProvider>,
    description: String,
}

impl std::fmt::Debug for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor")
            .field("id", &self.entity.id)
            .field("role", &self.entity.role)
            .field("steps", &self.steps)
            .field("difficulty", &self.difficulty)
            .field("memory", &self.memory.len())
            .field("inbox", &self.inbox.len())
            .finish_non_exhaustive()
    }
}

impl Actor {
    /// Create an actor with the built-in invariants
    pub fn new(
        entity: ActorEntity,
        provider: Arc<dyn ReasoningProvider>,
        config: ActorConfig,
    ) -> Self {
        let role = RoleDescriptor::for_kind(entity.kind);
        let memory = MemoryLog::new(config.memory_capacity, config.eviction_ratio);
        Self {
            entity,
            role,
            config,
            memory,
            inbox: VecDeque::new(),
            goals: Vec::new(),
            strategy: String::new(),
            difficulty: BASE_DIFFICULTY,
            steps: 0,
            invariants: vec![
                Invariant::permitted_action(role),
                Invariant::timestamp_not_before_clock(),
            ],
            provider,
            description: String::new(),
        }
    }

    /// Venture description used in prompts
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Register an additional invariant
    pub fn add_invariant(&mut self, invariant: Invariant) {
        self.invariants.push(invariant);
    }

    /// Actor id
    pub fn id(&self) -> &str {
        &self.entity.id
    }

    /// Persisted entity
    pub fn entity(&self) -> &ActorEntity {
        &self.entity
    }

    /// Role descriptor
    pub fn role(&self) -> &'static RoleDescriptor {
        self.role
    }

    /// Memory log
    pub fn memory(&self) -> &MemoryLog {
        &self.memory
    }

    /// Steps taken
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Difficulty scalar
    pub fn difficulty(&self) -> f64 {
        self.difficulty
    }

    /// Goals, highest priority first
    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    /// Current strategy
    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    /// Queued inbound messages
    pub fn pending_messages(&self) -> usize {
        self.inbox.len()
    }

    /// Append a memory entry
    pub fn add_memory(&mut self, kind: MemoryKind, content: impl Into<String>, timestamp: f64) {
        self.memory.push(MemoryEntry::new(kind, content, timestamp));
    }

    /// Replace memory contents from a checkpoint tail
    pub fn restore_memory(&mut self, entries: Vec<MemoryEntry>) {
        self.memory.restore(entries);
    }

    /// Resume the step counter and difficulty ramp from a checkpoint
    pub fn restore_progress(&mut self, steps: u64, difficulty: f64) {
        self.steps = steps;
        let ceiling = self.config.max_difficulty.max(BASE_DIFFICULTY);
        self.difficulty = difficulty.clamp(BASE_DIFFICULTY, ceiling);
    }

    /// Queue an inbound message, dropping the oldest when the inbox is full.
    pub fn deliver(&mut self, message: InboxMessage) {
        if self.inbox.len() >= self.config.inbox_capacity.max(1) {
            if let Some(dropped) = self.inbox.pop_front() {
                tracing::debug!(actor = %self.entity.id, from = %dropped.sender_id, "Inbox full, dropping oldest message");
            }
        }
        self.add_memory(
            MemoryKind::Message,
            format!("Message from {}: {}", message.sender_name, message.content),
            message.timestamp,
        );
        self.inbox.push_back(message);
    }

    /// Add a goal, keeping goals sorted by priority
    pub fn set_goal(&mut self, goal: impl Into<String>, priority: f64) {
        self.goals.push(Goal {
            goal: goal.into(),
            priority,
            progress: 0.0,
        });
        self.goals
            .sort_by(|a, b| b.priority.total_cmp(&a.priority));
    }

    /// Update progress of the goal at `index`
    pub fn update_goal_progress(&mut self, index: usize, progress: f64) {
        if let Some(goal) = self.goals.get_mut(index) {
            goal.progress = progress.clamp(0.0, 1.0);
        }
    }

    /// Replace the strategy and remember the change
    pub fn set_strategy(&mut self, strategy: impl Into<String>, timestamp: f64) {
        self.strategy = strategy.into();
        self.add_memory(
            MemoryKind::Strategy,
            format!("Strategy updated: {}", self.strategy),
            timestamp,
        );
    }

    /// Run one decision cycle.
    ///
    /// Only invariant violations surface as errors; provider failures and
    /// malformed output degrade to a `wait` decision.
    pub async fn run_step(
        &mut self,
        world: &WorldSnapshot,
        timestamp: f64,
    ) -> Result<Option<InteractionLog>> {
        self.steps += 1;
        let interval = self.config.difficulty_interval.max(1);
        if self.steps % interval == 0 {
            self.difficulty =
                (self.difficulty + self.config.difficulty_step).min(self.config.max_difficulty);
        }

        self.compact_memory(timestamp).await;

        let perception = self.perceive(world);
        let decision = self.reason(&perception, timestamp).await;
        let Some(log) = self.act(&decision, &world.simulation_id, timestamp) else {
            return Ok(None);
        };

        for invariant in &self.invariants {
            invariant.evaluate(&log, world)?;
        }

        let reflect_every = self.config.reflection_interval;
        if reflect_every > 0 && self.steps % reflect_every == 0 {
            self.reflect(timestamp).await;
        }

        Ok(Some(log))
    }

    /// Drain the inbox into a perception of the world
    pub fn perceive<'w>(&mut self, world: &'w WorldSnapshot) -> Perception<'w> {
        Perception {
            world,
            messages: self.inbox.drain(..).collect(),
        }
    }

    /// Ask the provider for a decision, degrading to `wait` on any failure.
    pub async fn reason(&mut self, perception: &Perception<'_>, timestamp: f64) -> Decision {
        let prompt = prompts::decision_prompt(&DecisionContext {
            entity: &self.entity,
            role: self.role,
            world: perception.world,
            messages: &perception.messages,
            memory: self.memory.render_recent(5),
            goals: &self.goals,
            strategy: &self.strategy,
            difficulty: self.difficulty,
            description: &self.description,
        });
        let request = CompletionRequest::new(prompt).with_system(prompts::DECISION_SYSTEM_PROMPT);

        let decision = match self.provider.complete(request).await {
            Ok(text) => match Decision::parse(&text) {
                Some(decision) => decision,
                None => {
                    let excerpt: String = text.chars().take(100).collect();
                    tracing::warn!(actor = %self.entity.id, output = %excerpt, "Malformed reasoning output, falling back to wait");
                    Decision::fallback()
                },
            },
            Err(e) => {
                tracing::warn!(actor = %self.entity.id, error = %e, "Reasoning unavailable, falling back to wait");
                Decision::fallback()
            },
        };

        self.add_memory(
            MemoryKind::Internal,
            format!("Thought: {}", decision.thought_process),
            timestamp,
        );
        if let Some(goal) = &decision.new_goal {
            let priority = decision.goal_priority.unwrap_or(0.5);
            self.set_goal(goal.clone(), priority);
            self.add_memory(MemoryKind::Goal, format!("New goal: {}", goal), timestamp);
        }
        if let Some(strategy) = &decision.strategy_update {
            self.set_strategy(strategy.clone(), timestamp);
        }
        decision
    }

    /// Turn a decision into an interaction record
    pub fn act(
        &self,
        decision: &Decision,
        simulation_id: &str,
        timestamp: f64,
    ) -> Option<InteractionLog> {
        if decision.action_type.is_empty() {
            return None;
        }
        Some(
            InteractionLog::new(
                simulation_id,
                &self.entity.id,
                &decision.action_type,
                decision.target(),
                timestamp,
            )
            .with_outcome(Value::Object(decision.action_details.clone())),
        )
    }

    async fn compact_memory(&mut self, timestamp: f64) {
        if !self.memory.is_full() {
            return;
        }
        let count = self.memory.eviction_count();
        let prompt = prompts::summarization_prompt(self.memory.oldest(count));
        let request = CompletionRequest::new(prompt)
            .with_system(prompts::MEMORY_SYSTEM_PROMPT)
            .with_max_tokens(200);
        let summary = match self.provider.complete(request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => summarize_rule_based(self.memory.oldest(count)),
        };
        self.memory.collapse_oldest(count, summary);
        tracing::debug!(actor = %self.entity.id, collapsed = count, timestamp, "Compacted memory");
    }

    async fn reflect(&mut self, timestamp: f64) {
        let recent = self.memory.render_recent(10);
        let request = CompletionRequest::new(prompts::reflection_prompt(&self.entity, &recent))
            .with_system(prompts::MEMORY_SYSTEM_PROMPT)
            .with_max_tokens(150);
        let reflection = match self.provider.complete(request).await {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            _ => summarize_rule_based(self.memory.tail(10)),
        };
        self.add_memory(
            MemoryKind::Reflection,
            format!("Reflection: {}", reflection),
            timestamp,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use crate::model::{Stage, StakeholderKind};
    use crate::reasoning::ScriptedProvider;

    fn world(timestamp: f64) -> WorldSnapshot {
        WorldSnapshot::new("sim", "Acme", "fintech", Stage::Mvp, timestamp)
    }

    fn actor(kind: StakeholderKind, provider: Arc<ScriptedProvider>, config: ActorConfig) -> Actor {
        let entity = ActorEntity::new(kind, "Tester").with_id("a1");
        Actor::new(entity, provider, config)
    }

    #[tokio::test]
    async fn test_step_produces_interaction() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_text(
            r#"{"thought_process": "nice", "action_type": "buy", "action_details": {"target": "startup"}}"#,
        );
        let mut a = actor(StakeholderKind::Customer, provider, ActorConfig::default());

        let log = a.run_step(&world(10.0), 10.0).await.unwrap().unwrap();
        assert_eq!(log.action, "buy");
        assert_eq!(log.target, "startup");
        assert_eq!(log.actor_id, "a1");
        assert_eq!(log.simulation_id, "sim");
        assert!((log.timestamp - 10.0).abs() < f64::EPSILON);
        assert_eq!(a.memory().entries()[0].content, "Thought: nice");
    }

    #[tokio::test]
    async fn test_malformed_output_falls_back_to_wait() {
        let provider = Arc::new(ScriptedProvider::new().with_default("I refuse to answer in JSON"));
        let mut a = actor(StakeholderKind::Critic, provider, ActorConfig::default());
        let log = a.run_step(&world(0.0), 0.0).await.unwrap().unwrap();
        assert_eq!(log.action, "wait");
        assert_eq!(log.target, "system");
    }

    #[tokio::test]
    async fn test_provider_error_falls_back_to_wait() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_error(SimError::ProviderUnavailable {
            attempts: 3,
            last_error: "down".into(),
        });
        let mut a = actor(StakeholderKind::Media, provider, ActorConfig::default());
        let log = a.run_step(&world(0.0), 0.0).await.unwrap().unwrap();
        assert_eq!(log.action, "wait");
    }

    #[tokio::test]
    async fn test_forbidden_action_is_hard_failure() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_text(r#"{"action_type": "invest"}"#);
        let mut a = actor(StakeholderKind::Customer, provider, ActorConfig::default());
        let err = a.run_step(&world(0.0), 0.0).await.unwrap_err();
        assert!(matches!(err, SimError::InvariantViolation { .. }));
    }

    #[tokio::test]
    async fn test_difficulty_ramps_and_caps() {
        let provider = Arc::new(ScriptedProvider::new());
        let config = ActorConfig {
            difficulty_interval: 2,
            difficulty_step: 1.0,
            max_difficulty: 2.5,
            reflection_interval: 0,
            ..ActorConfig::default()
        };
        let mut a = actor(StakeholderKind::Advisor, provider, config);
        for _ in 0..6 {
            a.run_step(&world(0.0), 0.0).await.unwrap();
        }
        assert_eq!(a.steps(), 6);
        assert!((a.difficulty() - 2.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_inbox_drained_into_prompt() {
        let provider = Arc::new(ScriptedProvider::new());
        let mut a = actor(StakeholderKind::Partner, provider.clone(), ActorConfig::default());
        a.deliver(InboxMessage {
            sender_id: "x".into(),
            sender_name: "Mentor".into(),
            content: "Let's integrate".into(),
            timestamp: 0.0,
        });
        assert_eq!(a.pending_messages(), 1);

        a.run_step(&world(0.0), 0.0).await.unwrap();
        assert_eq!(a.pending_messages(), 0);
        assert!(provider.prompts()[0].contains("From Mentor: Let's integrate"));
    }

    #[tokio::test]
    async fn test_goals_and_strategy_applied() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.push_text(
            r#"{"action_type": "research", "new_goal": "Low", "goal_priority": 0.2, "strategy_update": "Go slow"}"#,
        );
        provider.push_text(r#"{"action_type": "research", "new_goal": "High", "goal_priority": 0.9}"#);
        let mut a = actor(StakeholderKind::Investor, provider, ActorConfig::default());
        a.run_step(&world(0.0), 0.0).await.unwrap();
        a.run_step(&world(1.0), 1.0).await.unwrap();
        assert_eq!(a.goals()[0].goal, "High");
        assert_eq!(a.goals()[1].goal, "Low");
        assert_eq!(a.strategy(), "Go slow");
    }

    #[tokio::test]
    async fn test_memory_bounded_over_many_steps() {
        let provider = Arc::new(ScriptedProvider::new());
        let config = ActorConfig {
            memory_capacity: 6,
            reflection_interval: 3,
            ..ActorConfig::default()
        };
        let mut a = actor(StakeholderKind::Supplier, provider, config);
        for t in 0..40 {
            a.run_step(&world(t as f64), t as f64).await.unwrap();
            assert!(a.memory().len() <= 6);
        }
        assert!(a
            .memory()
            .entries()
            .iter()
            .any(|m| m.kind == MemoryKind::Summary));
    }

    #[tokio::test]
    async fn test_inbox_bounded() {
        let provider = Arc::new(ScriptedProvider::new());
        let config = ActorConfig {
            inbox_capacity: 2,
            ..ActorConfig::default()
        };
        let mut a = actor(StakeholderKind::Customer, provider, config);
        for i in 0..5 {
            a.deliver(InboxMessage {
                sender_id: format!("s{}", i),
                sender_name: "S".into(),
                content: i.to_string(),
                timestamp: 0.0,
            });
        }
        assert_eq!(a.pending_messages(), 2);
    }

    #[tokio::test]
    async fn test_restored_progress_continues_difficulty_ramp() {
        let provider = Arc::new(ScriptedProvider::new());
        let config = ActorConfig {
            difficulty_interval: 4,
            difficulty_step: 0.5,
            ..ActorConfig::default()
        };
        let mut a = actor(StakeholderKind::Critic, provider, config);
        a.restore_progress(3, 1.5);
        a.run_step(&world(0.0), 0.0).await.unwrap();
        assert_eq!(a.steps(), 4);
        assert!((a.difficulty() - 2.0).abs() < 1e-9);

        a.restore_progress(0, 99.0);
        assert!((a.difficulty() - 3.0).abs() < 1e-9);
    }
}

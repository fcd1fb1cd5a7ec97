//! Tick scheduler.
//!
//! Advances the virtual clock in fixed increments, drives every active actor
//! once per tick and fans out derived work on sub-cadences.
//!
//! ```text
//!            start              pause
//!   [Idle] ────────> [Running] ───────> [Paused]
//!     │                │   ^    resume     │
//!     │                │   └───────────────┘
//!     │ stop           │ stop / tick limit / failure ceiling
//!     v                v                   │
//!   [Stopped] <────────┴───────────────────┘
//! ```
//!
//! # Tick
//!
//! 1. Advance the clock by `tick_seconds`
//! 2. Refresh the world snapshot (roster, metrics, random event, flags, sentiment)
//! 3. Run every active actor (concurrently when `parallel_reasoning` is set)
//! 4. Drain results in roster order: batch writer, relationships, emergence,
//!    sentiment, message routing
//! 5. Publish `tick`
//! 6. Every `metrics_interval`: metrics, sentiment, emergence flags, stage check
//! 7. Every `social_interval`: coalitions, ally conversations, one rival debate
//! 8. Relationship decay
//! 9. Every `checkpoint_interval`: checkpoint
//!
//! Commands from a [`ControlHandle`] are applied between ticks, never
//! mid-tick.

mod checkpoint;
mod control;
mod lifecycle;
mod report;

pub use checkpoint::{ActorProgress, CheckpointPayload, CHECKPOINT_KEY, CHECKPOINT_VERSION};
pub use control::{channel, Command, ControlHandle};
pub use lifecycle::{Lifecycle, LifecycleAction};
pub use report::{top_actions, RunOutcome, RunReport, OUTCOME_KEY, TICKS_KEY, TOP_ACTIONS};

use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::actor::{default_roster, Actor, InboxMessage, MemoryKind};
use crate::analytics::{EmergenceDetector, SentimentTracker, Trend};
use crate::config::Config;
use crate::economics::{growth_modifier, EconomicParams, MetricContext, MetricSet, PhaseManager};
use crate::error::{Result, SimError};
use crate::events::{EventBus, EventKind};
use crate::model::{ActorEntity, InteractionLog, SimulationEntity, StakeholderKind};
use crate::reasoning::ReasoningProvider;
use crate::resilience::{ActorPool, BatchWriter, FailureCeiling};
use crate::scenario::EventGenerator;
use crate::social::{
    converse, debate, CoalitionDetector, Participant, RelationshipGraph, SocialMemory,
    DEBATE_ROUNDS, MAX_TURNS,
};
use crate::storage::Storage;
use crate::world::{RosterEntry, WorldSnapshot};

/// Allies invited to one conversation
pub const MAX_ALLIES: usize = 2;

type StepOutcome = std::result::Result<Result<Option<InteractionLog>>, Box<dyn Any + Send>>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum StopCause {
    Requested,
    TickLimit,
    Failed(String),
}

fn payload<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panicked".to_string())
}

/// Drives one simulation.
pub struct TickScheduler {
    config: Config,
    simulation: SimulationEntity,
    storage: Arc<dyn Storage>,
    provider: Arc<dyn ReasoningProvider>,
    bus: EventBus,

    lifecycle: Lifecycle,
    tick_count: u64,
    clock: f64,
    world: WorldSnapshot,

    actors: Vec<Actor>,
    pool: ActorPool,
    writer: BatchWriter,
    ceiling: FailureCeiling,

    relationships: RelationshipGraph,
    coalitions: CoalitionDetector,
    emergence: EmergenceDetector,
    sentiment: SentimentTracker,
    phases: PhaseManager,
    events: EventGenerator,

    interactions: Vec<InteractionLog>,
    latest_metrics: Option<MetricSet>,

    control: ControlHandle,
    commands: mpsc::UnboundedReceiver<Command>,
    interrupts: u32,
    stop_cause: Option<StopCause>,
}

impl std::fmt::Debug for TickScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickScheduler")
            .field("simulation", &self.simulation.id)
            .field("lifecycle", &self.lifecycle)
            .field("tick_count", &self.tick_count)
            .field("clock", &self.clock)
            .field("actors", &self.actors.len())
            .field("provider", &self.provider.name())
            .finish_non_exhaustive()
    }
}

impl TickScheduler {
    /// Scheduler for an already persisted simulation, with no actors.
    ///
    /// The virtual clock starts at the simulation's `created_at`.
    pub fn new(
        simulation: SimulationEntity,
        config: Config,
        storage: Arc<dyn Storage>,
        provider: Arc<dyn ReasoningProvider>,
    ) -> Self {
        let (control, commands) = control::channel();
        let clock = simulation.created_at;
        let seed = config.scheduler.seed.unwrap_or_else(rand::random);
        let world = WorldSnapshot::new(
            &simulation.id,
            &simulation.name,
            &simulation.industry,
            simulation.stage,
            clock,
        );
        let writer = BatchWriter::new(
            Arc::clone(&storage),
            config.resilience.batch_size,
            Duration::from_millis(config.resilience.flush_interval_ms),
        );

        Self {
            pool: ActorPool::new(config.resilience.pool_max_active),
            ceiling: FailureCeiling::new(config.scheduler.max_consecutive_failures),
            coalitions: CoalitionDetector::new(config.analytics.alliance_threshold),
            emergence: EmergenceDetector::new(&config.analytics),
            sentiment: SentimentTracker::new(&config.analytics),
            phases: PhaseManager::new(simulation.stage),
            events: EventGenerator::new(seed),
            relationships: RelationshipGraph::new(),
            bus: EventBus::new(),
            lifecycle: Lifecycle::Idle,
            tick_count: 0,
            clock,
            world,
            actors: Vec::new(),
            writer,
            interactions: Vec::new(),
            latest_metrics: None,
            control,
            commands,
            interrupts: 0,
            stop_cause: None,
            config,
            simulation,
            storage,
            provider,
        }
    }

    /// Persist a new simulation and build its scheduler
    pub fn create(
        simulation: SimulationEntity,
        config: Config,
        storage: Arc<dyn Storage>,
        provider: Arc<dyn ReasoningProvider>,
    ) -> Result<Self> {
        storage.create_simulation(&simulation)?;
        tracing::info!(simulation = %simulation.id, name = %simulation.name, "Simulation created");
        Ok(Self::new(simulation, config, storage, provider))
    }

    /// Reload a persisted simulation: its actors, interactions and, when
    /// present, its latest checkpoint.
    pub fn open(
        simulation_id: &str,
        config: Config,
        storage: Arc<dyn Storage>,
        provider: Arc<dyn ReasoningProvider>,
    ) -> Result<Self> {
        let simulation = storage.get_simulation(simulation_id)?;
        let agents = storage.get_agents(simulation_id)?;
        let mut scheduler = Self::new(simulation, config, storage, provider);
        for entity in agents {
            let actor = Actor::new(entity, Arc::clone(&scheduler.provider), scheduler.config.actor.clone());
            scheduler.add_actor(actor);
        }
        if !scheduler.restore_from_checkpoint()? {
            scheduler.interactions = scheduler.storage.get_interactions(simulation_id)?;
        }
        Ok(scheduler)
    }

    // ---------------------------------------------------------------------
    // Roster
    // ---------------------------------------------------------------------

    /// Persist an actor entity and add it to the roster
    pub fn spawn(&mut self, entity: ActorEntity) -> Result<()> {
        let actor = Actor::new(entity, Arc::clone(&self.provider), self.config.actor.clone());
        self.spawn_actor(actor)
    }

    /// Persist and add a pre-built actor (custom invariants, description)
    pub fn spawn_actor(&mut self, actor: Actor) -> Result<()> {
        let entity = actor.entity();
        self.storage.save_agent(&self.simulation.id, entity)?;
        self.publish(
            EventKind::AgentCreated,
            json!({
                "agent_id": entity.id,
                "name": entity.name,
                "type": entity.kind,
                "role": entity.role,
            }),
        );
        tracing::debug!(actor = %entity.id, kind = %entity.kind, "Actor spawned");
        self.add_actor(actor);
        Ok(())
    }

    /// Spawn the standard stakeholder roster for this venture
    pub fn spawn_default_roster(&mut self) -> Result<usize> {
        let roster = default_roster(&self.simulation);
        let count = roster.len();
        for entity in roster {
            self.spawn(entity)?;
        }
        Ok(count)
    }

    fn add_actor(&mut self, actor: Actor) {
        self.pool.add(self.actors.len());
        self.actors.push(actor);
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    fn transition(&mut self, action: LifecycleAction) -> Result<Lifecycle> {
        let previous = self.lifecycle;
        self.lifecycle = previous.transition(action)?;
        if previous != self.lifecycle {
            tracing::info!(
                simulation = %self.simulation.id,
                from = %previous,
                to = %self.lifecycle,
                tick = self.tick_count,
                "Lifecycle transition"
            );
        }
        Ok(previous)
    }

    /// idle -> running
    pub fn start(&mut self) -> Result<()> {
        self.transition(LifecycleAction::Start)?;
        self.publish(
            EventKind::SimulationStarted,
            json!({
                "simulation_id": self.simulation.id,
                "name": self.simulation.name,
                "agents": self.actors.len(),
                "tick": self.tick_count,
            }),
        );
        Ok(())
    }

    /// running -> paused
    pub fn pause(&mut self) -> Result<()> {
        self.transition(LifecycleAction::Pause)?;
        self.publish(EventKind::SimulationPaused, json!({"tick": self.tick_count}));
        Ok(())
    }

    /// paused -> running
    pub fn resume(&mut self) -> Result<()> {
        self.transition(LifecycleAction::Resume)?;
        self.interrupts = 0;
        self.publish(EventKind::SimulationResumed, json!({"tick": self.tick_count}));
        Ok(())
    }

    /// Stop the run and flush buffered writes. Idempotent.
    pub fn stop(&mut self) -> Result<()> {
        self.stop_with(StopCause::Requested)
    }

    fn stop_with(&mut self, cause: StopCause) -> Result<()> {
        let previous = self.transition(LifecycleAction::Stop)?;
        if !previous.is_stopped() {
            let reason = match &cause {
                StopCause::Requested => "requested".to_string(),
                StopCause::TickLimit => "tick limit".to_string(),
                StopCause::Failed(reason) => reason.clone(),
            };
            self.stop_cause = Some(cause);
            self.publish(
                EventKind::SimulationStopped,
                json!({"tick": self.tick_count, "reason": reason}),
            );
        }
        self.writer.flush()
    }

    /// Host interrupt: the first one toggles pause/resume, a second one
    /// before the run is resumed stops it.
    pub fn interrupt(&mut self) -> Result<()> {
        self.interrupts += 1;
        if self.interrupts > 1 {
            tracing::info!(tick = self.tick_count, "Repeated interrupt, stopping");
            return self.stop();
        }
        match self.lifecycle {
            Lifecycle::Running => self.pause(),
            Lifecycle::Paused => self.resume(),
            Lifecycle::Idle | Lifecycle::Stopped => self.stop(),
        }
    }

    /// Apply one command. Commands that do not fit the current state are
    /// ignored.
    pub fn apply(&mut self, command: Command) -> Result<()> {
        let result = match command {
            Command::Pause => self.pause(),
            Command::Resume => self.resume(),
            Command::Stop => self.stop(),
            Command::Interrupt => self.interrupt(),
            Command::Checkpoint => self.checkpoint(),
        };
        match result {
            Err(e @ SimError::InvalidTransition { .. }) => {
                tracing::debug!(?command, error = %e, "Ignoring command");
                Ok(())
            },
            other => other,
        }
    }

    fn drain_commands(&mut self) -> Result<()> {
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Tick
    // ---------------------------------------------------------------------

    /// Process one tick. Returns false, changing nothing, unless running.
    pub async fn step(&mut self) -> Result<bool> {
        if !self.lifecycle.is_running() {
            return Ok(false);
        }
        self.tick_count += 1;
        self.clock += self.config.scheduler.tick_seconds;
        self.refresh_world();

        let active = self.pool.active();
        self.pool.rotate();
        let outcomes = self.run_actors(&active).await;

        for (actor_id, outcome) in outcomes {
            let error = match outcome {
                Ok(Ok(Some(log))) => {
                    self.ceiling.record_success();
                    self.record_interaction(log)?;
                    continue;
                },
                Ok(Ok(None)) => {
                    self.ceiling.record_success();
                    continue;
                },
                Ok(Err(e)) => e,
                Err(panic) => SimError::ActorStep {
                    actor: actor_id.clone(),
                    reason: panic_message(&*panic),
                },
            };
            tracing::error!(actor = %actor_id, tick = self.tick_count, error = %error, "Actor step failed");
            if self.ceiling.record_failure() {
                tracing::error!(
                    consecutive = self.ceiling.consecutive(),
                    tick = self.tick_count,
                    "Consecutive failure ceiling reached, stopping"
                );
                self.stop_with(StopCause::Failed(error.to_string()))?;
                return Ok(true);
            }
        }

        self.publish(
            EventKind::Tick,
            json!({"tick": self.tick_count, "time": self.clock, "date": self.world.date()}),
        );

        let sched = &self.config.scheduler;
        let due = |interval: u64| interval > 0 && self.tick_count % interval == 0;
        let (metrics_due, social_due, checkpoint_due) = (
            due(sched.metrics_interval),
            due(sched.social_interval),
            due(sched.checkpoint_interval),
        );
        if metrics_due {
            self.emit_metrics()?;
        }
        if social_due {
            self.run_social_events().await;
        }

        let decay = self
            .simulation
            .param_f64("relationship_decay_factor", self.config.scheduler.relationship_decay);
        self.relationships.decay(decay);

        if checkpoint_due {
            self.checkpoint()?;
        }
        Ok(true)
    }

    fn refresh_world(&mut self) {
        let active_event = self.events.maybe_trigger(self.tick_count);
        if let Some(event) = &active_event {
            self.publish(event.category.event_kind(), payload(event));
        }

        let world = &mut self.world;
        world.tick = self.tick_count;
        world.timestamp = self.clock;
        world.stage = self.phases.current();
        world.roster = self.actors.iter().map(|a| RosterEntry::from(a.entity())).collect();
        world.metrics = self.latest_metrics.map(|m| m.to_map()).unwrap_or_default();
        world.active_events = active_event.into_iter().collect();
        world.emergence_flags = self.emergence.recent_flags();
        world.sentiments = self.sentiment.all_sentiments();
    }

    async fn run_actors(&mut self, active: &[usize]) -> Vec<(String, StepOutcome)> {
        let world = &self.world;
        let clock = self.clock;
        let steps = self
            .actors
            .iter_mut()
            .enumerate()
            .filter(|(i, _)| active.contains(i))
            .map(|(_, actor)| async move {
                let id = actor.id().to_string();
                let outcome = AssertUnwindSafe(actor.run_step(world, clock))
                    .catch_unwind()
                    .await;
                (id, outcome)
            });

        if self.config.scheduler.parallel_reasoning {
            join_all(steps).await
        } else {
            let mut outcomes = Vec::with_capacity(active.len());
            for step in steps {
                outcomes.push(step.await);
            }
            outcomes
        }
    }

    fn record_interaction(&mut self, log: InteractionLog) -> Result<()> {
        self.relationships
            .update_from_interaction(&log.actor_id, &log.target, &log.action);
        self.emergence.observe(&log.action);
        self.sentiment
            .record_action(&log.actor_id, &log.action, &log.outcome_text(), log.timestamp);
        self.publish(EventKind::InteractionOccurred, payload(&log));
        if log.action == "send_message" {
            self.route_message(&log);
        }
        self.interactions.push(log.clone());
        self.writer.add(log)
    }

    fn route_message(&mut self, log: &InteractionLog) {
        let target = log
            .outcome
            .get("target_agent_id")
            .and_then(Value::as_str)
            .unwrap_or(log.target.as_str());
        if target == log.actor_id {
            return;
        }
        let Some(sender_name) = self.actor(&log.actor_id).map(|a| a.entity().name.clone()) else {
            return;
        };
        let content = log
            .outcome
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let Some(recipient) = self.actors.iter_mut().find(|a| a.id() == target) else {
            tracing::debug!(from = %log.actor_id, to = %target, "Message to unknown actor dropped");
            return;
        };
        recipient.deliver(InboxMessage {
            sender_id: log.actor_id.clone(),
            sender_name: sender_name.clone(),
            content: content.clone(),
            timestamp: log.timestamp,
        });
        self.publish(
            EventKind::AgentMessage,
            json!({
                "from": log.actor_id,
                "from_name": sender_name,
                "to": target,
                "content": content,
            }),
        );
    }

    // ---------------------------------------------------------------------
    // Sub-cadences
    // ---------------------------------------------------------------------

    fn compute_metrics(&mut self) -> MetricSet {
        let (share, penetration) = self
            .latest_metrics
            .map(|m| (m.market_share, m.adoption_rate))
            .unwrap_or((0.1, 0.0));
        self.simulation.parameters.insert(
            "growth_modifier".to_string(),
            json!(growth_modifier(share, penetration)),
        );
        let params = EconomicParams::from_simulation(&self.simulation);
        let employees: HashSet<String> = self
            .actors
            .iter()
            .filter(|a| a.entity().kind == StakeholderKind::Employee)
            .map(|a| a.id().to_string())
            .collect();
        MetricSet::compute(
            &params,
            &self.interactions,
            MetricContext {
                tick: self.tick_count,
                now: self.clock,
                tick_seconds: self.config.scheduler.tick_seconds,
                employee_ids: &employees,
            },
        )
    }

    fn emit_metrics(&mut self) -> Result<()> {
        self.writer.flush()?;
        let metrics = self.compute_metrics();
        for snapshot in metrics.snapshots(&self.simulation.id, self.clock) {
            self.storage.log_metric(&snapshot)?;
            self.publish(
                EventKind::MetricChanged,
                json!({
                    "metric": snapshot.metric_type,
                    "value": snapshot.value,
                    "tick": self.tick_count,
                }),
            );
        }
        self.latest_metrics = Some(metrics);
        tracing::debug!(
            tick = self.tick_count,
            adoption = metrics.adoption_rate,
            revenue = metrics.revenue,
            "Metrics updated"
        );

        let trends: BTreeMap<String, Trend> = self
            .actors
            .iter()
            .map(|a| (a.id().to_string(), self.sentiment.trend(a.id())))
            .collect();
        self.publish(
            EventKind::SentimentUpdate,
            json!({"sentiments": self.sentiment.all_sentiments(), "trends": trends}),
        );

        let flags = self.emergence.recent_flags();
        if !flags.is_empty() {
            self.publish(
                EventKind::EmergenceFlags,
                json!({"flags": flags, "tick": self.tick_count}),
            );
        }

        if let Some(transition) = self
            .phases
            .check_transition(self.tick_count, metrics.adoption_rate)
        {
            self.simulation.stage = transition.to;
            self.publish(EventKind::PhaseTransition, payload(&transition));
        }
        Ok(())
    }

    async fn run_social_events(&mut self) {
        let roster: Vec<String> = self.actors.iter().map(|a| a.id().to_string()).collect();
        let coalitions = self
            .coalitions
            .detect(&self.relationships, &roster)
            .to_vec();
        if !coalitions.is_empty() {
            tracing::info!(count = coalitions.len(), tick = self.tick_count, "Coalitions detected");
            self.publish(
                EventKind::CoalitionsDetected,
                json!({"coalitions": coalitions, "tick": self.tick_count}),
            );
        }

        let memories = self.social_events().await;
        let clock = self.clock;
        for memory in memories {
            if let Some(actor) = self.actor_mut(&memory.actor_id) {
                actor.add_memory(MemoryKind::Social, memory.content, clock);
            }
        }
    }

    async fn social_events(&self) -> Vec<SocialMemory> {
        let threshold = self.config.analytics.alliance_threshold;
        let mut memories = Vec::new();

        let topic = format!("Strategy discussion about {}", self.simulation.name);
        for actor in &self.actors {
            let allies: Vec<Participant> = self
                .relationships
                .allies(actor.id(), threshold)
                .iter()
                .filter_map(|id| self.actor(id))
                .take(MAX_ALLIES)
                .map(|a| Participant::from(a.entity()))
                .collect();
            if allies.is_empty() {
                continue;
            }
            let mut participants = vec![Participant::from(actor.entity())];
            participants.extend(allies);
            let transcript = converse(self.provider.as_ref(), &topic, &participants, MAX_TURNS).await;
            self.publish(EventKind::Conversation, payload(&transcript));
            memories.extend(transcript.memories);
        }

        let rivalry = self.actors.iter().find_map(|actor| {
            self.relationships
                .rivals(actor.id(), threshold)
                .iter()
                .find_map(|id| self.actor(id))
                .map(|rival| (actor, rival))
        });
        if let Some((actor, rival)) = rivalry {
            let participants = vec![Participant::from(actor.entity()), Participant::from(rival.entity())];
            let topic = format!("Market direction for {}", self.simulation.industry);
            let context = format!("Stage: {}", self.phases.current());
            let outcome = debate(
                self.provider.as_ref(),
                &topic,
                &context,
                &participants,
                DEBATE_ROUNDS,
            )
            .await;
            self.publish(EventKind::Debate, payload(&outcome));
            memories.extend(outcome.memories);
        }
        memories
    }

    // ---------------------------------------------------------------------
    // Checkpoints
    // ---------------------------------------------------------------------

    /// Current state as a checkpoint payload
    pub fn checkpoint_payload(&self) -> CheckpointPayload {
        let tail = self.config.actor.checkpoint_memory_tail;
        CheckpointPayload {
            version: CHECKPOINT_VERSION,
            current_time: self.clock,
            tick_count: self.tick_count,
            stage: self.phases.current(),
            agent_memories: self
                .actors
                .iter()
                .map(|a| (a.id().to_string(), a.memory().tail(tail).to_vec()))
                .collect(),
            agent_progress: self
                .actors
                .iter()
                .map(|a| {
                    let progress = ActorProgress {
                        steps: a.steps(),
                        difficulty: a.difficulty(),
                    };
                    (a.id().to_string(), progress)
                })
                .collect(),
            relationships: self.relationships.edges(),
            emergence_state: self.emergence.state(),
            sentiment_history: self.sentiment.snapshot(),
            coalitions: self.coalitions.coalitions().to_vec(),
            latest_metrics: self.latest_metrics,
        }
    }

    /// Flush pending interactions, then persist a checkpoint both in the
    /// simulation's parameter map and through the storage checkpoint slot.
    pub fn checkpoint(&mut self) -> Result<()> {
        self.writer.flush()?;
        let value = self.checkpoint_payload().to_value()?;
        self.simulation
            .parameters
            .insert(CHECKPOINT_KEY.to_string(), value.clone());
        self.storage.update_simulation(&self.simulation)?;
        self.storage.write_checkpoint(&self.simulation.id, &value)?;
        tracing::info!(
            simulation = %self.simulation.id,
            tick = self.tick_count,
            "Checkpoint saved"
        );
        self.publish(
            EventKind::Checkpoint,
            json!({"tick": self.tick_count, "time": self.clock}),
        );
        Ok(())
    }

    /// Restore from the latest checkpoint. Returns false when none exists.
    ///
    /// Actors must already be on the roster; state for unknown actor ids is
    /// skipped. Interactions and metric snapshots stamped after the
    /// checkpoint are deleted from storage before the history is reloaded.
    pub fn restore_from_checkpoint(&mut self) -> Result<bool> {
        let stored = match self.storage.read_checkpoint(&self.simulation.id)? {
            Some(value) => Some(value),
            None => self.simulation.parameters.get(CHECKPOINT_KEY).cloned(),
        };
        let Some(value) = stored else {
            tracing::debug!(simulation = %self.simulation.id, "No checkpoint to restore");
            return Ok(false);
        };
        let payload = CheckpointPayload::from_value(value)?;

        self.tick_count = payload.tick_count;
        self.clock = payload.current_time;
        self.simulation.stage = payload.stage;
        self.phases = PhaseManager::new(payload.stage);
        for (actor_id, memories) in payload.agent_memories {
            if let Some(actor) = self.actor_mut(&actor_id) {
                actor.restore_memory(memories);
            }
        }
        self.relationships.restore(&payload.relationships);
        self.emergence.restore(payload.emergence_state);
        self.sentiment.restore(payload.sentiment_history);
        self.coalitions.restore(payload.coalitions);
        for (actor_id, progress) in payload.agent_progress {
            if let Some(actor) = self.actor_mut(&actor_id) {
                actor.restore_progress(progress.steps, progress.difficulty);
            }
        }
        self.latest_metrics = payload.latest_metrics;

        // Ticks past the checkpoint are replayed, so their records go
        let discarded = self.storage.truncate_after(&self.simulation.id, self.clock)?;
        if discarded > 0 {
            tracing::info!(
                simulation = %self.simulation.id,
                tick = self.tick_count,
                discarded,
                "Discarded records logged after the checkpoint"
            );
        }
        self.interactions = self.storage.get_interactions(&self.simulation.id)?;

        self.world.tick = self.tick_count;
        self.world.timestamp = self.clock;
        self.world.stage = payload.stage;

        tracing::info!(
            simulation = %self.simulation.id,
            tick = self.tick_count,
            interactions = self.interactions.len(),
            "Checkpoint restored"
        );
        Ok(true)
    }

    // ---------------------------------------------------------------------
    // Run loop
    // ---------------------------------------------------------------------

    /// Run until stopped, the tick limit, or the failure ceiling, then
    /// finalize.
    ///
    /// `max_ticks` (falling back to the configured limit) counts total
    /// ticks, including those before a restored checkpoint. With a positive
    /// `speed_multiplier` each tick takes at least `1 / speed_multiplier`
    /// wall-clock seconds. Commands are applied between ticks; while paused
    /// the loop waits on the command channel.
    pub async fn run(&mut self, max_ticks: Option<u64>) -> Result<RunReport> {
        let limit = max_ticks.or(self.config.scheduler.max_ticks);
        let speed = self.config.scheduler.speed_multiplier;
        let pace = (speed > 0.0).then(|| Duration::from_secs_f64(1.0 / speed));
        if self.lifecycle == Lifecycle::Idle {
            self.start()?;
        }

        loop {
            self.drain_commands()?;
            match self.lifecycle {
                Lifecycle::Running => {},
                Lifecycle::Paused => {
                    // The scheduler holds a sender itself, so the channel stays open
                    if let Some(command) = self.commands.recv().await {
                        self.apply(command)?;
                    }
                    continue;
                },
                Lifecycle::Idle | Lifecycle::Stopped => break,
            }
            if limit.is_some_and(|max| self.tick_count >= max) {
                self.stop_with(StopCause::TickLimit)?;
                break;
            }

            let started = Instant::now();
            if let Err(e) = self.step().await {
                tracing::error!(tick = self.tick_count, error = %e, "Tick failed");
                if let Err(stop_err) = self.stop_with(StopCause::Failed(e.to_string())) {
                    tracing::warn!(error = %stop_err, "Flush after failed tick also failed");
                }
                return Err(e);
            }

            if let Some(pace) = pace {
                let remaining = pace.saturating_sub(started.elapsed());
                if !remaining.is_zero() {
                    let command = tokio::select! {
                        _ = tokio::time::sleep(remaining) => None,
                        command = self.commands.recv() => command,
                    };
                    if let Some(command) = command {
                        self.apply(command)?;
                    }
                }
            }
        }
        self.finalize()
    }

    /// Flush, persist the final stage, tick count and outcome, and build
    /// the end-of-run report.
    pub fn finalize(&mut self) -> Result<RunReport> {
        self.writer.flush()?;
        let metrics = match self.latest_metrics {
            Some(metrics) => metrics,
            None => self.compute_metrics(),
        };
        let outcome = match &self.stop_cause {
            Some(StopCause::Failed(reason)) => RunOutcome::Failed {
                reason: reason.clone(),
            },
            Some(StopCause::Requested) => RunOutcome::Stopped,
            Some(StopCause::TickLimit) | None => RunOutcome::Completed,
        };
        self.simulation
            .parameters
            .insert(TICKS_KEY.to_string(), json!(self.tick_count));
        self.simulation
            .parameters
            .insert(OUTCOME_KEY.to_string(), payload(&outcome));
        self.storage.update_simulation(&self.simulation)?;
        tracing::info!(
            simulation = %self.simulation.id,
            ticks = self.tick_count,
            interactions = self.interactions.len(),
            %outcome,
            "Run finalized"
        );
        Ok(RunReport::build(
            &self.simulation,
            &self.interactions,
            &metrics,
            self.tick_count,
            outcome,
        ))
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    fn publish(&self, kind: EventKind, payload: Value) {
        self.bus.publish(kind, payload, self.clock);
    }

    /// Event bus shared with observers
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// A new handle onto the command channel
    pub fn control(&self) -> ControlHandle {
        self.control.clone()
    }

    /// Current lifecycle state
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// Completed ticks
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Virtual clock
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// The simulation being driven
    pub fn simulation(&self) -> &SimulationEntity {
        &self.simulation
    }

    /// Latest world snapshot
    pub fn world(&self) -> &WorldSnapshot {
        &self.world
    }

    /// Roster in spawn order
    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    /// Actor by id
    pub fn actor(&self, id: &str) -> Option<&Actor> {
        self.actors.iter().find(|a| a.id() == id)
    }

    /// Mutable actor by id
    pub fn actor_mut(&mut self, id: &str) -> Option<&mut Actor> {
        self.actors.iter_mut().find(|a| a.id() == id)
    }

    /// Interaction history of this run
    pub fn interactions(&self) -> &[InteractionLog] {
        &self.interactions
    }

    /// Latest metrics cycle
    pub fn latest_metrics(&self) -> Option<&MetricSet> {
        self.latest_metrics.as_ref()
    }

    /// Relationship graph
    pub fn relationships(&self) -> &RelationshipGraph {
        &self.relationships
    }

    /// Coalition detector with the last result
    pub fn coalitions(&self) -> &CoalitionDetector {
        &self.coalitions
    }

    /// Emergence detector
    pub fn emergence(&self) -> &EmergenceDetector {
        &self.emergence
    }

    /// Sentiment tracker
    pub fn sentiment(&self) -> &SentimentTracker {
        &self.sentiment
    }

    /// Current consecutive actor failures
    pub fn consecutive_failures(&self) -> u32 {
        self.ceiling.consecutive()
    }

    /// Interactions waiting in the batch writer
    pub fn pending_writes(&self) -> usize {
        self.writer.pending()
    }
}

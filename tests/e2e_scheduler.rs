//! End-to-end scheduler tests.
//!
//! These drive the tick loop through the public API with scripted reasoning
//! and in-memory (or temp-dir) storage: lifecycle, checkpoints, the failure
//! ceiling, coalitions, message routing and event-bus isolation.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use stakesim::reasoning::CompletionFuture;
use stakesim::{
    Actor, ActorEntity, CompletionRequest, Config, EventKind, FileStorage, HandlerError,
    Invariant, Lifecycle, MemoryKind, MemoryStorage, ReasoningProvider, RunOutcome,
    ScriptedProvider, SimulationEntity, Stage, StakeholderKind, Storage, TickScheduler,
};

fn decision(action: &str, target: &str) -> String {
    json!({
        "thought_process": format!("{} {}", action, target),
        "action_type": action,
        "action_details": {"target": target},
    })
    .to_string()
}

fn config() -> Config {
    let mut config = Config::default();
    config.scheduler.speed_multiplier = 0.0;
    config.scheduler.seed = Some(11);
    config
}

fn venture() -> SimulationEntity {
    SimulationEntity::new("Acme Pay", "fintech", Stage::Mvp).with_created_at(1_700_000_000.0)
}

/// Answers decision prompts per actor id, everything else with a short
/// closing remark.
struct RoutedProvider {
    replies: HashMap<String, String>,
}

impl RoutedProvider {
    fn new(replies: &[(&str, String)]) -> Self {
        Self {
            replies: replies
                .iter()
                .map(|(id, reply)| (id.to_string(), reply.clone()))
                .collect(),
        }
    }
}

impl ReasoningProvider for RoutedProvider {
    fn complete(&self, request: CompletionRequest) -> CompletionFuture<'_> {
        let id = request
            .prompt
            .lines()
            .find_map(|line| line.strip_prefix("Your id: "))
            .map(str::to_string);
        let reply = id
            .and_then(|id| self.replies.get(&id).cloned())
            .unwrap_or_else(|| json!({"message": "Agreed.", "wants_to_continue": false}).to_string());
        Box::pin(async move { Ok(reply) })
    }

    fn name(&self) -> &'static str {
        "routed"
    }
}

/// Test tick counting across pause, resume and stop
#[tokio::test]
async fn test_tick_count_only_advances_while_running() {
    let provider = Arc::new(ScriptedProvider::new());
    let mut s = TickScheduler::create(venture(), config(), Arc::new(MemoryStorage::new()), provider)
        .unwrap();
    s.spawn(ActorEntity::new(StakeholderKind::Customer, "Early adopter"))
        .unwrap();
    s.spawn(ActorEntity::new(StakeholderKind::Investor, "Angel"))
        .unwrap();

    s.start().unwrap();
    for _ in 0..7 {
        assert!(s.step().await.unwrap());
    }
    assert_eq!(s.tick_count(), 7);

    s.pause().unwrap();
    for _ in 0..3 {
        assert!(!s.step().await.unwrap());
    }
    assert_eq!(s.tick_count(), 7);

    s.resume().unwrap();
    s.step().await.unwrap();
    assert_eq!(s.tick_count(), 8);
    assert!((s.clock() - 1_700_000_008.0).abs() < 1e-6);

    s.stop().unwrap();
    s.stop().unwrap();
    assert!(!s.step().await.unwrap());
    assert_eq!(s.tick_count(), 8);
    assert_eq!(s.lifecycle(), Lifecycle::Stopped);
    assert!(s.resume().is_err());
}

/// Test checkpoint and restore into a fresh scheduler over the same storage
#[tokio::test]
async fn test_checkpoint_restore_round_trip() {
    let storage = Arc::new(MemoryStorage::new());
    let provider = Arc::new(ScriptedProvider::new().with_default(decision("buy", "startup")));
    let mut s = TickScheduler::create(venture(), config(), storage.clone(), provider.clone())
        .unwrap();
    s.spawn(ActorEntity::new(StakeholderKind::Customer, "Early adopter").with_id("c1"))
        .unwrap();
    s.spawn(ActorEntity::new(StakeholderKind::Customer, "Mainstream").with_id("c2"))
        .unwrap();

    s.start().unwrap();
    for _ in 0..30 {
        s.step().await.unwrap();
    }
    s.checkpoint().unwrap();

    let tail = config().actor.checkpoint_memory_tail;
    let expected: Vec<_> = s
        .actors()
        .iter()
        .map(|a| (a.id().to_string(), a.memory().tail(tail).to_vec()))
        .collect();
    let sim_id = s.simulation().id.clone();

    let restored = TickScheduler::open(&sim_id, config(), storage.clone(), provider).unwrap();
    assert_eq!(restored.tick_count(), 30);
    assert_eq!(restored.clock(), s.clock());
    assert_eq!(restored.actors().len(), 2);
    for (id, memories) in &expected {
        let actor = restored.actor(id).unwrap();
        assert_eq!(memories.len(), tail);
        assert_eq!(actor.memory().tail(tail), memories.as_slice());
    }
    assert_eq!(restored.interactions().len(), 60);
    assert_eq!(restored.relationships().edge_count(), s.relationships().edge_count());
    assert_eq!(restored.emergence().observed(), s.emergence().observed());
    assert_eq!(restored.lifecycle(), Lifecycle::Idle);

    let stored = storage.get_simulation(&sim_id).unwrap();
    assert_eq!(stored.parameters["checkpoint"]["tick_count"], 30);
}

/// Test that a restored run keeps ticking from the checkpointed clock
#[tokio::test]
async fn test_restore_from_file_storage_and_continue() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::new());
    let sim_id = {
        let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
        let mut s = TickScheduler::create(venture(), config(), storage, provider.clone()).unwrap();
        s.spawn(ActorEntity::new(StakeholderKind::Critic, "Blogger"))
            .unwrap();
        s.start().unwrap();
        for _ in 0..12 {
            s.step().await.unwrap();
        }
        s.checkpoint().unwrap();
        s.simulation().id.clone()
    };

    let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
    let mut s = TickScheduler::open(&sim_id, config(), storage, provider).unwrap();
    assert_eq!(s.tick_count(), 12);
    let report = s.run(Some(15)).await.unwrap();
    assert_eq!(s.tick_count(), 15);
    assert!((s.clock() - 1_700_000_015.0).abs() < 1e-6);
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.total_interactions, 15);
}

/// Run one buyer for 15 ticks with a checkpoint at tick 10, reopen over a
/// fresh handle from `reopen`, and resume to tick 15.
async fn resume_past_checkpoint(first: Arc<dyn Storage>, reopen: impl Fn() -> Arc<dyn Storage>) {
    let provider = Arc::new(ScriptedProvider::new().with_default(decision("buy", "startup")));
    let mut cfg = config();
    cfg.scheduler.checkpoint_interval = 10;
    cfg.scheduler.metrics_interval = 5;

    let mut s = TickScheduler::create(venture(), cfg.clone(), first, provider.clone()).unwrap();
    s.spawn(ActorEntity::new(StakeholderKind::Customer, "Loyal buyer").with_id("c1"))
        .unwrap();
    s.run(Some(15)).await.unwrap();
    assert_eq!(s.interactions().len(), 15);
    let sim_id = s.simulation().id.clone();
    drop(s);

    let storage = reopen();
    let mut restored = TickScheduler::open(&sim_id, cfg, storage.clone(), provider).unwrap();
    assert_eq!(restored.tick_count(), 10);
    assert_eq!(restored.interactions().len(), 10);
    assert_eq!(storage.get_interactions(&sim_id).unwrap().len(), 10);
    assert_eq!(storage.get_metrics(&sim_id, Some("revenue")).unwrap().len(), 2);
    assert_eq!(restored.actor("c1").unwrap().steps(), 10);

    let report = restored.run(Some(15)).await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.total_interactions, 15);
    assert_eq!(restored.actor("c1").unwrap().steps(), 15);

    let stored = storage.get_interactions(&sim_id).unwrap();
    let ticks: Vec<i64> = stored
        .iter()
        .map(|l| (l.timestamp - 1_700_000_000.0).round() as i64)
        .collect();
    assert_eq!(ticks, (1..=15).collect::<Vec<i64>>());
    assert!(stored.iter().all(|l| l.actor_id == "c1"));
    assert_eq!(storage.get_metrics(&sim_id, Some("revenue")).unwrap().len(), 3);
    let revenue = restored.latest_metrics().unwrap().revenue;
    assert!((revenue - 1_500.0).abs() < 1e-9);
}

/// Test resuming in memory after ticks ran past the last checkpoint
#[tokio::test]
async fn test_resume_after_work_past_checkpoint_in_memory() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let shared = storage.clone();
    resume_past_checkpoint(storage, move || shared.clone()).await;
}

/// Test resuming from disk after ticks ran past the last checkpoint
#[tokio::test]
async fn test_resume_after_work_past_checkpoint_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let first: Arc<dyn Storage> = Arc::new(FileStorage::open(&root).unwrap());
    resume_past_checkpoint(first, move || {
        Arc::new(FileStorage::open(&root).unwrap()) as Arc<dyn Storage>
    })
    .await;
}

/// Test that the failure ceiling stops the run and success resets it
#[tokio::test]
async fn test_failure_ceiling_stops_run() {
    let storage = Arc::new(MemoryStorage::new());
    let provider = Arc::new(ScriptedProvider::new());
    for action in ["invest", "invest", "buy", "invest", "invest", "invest"] {
        // customers may not invest
        provider.push_text(decision(action, "startup"));
    }
    let mut cfg = config();
    cfg.scheduler.max_consecutive_failures = Some(3);
    let mut s = TickScheduler::create(venture(), cfg, storage.clone(), provider).unwrap();
    s.spawn(ActorEntity::new(StakeholderKind::Customer, "Skeptic"))
        .unwrap();

    s.start().unwrap();
    for _ in 0..5 {
        s.step().await.unwrap();
    }
    assert_eq!(s.consecutive_failures(), 2);
    assert_eq!(s.lifecycle(), Lifecycle::Running);

    s.step().await.unwrap();
    assert_eq!(s.lifecycle(), Lifecycle::Stopped);
    assert_eq!(s.tick_count(), 6);
    assert!(!s.step().await.unwrap());
    assert_eq!(s.tick_count(), 6);

    let report = s.finalize().unwrap();
    match &report.outcome {
        RunOutcome::Failed { reason } => assert!(reason.contains("permitted_action")),
        other => panic!("expected failure, got {:?}", other),
    }
    // the one good interaction survives the failed run
    let stored = storage.get_interactions(&s.simulation().id).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].action, "buy");
}

/// Test that a panicking actor is isolated from the rest of the tick
#[tokio::test]
async fn test_panicking_actor_is_isolated() {
    let provider: Arc<dyn ReasoningProvider> = Arc::new(ScriptedProvider::new());
    let mut s = TickScheduler::create(
        venture(),
        config(),
        Arc::new(MemoryStorage::new()),
        Arc::clone(&provider),
    )
    .unwrap();
    let mut fragile = Actor::new(
        ActorEntity::new(StakeholderKind::Media, "Tabloid").with_id("m1"),
        Arc::clone(&provider),
        config().actor,
    );
    fragile.add_invariant(Invariant::new("explodes", |_, _| panic!("boom")));
    s.spawn_actor(fragile).unwrap();
    s.spawn(ActorEntity::new(StakeholderKind::Advisor, "Mentor").with_id("a1"))
        .unwrap();

    s.start().unwrap();
    s.step().await.unwrap();
    assert_eq!(s.lifecycle(), Lifecycle::Running);
    assert_eq!(s.tick_count(), 1);
    assert_eq!(s.consecutive_failures(), 0);
    assert_eq!(s.interactions().len(), 1);
    assert_eq!(s.interactions()[0].actor_id, "a1");
}

/// Test that parallel reasoning keeps roster order when draining
#[tokio::test]
async fn test_parallel_reasoning_drains_in_roster_order() {
    let mut cfg = config();
    cfg.scheduler.parallel_reasoning = true;
    let provider = Arc::new(ScriptedProvider::new().with_default(decision("build", "system")));
    let mut s = TickScheduler::create(venture(), cfg, Arc::new(MemoryStorage::new()), provider)
        .unwrap();
    let ids = ["e1", "e2", "e3", "e4"];
    for id in ids {
        s.spawn(ActorEntity::new(StakeholderKind::Employee, "Engineer").with_id(id))
            .unwrap();
    }
    s.start().unwrap();
    s.step().await.unwrap();
    let order: Vec<&str> = s.interactions().iter().map(|l| l.actor_id.as_str()).collect();
    assert_eq!(order, ids);
}

/// Test coalition formation, social events and detector idempotence
#[tokio::test]
async fn test_allies_form_coalition_and_talk() {
    let provider = Arc::new(RoutedProvider::new(&[
        ("p1", decision("partner", "p2")),
        ("p2", decision("partner", "p1")),
        ("c1", decision("buy", "startup")),
    ]));
    let mut cfg = config();
    cfg.scheduler.social_interval = 10;
    let mut s = TickScheduler::create(venture(), cfg, Arc::new(MemoryStorage::new()), provider)
        .unwrap();
    s.spawn(ActorEntity::new(StakeholderKind::Partner, "Bank").with_id("p1"))
        .unwrap();
    s.spawn(ActorEntity::new(StakeholderKind::Partner, "Marketplace").with_id("p2"))
        .unwrap();
    s.spawn(ActorEntity::new(StakeholderKind::Customer, "Shopper").with_id("c1"))
        .unwrap();

    let detected = Arc::new(Mutex::new(0usize));
    let counter = detected.clone();
    s.bus().subscribe(EventKind::CoalitionsDetected, move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    });
    let conversations = Arc::new(Mutex::new(0usize));
    let counter = conversations.clone();
    s.bus().subscribe(EventKind::Conversation, move |_| {
        *counter.lock().unwrap() += 1;
        Ok(())
    });

    s.start().unwrap();
    for _ in 0..10 {
        s.step().await.unwrap();
    }

    assert_eq!(*detected.lock().unwrap(), 1);
    let coalitions = s.coalitions().coalitions();
    assert_eq!(coalitions.len(), 1);
    let members: BTreeSet<String> = ["p1", "p2"].iter().map(|id| id.to_string()).collect();
    assert_eq!(coalitions[0].members, members);
    assert!(coalitions[0].strength >= 0.3);

    assert_eq!(*conversations.lock().unwrap(), 2);
    for id in ["p1", "p2"] {
        let actor = s.actor(id).unwrap();
        assert!(actor
            .memory()
            .entries()
            .iter()
            .any(|m| m.kind == MemoryKind::Social));
    }
    assert!(!s
        .actor("c1")
        .unwrap()
        .memory()
        .entries()
        .iter()
        .any(|m| m.kind == MemoryKind::Social));

    let roster: Vec<String> = s.actors().iter().map(|a| a.id().to_string()).collect();
    let mut detector = s.coalitions().clone();
    let first = detector.detect(s.relationships(), &roster).to_vec();
    let second = detector.detect(s.relationships(), &roster).to_vec();
    assert_eq!(first, second);
    assert!(first.iter().all(|c| !c.members.contains("c1")));
}

/// Test that failing and panicking observers never reach the scheduler
#[tokio::test]
async fn test_failing_observers_do_not_disturb_ticks() {
    let mut s = TickScheduler::create(
        venture(),
        config(),
        Arc::new(MemoryStorage::new()),
        Arc::new(ScriptedProvider::new()),
    )
    .unwrap();
    s.spawn(ActorEntity::new(StakeholderKind::Supplier, "Cloud host"))
        .unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    s.bus()
        .subscribe(EventKind::Tick, |_| Err(HandlerError::new("dashboard offline")));
    s.bus().subscribe(EventKind::Tick, |_| panic!("renderer crashed"));
    let sink = seen.clone();
    s.bus().subscribe(EventKind::Tick, move |event| {
        sink.lock().unwrap().push(format!("tick:{}", event.payload["tick"]));
        Ok(())
    });
    let sink = seen.clone();
    s.bus().subscribe_all(move |event| {
        if event.kind == EventKind::Tick {
            sink.lock().unwrap().push("wildcard".to_string());
        }
        Ok(())
    });

    s.start().unwrap();
    s.step().await.unwrap();
    s.step().await.unwrap();
    assert_eq!(s.tick_count(), 2);
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["tick:1", "wildcard", "tick:2", "wildcard"]
    );
}

/// Test interrupts from another task: pause first, then stop
#[tokio::test]
async fn test_interrupts_pause_then_stop_run() {
    let mut cfg = config();
    cfg.scheduler.speed_multiplier = 200.0;
    let mut s = TickScheduler::create(
        venture(),
        cfg,
        Arc::new(MemoryStorage::new()),
        Arc::new(ScriptedProvider::new()),
    )
    .unwrap();
    s.spawn(ActorEntity::new(StakeholderKind::Customer, "Shopper"))
        .unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    s.bus().subscribe_all(move |event| {
        if matches!(
            event.kind,
            EventKind::Tick | EventKind::SimulationPaused | EventKind::SimulationStopped
        ) {
            sink.lock().unwrap().push(event.kind);
        }
        Ok(())
    });

    let control = s.control();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(40)).await;
        control.interrupt();
        tokio::time::sleep(Duration::from_millis(40)).await;
        control.interrupt();
    });

    let report = s.run(None).await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Stopped);
    assert_eq!(s.lifecycle(), Lifecycle::Stopped);

    let events = events.lock().unwrap();
    let ticks = events.iter().filter(|k| **k == EventKind::Tick).count() as u64;
    assert_eq!(ticks, s.tick_count());
    let paused_at = events
        .iter()
        .position(|k| *k == EventKind::SimulationPaused)
        .unwrap();
    // no tick runs between the pause and the stop
    assert_eq!(events[paused_at + 1], EventKind::SimulationStopped);
}

//! Offline providers: a seeded mock for demo runs and a scripted one for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use lazy_static::lazy_static;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde_json::json;

use super::{CompletionFuture, CompletionRequest, ReasoningProvider};
use crate::error::{Result, SimError};

lazy_static! {
    static ref PERMITTED_RE: Option<Regex> = Regex::new(r"(?m)^Permitted actions: (.+)$").ok();
    static ref ROSTER_ID_RE: Option<Regex> = Regex::new(r"id=(\S+)").ok();
    static ref SELF_ID_RE: Option<Regex> = Regex::new(r"(?m)^Your id: (\S+)$").ok();
}

fn first_capture<'a>(re: &Option<Regex>, text: &'a str) -> Option<&'a str> {
    re.as_ref()?.captures(text)?.get(1).map(|m| m.as_str())
}

const FALLBACK_ACTIONS: [&str; 4] = ["wait", "observe", "research", "post_review"];

/// Seeded offline provider producing well-formed payloads.
///
/// Recognises the payload a prompt asks for (actor decision, dialogue turn,
/// debate position, debate synthesis or free text) and answers with a plausible random one.
/// Decisions only use actions listed on the prompt's `Permitted actions:` line.
#[derive(Debug)]
pub struct MockProvider {
    rng: Mutex<StdRng>,
}

impl MockProvider {
    /// Create a mock seeded for reproducible runs
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn respond(&self, prompt: &str) -> String {
        let mut rng = self
            .rng
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if prompt.contains("\"action_type\"") {
            let actions: Vec<&str> = first_capture(&PERMITTED_RE, prompt)
                .map(|line| line.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
                .unwrap_or_else(|| FALLBACK_ACTIONS.to_vec());
            let action = actions.choose(&mut *rng).copied().unwrap_or("wait");

            let own_id = first_capture(&SELF_ID_RE, prompt);
            let peers: Vec<&str> = ROSTER_ID_RE
                .as_ref()
                .map(|re| {
                    re.captures_iter(prompt)
                        .filter_map(|c| c.get(1).map(|m| m.as_str()))
                        .filter(|id| Some(*id) != own_id)
                        .collect()
                })
                .unwrap_or_default();
            let peer = peers.choose(&mut *rng).copied();
            let directed = rng.gen_bool(0.5);

            let details = match (action, peer) {
                ("send_message", Some(peer)) => json!({
                    "target_agent_id": peer,
                    "target": peer,
                    "content": "Let's compare notes on this venture.",
                }),
                (_, Some(peer)) if directed => json!({
                    "target": peer,
                    "content": format!("Mock {} directed at a peer.", action),
                }),
                _ => json!({
                    "target": "system",
                    "content": format!("Mock {} executed.", action),
                }),
            };
            return json!({
                "thought_process": "This is a mock thought process.",
                "action_type": action,
                "action_details": details,
            })
            .to_string();
        }

        if prompt.contains("wants_to_continue") {
            return json!({
                "message": "I think we should align our plans.",
                "wants_to_continue": rng.gen_bool(0.6),
            })
            .to_string();
        }

        if prompt.contains("\"key_points\"") {
            return json!({
                "decision": "Proceed, but validate demand before scaling.",
                "key_points": ["Early traction is real", "Costs need watching"],
                "dissenting_views": ["Competition may respond quickly"],
                "confidence": 0.6,
            })
            .to_string();
        }

        if prompt.contains("\"position\"") {
            let position = ["for", "against", "neutral"]
                .choose(&mut *rng)
                .copied()
                .unwrap_or("neutral");
            return json!({
                "position": position,
                "argument": "The market signals point this way.",
                "confidence": (rng.gen_range(0.3..0.95_f64) * 100.0).round() / 100.0,
            })
            .to_string();
        }

        "Recent activity was mixed; the venture is still finding its footing.".to_string()
    }
}

impl ReasoningProvider for MockProvider {
    fn complete(&self, request: CompletionRequest) -> CompletionFuture<'_> {
        let text = self.respond(&request.prompt);
        Box::pin(async move { Ok(text) })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Provider that replays queued responses, for tests.
///
/// When the queue is empty the default text is returned.
#[derive(Debug)]
pub struct ScriptedProvider {
    queue: Mutex<VecDeque<Result<String>>>,
    default_text: Mutex<String>,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    /// Empty script; the default reply is a `wait` decision
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            default_text: Mutex::new(
                json!({"thought_process": "idle", "action_type": "wait", "action_details": {}})
                    .to_string(),
            ),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replace the reply used once the queue is drained
    pub fn with_default(self, text: impl Into<String>) -> Self {
        if let Ok(mut slot) = self.default_text.lock() {
            *slot = text.into();
        }
        self
    }

    /// Queue a successful reply
    pub fn push_text(&self, text: impl Into<String>) {
        if let Ok(mut q) = self.queue.lock() {
            q.push_back(Ok(text.into()));
        }
    }

    /// Queue a failure
    pub fn push_error(&self, err: SimError) {
        if let Ok(mut q) = self.queue.lock() {
            q.push_back(Err(err));
        }
    }

    /// Number of completions requested
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts seen so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn next_reply(&self, prompt: String) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt);
        }
        let queued = self.queue.lock().ok().and_then(|mut q| q.pop_front());
        match queued {
            Some(reply) => reply,
            None => Ok(self
                .default_text
                .lock()
                .map(|t| t.clone())
                .unwrap_or_default()),
        }
    }
}

impl ReasoningProvider for ScriptedProvider {
    fn complete(&self, request: CompletionRequest) -> CompletionFuture<'_> {
        let reply = self.next_reply(request.prompt);
        Box::pin(async move { reply })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

//! Ally conversations and rival debates.
//!
//! Both run against participant views rather than live actors so the
//! scheduler can apply the resulting memories afterwards, one actor at a
//! time. Malformed provider output degrades to neutral text; a provider
//! failure ends a conversation early and yields a neutral debate argument.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actor::extract_json;
use crate::model::{ActorEntity, StakeholderKind};
use crate::reasoning::{CompletionRequest, ReasoningProvider};

/// Default conversation length
pub const MAX_TURNS: usize = 6;

/// Default debate length
pub const DEBATE_ROUNDS: usize = 2;

/// Who takes part in a social event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Actor id
    pub id: String,
    /// Display name
    pub name: String,
    /// Role label
    pub role: String,
    /// Stakeholder kind
    pub kind: StakeholderKind,
}

impl From<&ActorEntity> for Participant {
    fn from(entity: &ActorEntity) -> Self {
        Self {
            id: entity.id.clone(),
            name: entity.name.clone(),
            role: entity.role.clone(),
            kind: entity.kind,
        }
    }
}

/// A memory produced by a social event for one participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialMemory {
    /// Actor the memory belongs to
    pub actor_id: String,
    /// Memory text
    pub content: String,
}

/// One spoken turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    /// Speaker display name
    pub speaker: String,
    /// Speaker id
    pub speaker_id: String,
    /// What was said
    pub message: String,
    /// Zero-based turn number
    pub turn: usize,
    /// Action the speaker intends to take
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// A finished conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Conversation topic
    pub topic: String,
    /// Participant names
    pub participants: Vec<String>,
    /// Turns in order
    pub turns: Vec<Turn>,
    /// Memories to record
    #[serde(skip)]
    pub memories: Vec<SocialMemory>,
}

/// One debate contribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// Speaker display name
    pub agent: String,
    /// Speaker id
    pub agent_id: String,
    /// Zero-based round
    pub round: usize,
    /// for / against / neutral
    pub position: String,
    /// Reasoning
    pub argument: String,
    /// Response to earlier points
    #[serde(default)]
    pub rebuttal: String,
    /// Self-reported confidence
    pub confidence: f64,
}

/// Moderator summary of a debate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    /// Consensus or majority decision
    pub decision: String,
    /// Main points raised
    pub key_points: Vec<String>,
    /// Minority positions
    pub dissenting_views: Vec<String>,
    /// Moderator confidence
    pub confidence: f64,
}

impl Synthesis {
    /// Used when the moderator output cannot be parsed
    pub fn no_consensus() -> Self {
        Self {
            decision: "No consensus".to_string(),
            key_points: Vec::new(),
            dissenting_views: Vec::new(),
            confidence: 0.0,
        }
    }
}

/// A finished debate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateOutcome {
    /// Debate topic
    pub topic: String,
    /// Arguments in order
    pub arguments: Vec<Argument>,
    /// Moderator synthesis
    pub synthesis: Synthesis,
    /// Memories to record
    #[serde(skip)]
    pub memories: Vec<SocialMemory>,
}

fn excerpt(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

fn str_field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn conversation_prompt(speaker: &Participant, topic: &str, turns: &[Turn]) -> String {
    let history = if turns.is_empty() {
        "Conversation just started.".to_string()
    } else {
        turns
            .iter()
            .map(|t| format!("{}: {}", t.speaker, t.message))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "You are {} ({}, {}) in a multi-turn conversation.\n\
         Topic: {}\n\
         Conversation so far:\n{}\n\
         Respond naturally in character. Output JSON:\n\
         {{\"message\": \"your response\", \"wants_to_continue\": true/false, \
         \"action\": \"optional action to take based on conversation\"}}",
        speaker.name, speaker.role, speaker.kind, topic, history
    )
}

/// Run a round-robin conversation of at most `max_turns` turns.
///
/// Stops early when a speaker does not want to continue.
pub async fn converse(
    provider: &dyn ReasoningProvider,
    topic: &str,
    participants: &[Participant],
    max_turns: usize,
) -> Transcript {
    let mut transcript = Transcript {
        topic: topic.to_string(),
        participants: participants.iter().map(|p| p.name.clone()).collect(),
        turns: Vec::new(),
        memories: Vec::new(),
    };
    if participants.is_empty() {
        return transcript;
    }

    for turn in 0..max_turns {
        let speaker = &participants[turn % participants.len()];
        let request = CompletionRequest::new(conversation_prompt(speaker, topic, &transcript.turns))
            .with_system(format!("You are {} in a business conversation.", speaker.name));
        let response = match provider.complete(request).await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(speaker = %speaker.id, error = %e, "Conversation cut short");
                break;
            },
        };

        let (message, wants_more, action) = match extract_json(&response) {
            Some(obj @ Value::Object(_)) => (
                str_field(&obj, "message").unwrap_or_default(),
                obj.get("wants_to_continue")
                    .and_then(Value::as_bool)
                    .unwrap_or(true),
                str_field(&obj, "action").filter(|a| !a.is_empty()),
            ),
            _ => (excerpt(&response, 200), true, None),
        };

        transcript.memories.push(SocialMemory {
            actor_id: speaker.id.clone(),
            content: format!("Conversation ({}): said '{}'", topic, excerpt(&message, 80)),
        });
        transcript.turns.push(Turn {
            speaker: speaker.name.clone(),
            speaker_id: speaker.id.clone(),
            message,
            turn,
            action,
        });
        if !wants_more {
            break;
        }
    }
    transcript
}

fn debate_prompt(topic: &str, context: &str, speaker: &Participant, history: &[Argument]) -> String {
    let history = if history.is_empty() {
        "None yet.".to_string()
    } else {
        history
            .iter()
            .map(|h| format!("[{}] {}: {}", h.agent, h.position, h.argument))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "You are participating in a multi-stakeholder debate about: {}\n\
         Context: {}\n\
         Your role: {} ({})\n\
         Previous arguments:\n{}\n\
         Provide your argument as JSON:\n\
         {{\"position\": \"for/against/neutral\", \"argument\": \"your reasoning\", \
         \"rebuttal\": \"response to previous points if any\", \"confidence\": 0.0-1.0}}",
        topic, context, speaker.role, speaker.kind, history
    )
}

fn synthesis_prompt(topic: &str, arguments: &[Argument]) -> String {
    let lines = arguments
        .iter()
        .map(|h| {
            format!(
                "[{}] ({}, confidence={}): {}",
                h.agent, h.position, h.confidence, h.argument
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Synthesize the following debate into a final decision:\n\
         Topic: {}\n\
         Arguments:\n{}\n\
         Provide synthesis as JSON:\n\
         {{\"decision\": \"the consensus or majority decision\", \"key_points\": [\"point1\", \"point2\"], \
         \"dissenting_views\": [\"view1\"], \"confidence\": 0.0-1.0}}",
        topic, lines
    )
}

fn parse_argument(response: &str, speaker: &Participant, round: usize) -> Argument {
    let neutral = |argument: String| Argument {
        agent: speaker.name.clone(),
        agent_id: speaker.id.clone(),
        round,
        position: "neutral".to_string(),
        argument,
        rebuttal: String::new(),
        confidence: 0.5,
    };
    match extract_json(response) {
        Some(obj @ Value::Object(_)) => Argument {
            position: str_field(&obj, "position").unwrap_or_else(|| "neutral".to_string()),
            argument: str_field(&obj, "argument").unwrap_or_default(),
            rebuttal: str_field(&obj, "rebuttal").unwrap_or_default(),
            confidence: obj
                .get("confidence")
                .and_then(Value::as_f64)
                .unwrap_or(0.5)
                .clamp(0.0, 1.0),
            ..neutral(String::new())
        },
        _ => neutral(excerpt(response, 200)),
    }
}

fn parse_synthesis(response: &str) -> Synthesis {
    let Some(obj @ Value::Object(_)) = extract_json(response) else {
        return Synthesis::no_consensus();
    };
    let list = |key: &str| {
        obj.get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect::<Vec<String>>()
            })
            .unwrap_or_default()
    };
    Synthesis {
        decision: str_field(&obj, "decision").unwrap_or_else(|| "No consensus".to_string()),
        key_points: list("key_points"),
        dissenting_views: list("dissenting_views"),
        confidence: obj
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(0.0)
            .clamp(0.0, 1.0),
    }
}

/// Run a multi-round debate followed by a moderator synthesis.
pub async fn debate(
    provider: &dyn ReasoningProvider,
    topic: &str,
    context: &str,
    participants: &[Participant],
    rounds: usize,
) -> DebateOutcome {
    let mut arguments: Vec<Argument> = Vec::new();
    let mut memories = Vec::new();

    for round in 0..rounds {
        for speaker in participants {
            let request = CompletionRequest::new(debate_prompt(topic, context, speaker, &arguments))
                .with_system(format!("You are {}, a {}.", speaker.name, speaker.role));
            let response = match provider.complete(request).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(speaker = %speaker.id, error = %e, "Debate argument unavailable");
                    String::new()
                },
            };
            let argument = parse_argument(&response, speaker, round);
            memories.push(SocialMemory {
                actor_id: speaker.id.clone(),
                content: format!("Debate ({}): {}", topic, excerpt(&argument.argument, 100)),
            });
            arguments.push(argument);
        }
    }

    let synthesis = if arguments.is_empty() {
        Synthesis::no_consensus()
    } else {
        let request = CompletionRequest::new(synthesis_prompt(topic, &arguments))
            .with_system("You are a neutral moderator synthesizing debate results.");
        match provider.complete(request).await {
            Ok(text) => parse_synthesis(&text),
            Err(e) => {
                tracing::warn!(error = %e, "Debate synthesis unavailable");
                Synthesis::no_consensus()
            },
        }
    };

    DebateOutcome {
        topic: topic.to_string(),
        arguments,
        synthesis,
        memories,
    }
}

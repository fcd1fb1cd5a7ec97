//! Prompt templates for actor reasoning.

use serde_json::Value;

use super::memory::MemoryEntry;
use super::runtime::{Goal, InboxMessage};
use super::role::RoleDescriptor;
use crate::model::ActorEntity;
use crate::world::WorldSnapshot;

/// System prompt for decision calls
pub const DECISION_SYSTEM_PROMPT: &str = "You are a role-playing agent in a business simulation.";

/// System prompt for memory compaction and reflection
pub const MEMORY_SYSTEM_PROMPT: &str = "You condense an agent's memories into short factual notes.";

/// Everything a decision prompt is built from.
#[derive(Debug)]
pub struct DecisionContext<'a> {
    /// The deciding actor
    pub entity: &'a ActorEntity,
    /// Its role descriptor
    pub role: &'a RoleDescriptor,
    /// Shared world view
    pub world: &'a WorldSnapshot,
    /// Messages drained this step
    pub messages: &'a [InboxMessage],
    /// Rendered recent memory
    pub memory: String,
    /// Current goals, highest priority first
    pub goals: &'a [Goal],
    /// Current strategy
    pub strategy: &'a str,
    /// Difficulty scalar
    pub difficulty: f64,
    /// Venture description
    pub description: &'a str,
}

/// Build the full decision prompt.
pub fn decision_prompt(ctx: &DecisionContext<'_>) -> String {
    let entity = ctx.entity;
    let world = ctx.world;
    let mut out = String::new();

    out.push_str(&format!(
        "You are an agent in a startup simulation.\n\
         Current Industry: {}\n\
         Current Startup Stage: {}\n\
         Startup Name: {}\n\
         Startup Description: {}\n\
         Current Date: {}\n\n",
        world.industry,
        world.stage,
        world.venture,
        ctx.description,
        world.date()
    ));

    out.push_str(&format!(
        "Your Name: {}\nYour id: {}\nYour Role: {}\nYour Type: {}\n{}\n\n",
        entity.name, entity.id, entity.role, entity.kind, ctx.role.persona
    ));
    out.push_str(&format!(
        "Your Personality Traits:\n{}\n\n",
        pretty(&Value::Object(entity.personality.clone()))
    ));
    out.push_str(&format!("Your Knowledge Base:\n{}\n\n", bullet_list(&entity.knowledge)));
    out.push_str(&format!(
        "Your Core Behavior Rules:\n{}\n\n",
        bullet_list(&entity.behavior_rules)
    ));

    if !ctx.goals.is_empty() {
        out.push_str("YOUR GOALS:\n");
        for goal in ctx.goals {
            out.push_str(&format!(
                "- [{:.0}%] (P{:.1}) {}\n",
                goal.progress * 100.0,
                goal.priority,
                goal.goal
            ));
        }
        out.push('\n');
    }
    if !ctx.strategy.is_empty() {
        out.push_str(&format!("YOUR STRATEGY: {}\n\n", ctx.strategy));
    }
    if let Some(text) = difficulty_text(ctx.difficulty) {
        out.push_str(text);
        out.push_str("\n\n");
    }
    if !world.sentiments.is_empty() {
        out.push_str(sentiment_text(world.sentiment_of(&entity.id)));
        out.push_str("\n\n");
    }

    out.push_str("SITUATION:\n");
    out.push_str(&world.render_context());
    if !ctx.messages.is_empty() {
        out.push_str("Incoming messages:\n");
        for msg in ctx.messages {
            out.push_str(&format!("  From {}: {}\n", msg.sender_name, msg.content));
        }
    }
    out.push('\n');

    out.push_str("RECENT MEMORY:\n");
    if ctx.memory.is_empty() {
        out.push_str("Nothing yet.");
    } else {
        out.push_str(&ctx.memory);
    }
    out.push_str("\n\n");

    out.push_str(&format!(
        "Permitted actions: {}\n\n",
        ctx.role.permitted_actions().join(", ")
    ));
    out.push_str(
        "TASK:\n\
         Based on your role and personality, analyze the situation and decide on your next action.\n\
         You must output a JSON object with the following structure:\n\
         {\n\
         \x20   \"thought_process\": \"Your internal reasoning...\",\n\
         \x20   \"action_type\": \"One of the permitted actions\",\n\
         \x20   \"action_details\": {\n\
         \x20       \"content\": \"The content of your action\",\n\
         \x20       \"target\": \"Target stakeholder id, or 'system'\",\n\
         \x20       \"target_agent_id\": \"Recipient id when action_type is send_message\"\n\
         \x20   },\n\
         \x20   \"new_goal\": \"Optional new goal\",\n\
         \x20   \"goal_priority\": 0.5,\n\
         \x20   \"strategy_update\": \"Optional new strategy\"\n\
         }\n",
    );
    let dominant = entity
        .personality
        .get("dominant_trait")
        .and_then(Value::as_str)
        .unwrap_or("consistent");
    out.push_str(&format!(
        "Ensure your action is consistent with your personality: Be {}.\n",
        dominant
    ));
    out
}

/// Prompt asking the provider to compact a block of memories.
pub fn summarization_prompt(entries: &[MemoryEntry]) -> String {
    let memories = entries
        .iter()
        .map(|m| format!("[{}] {}", m.kind, m.content))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Summarize the following {} agent memories into a concise 2-3 sentence summary \
         that captures the key events and patterns:\n\nMEMORIES:\n{}\n\n\
         Provide only the summary, no additional commentary.",
        entries.len(),
        memories
    )
}

/// Prompt asking the actor to reflect on its recent steps.
pub fn reflection_prompt(entity: &ActorEntity, recent: &str) -> String {
    format!(
        "You are {} ({}). Reflect on your recent experience below in one or two sentences: \
         what is working, what is not, and what you will focus on next.\n\n\
         RECENT MEMORY:\n{}\n\nProvide only the reflection.",
        entity.name, entity.role, recent
    )
}

fn difficulty_text(difficulty: f64) -> Option<&'static str> {
    if difficulty > 2.0 {
        Some(
            "You are a veteran in this market. Think multiple moves ahead, consider game theory, \
             and exploit market inefficiencies.",
        )
    } else if difficulty > 1.5 {
        Some(
            "You are now more experienced and sophisticated. Be more strategic, consider \
             second-order effects, and make nuanced decisions.",
        )
    } else {
        None
    }
}

fn sentiment_text(sentiment: f64) -> &'static str {
    if sentiment > 0.2 {
        "MARKET SENTIMENT: The market feels POSITIVE about this startup (rising confidence)."
    } else if sentiment < -0.2 {
        "MARKET SENTIMENT: The market feels NEGATIVE about this startup (falling confidence)."
    } else {
        "MARKET SENTIMENT: The market sentiment is NEUTRAL/STABLE."
    }
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- none".to_string();
    }
    items
        .iter()
        .map(|i| format!("- {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

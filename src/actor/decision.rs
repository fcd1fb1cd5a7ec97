//! Decision payloads and tolerant extraction from provider output.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

lazy_static! {
    static ref FENCED_JSON: Option<Regex> = Regex::new(r"(?s)```json\s*(.*?)\s*```").ok();
}

/// Action used when no usable decision could be extracted.
pub const FALLBACK_ACTION: &str = "wait";

/// One actor decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Free-text reasoning
    pub thought_process: String,
    /// Chosen action
    pub action_type: String,
    /// Action payload (target, content, parameters)
    pub action_details: Map<String, Value>,
    /// Goal the actor wants to adopt
    pub new_goal: Option<String>,
    /// Priority for `new_goal`
    pub goal_priority: Option<f64>,
    /// Replacement strategy
    pub strategy_update: Option<String>,
}

impl Decision {
    /// The neutral no-op decision substituted for malformed output.
    pub fn fallback() -> Self {
        Self {
            thought_process: "I am confused and will do nothing.".to_string(),
            action_type: FALLBACK_ACTION.to_string(),
            action_details: Map::new(),
            new_goal: None,
            goal_priority: None,
            strategy_update: None,
        }
    }

    /// Parse provider output; `None` when no JSON object can be recovered.
    pub fn parse(text: &str) -> Option<Self> {
        let Value::Object(obj) = extract_json(text)? else {
            return None;
        };
        let text_field = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let action_type = text_field("action_type")
            .map(|a| a.to_lowercase().replace([' ', '-'], "_"))
            .unwrap_or_else(|| FALLBACK_ACTION.to_string());
        let action_details = match obj.get("action_details") {
            Some(Value::Object(details)) => details.clone(),
            Some(Value::String(s)) => {
                let mut details = Map::new();
                details.insert("content".to_string(), Value::String(s.clone()));
                details
            },
            _ => Map::new(),
        };

        Some(Self {
            thought_process: text_field("thought_process").unwrap_or_default(),
            action_type,
            action_details,
            new_goal: text_field("new_goal"),
            goal_priority: obj.get("goal_priority").and_then(Value::as_f64),
            strategy_update: text_field("strategy_update"),
        })
    }

    /// Target of the action, "system" when unspecified
    pub fn target(&self) -> String {
        self.detail_str("target")
            .or_else(|| self.detail_str("target_agent_id"))
            .unwrap_or("system")
            .to_string()
    }

    /// String field of the action payload
    pub fn detail_str(&self, key: &str) -> Option<&str> {
        self.action_details
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

/// Recover a JSON value from free text.
///
/// Tries, in order: the whole text, a ```json fenced block, and the span from
/// the first `{` to the last `}`.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return Some(value);
    }

    if let Some(block) = FENCED_JSON
        .as_ref()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
    {
        if let Ok(value) = serde_json::from_str(block.as_str()) {
            return Some(value);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let d = Decision::parse(
            r#"{"thought_process": "good deal", "action_type": "buy", "action_details": {"target": "startup", "content": "Bought it"}}"#,
        )
        .unwrap();
        assert_eq!(d.action_type, "buy");
        assert_eq!(d.target(), "startup");
        assert_eq!(d.thought_process, "good deal");
    }

    #[test]
    fn test_parse_fenced_and_embedded() {
        let fenced = "Sure!\n```json\n{\"action_type\": \"invest\"}\n```\nThanks";
        assert_eq!(Decision::parse(fenced).unwrap().action_type, "invest");

        let embedded = "I will act now: {\"action_type\": \"Post Review\"} done.";
        assert_eq!(Decision::parse(embedded).unwrap().action_type, "post_review");
    }

    #[test]
    fn test_malformed_yields_none() {
        assert!(Decision::parse("no json here").is_none());
        assert!(Decision::parse("{ broken").is_none());
        assert!(Decision::parse("[1, 2, 3]").is_none());
        assert!(Decision::parse("} backwards {").is_none());
    }

    #[test]
    fn test_defaults_when_fields_missing() {
        let d = Decision::parse(r#"{"thought_process": "hmm"}"#).unwrap();
        assert_eq!(d.action_type, FALLBACK_ACTION);
        assert_eq!(d.target(), "system");
        assert!(d.new_goal.is_none());
    }

    #[test]
    fn test_goal_and_strategy_fields() {
        let d = Decision::parse(
            r#"{"action_type": "research", "new_goal": "Find a partner", "goal_priority": 0.9, "strategy_update": "Go enterprise"}"#,
        )
        .unwrap();
        assert_eq!(d.new_goal.as_deref(), Some("Find a partner"));
        assert_eq!(d.goal_priority, Some(0.9));
        assert_eq!(d.strategy_update.as_deref(), Some("Go enterprise"));
    }

    #[test]
    fn test_fallback_is_wait() {
        let d = Decision::fallback();
        assert_eq!(d.action_type, "wait");
        assert!(d.action_details.is_empty());
    }
}

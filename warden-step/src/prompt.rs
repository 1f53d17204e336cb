//! Prompt assembly: the fixed six-section ordering consumed by the
//! provider loop in [`crate::OrchestratorStep`].

use chrono::{DateTime, Utc};
use serde::Deserialize;
use warden_domain::thread::{Message, MessageRole};
use warden_memory::{ActiveStateItem, RetrievedItem};
use warden_turn::types::{ContentPart, ProviderMessage, Role};

/// A named, reusable document pinned into every step's system context.
#[derive(Debug, Clone)]
pub struct PinnedSkill {
    /// The skill's name, rendered as a heading.
    pub name: String,
    /// The skill's body text.
    pub content: String,
}

/// The conventional shape an [`ActiveStateItem`]'s value carries. Items
/// that don't deserialize into this shape are skipped — a malformed
/// state item degrades the block, it doesn't fail the step.
#[derive(Debug, Deserialize)]
struct StructuredStateItem {
    #[serde(default = "default_item_type")]
    item_type: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    topic: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default = "Utc::now")]
    last_seen: DateTime<Utc>,
    #[serde(default)]
    pinned: bool,
    #[serde(default)]
    conflict: bool,
    #[serde(default)]
    ref_count: u32,
}

fn default_item_type() -> String {
    "action".to_string()
}

fn type_priority(item_type: &str) -> u8 {
    match item_type {
        "decision" => 0,
        "constraint" => 1,
        "action" => 2,
        "risk" => 3,
        "question" => 4,
        _ => 5,
    }
}

/// Render the structured-state-block: pinned-first, then by type priority
/// (decision > constraint > action > risk > question), then confidence
/// descending, then last-seen descending. Returns `None` if no item
/// parses, so the caller can fall back to the long summary.
pub fn render_state_block(items: &[ActiveStateItem]) -> Option<String> {
    let mut parsed: Vec<(&ActiveStateItem, StructuredStateItem)> = items
        .iter()
        .filter_map(|item| {
            serde_json::from_value::<StructuredStateItem>(item.value.clone())
                .ok()
                .map(|parsed| (item, parsed))
        })
        .collect();

    if parsed.is_empty() {
        return None;
    }

    parsed.sort_by(|(_, a), (_, b)| {
        b.pinned
            .cmp(&a.pinned)
            .then_with(|| type_priority(&a.item_type).cmp(&type_priority(&b.item_type)))
            .then_with(|| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| b.last_seen.cmp(&a.last_seen))
    });

    let mut lines = String::new();
    for (item, parsed) in parsed {
        let conflict_marker = if parsed.conflict { " [CONFLICT]" } else { "" };
        lines.push_str(&format!(
            "- [{}] {} ({}, refs={}){}: {}\n",
            parsed.item_type, parsed.topic, parsed.status, parsed.ref_count, conflict_marker, item.key
        ));
    }
    Some(lines)
}

/// Render top-k retrieval results as a labeled block.
pub fn render_retrieval(items: &[RetrievedItem]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let mut out = String::new();
    for item in items {
        out.push_str(&format!("- ({:.3}, {}): {}\n", item.score, item.provenance, item.text));
    }
    out
}

/// Build the synthetic context message carrying sections 3-5 (short
/// summary, structured state block or long summary fallback, and
/// retrieval). This is injected as a `Role::System` turn ahead of the
/// real conversation tail — the agent's own system prompt (sections 1-2)
/// stays in `ProviderRequest::system` where it belongs.
pub fn build_context_message(
    short_summary: &str,
    state_block: Option<&str>,
    long_summary: &str,
    retrieval: &str,
) -> ProviderMessage {
    let mut text = String::new();
    text.push_str("## Thread summary\n");
    text.push_str(if short_summary.is_empty() { "(none yet)" } else { short_summary });
    text.push_str("\n\n## Active state\n");
    match state_block {
        Some(block) if !block.is_empty() => text.push_str(block),
        _ if !long_summary.is_empty() => text.push_str(long_summary),
        _ => text.push_str("(none)"),
    }
    if !retrieval.is_empty() {
        text.push_str("\n\n## Retrieved context\n");
        text.push_str(retrieval);
    }

    ProviderMessage {
        role: Role::System,
        content: vec![ContentPart::Text { text }],
    }
}

/// Build the system prompt from agent identity + persona + pinned
/// skills, concatenated in that order (section 1 then section 2).
pub fn build_system_prompt(identity: &str, persona: &str, skills: &[PinnedSkill]) -> String {
    let mut system = format!("{identity}\n\n{persona}");
    for skill in skills {
        system.push_str(&format!("\n\n## {}\n{}", skill.name, skill.content));
    }
    system
}

/// Convert a persisted domain [`Message`] into a provider message for
/// the recent-tail section. Tool-role messages have no direct
/// `ProviderMessage` role counterpart; they're folded into a `User` turn
/// prefixed so the model can still tell it apart from human input.
pub fn message_to_provider(message: &Message) -> ProviderMessage {
    match message.role {
        MessageRole::User => ProviderMessage {
            role: Role::User,
            content: vec![ContentPart::Text { text: message.content.clone() }],
        },
        MessageRole::Assistant => ProviderMessage {
            role: Role::Assistant,
            content: vec![ContentPart::Text { text: message.content.clone() }],
        },
        MessageRole::Tool => ProviderMessage {
            role: Role::User,
            content: vec![ContentPart::Text {
                text: format!("[tool result]\n{}", message.content),
            }],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(key: &str, value: serde_json::Value) -> ActiveStateItem {
        ActiveStateItem { key: key.to_string(), value }
    }

    #[test]
    fn state_block_sorts_pinned_and_priority() {
        let items = vec![
            item("a", serde_json::json!({"item_type": "question", "pinned": false})),
            item("b", serde_json::json!({"item_type": "decision", "pinned": false})),
            item("c", serde_json::json!({"item_type": "action", "pinned": true})),
        ];
        let rendered = render_state_block(&items).unwrap();
        let lines: Vec<&str> = rendered.lines().collect();
        assert!(lines[0].contains("[action]"));
        assert!(lines[1].contains("[decision]"));
        assert!(lines[2].contains("[question]"));
    }

    #[test]
    fn state_block_marks_conflicts() {
        let items = vec![item("a", serde_json::json!({"item_type": "risk", "conflict": true}))];
        let rendered = render_state_block(&items).unwrap();
        assert!(rendered.contains("[CONFLICT]"));
    }

    #[test]
    fn empty_items_yield_none() {
        assert!(render_state_block(&[]).is_none());
    }

    #[test]
    fn malformed_items_are_skipped_not_fatal() {
        let items = vec![item("a", serde_json::json!("not an object"))];
        assert!(render_state_block(&items).is_none());
    }

    #[test]
    fn context_message_falls_back_to_long_summary() {
        let msg = build_context_message("short", None, "long summary text", "");
        let ContentPart::Text { text } = &msg.content[0] else { panic!() };
        assert!(text.contains("long summary text"));
    }
}

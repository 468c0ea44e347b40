//! Chat lines and message cleanup.

use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::SocialError;

/// Longest message body kept, in bytes.
pub const MAX_MESSAGE_BYTES: usize = 180;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatChannel {
    Say,
    World,
    Whisper,
}

/// One `CHAT_MESSAGE` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatLine {
    pub channel: ChatChannel,
    pub from: String,
    /// Display name of the sender's world.
    pub world: String,
    pub message: String,
    /// RFC 3339 UTC timestamp, second precision.
    pub ts: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl ChatLine {
    /// Builds a line stamped with the current time.
    pub fn new(channel: ChatChannel, from: &str, world: &str, message: String) -> Self {
        Self {
            channel,
            from: from.to_string(),
            world: world.to_string(),
            message,
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            to: None,
        }
    }

    pub fn to(mut self, target: &str) -> Self {
        self.to = Some(target.to_string());
        self
    }
}

/// Trims `raw` and caps it at [`MAX_MESSAGE_BYTES`] without splitting a
/// character.
pub fn sanitize_message(raw: &str) -> Result<String, SocialError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SocialError::EmptyMessage);
    }
    let mut end = trimmed.len().min(MAX_MESSAGE_BYTES);
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    Ok(trimmed[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_message_trims() {
        assert_eq!(sanitize_message("  hello  ").unwrap(), "hello");
    }

    #[test]
    fn test_sanitize_message_blank_rejected() {
        assert_eq!(sanitize_message(" \t\n").unwrap_err(), SocialError::EmptyMessage);
    }

    #[test]
    fn test_sanitize_message_caps_length() {
        let long = "a".repeat(500);
        assert_eq!(sanitize_message(&long).unwrap().len(), MAX_MESSAGE_BYTES);
    }

    #[test]
    fn test_sanitize_message_respects_char_boundary() {
        // 179 ASCII bytes then a 2-byte char straddling the cap.
        let msg = format!("{}é tail", "a".repeat(179));
        let out = sanitize_message(&msg).unwrap();
        assert_eq!(out.len(), 179);
        assert!(out.chars().all(|c| c == 'a'));
    }

    #[test]
    fn test_chat_line_serializes_wire_shape() {
        let line = ChatLine::new(ChatChannel::Whisper, "Ayla", "Known World", "psst".into()).to("Bran");
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["channel"], "whisper");
        assert_eq!(json["to"], "Bran");
        assert!(json["ts"].as_str().unwrap().ends_with('Z'));

        let say = ChatLine::new(ChatChannel::Say, "Ayla", "Known World", "hi".into());
        assert!(serde_json::to_value(&say).unwrap().get("to").is_none());
    }
}

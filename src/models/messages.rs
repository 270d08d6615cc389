use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Current version of the full-text replace message
pub const PROTOCOL_VERSION: u8 = 1;

fn default_version() -> u8 {
    PROTOCOL_VERSION
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceMessage {
    pub code: String,
    #[serde(default = "default_version")]
    pub v: u8,
}

/// Untagged `{"code": ...}` frame sent by older browser clients
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct LegacyReplaceMessage {
    code: String,
    #[serde(default = "default_version")]
    v: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "replace")]
    Replace(ReplaceMessage),
    #[serde(rename = "ping")]
    Ping,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WireMessage {
    Tagged(ReceivedMessage),
    Legacy(LegacyReplaceMessage),
}

impl ReceivedMessage {
    /// Decode one inbound text frame
    pub fn parse(payload: &str) -> Result<Self, String> {
        let message = match serde_json::from_str::<WireMessage>(payload) {
            Ok(WireMessage::Tagged(message)) => message,
            Ok(WireMessage::Legacy(legacy)) => ReceivedMessage::Replace(ReplaceMessage {
                code: legacy.code,
                v: legacy.v,
            }),
            Err(_) => return Err("expected a replace or ping message".to_string()),
        };

        if let ReceivedMessage::Replace(replace) = &message {
            if replace.v != PROTOCOL_VERSION {
                return Err(format!("unsupported protocol version {}", replace.v));
            }
        }
        Ok(message)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CodeMessage {
    pub code: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub error: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PongMessage {
    pub date: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "snapshot")]
    Snapshot(CodeMessage),
    #[serde(rename = "update")]
    Update(CodeMessage),
    #[serde(rename = "error")]
    Error(ErrorMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
}

impl SendMessage {
    pub fn snapshot(code: String) -> Self {
        SendMessage::Snapshot(CodeMessage { code })
    }

    pub fn update(code: String) -> Self {
        SendMessage::Update(CodeMessage { code })
    }

    pub fn error(error: String) -> Self {
        SendMessage::Error(ErrorMessage { error })
    }

    pub fn pong() -> Self {
        SendMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() })
    }
}

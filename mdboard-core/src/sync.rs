/// Board sync protocol between the host (owner of the files) and an
/// interactive client.
///
/// Every message is a JSON object tagged by `type`:
///   host → client: `refresh { payload }`, `notice { level, message }`
///   client → host: `moveCard`, `openCard`, `editCard`, `createCard`,
///                  `deleteCard`, `reorderColumns`, `deleteColumn`
///
/// The host always answers with a full snapshot, never a diff. Unknown client
/// message types decode to `ClientMessage::Unknown` and are ignored.
use serde::{Deserialize, Serialize};

use crate::types::BoardPayload;

/// Messages sent from host to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostMessage {
    Refresh { payload: BoardPayload },
    Notice { level: NoticeLevel, message: String },
}

impl HostMessage {
    pub fn info(message: impl Into<String>) -> Self {
        HostMessage::Notice {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        HostMessage::Notice {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        HostMessage::Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Messages sent from client to host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    MoveCard {
        id: String,
        status: String,
    },
    OpenCard {
        id: String,
    },
    EditCard {
        id: String,
    },
    /// `title` skips the host's title prompt when present.
    CreateCard {
        #[serde(default)]
        status: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    DeleteCard {
        id: String,
    },
    ReorderColumns {
        columns: Vec<String>,
    },
    DeleteColumn {
        status: String,
    },
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(ProtocolError::Decode)
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(ProtocolError::Encode)
    }

    /// Wire name of the message type, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::MoveCard { .. } => "moveCard",
            ClientMessage::OpenCard { .. } => "openCard",
            ClientMessage::EditCard { .. } => "editCard",
            ClientMessage::CreateCard { .. } => "createCard",
            ClientMessage::DeleteCard { .. } => "deleteCard",
            ClientMessage::ReorderColumns { .. } => "reorderColumns",
            ClientMessage::DeleteColumn { .. } => "deleteColumn",
            ClientMessage::Unknown => "unknown",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("Cannot encode message: {0}")]
    Encode(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_STATUS;

    #[test]
    fn test_decode_client_messages() {
        assert_eq!(
            ClientMessage::decode(r#"{"type":"moveCard","id":"/f/a.md","status":"Done"}"#).unwrap(),
            ClientMessage::MoveCard {
                id: "/f/a.md".to_string(),
                status: "Done".to_string()
            }
        );
        assert_eq!(
            ClientMessage::decode(r#"{"type":"reorderColumns","columns":["A","B"]}"#).unwrap(),
            ClientMessage::ReorderColumns {
                columns: vec!["A".to_string(), "B".to_string()]
            }
        );
        assert_eq!(
            ClientMessage::decode(r#"{"type":"createCard","status":"Doing"}"#).unwrap(),
            ClientMessage::CreateCard {
                status: Some("Doing".to_string()),
                title: None
            }
        );
        assert_eq!(
            ClientMessage::decode(r#"{"type":"createCard"}"#).unwrap(),
            ClientMessage::CreateCard {
                status: None,
                title: None
            }
        );
    }

    #[test]
    fn test_unknown_type_is_ignored_variant() {
        assert_eq!(
            ClientMessage::decode(r#"{"type":"selectTheme","theme":"dark"}"#).unwrap(),
            ClientMessage::Unknown
        );
    }

    #[test]
    fn test_known_type_with_bad_fields_is_rejected() {
        assert!(ClientMessage::decode(r#"{"type":"moveCard","id":"/f/a.md"}"#).is_err());
        assert!(ClientMessage::decode(r#"{"type":"deleteColumn","status":3}"#).is_err());
        assert!(ClientMessage::decode(r#"{"id":"x"}"#).is_err());
        assert!(ClientMessage::decode("not json").is_err());
    }

    #[test]
    fn test_encode_host_messages() {
        let payload = BoardPayload {
            folder_path: "/f".to_string(),
            folder_name: "f".to_string(),
            columns: vec![DEFAULT_STATUS.to_string()],
            cards: vec![],
        };
        let json: serde_json::Value =
            serde_json::from_str(&HostMessage::Refresh { payload }.encode().unwrap()).unwrap();
        assert_eq!(json["type"], "refresh");
        assert_eq!(json["payload"]["folderPath"], "/f");
        assert_eq!(json["payload"]["columns"][0], DEFAULT_STATUS);

        let json: serde_json::Value =
            serde_json::from_str(&HostMessage::warning("Column is not empty").encode().unwrap()).unwrap();
        assert_eq!(json["type"], "notice");
        assert_eq!(json["level"], "warning");
        assert_eq!(json["message"], "Column is not empty");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which side of a message a participant is on.
///
/// A participant holds exactly one delivery record per message; a sender who
/// addresses themselves becomes `Both` rather than getting a second record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Sender,
    Recipient,
    Both,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Sender => "sender",
            Role::Recipient => "recipient",
            Role::Both => "both",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "sender" => Some(Role::Sender),
            "recipient" => Some(Role::Recipient),
            "both" => Some(Role::Both),
            _ => None,
        }
    }

    pub fn is_sender(self) -> bool {
        matches!(self, Role::Sender | Role::Both)
    }

    pub fn is_recipient(self) -> bool {
        matches!(self, Role::Recipient | Role::Both)
    }
}

/// Outcome class of a send call. Partial delivery is still a success; the
/// unresolved addresses ride along in the receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendStatus {
    Sent,
    Partial,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendReceipt {
    pub message_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub status: SendStatus,
    pub recipient_count: usize,
    pub failed_recipients: Vec<String>,
}

/// What a per-user delete ended up removing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Other participants still hold records; only the caller's was removed.
    RecordRemoved,
    /// The caller held the last record, so the message itself is gone.
    MessageFullyDeleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageFilter {
    #[default]
    All,
    Sent,
    Received,
    ReceivedUnread,
    ReceivedRead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// One message as seen by one viewer: the immutable message fields plus the
/// viewer's own delivery state. Another participant's flags are never exposed.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: Uuid,
    pub subject: String,
    pub body: String,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub created_at: DateTime<Utc>,
    pub role: Role,
    pub is_read: bool,
}

//! Message models produced by item sync and consumed by storage

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// Display name (e.g., "John Doe")
    pub name: Option<String>,
    /// Email address (e.g., "john@example.com")
    pub email: String,
}

impl EmailAddress {
    /// Create a new email address with just the email
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    /// Create a new email address with a display name
    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Parse an email address from a string like "\"John Doe\" <john@example.com>"
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        if let Some(angle_start) = s.rfind('<')
            && let Some(angle_end) = s.rfind('>')
            && angle_start < angle_end
        {
            let name = s[..angle_start].trim().trim_matches('"').trim();
            let email = s[angle_start + 1..angle_end].trim();
            return Self {
                name: if name.is_empty() {
                    None
                } else {
                    Some(name.to_string())
                },
                email: email.to_string(),
            };
        }

        Self {
            name: None,
            email: s.to_string(),
        }
    }

    /// Parse a comma separated address list, honouring quoted display names
    /// that themselves contain commas ("Doe, John" <john@example.com>).
    pub fn parse_list(s: &str) -> Vec<Self> {
        let mut addresses = Vec::new();
        let mut current = String::new();
        let mut in_quotes = false;

        for c in s.chars() {
            match c {
                '"' => {
                    in_quotes = !in_quotes;
                    current.push(c);
                }
                ',' | ';' if !in_quotes => {
                    if !current.trim().is_empty() {
                        addresses.push(Self::parse(&current));
                    }
                    current.clear();
                }
                _ => current.push(c),
            }
        }
        if !current.trim().is_empty() {
            addresses.push(Self::parse(&current));
        }
        addresses
    }

    /// Format the email address for display
    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

/// Message flags the backend understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    Seen,
    Flagged,
    Answered,
    Forwarded,
    /// Deletion is a distinct protocol operation, never a stored bit
    Deleted,
}

impl Flag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::Seen => "seen",
            Flag::Flagged => "flagged",
            Flag::Answered => "answered",
            Flag::Forwarded => "forwarded",
            Flag::Deleted => "deleted",
        }
    }
}

/// Persisted flag state of a message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageFlags {
    pub seen: bool,
    pub flagged: bool,
    pub answered: bool,
    pub forwarded: bool,
}

impl MessageFlags {
    pub fn contains(&self, flag: Flag) -> bool {
        match flag {
            Flag::Seen => self.seen,
            Flag::Flagged => self.flagged,
            Flag::Answered => self.answered,
            Flag::Forwarded => self.forwarded,
            Flag::Deleted => false,
        }
    }

    /// Returns false when the flag cannot be stored (DELETED)
    pub fn set(&mut self, flag: Flag, state: bool) -> bool {
        match flag {
            Flag::Seen => self.seen = state,
            Flag::Flagged => self.flagged = state,
            Flag::Answered => self.answered = state,
            Flag::Forwarded => self.forwarded = state,
            Flag::Deleted => return false,
        }
        true
    }
}

/// How much of a message body has been retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    /// Body was truncated by the server
    Partial,
    Complete,
}

impl DownloadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadState::Partial => "partial",
            DownloadState::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "partial" => Some(DownloadState::Partial),
            "complete" => Some(DownloadState::Complete),
            _ => None,
        }
    }
}

/// A message as delivered by an Add command or a Fetch response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncedMessage {
    /// Server-assigned id, unique within its folder
    pub server_id: String,
    pub subject: Option<String>,
    pub from: Vec<EmailAddress>,
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub reply_to: Vec<EmailAddress>,
    pub date_received: Option<DateTime<Utc>>,
    /// IPM.Note, IPM.Schedule.Meeting.Request, ...
    pub message_class: Option<String>,
    pub thread_topic: Option<String>,
    pub flags: MessageFlags,
    /// Raw RFC 822 content, possibly truncated
    pub mime: Option<Vec<u8>>,
    /// True when the server cut the body short
    pub truncated: bool,
}

impl SyncedMessage {
    pub fn new(server_id: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            ..Default::default()
        }
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn from(mut self, from: EmailAddress) -> Self {
        self.from = vec![from];
        self
    }

    pub fn date_received(mut self, date: DateTime<Utc>) -> Self {
        self.date_received = Some(date);
        self
    }

    pub fn flags(mut self, flags: MessageFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn mime(mut self, mime: impl Into<Vec<u8>>, truncated: bool) -> Self {
        self.mime = Some(mime.into());
        self.truncated = truncated;
        self
    }

    pub fn download_state(&self) -> DownloadState {
        if self.truncated {
            DownloadState::Partial
        } else {
            DownloadState::Complete
        }
    }
}

/// A message read back from storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    pub folder_server_id: String,
    pub message: SyncedMessage,
    pub download_state: DownloadState,
}

/// An outbound RFC 822 message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Message-ID header value, used for logging only
    pub message_id: Option<String>,
    pub mime: Vec<u8>,
}

impl OutgoingMessage {
    pub fn new(mime: impl Into<Vec<u8>>) -> Self {
        let mime = mime.into();
        let message_id = find_header(&mime, "message-id");
        Self { message_id, mime }
    }
}

/// Value of the first header with the given (lowercase) name
fn find_header(mime: &[u8], name: &str) -> Option<String> {
    let text = String::from_utf8_lossy(mime);
    for line in text.lines() {
        if line.is_empty() {
            break;
        }
        if let Some((key, value)) = line.split_once(':')
            && key.trim().eq_ignore_ascii_case(name)
        {
            return Some(value.trim().to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quoted_name() {
        let addr = EmailAddress::parse("\"Jane Smith\" <jane@example.com>");
        assert_eq!(addr.name.as_deref(), Some("Jane Smith"));
        assert_eq!(addr.email, "jane@example.com");
    }

    #[test]
    fn test_parse_list_with_comma_in_name() {
        let list = EmailAddress::parse_list("\"Doe, John\" <john@example.com>, bob@example.com");
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name.as_deref(), Some("Doe, John"));
        assert_eq!(list[0].email, "john@example.com");
        assert_eq!(list[1], EmailAddress::new("bob@example.com"));
    }

    #[test]
    fn test_parse_list_empty() {
        assert!(EmailAddress::parse_list("").is_empty());
        assert!(EmailAddress::parse_list(" , ").is_empty());
    }

    #[test]
    fn test_flags_reject_deleted() {
        let mut flags = MessageFlags::default();
        assert!(flags.set(Flag::Seen, true));
        assert!(flags.contains(Flag::Seen));
        assert!(!flags.set(Flag::Deleted, true));
        assert!(!flags.contains(Flag::Deleted));
    }

    #[test]
    fn test_download_state_follows_truncation() {
        let partial = SyncedMessage::new("1:1").mime(b"Subject: hi\r\n".to_vec(), true);
        assert_eq!(partial.download_state(), DownloadState::Partial);
        let complete = SyncedMessage::new("1:2").mime(b"Subject: hi\r\n\r\nbody".to_vec(), false);
        assert_eq!(complete.download_state(), DownloadState::Complete);
    }

    #[test]
    fn test_outgoing_message_id() {
        let msg = OutgoingMessage::new(
            b"From: a@example.com\r\nMessage-ID: <abc@example.com>\r\n\r\nMessage-ID: body".to_vec(),
        );
        assert_eq!(msg.message_id.as_deref(), Some("<abc@example.com>"));

        let msg = OutgoingMessage::new(b"From: a@example.com\r\n\r\nhello".to_vec());
        assert_eq!(msg.message_id, None);
    }
}

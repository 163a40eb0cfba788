//! Folder records and the remote type to role mapping

use serde::{Deserialize, Serialize};

/// FolderHierarchy type codes sent by the server
pub mod folder_type {
    pub const USER_GENERIC: u32 = 1;
    pub const INBOX: u32 = 2;
    pub const DRAFTS: u32 = 3;
    pub const DELETED: u32 = 4;
    pub const SENT: u32 = 5;
    pub const OUTBOX: u32 = 6;
    pub const TASKS: u32 = 7;
    pub const CALENDAR: u32 = 8;
    pub const CONTACTS: u32 = 9;
    pub const NOTES: u32 = 10;
    pub const JOURNAL: u32 = 11;
    pub const USER_MAIL: u32 = 12;
    pub const USER_CALENDAR: u32 = 13;
    pub const USER_CONTACTS: u32 = 14;
    pub const USER_TASKS: u32 = 15;
    pub const USER_JOURNAL: u32 = 16;
    pub const USER_NOTES: u32 = 17;
    pub const UNKNOWN: u32 = 18;
    pub const RECIPIENT_INFO_CACHE: u32 = 19;
}

/// Canonical role of a locally stored folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FolderRole {
    Regular,
    Inbox,
    Drafts,
    Outbox,
    Sent,
    Trash,
}

impl FolderRole {
    /// Map a FolderHierarchy type code to a role.
    ///
    /// Returns `None` for every type that is not a mail folder (calendars,
    /// contacts, tasks, notes, journals, caches and codes this client does
    /// not know). Such folders are never stored.
    pub fn from_type_code(code: u32) -> Option<Self> {
        match code {
            folder_type::USER_GENERIC | folder_type::USER_MAIL => Some(FolderRole::Regular),
            folder_type::INBOX => Some(FolderRole::Inbox),
            folder_type::DRAFTS => Some(FolderRole::Drafts),
            folder_type::DELETED => Some(FolderRole::Trash),
            folder_type::SENT => Some(FolderRole::Sent),
            folder_type::OUTBOX => Some(FolderRole::Outbox),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FolderRole::Regular => "regular",
            FolderRole::Inbox => "inbox",
            FolderRole::Drafts => "drafts",
            FolderRole::Outbox => "outbox",
            FolderRole::Sent => "sent",
            FolderRole::Trash => "trash",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "regular" => Some(FolderRole::Regular),
            "inbox" => Some(FolderRole::Inbox),
            "drafts" => Some(FolderRole::Drafts),
            "outbox" => Some(FolderRole::Outbox),
            "sent" => Some(FolderRole::Sent),
            "trash" => Some(FolderRole::Trash),
            _ => None,
        }
    }
}

/// A folder as known to local storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRecord {
    /// Stable remote identity
    pub server_id: String,
    pub display_name: String,
    pub role: FolderRole,
    /// None for top-level folders
    pub parent_server_id: Option<String>,
}

impl FolderRecord {
    pub fn new(server_id: impl Into<String>, display_name: impl Into<String>, role: FolderRole) -> Self {
        Self {
            server_id: server_id.into(),
            display_name: display_name.into(),
            role,
            parent_server_id: None,
        }
    }

    /// Set the parent, treating the server's root marker "0" as no parent
    pub fn with_parent(mut self, parent: Option<String>) -> Self {
        self.parent_server_id = parent.filter(|p| !p.is_empty() && p != "0");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mail_types_map_to_roles() {
        assert_eq!(FolderRole::from_type_code(1), Some(FolderRole::Regular));
        assert_eq!(FolderRole::from_type_code(2), Some(FolderRole::Inbox));
        assert_eq!(FolderRole::from_type_code(3), Some(FolderRole::Drafts));
        assert_eq!(FolderRole::from_type_code(4), Some(FolderRole::Trash));
        assert_eq!(FolderRole::from_type_code(5), Some(FolderRole::Sent));
        assert_eq!(FolderRole::from_type_code(6), Some(FolderRole::Outbox));
        assert_eq!(FolderRole::from_type_code(12), Some(FolderRole::Regular));
    }

    #[test]
    fn test_non_mail_types_are_unmapped() {
        for code in [0, 7, 8, 9, 10, 11, 13, 14, 15, 16, 17, 18, 19, 99] {
            assert_eq!(FolderRole::from_type_code(code), None, "type {}", code);
        }
    }

    #[test]
    fn test_role_string_roundtrip() {
        for role in [
            FolderRole::Regular,
            FolderRole::Inbox,
            FolderRole::Drafts,
            FolderRole::Outbox,
            FolderRole::Sent,
            FolderRole::Trash,
        ] {
            assert_eq!(FolderRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(FolderRole::parse("calendar"), None);
    }

    #[test]
    fn test_root_parent_is_dropped() {
        let folder = FolderRecord::new("5", "Projects", FolderRole::Regular).with_parent(Some("0".into()));
        assert_eq!(folder.parent_server_id, None);

        let nested = FolderRecord::new("6", "Q3", FolderRole::Regular).with_parent(Some("5".into()));
        assert_eq!(nested.parent_server_id.as_deref(), Some("5"));
    }
}

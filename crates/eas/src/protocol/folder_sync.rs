//! FolderSync request and response

use super::ParseError;
use super::status::OperationStatus;
use super::tags::folder_hierarchy as fh;
use super::transport::NetworkErrorKind;
use super::wbxml::Element;

const STATUS_OK: u32 = 1;
const STATUS_SERVER_ERROR: u32 = 6;
const STATUS_TIMEOUT: u32 = 8;
const STATUS_INVALID_SYNC_KEY: u32 = 9;

/// One change to the remote folder hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderDelta {
    Add {
        server_id: String,
        parent_id: Option<String>,
        display_name: String,
        type_code: Option<u32>,
    },
    Change {
        server_id: String,
        parent_id: Option<String>,
        display_name: String,
        type_code: Option<u32>,
    },
    Remove {
        server_id: String,
    },
}

impl FolderDelta {
    pub fn server_id(&self) -> &str {
        match self {
            FolderDelta::Add { server_id, .. }
            | FolderDelta::Change { server_id, .. }
            | FolderDelta::Remove { server_id } => server_id,
        }
    }
}

/// Deltas from one or more rounds of a folder sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderDeltaBatch {
    /// Server restarted the hierarchy; the deltas name every folder
    pub reset: bool,
    pub deltas: Vec<FolderDelta>,
}

impl FolderDeltaBatch {
    pub fn extend(&mut self, other: FolderDeltaBatch) {
        self.reset |= other.reset;
        self.deltas.extend(other.deltas);
    }
}

/// Parsed FolderSync response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderSyncResponse {
    pub status: u32,
    pub sync_key: Option<String>,
    pub deltas: Vec<FolderDelta>,
}

pub fn build_request(sync_key: &str) -> Element {
    Element::new(fh::FOLDER_SYNC).text_child(fh::SYNC_KEY, sync_key)
}

pub fn parse_response(root: &Element) -> Result<FolderSyncResponse, ParseError> {
    if root.tag != fh::FOLDER_SYNC {
        return Err(ParseError::new(format!("expected FolderSync, got {:?}", root.tag)));
    }
    let status = root
        .child_u32(fh::STATUS)
        .ok_or_else(|| ParseError::new("FolderSync without Status"))?;

    let mut deltas = Vec::new();
    if let Some(changes) = root.find(fh::CHANGES) {
        for change in &changes.children {
            match change.tag {
                fh::ADD => {
                    let (server_id, parent_id, display_name, type_code) = folder_fields(change)?;
                    deltas.push(FolderDelta::Add {
                        server_id,
                        parent_id,
                        display_name,
                        type_code,
                    });
                }
                fh::UPDATE => {
                    let (server_id, parent_id, display_name, type_code) = folder_fields(change)?;
                    deltas.push(FolderDelta::Change {
                        server_id,
                        parent_id,
                        display_name,
                        type_code,
                    });
                }
                fh::DELETE => {
                    let server_id = required_server_id(change)?;
                    deltas.push(FolderDelta::Remove { server_id });
                }
                // Count and anything newer than we understand
                _ => {}
            }
        }
    }

    Ok(FolderSyncResponse {
        status,
        sync_key: root.child_text(fh::SYNC_KEY).map(str::to_string),
        deltas,
    })
}

fn required_server_id(element: &Element) -> Result<String, ParseError> {
    element
        .child_text(fh::SERVER_ID)
        .map(str::to_string)
        .ok_or_else(|| ParseError::new("folder change without ServerId"))
}

fn folder_fields(element: &Element) -> Result<(String, Option<String>, String, Option<u32>), ParseError> {
    Ok((
        required_server_id(element)?,
        element.child_text(fh::PARENT_ID).map(str::to_string),
        element.child_text(fh::DISPLAY_NAME).unwrap_or_default().to_string(),
        element.child_u32(fh::TYPE),
    ))
}

pub fn classify(status: u32) -> OperationStatus {
    match status {
        STATUS_OK => OperationStatus::Ok,
        STATUS_INVALID_SYNC_KEY => OperationStatus::KeyInvalid,
        STATUS_SERVER_ERROR | STATUS_TIMEOUT => {
            OperationStatus::NetworkError(NetworkErrorKind::ServerUnavailable)
        }
        other => OperationStatus::from_command_status(other),
    }
}

/// Build a FolderSync response document. Used by tests and scripted
/// servers.
pub fn response_document(status: u32, sync_key: Option<&str>, deltas: &[FolderDelta]) -> Element {
    let mut root = Element::new(fh::FOLDER_SYNC).text_child(fh::STATUS, status.to_string());
    if let Some(key) = sync_key {
        root = root.text_child(fh::SYNC_KEY, key);
    }
    if deltas.is_empty() {
        return root;
    }

    let mut changes = Element::new(fh::CHANGES).text_child(fh::COUNT, deltas.len().to_string());
    for delta in deltas {
        let element = match delta {
            FolderDelta::Add {
                server_id,
                parent_id,
                display_name,
                type_code,
            }
            | FolderDelta::Change {
                server_id,
                parent_id,
                display_name,
                type_code,
            } => {
                let tag = if matches!(delta, FolderDelta::Add { .. }) { fh::ADD } else { fh::UPDATE };
                let mut e = Element::new(tag)
                    .text_child(fh::SERVER_ID, server_id.as_str())
                    .text_child(fh::PARENT_ID, parent_id.as_deref().unwrap_or("0"))
                    .text_child(fh::DISPLAY_NAME, display_name.as_str());
                if let Some(code) = type_code {
                    e = e.text_child(fh::TYPE, code.to_string());
                }
                e
            }
            FolderDelta::Remove { server_id } => {
                Element::new(fh::DELETE).text_child(fh::SERVER_ID, server_id.as_str())
            }
        };
        changes.push(element);
    }
    root.child(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wbxml;

    fn add(id: &str, name: &str, type_code: u32) -> FolderDelta {
        FolderDelta::Add {
            server_id: id.into(),
            parent_id: None,
            display_name: name.into(),
            type_code: Some(type_code),
        }
    }

    #[test]
    fn test_parse_changes_in_order() {
        let deltas = vec![
            add("1", "Inbox", 2),
            FolderDelta::Change {
                server_id: "1".into(),
                parent_id: Some("0".into()),
                display_name: "Posteingang".into(),
                type_code: Some(2),
            },
            FolderDelta::Remove {
                server_id: "7".into(),
            },
        ];
        let doc = response_document(1, Some("k2"), &deltas);
        let parsed = parse_response(&wbxml::decode(&wbxml::encode(&doc)).unwrap()).unwrap();

        assert_eq!(parsed.status, 1);
        assert_eq!(parsed.sync_key.as_deref(), Some("k2"));
        assert_eq!(parsed.deltas.len(), 3);
        assert_eq!(parsed.deltas[0].server_id(), "1");
        assert!(matches!(&parsed.deltas[1], FolderDelta::Change { display_name, .. } if display_name == "Posteingang"));
        assert!(matches!(&parsed.deltas[2], FolderDelta::Remove { server_id } if server_id == "7"));
    }

    #[test]
    fn test_missing_status_is_malformed() {
        let doc = Element::new(fh::FOLDER_SYNC).text_child(fh::SYNC_KEY, "1");
        assert!(parse_response(&doc).is_err());
    }

    #[test]
    fn test_wrong_root_is_malformed() {
        let doc = Element::new(fh::ADD);
        assert!(parse_response(&doc).is_err());
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(1), OperationStatus::Ok);
        assert_eq!(classify(9), OperationStatus::KeyInvalid);
        assert_eq!(
            classify(6),
            OperationStatus::NetworkError(NetworkErrorKind::ServerUnavailable)
        );
        assert_eq!(classify(131), OperationStatus::Forbidden);
        assert_eq!(classify(12), OperationStatus::ServerError(12));
    }
}

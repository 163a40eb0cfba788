//! MoveItems request and response

use super::ParseError;
use super::tags::moves;
use super::wbxml::Element;
use crate::models::ItemStatus;

pub const STATUS_INVALID_SOURCE: u32 = 1;
pub const STATUS_INVALID_DESTINATION: u32 = 2;
pub const STATUS_SUCCESS: u32 = 3;
pub const STATUS_SAME_FOLDER: u32 = 4;
pub const STATUS_FAILURE: u32 = 5;
pub const STATUS_ALREADY_EXISTS: u32 = 6;
pub const STATUS_LOCKED: u32 = 7;

/// One message to move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageMove {
    pub src_msg_id: String,
    pub src_folder_id: String,
    pub dst_folder_id: String,
}

/// Server verdict for one move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveResponse {
    pub src_msg_id: String,
    pub status: u32,
    pub dst_msg_id: Option<String>,
}

impl MoveResponse {
    pub fn item_status(&self) -> ItemStatus {
        item_status(self.status)
    }
}

/// Map a MoveItems status to what the caller should do with the message
pub fn item_status(status: u32) -> ItemStatus {
    match status {
        STATUS_SUCCESS | STATUS_SAME_FOLDER | STATUS_ALREADY_EXISTS => ItemStatus::Success,
        STATUS_LOCKED => ItemStatus::Retry,
        // Invalid source or destination, generic failure, unknown codes
        _ => ItemStatus::Revert,
    }
}

pub fn build_request(items: &[MessageMove]) -> Element {
    Element::new(moves::MOVE_ITEMS).with_children(items.iter().map(|item| {
        Element::new(moves::MOVE)
            .text_child(moves::SRC_MSG_ID, item.src_msg_id.as_str())
            .text_child(moves::SRC_FLD_ID, item.src_folder_id.as_str())
            .text_child(moves::DST_FLD_ID, item.dst_folder_id.as_str())
    }))
}

pub fn parse_response(root: &Element) -> Result<Vec<MoveResponse>, ParseError> {
    if root.tag != moves::MOVE_ITEMS {
        return Err(ParseError::new(format!("expected MoveItems, got {:?}", root.tag)));
    }
    root.find_all(moves::RESPONSE)
        .map(|response| {
            let src_msg_id = response
                .child_text(moves::SRC_MSG_ID)
                .ok_or_else(|| ParseError::new("MoveItems response without SrcMsgId"))?;
            let status = response
                .child_u32(moves::STATUS)
                .ok_or_else(|| ParseError::new("MoveItems response without Status"))?;
            Ok(MoveResponse {
                src_msg_id: src_msg_id.to_string(),
                status,
                dst_msg_id: response.child_text(moves::DST_MSG_ID).map(str::to_string),
            })
        })
        .collect()
}

/// Build a MoveItems response document. Used by tests and scripted
/// servers.
pub fn response_document(responses: &[MoveResponse]) -> Element {
    Element::new(moves::MOVE_ITEMS).with_children(responses.iter().map(|r| {
        let mut e = Element::new(moves::RESPONSE)
            .text_child(moves::SRC_MSG_ID, r.src_msg_id.as_str())
            .text_child(moves::STATUS, r.status.to_string());
        if let Some(dst) = &r.dst_msg_id {
            e = e.text_child(moves::DST_MSG_ID, dst.as_str());
        }
        e
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wbxml;

    #[test]
    fn test_status_mapping() {
        assert_eq!(item_status(STATUS_SUCCESS), ItemStatus::Success);
        assert_eq!(item_status(STATUS_SAME_FOLDER), ItemStatus::Success);
        assert_eq!(item_status(STATUS_ALREADY_EXISTS), ItemStatus::Success);
        assert_eq!(item_status(STATUS_LOCKED), ItemStatus::Retry);
        assert_eq!(item_status(STATUS_INVALID_SOURCE), ItemStatus::Revert);
        assert_eq!(item_status(STATUS_INVALID_DESTINATION), ItemStatus::Revert);
        assert_eq!(item_status(STATUS_FAILURE), ItemStatus::Revert);
        assert_eq!(item_status(42), ItemStatus::Revert);
    }

    #[test]
    fn test_request_lists_every_move() {
        let items = vec![
            MessageMove {
                src_msg_id: "5:1".into(),
                src_folder_id: "5".into(),
                dst_folder_id: "9".into(),
            },
            MessageMove {
                src_msg_id: "5:2".into(),
                src_folder_id: "5".into(),
                dst_folder_id: "9".into(),
            },
        ];
        let doc = build_request(&items);
        let requested: Vec<_> = doc.find_all(moves::MOVE).collect();
        assert_eq!(requested.len(), 2);
        assert_eq!(requested[1].child_text(moves::SRC_MSG_ID), Some("5:2"));
        assert_eq!(requested[1].child_text(moves::DST_FLD_ID), Some("9"));
    }

    #[test]
    fn test_parse_response() {
        let doc = response_document(&[
            MoveResponse {
                src_msg_id: "5:1".into(),
                status: 3,
                dst_msg_id: Some("9:1".into()),
            },
            MoveResponse {
                src_msg_id: "5:2".into(),
                status: 7,
                dst_msg_id: None,
            },
        ]);
        let parsed = parse_response(&wbxml::decode(&wbxml::encode(&doc)).unwrap()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].dst_msg_id.as_deref(), Some("9:1"));
        assert_eq!(parsed[1].item_status(), ItemStatus::Retry);
    }
}

//! Sync command for the Email class
//!
//! Builds item sync requests (including Fetch, Delete and flag Change
//! commands) and parses responses into an ordered list of message deltas.

use chrono::{DateTime, NaiveDate, Utc};
use log::warn;

use super::ParseError;
use super::status::OperationStatus;
use super::tags::{airsync, airsync_base, email, email2};
use super::transport::NetworkErrorKind;
use super::wbxml::Element;
use crate::models::{EmailAddress, Flag, MessageFlags, SyncWindow, SyncedMessage};

const STATUS_OK: u32 = 1;
const STATUS_INVALID_SYNC_KEY: u32 = 3;
const STATUS_SERVER_ERROR: u32 = 5;
const STATUS_OBJECT_NOT_FOUND: u32 = 8;
const STATUS_FOLDER_HIERARCHY_CHANGED: u32 = 12;
const STATUS_RETRY: u32 = 16;

/// MIME body type for BodyPreference
const BODY_TYPE_MIME: &str = "4";
/// Always send MIME for every message
const MIME_SUPPORT_ALL: &str = "2";
/// Bytes of MIME requested per message during a normal sync
pub const TRUNCATION_SIZE: u32 = 200_000;

const FLAG_STATUS_ACTIVE: u32 = 2;
const VERB_REPLY_TO_SENDER: u32 = 1;
const VERB_REPLY_TO_ALL: u32 = 2;
const VERB_FORWARD: u32 = 3;

/// Command sent to the server inside a Sync request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemCommand {
    Fetch(String),
    Delete(String),
    ChangeFlag {
        server_id: String,
        flag: Flag,
        state: bool,
    },
}

/// Parameters of one item sync round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSyncRequest {
    pub collection_id: String,
    pub window: SyncWindow,
    pub window_size: u32,
    pub get_changes: bool,
    pub deletes_as_moves: bool,
    /// `None` requests complete bodies
    pub truncation_size: Option<u32>,
    pub commands: Vec<ItemCommand>,
}

impl ItemSyncRequest {
    /// A plain "give me changes" round
    pub fn changes(collection_id: impl Into<String>, window: SyncWindow, window_size: u32) -> Self {
        Self {
            collection_id: collection_id.into(),
            window,
            window_size,
            get_changes: true,
            deletes_as_moves: true,
            truncation_size: Some(TRUNCATION_SIZE),
            commands: Vec::new(),
        }
    }
}

/// One change to the content of a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageDelta {
    Add(SyncedMessage),
    ChangeFlag {
        server_id: String,
        flag: Flag,
        state: bool,
    },
    Delete {
        server_id: String,
    },
}

/// Which client command a per-item status answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Add,
    Change,
    Delete,
    Fetch,
}

/// Per-item status from the Responses block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemResponse {
    pub server_id: String,
    pub kind: ResponseKind,
    pub status: u32,
}

/// Deltas from one or more rounds of an item sync pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDeltaBatch {
    /// Key was restarted; drop every local message of the folder first
    pub reset: bool,
    pub deltas: Vec<MessageDelta>,
    pub responses: Vec<ItemResponse>,
}

impl ItemDeltaBatch {
    pub fn extend(&mut self, other: ItemDeltaBatch) {
        self.reset |= other.reset;
        self.deltas.extend(other.deltas);
        self.responses.extend(other.responses);
    }

    /// Status the server reported for a command on `server_id`
    pub fn response_status(&self, server_id: &str, kind: ResponseKind) -> Option<u32> {
        self.responses
            .iter()
            .rev()
            .find(|r| r.kind == kind && r.server_id == server_id)
            .map(|r| r.status)
    }
}

/// Parsed Sync response for one collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSyncResponse {
    pub status: u32,
    pub sync_key: Option<String>,
    pub more_available: bool,
    pub deltas: Vec<MessageDelta>,
    pub responses: Vec<ItemResponse>,
}

/// Build a Sync request. Initial-key requests carry neither options nor
/// commands; the server refuses them until a real key exists.
pub fn build_request(request: &ItemSyncRequest, sync_key: &str, initial: bool) -> Element {
    let mut collection = Element::new(airsync::COLLECTION)
        .text_child(airsync::SYNC_KEY, sync_key)
        .text_child(airsync::COLLECTION_ID, request.collection_id.as_str());

    if !initial {
        collection = collection
            .text_child(
                airsync::DELETES_AS_MOVES,
                if request.deletes_as_moves { "1" } else { "0" },
            )
            .text_child(airsync::GET_CHANGES, if request.get_changes { "1" } else { "0" })
            .text_child(airsync::WINDOW_SIZE, request.window_size.to_string());

        let mut body_preference = Element::new(airsync_base::BODY_PREFERENCE)
            .text_child(airsync_base::TYPE, BODY_TYPE_MIME);
        if let Some(size) = request.truncation_size {
            body_preference = body_preference.text_child(airsync_base::TRUNCATION_SIZE, size.to_string());
        }
        collection = collection.child(
            Element::new(airsync::OPTIONS)
                .text_child(airsync::FILTER_TYPE, request.window.code().to_string())
                .text_child(airsync::MIME_SUPPORT, MIME_SUPPORT_ALL)
                .child(body_preference),
        );

        if !request.commands.is_empty() {
            let commands = request.commands.iter().map(command_element);
            collection = collection.child(Element::new(airsync::COMMANDS).with_children(commands));
        }
    }

    Element::new(airsync::SYNC).child(Element::new(airsync::COLLECTIONS).child(collection))
}

fn command_element(command: &ItemCommand) -> Element {
    match command {
        ItemCommand::Fetch(server_id) => {
            Element::new(airsync::FETCH).text_child(airsync::SERVER_ID, server_id.as_str())
        }
        ItemCommand::Delete(server_id) => {
            Element::new(airsync::DELETE).text_child(airsync::SERVER_ID, server_id.as_str())
        }
        ItemCommand::ChangeFlag {
            server_id,
            flag,
            state,
        } => Element::new(airsync::CHANGE)
            .text_child(airsync::SERVER_ID, server_id.as_str())
            .child(Element::new(airsync::APPLICATION_DATA).with_children(flag_elements(*flag, *state))),
    }
}

fn flag_elements(flag: Flag, state: bool) -> Option<Element> {
    match flag {
        Flag::Seen => Some(Element::with_text(email::READ, if state { "1" } else { "0" })),
        Flag::Flagged if state => Some(
            Element::new(email::FLAG)
                .text_child(email::FLAG_STATUS, FLAG_STATUS_ACTIVE.to_string())
                .text_child(email::FLAG_TYPE, "for Follow Up"),
        ),
        // An empty Flag element clears it
        Flag::Flagged => Some(Element::new(email::FLAG)),
        Flag::Answered | Flag::Forwarded | Flag::Deleted => None,
    }
}

/// Parse a Sync response, picking the collection with `collection_id`
pub fn parse_response(root: &Element, collection_id: &str) -> Result<ItemSyncResponse, ParseError> {
    if root.tag != airsync::SYNC {
        return Err(ParseError::new(format!("expected Sync, got {:?}", root.tag)));
    }

    let collections: Vec<&Element> = root
        .find(airsync::COLLECTIONS)
        .map(|c| c.find_all(airsync::COLLECTION).collect())
        .unwrap_or_default();
    let collection = collections
        .iter()
        .find(|c| c.child_text(airsync::COLLECTION_ID) == Some(collection_id))
        .or_else(|| collections.first());

    let Some(collection) = collection else {
        // Sync-level status only, e.g. hierarchy changed
        let status = root
            .child_u32(airsync::STATUS)
            .ok_or_else(|| ParseError::new("Sync response without collection or status"))?;
        return Ok(ItemSyncResponse {
            status,
            sync_key: None,
            more_available: false,
            deltas: Vec::new(),
            responses: Vec::new(),
        });
    };

    let status = collection
        .child_u32(airsync::STATUS)
        .ok_or_else(|| ParseError::new("Sync collection without Status"))?;

    let mut deltas = Vec::new();
    if let Some(commands) = collection.find(airsync::COMMANDS) {
        for command in &commands.children {
            match command.tag {
                airsync::ADD => {
                    let server_id = required_server_id(command)?;
                    let data = command.find(airsync::APPLICATION_DATA);
                    deltas.push(MessageDelta::Add(parse_message(server_id, data)?));
                }
                airsync::CHANGE => {
                    let server_id = required_server_id(command)?;
                    if let Some(data) = command.find(airsync::APPLICATION_DATA) {
                        deltas.extend(parse_flag_changes(&server_id, data));
                    }
                }
                airsync::DELETE | airsync::SOFT_DELETE => {
                    let server_id = required_server_id(command)?;
                    deltas.push(MessageDelta::Delete { server_id });
                }
                _ => {}
            }
        }
    }

    let mut responses = Vec::new();
    if let Some(block) = collection.find(airsync::RESPONSES) {
        for response in &block.children {
            let kind = match response.tag {
                airsync::ADD => ResponseKind::Add,
                airsync::CHANGE => ResponseKind::Change,
                airsync::DELETE => ResponseKind::Delete,
                airsync::FETCH => ResponseKind::Fetch,
                _ => continue,
            };
            let Some(server_id) = response.child_text(airsync::SERVER_ID) else {
                continue;
            };
            let item_status = response.child_u32(airsync::STATUS).unwrap_or(STATUS_OK);
            if kind == ResponseKind::Fetch
                && item_status == STATUS_OK
                && let Some(data) = response.find(airsync::APPLICATION_DATA)
            {
                deltas.push(MessageDelta::Add(parse_message(server_id.to_string(), Some(data))?));
            }
            responses.push(ItemResponse {
                server_id: server_id.to_string(),
                kind,
                status: item_status,
            });
        }
    }

    Ok(ItemSyncResponse {
        status,
        sync_key: collection.child_text(airsync::SYNC_KEY).map(str::to_string),
        more_available: collection.has(airsync::MORE_AVAILABLE),
        deltas,
        responses,
    })
}

fn required_server_id(element: &Element) -> Result<String, ParseError> {
    element
        .child_text(airsync::SERVER_ID)
        .map(str::to_string)
        .ok_or_else(|| ParseError::new("Sync command without ServerId"))
}

fn parse_message(server_id: String, data: Option<&Element>) -> Result<SyncedMessage, ParseError> {
    let mut message = SyncedMessage::new(server_id);
    let Some(data) = data else {
        return Ok(message);
    };

    message.subject = data.child_text(email::SUBJECT).map(str::to_string);
    message.from = addresses(data, email::FROM);
    message.to = addresses(data, email::TO);
    message.cc = addresses(data, email::CC);
    message.reply_to = addresses(data, email::REPLY_TO);
    message.message_class = data.child_text(email::MESSAGE_CLASS).map(str::to_string);
    message.thread_topic = data.child_text(email::THREAD_TOPIC).map(str::to_string);
    message.date_received = data.child_text(email::DATE_RECEIVED).and_then(|raw| {
        let parsed = parse_date(raw);
        if parsed.is_none() {
            warn!("Ignoring unparseable DateReceived {:?} on {}", raw, message.server_id);
        }
        parsed
    });

    let mut flags = MessageFlags::default();
    for delta in parse_flag_changes(&message.server_id, data) {
        if let MessageDelta::ChangeFlag { flag, state, .. } = delta {
            flags.set(flag, state);
        }
    }
    message.flags = flags;

    if let Some(body) = data.find(airsync_base::BODY) {
        message.mime = body.find(airsync_base::DATA).and_then(Element::bytes).map(<[u8]>::to_vec);
        message.truncated = body.child_u32(airsync_base::TRUNCATED) == Some(1);
    } else if let Some(mime) = data.find(email::MIME_DATA) {
        // Protocol 2.5 carries MIME directly on the email page
        message.mime = mime.bytes().map(<[u8]>::to_vec);
        message.truncated = data.child_u32(email::MIME_TRUNCATED) == Some(1);
    }

    Ok(message)
}

fn addresses(data: &Element, tag: super::wbxml::Tag) -> Vec<EmailAddress> {
    data.child_text(tag).map(EmailAddress::parse_list).unwrap_or_default()
}

/// Accepts `2024-01-15T10:30:00.000Z`, `2024-01-15T10:30:00Z` and the
/// date-only `2024-01-15` (midnight UTC).
fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Flag deltas carried by ApplicationData. Elements that are absent leave
/// the corresponding flag untouched.
fn parse_flag_changes(server_id: &str, data: &Element) -> Vec<MessageDelta> {
    let mut deltas = Vec::new();
    let mut push = |flag: Flag, state: bool| {
        deltas.push(MessageDelta::ChangeFlag {
            server_id: server_id.to_string(),
            flag,
            state,
        })
    };

    if let Some(read) = data.child_u32(email::READ) {
        push(Flag::Seen, read == 1);
    }
    if let Some(flag) = data.find(email::FLAG) {
        push(Flag::Flagged, flag.child_u32(email::FLAG_STATUS) == Some(FLAG_STATUS_ACTIVE));
    }
    match data.child_u32(email2::LAST_VERB_EXECUTED) {
        Some(VERB_REPLY_TO_SENDER) | Some(VERB_REPLY_TO_ALL) => push(Flag::Answered, true),
        Some(VERB_FORWARD) => push(Flag::Forwarded, true),
        _ => {}
    }
    deltas
}

pub fn classify(status: u32) -> OperationStatus {
    match status {
        STATUS_OK => OperationStatus::Ok,
        STATUS_INVALID_SYNC_KEY => OperationStatus::KeyInvalid,
        STATUS_FOLDER_HIERARCHY_CHANGED | STATUS_OBJECT_NOT_FOUND => OperationStatus::FolderSyncRequired,
        STATUS_SERVER_ERROR | STATUS_RETRY => {
            OperationStatus::NetworkError(NetworkErrorKind::ServerUnavailable)
        }
        other => OperationStatus::from_command_status(other),
    }
}

/// Build a Sync response for one collection. Used by tests and scripted
/// servers.
///
/// An `Add` whose id also has a successful `Fetch` response is emitted
/// inside that response instead of the Commands block.
pub fn response_document(
    collection_id: &str,
    status: u32,
    sync_key: Option<&str>,
    more_available: bool,
    deltas: &[MessageDelta],
    responses: &[ItemResponse],
) -> Element {
    let fetched = |id: &str| {
        responses
            .iter()
            .any(|r| r.kind == ResponseKind::Fetch && r.status == STATUS_OK && r.server_id == id)
    };

    let mut collection = Element::new(airsync::COLLECTION);
    if let Some(key) = sync_key {
        collection = collection.text_child(airsync::SYNC_KEY, key);
    }
    collection = collection
        .text_child(airsync::COLLECTION_ID, collection_id)
        .text_child(airsync::STATUS, status.to_string());
    if more_available {
        collection = collection.child(Element::new(airsync::MORE_AVAILABLE));
    }

    let commands: Vec<Element> = deltas
        .iter()
        .filter_map(|delta| match delta {
            MessageDelta::Add(message) if fetched(&message.server_id) => None,
            MessageDelta::Add(message) => Some(
                Element::new(airsync::ADD)
                    .text_child(airsync::SERVER_ID, message.server_id.as_str())
                    .child(message_data(message)),
            ),
            MessageDelta::ChangeFlag {
                server_id,
                flag,
                state,
            } => Some(
                Element::new(airsync::CHANGE)
                    .text_child(airsync::SERVER_ID, server_id.as_str())
                    .child(Element::new(airsync::APPLICATION_DATA).with_children(flag_elements(*flag, *state))),
            ),
            MessageDelta::Delete { server_id } => {
                Some(Element::new(airsync::DELETE).text_child(airsync::SERVER_ID, server_id.as_str()))
            }
        })
        .collect();
    if !commands.is_empty() {
        collection = collection.child(Element::new(airsync::COMMANDS).with_children(commands));
    }

    if !responses.is_empty() {
        let items = responses.iter().map(|response| {
            let tag = match response.kind {
                ResponseKind::Add => airsync::ADD,
                ResponseKind::Change => airsync::CHANGE,
                ResponseKind::Delete => airsync::DELETE,
                ResponseKind::Fetch => airsync::FETCH,
            };
            let mut item = Element::new(tag)
                .text_child(airsync::SERVER_ID, response.server_id.as_str())
                .text_child(airsync::STATUS, response.status.to_string());
            if response.kind == ResponseKind::Fetch {
                let message = deltas.iter().find_map(|delta| match delta {
                    MessageDelta::Add(message) if message.server_id == response.server_id => Some(message),
                    _ => None,
                });
                if let Some(message) = message {
                    item = item.child(message_data(message));
                }
            }
            item
        });
        collection = collection.child(Element::new(airsync::RESPONSES).with_children(items));
    }

    Element::new(airsync::SYNC).child(Element::new(airsync::COLLECTIONS).child(collection))
}

fn message_data(message: &SyncedMessage) -> Element {
    let join = |addresses: &[EmailAddress]| {
        addresses
            .iter()
            .map(|address| match &address.name {
                Some(name) => format!("\"{}\" <{}>", name, address.email),
                None => address.email.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut data = Element::new(airsync::APPLICATION_DATA);
    if let Some(subject) = &message.subject {
        data = data.text_child(email::SUBJECT, subject.as_str());
    }
    for (tag, addresses) in [
        (email::FROM, &message.from),
        (email::TO, &message.to),
        (email::CC, &message.cc),
        (email::REPLY_TO, &message.reply_to),
    ] {
        if !addresses.is_empty() {
            data = data.text_child(tag, join(addresses.as_slice()));
        }
    }
    if let Some(date) = message.date_received {
        data = data.text_child(
            email::DATE_RECEIVED,
            date.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        );
    }
    if let Some(class) = &message.message_class {
        data = data.text_child(email::MESSAGE_CLASS, class.as_str());
    }
    data = data.text_child(email::READ, if message.flags.seen { "1" } else { "0" });
    if message.flags.flagged {
        data = data.child(
            Element::new(email::FLAG).text_child(email::FLAG_STATUS, FLAG_STATUS_ACTIVE.to_string()),
        );
    }
    if let Some(mime) = &message.mime {
        data = data.child(
            Element::new(airsync_base::BODY)
                .text_child(airsync_base::TYPE, BODY_TYPE_MIME)
                .text_child(airsync_base::TRUNCATED, if message.truncated { "1" } else { "0" })
                .child(Element::with_opaque(airsync_base::DATA, mime.clone())),
        );
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wbxml;

    fn roundtrip(doc: &Element) -> Element {
        wbxml::decode(&wbxml::encode(doc)).unwrap()
    }

    fn collection(status: u32, key: &str) -> Element {
        Element::new(airsync::COLLECTION)
            .text_child(airsync::SYNC_KEY, key)
            .text_child(airsync::COLLECTION_ID, "5")
            .text_child(airsync::STATUS, status.to_string())
    }

    fn wrap(collection: Element) -> Element {
        Element::new(airsync::SYNC).child(Element::new(airsync::COLLECTIONS).child(collection))
    }

    #[test]
    fn test_initial_request_has_no_options() {
        let request = ItemSyncRequest::changes("5", SyncWindow::OneWeek, 10);
        let doc = build_request(&request, "0", true);
        let collection = doc.path(&[airsync::COLLECTIONS, airsync::COLLECTION]).unwrap();
        assert_eq!(collection.child_text(airsync::SYNC_KEY), Some("0"));
        assert!(!collection.has(airsync::OPTIONS));
        assert!(!collection.has(airsync::GET_CHANGES));
    }

    #[test]
    fn test_request_options_and_commands() {
        let mut request = ItemSyncRequest::changes("5", SyncWindow::TwoWeeks, 20);
        request.deletes_as_moves = false;
        request.commands = vec![
            ItemCommand::Delete("5:1".into()),
            ItemCommand::ChangeFlag {
                server_id: "5:2".into(),
                flag: Flag::Flagged,
                state: false,
            },
        ];
        let doc = roundtrip(&build_request(&request, "k1", false));
        let collection = doc.path(&[airsync::COLLECTIONS, airsync::COLLECTION]).unwrap();

        assert_eq!(collection.child_text(airsync::DELETES_AS_MOVES), Some("0"));
        assert_eq!(collection.child_text(airsync::WINDOW_SIZE), Some("20"));
        let options = collection.find(airsync::OPTIONS).unwrap();
        assert_eq!(options.child_text(airsync::FILTER_TYPE), Some("4"));
        assert_eq!(
            options.path(&[airsync_base::BODY_PREFERENCE]).unwrap().child_text(airsync_base::TRUNCATION_SIZE),
            Some("200000")
        );

        let commands = collection.find(airsync::COMMANDS).unwrap();
        assert_eq!(commands.children.len(), 2);
        assert_eq!(commands.children[0].tag, airsync::DELETE);
        let change = &commands.children[1];
        let flag = change.path(&[airsync::APPLICATION_DATA, email::FLAG]).unwrap();
        assert!(flag.children.is_empty());
    }

    #[test]
    fn test_parse_add_with_truncated_body() {
        let add = Element::new(airsync::ADD)
            .text_child(airsync::SERVER_ID, "5:1")
            .child(
                Element::new(airsync::APPLICATION_DATA)
                    .text_child(email::SUBJECT, "Quarterly report")
                    .text_child(email::FROM, "\"Ann Lee\" <ann@example.com>")
                    .text_child(email::TO, "bob@example.com, carol@example.com")
                    .text_child(email::DATE_RECEIVED, "2024-05-01T10:30:00.000Z")
                    .text_child(email::READ, "1")
                    .text_child(email2::LAST_VERB_EXECUTED, "3")
                    .child(
                        Element::new(airsync_base::BODY)
                            .text_child(airsync_base::TYPE, "4")
                            .child(Element::with_opaque(airsync_base::DATA, b"Subject: Quarterly".to_vec()))
                            .text_child(airsync_base::TRUNCATED, "1"),
                    ),
            );
        let doc = wrap(
            collection(1, "k2")
                .child(Element::new(airsync::MORE_AVAILABLE))
                .child(Element::new(airsync::COMMANDS).child(add)),
        );
        let response = parse_response(&roundtrip(&doc), "5").unwrap();

        assert_eq!(response.sync_key.as_deref(), Some("k2"));
        assert!(response.more_available);
        let MessageDelta::Add(message) = &response.deltas[0] else {
            panic!("expected add");
        };
        assert_eq!(message.subject.as_deref(), Some("Quarterly report"));
        assert_eq!(message.from[0].name.as_deref(), Some("Ann Lee"));
        assert_eq!(message.to.len(), 2);
        assert!(message.flags.seen);
        assert!(message.flags.forwarded);
        assert!(!message.flags.flagged);
        assert!(message.truncated);
        assert_eq!(message.mime.as_deref(), Some(&b"Subject: Quarterly"[..]));
        assert_eq!(message.date_received.unwrap().to_rfc3339(), "2024-05-01T10:30:00+00:00");
    }

    #[test]
    fn test_parse_change_and_delete() {
        let commands = Element::new(airsync::COMMANDS)
            .child(
                Element::new(airsync::CHANGE).text_child(airsync::SERVER_ID, "5:1").child(
                    Element::new(airsync::APPLICATION_DATA)
                        .text_child(email::READ, "0")
                        .child(Element::new(email::FLAG).text_child(email::FLAG_STATUS, "2")),
                ),
            )
            .child(Element::new(airsync::SOFT_DELETE).text_child(airsync::SERVER_ID, "5:2"))
            .child(Element::new(airsync::DELETE).text_child(airsync::SERVER_ID, "5:3"));
        let response = parse_response(&roundtrip(&wrap(collection(1, "k3").child(commands))), "5").unwrap();

        assert_eq!(
            response.deltas,
            vec![
                MessageDelta::ChangeFlag {
                    server_id: "5:1".into(),
                    flag: Flag::Seen,
                    state: false
                },
                MessageDelta::ChangeFlag {
                    server_id: "5:1".into(),
                    flag: Flag::Flagged,
                    state: true
                },
                MessageDelta::Delete {
                    server_id: "5:2".into()
                },
                MessageDelta::Delete {
                    server_id: "5:3".into()
                },
            ]
        );
    }

    #[test]
    fn test_parse_fetch_and_delete_responses() {
        let responses = Element::new(airsync::RESPONSES)
            .child(
                Element::new(airsync::FETCH)
                    .text_child(airsync::SERVER_ID, "5:1")
                    .text_child(airsync::STATUS, "1")
                    .child(Element::new(airsync::APPLICATION_DATA).child(
                        Element::new(airsync_base::BODY).child(Element::with_opaque(airsync_base::DATA, b"full".to_vec())),
                    )),
            )
            .child(
                Element::new(airsync::DELETE)
                    .text_child(airsync::SERVER_ID, "5:9")
                    .text_child(airsync::STATUS, "8"),
            );
        let response = parse_response(&roundtrip(&wrap(collection(1, "k4").child(responses))), "5").unwrap();

        assert_eq!(response.deltas.len(), 1);
        let MessageDelta::Add(message) = &response.deltas[0] else {
            panic!("expected fetched message");
        };
        assert!(!message.truncated);
        assert_eq!(response.responses.len(), 2);
        assert_eq!(response.responses[1].kind, ResponseKind::Delete);
        assert_eq!(response.responses[1].status, 8);
    }

    #[test]
    fn test_sync_level_status_without_collection() {
        let doc = Element::new(airsync::SYNC).text_child(airsync::STATUS, "12");
        let response = parse_response(&doc, "5").unwrap();
        assert_eq!(classify(response.status), OperationStatus::FolderSyncRequired);
    }

    #[test]
    fn test_date_received_forms() {
        let add = |id: &str, date: &str| {
            Element::new(airsync::ADD)
                .text_child(airsync::SERVER_ID, id)
                .child(Element::new(airsync::APPLICATION_DATA).text_child(email::DATE_RECEIVED, date))
        };
        let commands = Element::new(airsync::COMMANDS)
            .child(add("5:1", "2024-01-15"))
            .child(add("5:2", "2024-01-15T08:15:00Z"))
            .child(add("5:3", "2024-01-15T08:15:00.250Z"))
            .child(add("5:4", "yesterday"));
        let doc = wrap(collection(1, "k2").child(commands));
        let response = parse_response(&doc, "5").unwrap();

        let dates: Vec<Option<String>> = response
            .deltas
            .iter()
            .map(|delta| match delta {
                MessageDelta::Add(message) => message.date_received.map(|d| d.to_rfc3339()),
                other => panic!("unexpected delta {:?}", other),
            })
            .collect();
        assert_eq!(
            dates,
            vec![
                Some("2024-01-15T00:00:00+00:00".to_string()),
                Some("2024-01-15T08:15:00+00:00".to_string()),
                Some("2024-01-15T08:15:00.250+00:00".to_string()),
                None,
            ]
        );
        assert_eq!(response.sync_key.as_deref(), Some("k2"));
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(1), OperationStatus::Ok);
        assert_eq!(classify(3), OperationStatus::KeyInvalid);
        assert_eq!(classify(12), OperationStatus::FolderSyncRequired);
        assert_eq!(classify(4), OperationStatus::ServerError(4));
    }
}

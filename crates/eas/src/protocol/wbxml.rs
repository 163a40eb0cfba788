//! WBXML 1.3 encoding and decoding
//!
//! ActiveSync bodies are WBXML documents with an empty string table and no
//! attributes. Elements carry either a value (inline string or opaque
//! bytes) or child elements.

use std::fmt;
use thiserror::Error;

const SWITCH_PAGE: u8 = 0x00;
const END: u8 = 0x01;
const ENTITY: u8 = 0x02;
const STR_I: u8 = 0x03;
const STR_T: u8 = 0x83;
const OPAQUE: u8 = 0xC3;

const CONTENT: u8 = 0x40;
const ATTRIBUTES: u8 = 0x80;
const TOKEN_MASK: u8 = 0x3F;
/// Tokens below this are global tokens, not tags
const FIRST_TAG_TOKEN: u8 = 0x05;

const VERSION_1_3: u8 = 0x03;
const PUBLIC_ID_UNKNOWN: u8 = 0x01;
const CHARSET_UTF8: u8 = 0x6A;

const MAX_DEPTH: usize = 64;

/// A tag identified by code page and token
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub page: u8,
    pub token: u8,
}

impl Tag {
    pub const fn new(page: u8, token: u8) -> Self {
        Self { page, token }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({}:{:#04x})", self.page, self.token)
    }
}

/// Errors produced while decoding a WBXML document
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WbxmlError {
    #[error("unexpected end of document")]
    UnexpectedEof,
    #[error("unsupported token {0:#04x}")]
    UnsupportedToken(u8),
    #[error("attributes are not supported ({0:?})")]
    AttributesUnsupported(Tag),
    #[error("invalid UTF-8 in inline string")]
    InvalidUtf8,
    #[error("multi-byte integer overflow")]
    IntegerOverflow,
    #[error("string table reference {0} out of range")]
    BadStringReference(u32),
    #[error("document nesting exceeds {MAX_DEPTH} levels")]
    TooDeep,
}

/// Leaf content of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Opaque(Vec<u8>),
}

/// A decoded or to-be-encoded element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: Tag,
    pub value: Option<Value>,
    pub children: Vec<Element>,
}

impl Element {
    /// An empty element
    pub fn new(tag: Tag) -> Self {
        Self {
            tag,
            value: None,
            children: Vec::new(),
        }
    }

    /// Inline strings are NUL-terminated on the wire, so the encoder drops
    /// any NUL characters in `text`. Use [`with_opaque`](Self::with_opaque)
    /// for values that may contain them.
    pub fn with_text(tag: Tag, text: impl Into<String>) -> Self {
        Self {
            tag,
            value: Some(Value::Text(text.into())),
            children: Vec::new(),
        }
    }

    pub fn with_opaque(tag: Tag, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            value: Some(Value::Opaque(bytes.into())),
            children: Vec::new(),
        }
    }

    /// Append a child, builder style
    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Append a text child, builder style
    pub fn text_child(self, tag: Tag, text: impl Into<String>) -> Self {
        self.child(Element::with_text(tag, text))
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// First direct child with the given tag
    pub fn find(&self, tag: Tag) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All direct children with the given tag
    pub fn find_all(&self, tag: Tag) -> impl Iterator<Item = &Element> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Follow a chain of direct children
    pub fn path(&self, tags: &[Tag]) -> Option<&Element> {
        tags.iter().try_fold(self, |element, tag| element.find(*tag))
    }

    /// Textual value; opaque values are returned when they are valid UTF-8
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            Some(Value::Text(s)) => Some(s),
            Some(Value::Opaque(bytes)) => std::str::from_utf8(bytes).ok(),
            None => None,
        }
    }

    /// Raw value bytes, regardless of encoding
    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.value {
            Some(Value::Text(s)) => Some(s.as_bytes()),
            Some(Value::Opaque(bytes)) => Some(bytes),
            None => None,
        }
    }

    pub fn child_text(&self, tag: Tag) -> Option<&str> {
        self.find(tag).and_then(Element::text)
    }

    pub fn child_u32(&self, tag: Tag) -> Option<u32> {
        self.child_text(tag).and_then(|s| s.trim().parse().ok())
    }

    /// True when a child with the tag exists, with or without content
    pub fn has(&self, tag: Tag) -> bool {
        self.find(tag).is_some()
    }

    fn has_content(&self) -> bool {
        self.value.is_some() || !self.children.is_empty()
    }
}

/// Encode a document rooted at `root`
pub fn encode(root: &Element) -> Vec<u8> {
    let mut encoder = Encoder {
        out: vec![VERSION_1_3, PUBLIC_ID_UNKNOWN, CHARSET_UTF8, 0x00],
        page: 0,
    };
    encoder.write_element(root);
    encoder.out
}

/// Decode a document. The caller handles empty bodies before calling.
pub fn decode(data: &[u8]) -> Result<Element, WbxmlError> {
    let mut decoder = Decoder {
        data,
        pos: 0,
        page: 0,
        string_table: &[],
    };
    decoder.read_header()?;
    decoder.read_element(0)
}

struct Encoder {
    out: Vec<u8>,
    page: u8,
}

impl Encoder {
    fn write_element(&mut self, element: &Element) {
        if element.tag.page != self.page {
            self.out.push(SWITCH_PAGE);
            self.out.push(element.tag.page);
            self.page = element.tag.page;
        }

        if !element.has_content() {
            self.out.push(element.tag.token);
            return;
        }
        self.out.push(element.tag.token | CONTENT);

        match &element.value {
            Some(Value::Text(text)) => {
                self.out.push(STR_I);
                self.out.extend(text.bytes().filter(|b| *b != 0));
                self.out.push(0);
            }
            Some(Value::Opaque(bytes)) => {
                self.out.push(OPAQUE);
                write_mb_u32(&mut self.out, bytes.len() as u32);
                self.out.extend_from_slice(bytes);
            }
            None => {}
        }

        for child in &element.children {
            self.write_element(child);
        }
        self.out.push(END);
    }
}

fn write_mb_u32(out: &mut Vec<u8>, mut value: u32) {
    let mut buf = [0u8; 5];
    let mut i = buf.len() - 1;
    buf[i] = (value & 0x7F) as u8;
    value >>= 7;
    while value > 0 {
        i -= 1;
        buf[i] = (value & 0x7F) as u8 | 0x80;
        value >>= 7;
    }
    out.extend_from_slice(&buf[i..]);
}

struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
    page: u8,
    string_table: &'a [u8],
}

impl<'a> Decoder<'a> {
    fn byte(&mut self) -> Result<u8, WbxmlError> {
        let b = *self.data.get(self.pos).ok_or(WbxmlError::UnexpectedEof)?;
        self.pos += 1;
        Ok(b)
    }

    fn peek(&self) -> Result<u8, WbxmlError> {
        self.data.get(self.pos).copied().ok_or(WbxmlError::UnexpectedEof)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], WbxmlError> {
        let end = self.pos.checked_add(len).ok_or(WbxmlError::UnexpectedEof)?;
        let slice = self.data.get(self.pos..end).ok_or(WbxmlError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    fn mb_u32(&mut self) -> Result<u32, WbxmlError> {
        let mut value: u32 = 0;
        for _ in 0..5 {
            let b = self.byte()?;
            if value > (u32::MAX >> 7) {
                return Err(WbxmlError::IntegerOverflow);
            }
            value = (value << 7) | u32::from(b & 0x7F);
            if b & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(WbxmlError::IntegerOverflow)
    }

    fn read_header(&mut self) -> Result<(), WbxmlError> {
        let _version = self.byte()?;
        let public_id = self.mb_u32()?;
        if public_id == 0 {
            // Public id given as a string table index
            self.mb_u32()?;
        }
        let _charset = self.mb_u32()?;
        let table_len = self.mb_u32()? as usize;
        self.string_table = self.take(table_len)?;
        Ok(())
    }

    fn c_string(&mut self) -> Result<String, WbxmlError> {
        let rest = &self.data[self.pos..];
        let len = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or(WbxmlError::UnexpectedEof)?;
        let s = std::str::from_utf8(&rest[..len]).map_err(|_| WbxmlError::InvalidUtf8)?;
        self.pos += len + 1;
        Ok(s.to_string())
    }

    fn table_string(&mut self) -> Result<String, WbxmlError> {
        let offset = self.mb_u32()?;
        let rest = self
            .string_table
            .get(offset as usize..)
            .ok_or(WbxmlError::BadStringReference(offset))?;
        let len = rest.iter().position(|b| *b == 0).unwrap_or(rest.len());
        std::str::from_utf8(&rest[..len])
            .map(str::to_string)
            .map_err(|_| WbxmlError::InvalidUtf8)
    }

    fn read_element(&mut self, depth: usize) -> Result<Element, WbxmlError> {
        if depth > MAX_DEPTH {
            return Err(WbxmlError::TooDeep);
        }

        let mut b = self.byte()?;
        while b == SWITCH_PAGE {
            self.page = self.byte()?;
            b = self.byte()?;
        }

        let token = b & TOKEN_MASK;
        if token < FIRST_TAG_TOKEN {
            return Err(WbxmlError::UnsupportedToken(b));
        }
        let mut element = Element::new(Tag::new(self.page, token));
        if b & ATTRIBUTES != 0 {
            return Err(WbxmlError::AttributesUnsupported(element.tag));
        }
        if b & CONTENT == 0 {
            return Ok(element);
        }

        let mut text: Option<String> = None;
        let mut opaque: Option<Vec<u8>> = None;
        loop {
            match self.peek()? {
                SWITCH_PAGE => {
                    self.pos += 1;
                    self.page = self.byte()?;
                }
                END => {
                    self.pos += 1;
                    break;
                }
                STR_I => {
                    self.pos += 1;
                    let s = self.c_string()?;
                    text.get_or_insert_with(String::new).push_str(&s);
                }
                STR_T => {
                    self.pos += 1;
                    let s = self.table_string()?;
                    text.get_or_insert_with(String::new).push_str(&s);
                }
                ENTITY => {
                    self.pos += 1;
                    let code = self.mb_u32()?;
                    let c = char::from_u32(code).ok_or(WbxmlError::InvalidUtf8)?;
                    text.get_or_insert_with(String::new).push(c);
                }
                OPAQUE => {
                    self.pos += 1;
                    let len = self.mb_u32()? as usize;
                    opaque
                        .get_or_insert_with(Vec::new)
                        .extend_from_slice(self.take(len)?);
                }
                b if b & TOKEN_MASK < FIRST_TAG_TOKEN => {
                    return Err(WbxmlError::UnsupportedToken(b));
                }
                _ => {
                    let child = self.read_element(depth + 1)?;
                    element.children.push(child);
                }
            }
        }

        element.value = match (opaque, text) {
            (Some(bytes), _) => Some(Value::Opaque(bytes)),
            (None, Some(s)) => Some(Value::Text(s)),
            (None, None) => None,
        };
        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::tags::{airsync, email, folder_hierarchy};

    #[test]
    fn test_encode_folder_sync_request() {
        let doc = Element::new(folder_hierarchy::FOLDER_SYNC)
            .text_child(folder_hierarchy::SYNC_KEY, "0");
        let bytes = encode(&doc);
        assert_eq!(
            bytes,
            vec![
                0x03, 0x01, 0x6A, 0x00, // header
                0x00, 0x07, // switch to FolderHierarchy
                0x56, // FolderSync with content
                0x52, 0x03, b'0', 0x00, 0x01, // SyncKey "0"
                0x01, // end FolderSync
            ]
        );
    }

    #[test]
    fn test_decode_known_bytes() {
        let bytes = [
            0x03, 0x01, 0x6A, 0x00, 0x00, 0x07, 0x56, 0x4C, 0x03, b'1', 0x00, 0x01, 0x52, 0x03,
            b'k', b'1', 0x00, 0x01, 0x01,
        ];
        let doc = decode(&bytes).unwrap();
        assert_eq!(doc.tag, folder_hierarchy::FOLDER_SYNC);
        assert_eq!(doc.child_u32(folder_hierarchy::STATUS), Some(1));
        assert_eq!(doc.child_text(folder_hierarchy::SYNC_KEY), Some("k1"));
    }

    #[test]
    fn test_roundtrip_across_pages_with_opaque() {
        let doc = Element::new(airsync::SYNC).child(
            Element::new(airsync::APPLICATION_DATA)
                .text_child(email::SUBJECT, "Hello")
                .child(Element::with_opaque(email::MIME_DATA, vec![0u8, 1, 2, 0xFF]))
                .child(Element::new(email::READ))
                .text_child(airsync::SERVER_ID, "1:1"),
        );
        let decoded = decode(&encode(&doc)).unwrap();
        assert_eq!(decoded, doc);

        let data = decoded.find(airsync::APPLICATION_DATA).unwrap();
        assert_eq!(data.find(email::MIME_DATA).unwrap().bytes(), Some(&[0u8, 1, 2, 0xFF][..]));
        assert!(data.has(email::READ));
        assert_eq!(data.child_text(airsync::SERVER_ID), Some("1:1"));
    }

    #[test]
    fn test_nul_dropped_from_inline_text() {
        let doc = Element::new(airsync::SYNC).text_child(airsync::SERVER_ID, "5:\u{0}1");
        let decoded = decode(&encode(&doc)).unwrap();
        assert_eq!(decoded.child_text(airsync::SERVER_ID), Some("5:1"));
    }

    #[test]
    fn test_large_opaque_length() {
        let body = vec![b'x'; 70_000];
        let doc = Element::with_opaque(email::MIME_DATA, body.clone());
        let decoded = decode(&encode(&doc)).unwrap();
        assert_eq!(decoded.bytes(), Some(&body[..]));
    }

    #[test]
    fn test_truncated_input_is_error() {
        let bytes = encode(
            &Element::new(folder_hierarchy::FOLDER_SYNC).text_child(folder_hierarchy::SYNC_KEY, "abc"),
        );
        for len in 0..bytes.len() {
            assert!(decode(&bytes[..len]).is_err(), "prefix of {} bytes decoded", len);
        }
    }

    #[test]
    fn test_attributes_rejected() {
        let bytes = [0x03, 0x01, 0x6A, 0x00, 0x85, 0x01, 0x01];
        assert!(matches!(
            decode(&bytes),
            Err(WbxmlError::AttributesUnsupported(_))
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let mut bytes = vec![0x03, 0x01, 0x6A, 0x00];
        bytes.extend(std::iter::repeat_n(0x45, MAX_DEPTH + 2));
        bytes.extend(std::iter::repeat_n(END, MAX_DEPTH + 2));
        assert_eq!(decode(&bytes), Err(WbxmlError::TooDeep));
    }

    #[test]
    fn test_string_table_reference() {
        // String table "ab\0cd\0", element value refers to offset 3
        let bytes = [
            0x03, 0x01, 0x6A, 0x06, b'a', b'b', 0x00, b'c', b'd', 0x00, 0x45, 0x83, 0x03, 0x01,
        ];
        let doc = decode(&bytes).unwrap();
        assert_eq!(doc.text(), Some("cd"));
    }
}

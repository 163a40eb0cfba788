//! SendMail request (protocol 14 and later)

use super::ParseError;
use super::tags::compose_mail;
use super::wbxml::Element;

pub fn build_request(client_id: &str, mime: &[u8], save_in_sent: bool) -> Element {
    let mut root = Element::new(compose_mail::SEND_MAIL).text_child(compose_mail::CLIENT_ID, client_id);
    if save_in_sent {
        root = root.child(Element::new(compose_mail::SAVE_IN_SENT_ITEMS));
    }
    root.child(Element::with_opaque(compose_mail::MIME, mime.to_vec()))
}

/// Status of a SendMail response. Servers answer success with an empty
/// body, which the caller passes as `None`.
pub fn parse_status(root: Option<&Element>) -> Result<Option<u32>, ParseError> {
    let Some(root) = root else {
        return Ok(None);
    };
    if root.tag != compose_mail::SEND_MAIL {
        return Err(ParseError::new(format!("expected SendMail, got {:?}", root.tag)));
    }
    Ok(root.child_u32(compose_mail::STATUS))
}

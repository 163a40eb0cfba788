//! Provision handshake documents

use super::ParseError;
use super::tags::provision as p;
use super::wbxml::Element;

pub const POLICY_TYPE: &str = "MS-EAS-Provisioning-WBXML";
pub const STATUS_OK: u32 = 1;

/// Parsed Provision response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionResponse {
    pub status: u32,
    pub policy_status: Option<u32>,
    pub policy_key: Option<String>,
    /// Server asked the device to wipe its data
    pub remote_wipe: bool,
}

/// First leg: ask for the policy
pub fn build_policy_request() -> Element {
    Element::new(p::PROVISION).child(
        Element::new(p::POLICIES).child(Element::new(p::POLICY).text_child(p::POLICY_TYPE, POLICY_TYPE)),
    )
}

/// Second leg: acknowledge the temporary key
pub fn build_acknowledgement(temporary_key: &str, status: u32) -> Element {
    Element::new(p::PROVISION).child(
        Element::new(p::POLICIES).child(
            Element::new(p::POLICY)
                .text_child(p::POLICY_TYPE, POLICY_TYPE)
                .text_child(p::POLICY_KEY, temporary_key)
                .text_child(p::STATUS, status.to_string()),
        ),
    )
}

pub fn parse_response(root: &Element) -> Result<ProvisionResponse, ParseError> {
    if root.tag != p::PROVISION {
        return Err(ParseError::new(format!("expected Provision, got {:?}", root.tag)));
    }
    let status = root
        .child_u32(p::STATUS)
        .ok_or_else(|| ParseError::new("Provision without Status"))?;
    let policy = root.path(&[p::POLICIES, p::POLICY]);
    Ok(ProvisionResponse {
        status,
        policy_status: policy.and_then(|e| e.child_u32(p::STATUS)),
        policy_key: policy
            .and_then(|e| e.child_text(p::POLICY_KEY))
            .map(str::to_string),
        remote_wipe: root.has(p::REMOTE_WIPE),
    })
}

/// Build a Provision response. Used by tests and scripted servers.
pub fn response_document(status: u32, policy_key: Option<&str>) -> Element {
    let mut policy = Element::new(p::POLICY)
        .text_child(p::POLICY_TYPE, POLICY_TYPE)
        .text_child(p::STATUS, "1");
    if let Some(key) = policy_key {
        policy = policy.text_child(p::POLICY_KEY, key);
    }
    Element::new(p::PROVISION)
        .text_child(p::STATUS, status.to_string())
        .child(Element::new(p::POLICIES).child(policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wbxml;

    #[test]
    fn test_parse_policy_key() {
        let doc = response_document(1, Some("3942919513"));
        let parsed = parse_response(&wbxml::decode(&wbxml::encode(&doc)).unwrap()).unwrap();
        assert_eq!(parsed.status, 1);
        assert_eq!(parsed.policy_status, Some(1));
        assert_eq!(parsed.policy_key.as_deref(), Some("3942919513"));
        assert!(!parsed.remote_wipe);
    }

    #[test]
    fn test_remote_wipe_flag() {
        let doc = Element::new(p::PROVISION)
            .text_child(p::STATUS, "1")
            .child(Element::new(p::REMOTE_WIPE));
        assert!(parse_response(&doc).unwrap().remote_wipe);
    }

    #[test]
    fn test_acknowledgement_echoes_key() {
        let doc = build_acknowledgement("tmp", 1);
        let policy = doc.path(&[p::POLICIES, p::POLICY]).unwrap();
        assert_eq!(policy.child_text(p::POLICY_KEY), Some("tmp"));
        assert_eq!(policy.child_text(p::STATUS), Some("1"));
    }
}

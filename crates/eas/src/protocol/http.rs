//! HTTPS transport built on ureq
//!
//! Uses synchronous HTTP so the sync core stays executor-agnostic; callers
//! run it on their own worker thread.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::debug;
use url::Url;

use super::transport::{EasReply, EasRequest, EasTransport, NetworkErrorKind, TransportError};
use crate::config::ProtocolConfig;
use crate::models::{AccountContext, AuthType};

/// Largest response body accepted (MIME of a fully downloaded message)
const MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;

/// Production transport
pub struct HttpTransport {
    agent: ureq::Agent,
    user_agent: String,
}

impl HttpTransport {
    pub fn new(config: &ProtocolConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_connect(Some(config.connect_timeout()))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            user_agent: config.user_agent.clone(),
        }
    }

    /// Endpoint URL with the standard ActiveSync query parameters
    pub fn request_url(account: &AccountContext, request: &EasRequest) -> Result<Url, TransportError> {
        let mut url = Url::parse(&account.server.endpoint()).map_err(|e| {
            TransportError::new(
                NetworkErrorKind::UnknownHost,
                format!("invalid server address {}: {}", account.server.host, e),
            )
        })?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("Cmd", request.command)
                .append_pair("User", &account.server.username)
                .append_pair("DeviceId", &account.device_id)
                .append_pair("DeviceType", AccountContext::DEVICE_TYPE);
            for (name, value) in &request.extra_query {
                query.append_pair(name, value);
            }
        }
        Ok(url)
    }

    /// Headers sent with every command
    pub fn request_headers(&self, account: &AccountContext, request: &EasRequest) -> Vec<(&'static str, String)> {
        let credentials = format!("{}:{}", account.server.username, account.server.password);
        vec![
            ("Authorization", format!("Basic {}", STANDARD.encode(credentials))),
            ("MS-ASProtocolVersion", account.protocol_version.clone()),
            ("User-Agent", self.user_agent.clone()),
            ("X-MS-PolicyKey", account.policy_key_header().to_string()),
            ("Content-Type", request.content_type.to_string()),
        ]
    }
}

impl EasTransport for HttpTransport {
    fn post(&self, account: &AccountContext, request: &EasRequest) -> Result<EasReply, TransportError> {
        if account.server.auth_type == AuthType::ClientCertificate {
            return Err(TransportError::new(
                NetworkErrorKind::Tls,
                "client certificate authentication is not available",
            ));
        }

        let url = Self::request_url(account, request)?;
        debug!("POST {} Cmd={}", account.server.host, request.command);

        let mut builder = self
            .agent
            .post(url.as_str())
            .config()
            .timeout_global(Some(request.timeout))
            .build();
        for (name, value) in self.request_headers(account, request) {
            builder = builder.header(name, value);
        }

        let mut response = builder.send(&request.body[..]).map_err(classify_error)?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_vec()
            .map_err(classify_error)?;

        Ok(EasReply { status, body })
    }
}

fn classify_error(err: ureq::Error) -> TransportError {
    let kind = match &err {
        ureq::Error::HostNotFound => NetworkErrorKind::UnknownHost,
        ureq::Error::Timeout(_) => NetworkErrorKind::Timeout,
        ureq::Error::ConnectionFailed => NetworkErrorKind::ConnectionFailed,
        ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => NetworkErrorKind::Timeout,
        _ => NetworkErrorKind::Io,
    };
    TransportError::new(kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ServerSettings;
    use crate::protocol::transport::WBXML_CONTENT_TYPE;
    use std::time::Duration;

    fn account() -> AccountContext {
        AccountContext::new(
            "abc123",
            "bob@example.com",
            ServerSettings::new("mail.example.com", "EXAMPLE\\bob", "secret"),
            "14.1",
        )
    }

    fn request() -> EasRequest {
        EasRequest {
            command: "SendMail",
            extra_query: vec![("SaveInSent", "T".to_string())],
            content_type: WBXML_CONTENT_TYPE,
            body: Vec::new(),
            timeout: Duration::from_secs(30),
        }
    }

    #[test]
    fn test_request_url() {
        let url = HttpTransport::request_url(&account(), &request()).unwrap();
        assert_eq!(
            url.as_str(),
            "https://mail.example.com/Microsoft-Server-ActiveSync\
             ?Cmd=SendMail&User=EXAMPLE%5Cbob&DeviceId=abc123&DeviceType=Android&SaveInSent=T"
        );
    }

    #[test]
    fn test_request_headers() {
        let transport = HttpTransport::new(&ProtocolConfig::default());
        let account = account().with_policy_key(Some("987".into()));
        let headers = transport.request_headers(&account, &request());
        let get = |name: &str| {
            headers
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(
            get("Authorization"),
            format!("Basic {}", STANDARD.encode("EXAMPLE\\bob:secret"))
        );
        assert_eq!(get("MS-ASProtocolVersion"), "14.1");
        assert_eq!(get("X-MS-PolicyKey"), "987");
        assert_eq!(get("Content-Type"), WBXML_CONTENT_TYPE);
    }

    #[test]
    fn test_client_certificate_is_refused_before_connecting() {
        let transport = HttpTransport::new(&ProtocolConfig::default());
        let mut account = account();
        account.server.auth_type = AuthType::ClientCertificate;
        let err = transport.post(&account, &request()).unwrap_err();
        assert_eq!(err.kind, NetworkErrorKind::Tls);
    }
}

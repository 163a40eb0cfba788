//! Outbound mail submission

use log::info;

use super::Session;
use crate::error::EasResult;
use crate::models::OutgoingMessage;

/// Submit `message` and have the server keep a copy in Sent
pub fn send_message(session: &Session, message: &OutgoingMessage) -> EasResult<()> {
    let executor = session.executor();
    session
        .exchange(|account| executor.send_mail(account, message, true))?
        .map_err(|failure| failure.into_error("SendMail"))?;
    info!(
        "Sent message {} ({} bytes)",
        message.message_id.as_deref().unwrap_or("<no id>"),
        message.mime.len()
    );
    Ok(())
}

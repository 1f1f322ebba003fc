//! Revocation guard: suppresses side effects on messages deleted since
//! receipt.
//!
//! The check is advisory best-effort. A race window remains between the
//! re-fetch and the dispatch that follows it: a message deleted in that gap
//! still receives the side effect. Known limitation, kept as-is.

use std::future::Future;

use tracing::{info, warn};

use crate::message::MessageRef;
use crate::transport::{ChatTransport, TransportError};

pub const PENDING: &str = "⏳";
pub const SUCCESS: &str = "✅";
pub const FAILURE: &str = "❌";

/// Whether `msg` has been deleted from its chat since receipt.
///
/// A transport failure during the check counts as "not revoked" so the
/// pending action still goes out.
pub async fn is_revoked(transport: &dyn ChatTransport, msg: &MessageRef) -> bool {
    match transport.exists_in_chat(msg).await {
        Ok(exists) => !exists,
        Err(e) => {
            warn!("revocation check failed for message {}: {e}", msg.message_id);
            false
        }
    }
}

/// Run an outbound action only if the originating message still exists.
/// A revoked message suppresses the action silently: no error, no retry.
pub async fn dispatch<F, Fut>(
    transport: &dyn ChatTransport,
    msg: &MessageRef,
    action: F,
) -> Result<(), TransportError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), TransportError>>,
{
    if is_revoked(transport, msg).await {
        info!("message {} was revoked, suppressing side effect", msg.message_id);
        return Ok(());
    }
    action().await
}

/// React to a message, unless it was revoked.
pub async fn react(
    transport: &dyn ChatTransport,
    msg: &MessageRef,
    emoji: &str,
) -> Result<(), TransportError> {
    dispatch(transport, msg, || transport.react(msg, emoji)).await
}

/// Reply to a message, unless it was revoked.
pub async fn reply(
    transport: &dyn ChatTransport,
    msg: &MessageRef,
    text: &str,
) -> Result<(), TransportError> {
    dispatch(transport, msg, || transport.send_reply(msg, text)).await
}

/// Pending marker while a command is being processed.
pub async fn indicate_pending(transport: &dyn ChatTransport, msg: &MessageRef) {
    if let Err(e) = react(transport, msg, PENDING).await {
        warn!("failed to indicate pending on {}: {e}", msg.message_id);
    }
}

/// Success marker on the originating message.
pub async fn indicate_success(transport: &dyn ChatTransport, msg: &MessageRef) {
    if let Err(e) = react(transport, msg, SUCCESS).await {
        warn!("failed to indicate success on {}: {e}", msg.message_id);
    }
}

/// Failure marker, preceded by an optional explanatory reply. One revocation
/// check covers both sends.
pub async fn indicate_error(
    transport: &dyn ChatTransport,
    msg: &MessageRef,
    explanation: Option<&str>,
) {
    if is_revoked(transport, msg).await {
        info!("message {} was revoked, suppressing failure indicator", msg.message_id);
        return;
    }
    if let Some(text) = explanation
        && let Err(e) = transport.send_reply(msg, text).await
    {
        warn!("failed to send error reply on {}: {e}", msg.message_id);
    }
    if let Err(e) = transport.react(msg, FAILURE).await {
        warn!("failed to indicate failure on {}: {e}", msg.message_id);
    }
}

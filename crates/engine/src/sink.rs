//! Feedback on the message that triggered a command or approval.
//!
//! Every call here is best-effort: a failed feedback call is logged and
//! dropped, never retried and never surfaced.

use std::sync::Arc;

use {
    aula_channels::ChatTransport,
    aula_common::MessageRef,
    tracing::{debug, warn},
};

use crate::error::CommandError;

/// What to show once a handler succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    /// The configured success reaction.
    Success,
    /// A specific reaction instead of the default.
    Emoji(String),
    /// No feedback; the handler already replied or will later.
    Silent,
}

#[derive(Clone)]
pub struct ResultSink {
    transport: Arc<dyn ChatTransport>,
    success_emoji: String,
    error_emoji: String,
}

impl ResultSink {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        success_emoji: impl Into<String>,
        error_emoji: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            success_emoji: success_emoji.into(),
            error_emoji: error_emoji.into(),
        }
    }

    pub async fn on_success(&self, origin: &MessageRef) {
        self.react(origin, &self.success_emoji).await;
    }

    /// Post the error text next to `origin`, then mark it with the error
    /// reaction.
    pub async fn on_error(&self, origin: &MessageRef, err: &CommandError) {
        warn!(
            channel_id = %origin.channel_id,
            message_id = %origin.message_id,
            kind = ?err.kind(),
            error = %err,
            "operation error"
        );
        if let Err(e) = self
            .transport
            .send_message(&origin.channel_id, &format!("Error! {err}"))
            .await
        {
            warn!(channel_id = %origin.channel_id, error = %e, "failed to send error message");
        }
        self.react(origin, &self.error_emoji).await;
    }

    /// Route a handler result to the matching feedback.
    pub async fn finish(&self, origin: &MessageRef, result: &Result<Ack, CommandError>) {
        match result {
            Ok(Ack::Success) => self.on_success(origin).await,
            Ok(Ack::Emoji(emoji)) => self.react(origin, emoji).await,
            Ok(Ack::Silent) => {},
            Err(err) => self.on_error(origin, err).await,
        }
    }

    async fn react(&self, origin: &MessageRef, emoji: &str) {
        match self.transport.add_reaction(origin, emoji).await {
            Ok(()) => debug!(message_id = %origin.message_id, emoji, "feedback reaction added"),
            Err(e) => warn!(message_id = %origin.message_id, emoji, error = %e, "failed to add reaction"),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        aula_channels::{InMemoryTransport, OutboundCall},
        aula_common::ChannelId,
    };

    fn sink(transport: &Arc<InMemoryTransport>) -> ResultSink {
        ResultSink::new(Arc::clone(transport) as Arc<dyn ChatTransport>, "✅", "❌")
    }

    #[tokio::test]
    async fn error_posts_text_then_reaction() {
        let transport = Arc::new(InMemoryTransport::new());
        let origin = MessageRef::new("c1", "m1");
        sink(&transport)
            .on_error(&origin, &CommandError::validation("Codigo invalido"))
            .await;

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].text(), Some("Error! Codigo invalido"));
        assert!(matches!(
            &calls[1],
            OutboundCall::Reaction { message, emoji } if message == &origin && emoji == "❌"
        ));
    }

    #[tokio::test]
    async fn finish_maps_acks() {
        let transport = Arc::new(InMemoryTransport::new());
        let sink = sink(&transport);
        let origin = MessageRef::new("c1", "m1");
        sink.finish(&origin, &Ok(Ack::Success)).await;
        sink.finish(&origin, &Ok(Ack::Emoji("👍".into()))).await;
        sink.finish(&origin, &Ok(Ack::Silent)).await;
        assert_eq!(transport.reactions_on(&origin), vec!["✅", "👍"]);
    }

    #[tokio::test]
    async fn transport_failures_are_swallowed() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.fail("send_message");
        transport.fail("add_reaction");
        let origin = MessageRef::new("c1", "m1");
        sink(&transport)
            .on_error(&origin, &CommandError::maintenance())
            .await;
        assert!(transport.calls_in(&ChannelId::new("c1")).is_empty());
    }
}

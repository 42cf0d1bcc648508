//! Subscription handle returned by `RealtimeClient::subscribe`.

use std::sync::Arc;

use crate::domain::RealtimeMessage;
use crate::messaging::{ListenerId, MessageHandler};

/// One listener's registration to a topic.
///
/// The handle and the listener registry own the registration jointly: the
/// caller decides when to unsubscribe, the registry garbage-collects the
/// topic entry once its listener set is empty. Dropping the handle without
/// calling [`Subscription::unsubscribe`] leaves the listener active until
/// the client is torn down.
pub struct Subscription {
    topic: String,
    listener_id: ListenerId,
    handler: Arc<MessageHandler>,
    active: bool,
}

impl Subscription {
    pub(crate) fn new(topic: String, listener_id: ListenerId, handler: Arc<MessageHandler>) -> Self {
        Self {
            topic,
            listener_id,
            handler,
            active: true,
        }
    }

    /// Topic this subscription listens on.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// True until `unsubscribe` is called.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Remove exactly this listener.
    ///
    /// When the topic's local listener set becomes empty, an unsubscribe
    /// control frame is sent to the server (best effort: if the connection
    /// is down the server-side cleanup happens on its own timeout). Calling
    /// this twice is a no-op.
    pub async fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        let emptied = self.handler.remove_listener(&self.topic, self.listener_id);
        if emptied {
            let frame = RealtimeMessage::unsubscribe(self.topic.clone());
            if let Err(err) = self.handler.send(frame).await {
                tracing::trace!(topic = %self.topic, error = %err, "unsubscribe frame not sent");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::TopicListener;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_listener() -> (TopicListener, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let captured = Arc::clone(&count);
        let listener: TopicListener = Arc::new(move |_msg| {
            captured.fetch_add(1, Ordering::SeqCst);
        });
        (listener, count)
    }

    #[tokio::test]
    async fn unsubscribe_removes_the_listener_and_deactivates() {
        let handler = Arc::new(MessageHandler::new());
        let (listener, count) = counting_listener();
        let id = handler.add_listener("chat", listener);
        let mut subscription = Subscription::new("chat".into(), id, Arc::clone(&handler));

        assert!(subscription.is_active());
        assert_eq!(subscription.topic(), "chat");

        subscription.unsubscribe().await;
        assert!(!subscription.is_active());

        handler.handle_message(RealtimeMessage::event("chat", json!({})));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn double_unsubscribe_is_a_noop() {
        let handler = Arc::new(MessageHandler::new());
        let (listener, _) = counting_listener();
        let id = handler.add_listener("chat", listener);
        let mut subscription = Subscription::new("chat".into(), id, Arc::clone(&handler));

        subscription.unsubscribe().await;
        subscription.unsubscribe().await;
        assert!(!subscription.is_active());
    }

    #[tokio::test]
    async fn unsubscribing_one_of_two_keeps_the_topic_listening() {
        let handler = Arc::new(MessageHandler::new());
        let (first, _) = counting_listener();
        let (second, second_count) = counting_listener();
        let first_id = handler.add_listener("chat", first);
        handler.add_listener("chat", second);

        let mut subscription = Subscription::new("chat".into(), first_id, Arc::clone(&handler));
        subscription.unsubscribe().await;

        handler.handle_message(RealtimeMessage::event("chat", json!({})));
        assert_eq!(second_count.load(Ordering::SeqCst), 1);
    }
}

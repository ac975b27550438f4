use super::{Broadcaster, Subscription, Topic};
use bytes::Bytes;
use hyper::body::{Body, Frame};
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// SSE response body fed by a subscriber queue.
///
/// Ends when the broadcaster drops the subscriber; dropping the body (client
/// disconnect) unregisters it.
pub struct EventStreamBody {
    id: u64,
    topic: Topic,
    receiver: mpsc::Receiver<Bytes>,
    broadcaster: Weak<Broadcaster>,
}

impl EventStreamBody {
    pub(super) fn new(subscription: Subscription, broadcaster: Weak<Broadcaster>) -> Self {
        Self {
            id: subscription.id,
            topic: subscription.topic,
            receiver: subscription.receiver,
            broadcaster,
        }
    }
}

impl Body for EventStreamBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        self.get_mut()
            .receiver
            .poll_recv(cx)
            .map(|frame| frame.map(|bytes| Ok(Frame::data(bytes))))
    }
}

impl Drop for EventStreamBody {
    fn drop(&mut self) {
        if let Some(broadcaster) = self.broadcaster.upgrade() {
            broadcaster.unsubscribe(&self.topic, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::StreamEvent;
    use http_body_util::BodyExt;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_body_yields_frames_and_unsubscribes_on_drop() {
        let broadcaster = Arc::new(Broadcaster::new(8));
        let topic = Topic::Project("p1".into());
        let mut body = broadcaster.stream(topic.clone());
        assert_eq!(broadcaster.subscriber_count(&topic), 1);

        broadcaster.publish(&topic, &StreamEvent::Heartbeat);

        let first = body.frame().await.unwrap().unwrap().into_data().unwrap();
        assert!(first.starts_with(b"data: {\"type\":\"connected\"}"));
        let second = body.frame().await.unwrap().unwrap().into_data().unwrap();
        assert!(second.starts_with(b"data: {\"type\":\"heartbeat\"}"));

        drop(body);
        assert_eq!(broadcaster.subscriber_count(&topic), 0);
    }
}

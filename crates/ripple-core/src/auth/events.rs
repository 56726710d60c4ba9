use tokio::sync::broadcast;

/// Channel capacity for session events. Events are rare (one per forced
/// logout), so a small buffer is plenty.
const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session could not be kept alive; callers should treat the user
    /// as signed out (e.g. route to a sign-in view).
    Ended,
}

/// Broadcast fan-out for session lifecycle events. Clone is cheap; all
/// clones feed the same subscribers.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub(crate) fn ended(&self) {
        // Send only fails when nobody is subscribed, which is fine.
        let _ = self.sender.send(SessionEvent::Ended);
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_ended() {
        let events = SessionEvents::new();
        let mut rx = events.subscribe();
        events.ended();
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::Ended);
    }

    #[test]
    fn test_ended_without_subscribers_is_harmless() {
        SessionEvents::new().ended();
    }
}

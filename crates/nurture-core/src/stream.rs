// ── Reactive session stream ──
//
// Subscription type for consuming session changes from the resolver.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::router::{Screen, route};
use crate::session::SessionState;

/// Read-only view of the resolver's state for one consumer.
///
/// Holds the last snapshot it observed; `changed()` advances it, and
/// `into_stream()` hands the receiver to a `Stream`.
pub struct SessionStream {
    current: SessionState,
    receiver: watch::Receiver<SessionState>,
}

impl SessionStream {
    pub(crate) fn new(receiver: watch::Receiver<SessionState>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// Last snapshot this subscriber observed.
    pub fn current(&self) -> &SessionState {
        &self.current
    }

    /// Whatever the resolver holds right now.
    pub fn latest(&self) -> SessionState {
        self.receiver.borrow().clone()
    }

    /// Screen for the latest snapshot.
    pub fn screen(&self) -> Screen {
        route(&self.receiver.borrow())
    }

    /// Next replacement of the state; `None` once the resolver is gone.
    pub async fn changed(&mut self) -> Option<SessionState> {
        if self.receiver.changed().await.is_err() {
            return None;
        }
        self.current = self.receiver.borrow_and_update().clone();
        Some(self.current.clone())
    }

    /// Every state replacement as a `Stream`, starting with the current one.
    pub fn into_stream(self) -> SessionWatchStream {
        SessionWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

pub struct SessionWatchStream {
    inner: WatchStream<SessionState>,
}

impl Stream for SessionWatchStream {
    type Item = SessionState;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<SessionState>> {
        let this = self.get_mut();
        Pin::new(&mut this.inner).poll_next(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn changed_advances_current_snapshot() {
        let (tx, rx) = watch::channel(SessionState::initial());
        let mut stream = SessionStream::new(rx);
        assert!(stream.current().is_loading());
        assert_eq!(stream.screen(), Screen::Loading);

        tx.send_replace(SessionState::empty());
        let next = stream.changed().await.unwrap();
        assert!(!next.is_loading());
        assert_eq!(stream.current(), &next);
        assert_eq!(stream.screen(), Screen::Login);

        drop(tx);
        assert!(stream.changed().await.is_none());
    }
}

use crate::state::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, stream};
use std::convert::Infallible;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

pub const SLOT_CHANGED_EVENT: &str = "slot-changed";

/// A write to, or removal of, a storage slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotChange {
    pub key: String,
}

/// Fans slot changes out to every open dashboard.
#[derive(Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<SlotChange>,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    pub fn notify(&self, key: &str) {
        let change = SlotChange {
            key: key.to_string(),
        };
        if let Err(err) = self.sender.send(change) {
            debug!("no dashboards listening for slot change: {err}");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SlotChange> {
        self.sender.subscribe()
    }
}

pub async fn slot_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.notifier.subscribe();

    let events = stream::unfold(receiver, |mut receiver| async move {
        let key = match receiver.recv().await {
            Ok(change) => change.key,
            // A lagging page only needs one repaint, whatever it missed.
            Err(RecvError::Lagged(skipped)) => {
                debug!("dashboard subscriber skipped {skipped} slot changes");
                String::new()
            }
            Err(RecvError::Closed) => return None,
        };
        let event = Event::default().event(SLOT_CHANGED_EVENT).data(key);
        Some((Ok::<_, Infallible>(event), receiver))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

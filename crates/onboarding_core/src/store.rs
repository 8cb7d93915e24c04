use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tokio::sync::{broadcast, Mutex};
use tracing::warn;

use crate::error::{ActionError, ActionResult, RemoteError};

const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Banking,
    Employee,
    NewStarter,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Banking => "banking",
            Self::Employee => "employee",
            Self::NewStarter => "new starter",
        })
    }
}

/// Change notification. Receivers re-read a snapshot; events carry no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    Changed(StoreKind),
    LoadingChanged { store: StoreKind, loading: bool },
}

pub(crate) trait TrackedState: Clone + Default + Send {
    fn set_loading(&mut self, loading: bool);
    fn set_last_error(&mut self, error: Option<String>);
}

/// State, in-flight flag and change channel shared by every store.
pub(crate) struct StoreCell<S> {
    kind: StoreKind,
    state: Mutex<S>,
    loading: Arc<AtomicBool>,
    events: broadcast::Sender<StoreEvent>,
}

impl<S: TrackedState> StoreCell<S> {
    pub(crate) fn new(kind: StoreKind) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            kind,
            state: Mutex::new(S::default()),
            loading: Arc::new(AtomicBool::new(false)),
            events,
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub(crate) async fn snapshot(&self) -> S {
        let mut snapshot = self.state.lock().await.clone();
        snapshot.set_loading(self.is_loading());
        snapshot
    }

    /// Claims the single remote-action slot of this store.
    pub(crate) fn begin(&self) -> ActionResult<InFlight> {
        if self
            .loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ActionError::Busy(self.kind));
        }
        let _ = self.events.send(StoreEvent::LoadingChanged {
            store: self.kind,
            loading: true,
        });
        Ok(InFlight {
            kind: self.kind,
            loading: Arc::clone(&self.loading),
            events: self.events.clone(),
        })
    }

    pub(crate) async fn mutate<R>(&self, apply: impl FnOnce(&mut S) -> R) -> R {
        let out = {
            let mut guard = self.state.lock().await;
            apply(&mut guard)
        };
        let _ = self.events.send(StoreEvent::Changed(self.kind));
        out
    }

    /// Applies a successful remote result and clears the last failure.
    pub(crate) async fn commit<R>(&self, apply: impl FnOnce(&mut S) -> R) -> R {
        self.mutate(|state| {
            state.set_last_error(None);
            apply(state)
        })
        .await
    }

    pub(crate) async fn fail<T>(&self, action: &'static str, err: RemoteError) -> ActionResult<T> {
        warn!(store = %self.kind, action, error = %err, "remote action failed");
        let message = err.to_string();
        self.mutate(|state| state.set_last_error(Some(message)))
            .await;
        Err(ActionError::Remote(err))
    }
}

/// Holds `loading` high until dropped, whatever way the action ends.
#[must_use]
pub(crate) struct InFlight {
    kind: StoreKind,
    loading: Arc<AtomicBool>,
    events: broadcast::Sender<StoreEvent>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.loading.store(false, Ordering::Release);
        let _ = self.events.send(StoreEvent::LoadingChanged {
            store: self.kind,
            loading: false,
        });
    }
}

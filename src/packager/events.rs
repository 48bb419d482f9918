//! Lifecycle events and listener registration.
//!
//! Listeners are either one-shot ([`EventHub::once`], fires at most once and
//! is then dropped) or persistent ([`EventHub::on`]). [`EventHub::subscribe`]
//! hands out a channel receiving every event.

use super::error::Stage;
use std::{
    fmt,
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::sync::mpsc;

/// Progress notification for a pipeline stage transition.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum LifecycleEvent {
    CompileStart,
    CompileComplete,
    CompileFailed,
    DependenciesStart,
    DependenciesComplete,
    DependenciesFailed,
    BundleStart,
    BundleComplete,
    BundleFailed,
}

impl LifecycleEvent {
    /// Start event of `stage`. Detection has no lifecycle events.
    pub fn start_of(stage: Stage) -> Option<Self> {
        match stage {
            Stage::Detect => None,
            Stage::Compile => Some(Self::CompileStart),
            Stage::Dependencies => Some(Self::DependenciesStart),
            Stage::Bundle => Some(Self::BundleStart),
        }
    }

    pub fn complete_of(stage: Stage) -> Option<Self> {
        match stage {
            Stage::Detect => None,
            Stage::Compile => Some(Self::CompileComplete),
            Stage::Dependencies => Some(Self::DependenciesComplete),
            Stage::Bundle => Some(Self::BundleComplete),
        }
    }

    pub fn failed_of(stage: Stage) -> Option<Self> {
        match stage {
            Stage::Detect => None,
            Stage::Compile => Some(Self::CompileFailed),
            Stage::Dependencies => Some(Self::DependenciesFailed),
            Stage::Bundle => Some(Self::BundleFailed),
        }
    }

    /// Stage the event belongs to.
    pub fn stage(&self) -> Stage {
        match self {
            Self::CompileStart | Self::CompileComplete | Self::CompileFailed => Stage::Compile,
            Self::DependenciesStart | Self::DependenciesComplete | Self::DependenciesFailed => {
                Stage::Dependencies
            }
            Self::BundleStart | Self::BundleComplete | Self::BundleFailed => Stage::Bundle,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CompileStart => "compile-start",
            Self::CompileComplete => "compile-complete",
            Self::CompileFailed => "compile-failed",
            Self::DependenciesStart => "dependencies-start",
            Self::DependenciesComplete => "dependencies-complete",
            Self::DependenciesFailed => "dependencies-failed",
            Self::BundleStart => "bundle-start",
            Self::BundleComplete => "bundle-complete",
            Self::BundleFailed => "bundle-failed",
        })
    }
}

/// Handle returned by [`EventHub::on`], used to remove the listener again.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ListenerId(u64);

type OnceListener = Box<dyn FnOnce() + Send>;
type Listener = Box<dyn FnMut(LifecycleEvent) + Send>;

#[derive(Default)]
struct Listeners {
    once: Vec<(LifecycleEvent, OnceListener)>,
    persistent: Vec<(ListenerId, Listener)>,
    channels: Vec<mpsc::UnboundedSender<LifecycleEvent>>,
}

/// Dispatches lifecycle events to registered listeners.
#[derive(Default)]
pub struct EventHub {
    listeners: Mutex<Listeners>,
    next_id: AtomicU64,
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub").finish_non_exhaustive()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for the next occurrence of `event` only.
    pub fn once(&self, event: LifecycleEvent, listener: impl FnOnce() + Send + 'static) {
        self.lock().once.push((event, Box::new(listener)));
    }

    /// Registers `listener` for every event until removed.
    pub fn on(&self, listener: impl FnMut(LifecycleEvent) + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().persistent.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener registered with [`EventHub::on`].
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.persistent.len();
        listeners.persistent.retain(|(lid, _)| *lid != id);
        listeners.persistent.len() != before
    }

    /// Returns a receiver for every subsequent event. Dropping it unsubscribes.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<LifecycleEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().channels.push(tx);
        rx
    }

    /// Delivers `event` to all matching listeners.
    ///
    /// Listeners run outside the internal lock, so they may register further
    /// listeners.
    pub fn emit(&self, event: LifecycleEvent) {
        log::debug!("Lifecycle event: {event}");

        let (fire_once, mut persistent) = {
            let mut listeners = self.lock();
            listeners.channels.retain(|tx| tx.send(event).is_ok());

            let (fire, keep): (Vec<_>, Vec<_>) = std::mem::take(&mut listeners.once)
                .into_iter()
                .partition(|(e, _)| *e == event);
            listeners.once = keep;
            (fire, std::mem::take(&mut listeners.persistent))
        };

        for (_, listener) in fire_once {
            listener();
        }
        for (_, listener) in persistent.iter_mut() {
            listener(event);
        }

        // Put persistent listeners back ahead of any registered while dispatching.
        let mut listeners = self.lock();
        persistent.append(&mut listeners.persistent);
        listeners.persistent = persistent;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Listeners> {
        match self.listeners.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn once_listener_fires_a_single_time() {
        let hub = EventHub::new();
        let count = Arc::new(AtomicU64::new(0));
        let c = count.clone();
        hub.once(LifecycleEvent::CompileStart, move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        hub.emit(LifecycleEvent::DependenciesStart);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        hub.emit(LifecycleEvent::CompileStart);
        hub.emit(LifecycleEvent::CompileStart);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn persistent_listener_sees_all_events_until_removed() {
        let hub = EventHub::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let id = hub.on(move |e| s.lock().unwrap().push(e));

        hub.emit(LifecycleEvent::CompileStart);
        hub.emit(LifecycleEvent::BundleStart);
        assert!(hub.off(id));
        hub.emit(LifecycleEvent::BundleComplete);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![LifecycleEvent::CompileStart, LifecycleEvent::BundleStart]
        );
        assert!(!hub.off(id));
    }

    #[test]
    fn listener_may_register_during_dispatch() {
        let hub = Arc::new(EventHub::new());
        let inner = hub.clone();
        let fired = Arc::new(AtomicU64::new(0));
        let f = fired.clone();
        hub.once(LifecycleEvent::CompileStart, move || {
            inner.once(LifecycleEvent::BundleStart, move || {
                f.fetch_add(1, Ordering::SeqCst);
            });
        });

        hub.emit(LifecycleEvent::CompileStart);
        hub.emit(LifecycleEvent::BundleStart);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let hub = EventHub::new();
        let mut rx = hub.subscribe();
        hub.emit(LifecycleEvent::CompileStart);
        hub.emit(LifecycleEvent::CompileComplete);

        assert_eq!(rx.recv().await, Some(LifecycleEvent::CompileStart));
        assert_eq!(rx.recv().await, Some(LifecycleEvent::CompileComplete));
    }

    #[test]
    fn events_map_back_to_stages() {
        for stage in [Stage::Compile, Stage::Dependencies, Stage::Bundle] {
            assert_eq!(LifecycleEvent::start_of(stage).unwrap().stage(), stage);
            assert_eq!(LifecycleEvent::failed_of(stage).unwrap().stage(), stage);
        }
        assert_eq!(LifecycleEvent::start_of(Stage::Detect), None);
    }
}

//! Per-event subscriber registry with snapshot dispatch.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tracing::{debug, trace};

use crate::models::{EventData, EventName};

/// Subscriber callback. Identity is the `Arc` allocation, so keep a clone of the
/// same `Arc` around to re-subscribe or compare.
pub type Callback = Arc<dyn Fn(&EventData) + Send + Sync>;

type Registry = RwLock<HashMap<EventName, Vec<Callback>>>;

fn same_callback(a: &Callback, b: &Callback) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Fans out validated payloads to the subscribers of each event, in subscription order.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    subscribers: Arc<Registry>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for `event`. Registering the same `Arc` again is a no-op,
    /// but still yields a working handle.
    pub fn subscribe(&self, event: EventName, callback: &Callback) -> Subscription {
        {
            let mut subs = self
                .subscribers
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let list = subs.entry(event).or_default();
            if list.iter().any(|c| same_callback(c, callback)) {
                trace!(event = event.as_wire(), "duplicate subscriber ignored");
            } else {
                list.push(callback.clone());
                debug!(event = event.as_wire(), count = list.len(), "subscribed");
            }
        }

        Subscription {
            registry: Arc::downgrade(&self.subscribers),
            event,
            callback: callback.clone(),
            active: AtomicBool::new(true),
        }
    }

    /// Wrap a closure and subscribe it.
    pub fn subscribe_fn<F>(&self, event: EventName, f: F) -> Subscription
    where
        F: Fn(&EventData) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(f);
        self.subscribe(event, &callback)
    }

    /// Dispatch by wire name; names other than the known events are ignored.
    pub fn dispatch(&self, event: &str, payload: &EventData) {
        match EventName::from_wire(event) {
            Some(name) => self.dispatch_event(name, payload),
            None => trace!(event, "ignoring unknown event"),
        }
    }

    /// Invoke every subscriber registered when the dispatch started.
    /// Subscribes and unsubscribes made by callbacks take effect on the next dispatch.
    pub fn dispatch_event(&self, event: EventName, payload: &EventData) {
        let snapshot: Vec<Callback> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event)
            .cloned()
            .unwrap_or_default();

        trace!(event = event.as_wire(), subscribers = snapshot.len(), "dispatch");
        for callback in &snapshot {
            callback(payload);
        }
    }

    pub fn subscriber_count(&self, event: EventName) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&event)
            .map_or(0, Vec::len)
    }
}

/// Handle returned by `EventDispatcher::subscribe`.
///
/// Dropping it leaves the subscriber registered; call `unsubscribe` to remove it.
pub struct Subscription {
    registry: Weak<Registry>,
    event: EventName,
    callback: Callback,
    active: AtomicBool,
}

impl Subscription {
    /// Remove this handle's callback. Only the first call has an effect.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::AcqRel) {
            return;
        }
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut subs = registry.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = subs.get_mut(&self.event) {
            list.retain(|c| !same_callback(c, &self.callback));
            debug!(event = self.event.as_wire(), count = list.len(), "unsubscribed");
        }
    }

    pub fn event(&self) -> EventName {
        self.event
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Turn the handle into a guard that unsubscribes when dropped.
    pub fn into_guard(self) -> SubscriptionGuard {
        SubscriptionGuard(self)
    }
}

/// Unsubscribes on drop.
pub struct SubscriptionGuard(Subscription);

impl SubscriptionGuard {
    pub fn unsubscribe(&self) {
        self.0.unsubscribe();
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.unsubscribe();
    }
}

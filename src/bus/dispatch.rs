//! Synchronous fan-out of bus events to attached listeners.

use super::{BusEvent, Channel};
use log::trace;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Callback invoked for every event on a subscribed channel.
pub type Listener = Arc<dyn Fn(&BusEvent) + Send + Sync>;

/// Handle returned by [`DispatchBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// In-process publish/subscribe keyed by [`Channel`].
///
/// `publish` calls every listener attached at that moment, on the caller's
/// thread, then returns. There is no queue: a listener attached after the
/// publish never sees the event.
#[derive(Default)]
pub struct DispatchBus {
    listeners: Mutex<HashMap<Channel, Vec<(SubscriptionId, Listener)>>>,
    next_id: AtomicU64,
}

impl DispatchBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, channel: Channel, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners
            .lock()
            .entry(channel)
            .or_default()
            .push((id, listener));
        id
    }

    /// Detach a listener. Returns `false` if it was not attached.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.lock();
        let mut found = false;
        listeners.retain(|_, attached| {
            let before = attached.len();
            attached.retain(|(sub_id, _)| *sub_id != id);
            found |= attached.len() != before;
            !attached.is_empty()
        });
        found
    }

    /// Deliver `event` to every listener on `channel`. Returns how many were called.
    pub fn publish(&self, channel: &Channel, event: BusEvent) -> usize {
        // Listeners may subscribe or publish themselves, so call them unlocked
        let targets: Vec<Listener> = match self.listeners.lock().get(channel) {
            Some(attached) => attached.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => return 0,
        };

        trace!("[Bus] {:?} -> {} listener(s)", channel, targets.len());
        for listener in &targets {
            listener(&event);
        }
        targets.len()
    }

    pub fn listener_count(&self, channel: &Channel) -> usize {
        self.listeners.lock().get(channel).map_or(0, Vec::len)
    }
}

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::logging::log_stream_event;

/// Open/closed flag shared between a handle and whatever produces its events.
/// Closing is one-way; only the first `close` reports `true`.
#[derive(Debug, Clone, Default)]
pub struct ChannelGuard {
    closed: Arc<AtomicBool>,
}

impl ChannelGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst)
    }

    pub fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// Single-use handle to one open subscription.
///
/// `release` closes the guard and runs the release hook (aborting the pump
/// task for HTTP streams). Repeated releases, or a release after the
/// transport already failed, do nothing. Dropping an unreleased handle
/// releases it.
pub struct SubscriptionHandle {
    entity_id: String,
    guard: ChannelGuard,
    on_release: Mutex<Option<ReleaseHook>>,
}

impl SubscriptionHandle {
    pub fn new(entity_id: &str, guard: ChannelGuard) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            guard,
            on_release: Mutex::new(None),
        }
    }

    pub fn on_release(self, hook: impl FnOnce() + Send + 'static) -> Self {
        if let Ok(mut slot) = self.on_release.lock() {
            *slot = Some(Box::new(hook));
        }
        self
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn is_open(&self) -> bool {
        self.guard.is_open()
    }

    /// Returns `true` only for the call that actually closed the channel.
    pub fn release(&self) -> bool {
        if !self.guard.close() {
            return false;
        }
        let hook = self.on_release.lock().ok().and_then(|mut slot| slot.take());
        if let Some(hook) = hook {
            hook();
        }
        log_stream_event("stream_released", &self.entity_id, "released by owner");
        true
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("entity_id", &self.entity_id)
            .field("open", &self.is_open())
            .finish()
    }
}

//! Detail panel controller: binds the selected campaign to one live
//! insights subscription.
//!
//! ```text
//!   select(E) ──► Loading ──(fetch ok / update)──► Live
//!                    │                               │
//!                    └──────────(stream error)───────┴──► Stale
//!   clear / select(other) / drop ──► Empty (handle released first)
//! ```
//!
//! Fetch results and stream callbacks are funnelled into one channel and
//! applied one at a time by whoever owns the controller (`process_next`,
//! `drain_ready`). Every event carries the generation that was current when
//! it was dispatched; a selection change bumps the generation, so anything
//! still in flight for the old selection is discarded on arrival.
//!
//! `select` spawns the fetch on the ambient tokio runtime.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::InsightsSnapshot;
use crate::insights::{InsightsSource, SubscriptionHandle};
use crate::logging::{log_fetch_failed, log_panel_transition};

pub mod state;

pub use state::{Outcome, PanelEvent, PanelState, PanelView, Tagged};

pub struct PanelController<S: InsightsSource + 'static> {
    source: Arc<S>,
    selection: Option<String>,
    generation: u64,
    handle: Option<SubscriptionHandle>,
    state: PanelState,
    snapshot: Option<InsightsSnapshot>,
    error: Option<String>,
    tx: mpsc::UnboundedSender<Tagged>,
    rx: mpsc::UnboundedReceiver<Tagged>,
}

impl<S: InsightsSource + 'static> PanelController<S> {
    pub fn new(source: Arc<S>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            source,
            selection: None,
            generation: 0,
            handle: None,
            state: PanelState::Empty,
            snapshot: None,
            error: None,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> Option<&InsightsSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_streaming(&self) -> bool {
        self.view().is_streaming()
    }

    pub fn has_open_subscription(&self) -> bool {
        self.handle.as_ref().map(|h| h.is_open()).unwrap_or(false)
    }

    pub fn view(&self) -> PanelView<'_> {
        PanelView {
            state: self.state,
            entity_id: self.selection.as_deref(),
            snapshot: self.snapshot.as_ref(),
            error: self.error.as_deref(),
        }
    }

    /// Selects `entity_id`, releasing any previous subscription before the
    /// new one is opened. Selecting the current entity again does nothing.
    pub fn select(&mut self, entity_id: &str) {
        if self.selection.as_deref() == Some(entity_id) {
            return;
        }
        self.reset("selection_changed");
        self.selection = Some(entity_id.to_string());
        self.transition(PanelState::Loading, "selected");

        let generation = self.generation;

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let id = entity_id.to_string();
        tokio::spawn(async move {
            let result = source.fetch_snapshot(&id).await;
            let _ = tx.send(Tagged {
                generation,
                event: PanelEvent::Fetched(result),
            });
        });

        let tx_update = self.tx.clone();
        let tx_error = self.tx.clone();
        let handle = self.source.subscribe(
            entity_id,
            Box::new(move |snapshot| {
                let _ = tx_update.send(Tagged {
                    generation,
                    event: PanelEvent::Update(snapshot),
                });
            }),
            Box::new(move |err| {
                let _ = tx_error.send(Tagged {
                    generation,
                    event: PanelEvent::StreamFailed(err),
                });
            }),
        );
        self.handle = Some(handle);
    }

    pub fn clear(&mut self) {
        if self.selection.is_none() && self.handle.is_none() {
            return;
        }
        self.reset("cleared");
    }

    /// Releases the subscription and invalidates everything in flight.
    fn reset(&mut self, cause: &str) {
        if let Some(handle) = self.handle.take() {
            handle.release();
        }
        self.generation += 1;
        self.selection = None;
        self.snapshot = None;
        self.error = None;
        self.transition(PanelState::Empty, cause);
    }

    fn transition(&mut self, to: PanelState, cause: &str) {
        if self.state != to {
            log_panel_transition(self.generation, self.selection.as_deref(), self.state.as_str(), to.as_str(), cause);
        }
        self.state = to;
    }

    /// Applies one event if it belongs to the current selection.
    pub fn apply(&mut self, tagged: Tagged) -> Outcome {
        if tagged.generation != self.generation || self.selection.is_none() {
            log_panel_transition(
                tagged.generation,
                self.selection.as_deref(),
                self.state.as_str(),
                self.state.as_str(),
                "discarded_stale_result",
            );
            return Outcome::Discarded;
        }

        match tagged.event {
            PanelEvent::Fetched(Ok(snapshot)) => {
                self.snapshot = Some(snapshot);
                // a fetch cannot revive a dead channel
                if self.state != PanelState::Stale {
                    self.error = None;
                    self.transition(PanelState::Live, "fetch_ok");
                }
            }
            PanelEvent::Fetched(Err(err)) => {
                // no snapshot yet; the stream may still populate it
                log_fetch_failed("insights", self.selection.as_deref(), &err.to_string());
            }
            PanelEvent::Update(snapshot) => {
                if self.state == PanelState::Stale {
                    return Outcome::Discarded;
                }
                self.snapshot = Some(snapshot);
                self.error = None;
                self.transition(PanelState::Live, "update");
            }
            PanelEvent::StreamFailed(err) => {
                if self.state == PanelState::Stale {
                    return Outcome::Discarded;
                }
                if let Some(handle) = self.handle.take() {
                    handle.release();
                }
                self.error = Some(err.to_string());
                self.transition(PanelState::Stale, "stream_failed");
            }
        }
        Outcome::Applied(self.state)
    }

    /// Waits for the next delivered event and applies it.
    pub async fn process_next(&mut self) -> Outcome {
        match self.rx.recv().await {
            Some(tagged) => self.apply(tagged),
            None => Outcome::Discarded,
        }
    }

    /// Applies everything already queued without waiting. Returns how many
    /// events were applied (discarded ones are not counted).
    pub fn drain_ready(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(tagged) = self.rx.try_recv() {
            if let Outcome::Applied(_) = self.apply(tagged) {
                applied += 1;
            }
        }
        applied
    }

    /// Tears the panel down. Also runs on drop.
    pub fn shutdown(&mut self) {
        self.clear();
    }
}

impl<S: InsightsSource + 'static> Drop for PanelController<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.release();
        }
    }
}

use crate::api::InsightsSnapshot;
use crate::error::{ApiError, StreamError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    /// Nothing selected.
    Empty,
    /// Selected; fetch and subscription dispatched, nothing received yet.
    Loading,
    /// At least one snapshot applied and the channel is up.
    Live,
    /// Channel failed. Last snapshot (if any) retained, error surfaced.
    Stale,
}

impl PanelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PanelState::Empty => "empty",
            PanelState::Loading => "loading",
            PanelState::Live => "live",
            PanelState::Stale => "stale",
        }
    }
}

#[derive(Debug)]
pub enum PanelEvent {
    Fetched(Result<InsightsSnapshot, ApiError>),
    Update(InsightsSnapshot),
    StreamFailed(StreamError),
}

impl PanelEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            PanelEvent::Fetched(Ok(_)) => "fetch_ok",
            PanelEvent::Fetched(Err(_)) => "fetch_err",
            PanelEvent::Update(_) => "update",
            PanelEvent::StreamFailed(_) => "stream_failed",
        }
    }
}

/// An event stamped with the selection generation it was dispatched under.
#[derive(Debug)]
pub struct Tagged {
    pub generation: u64,
    pub event: PanelEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied(PanelState),
    /// Dispatched under an earlier selection, or no longer meaningful.
    Discarded,
}

/// Read-only view handed to the renderer.
#[derive(Debug, Clone, Copy)]
pub struct PanelView<'a> {
    pub state: PanelState,
    pub entity_id: Option<&'a str>,
    pub snapshot: Option<&'a InsightsSnapshot>,
    pub error: Option<&'a str>,
}

impl PanelView<'_> {
    pub fn is_streaming(&self) -> bool {
        matches!(self.state, PanelState::Loading | PanelState::Live)
    }
}

//! Per-campaign insights: one-shot fetch plus a server-push subscription.

use async_trait::async_trait;

use crate::api::InsightsSnapshot;
use crate::error::{ApiError, StreamError};

pub mod client;
pub mod sse;
pub mod subscription;

pub use client::HttpInsightsClient;
pub use subscription::{ChannelGuard, SubscriptionHandle};

pub type UpdateFn = Box<dyn FnMut(InsightsSnapshot) + Send>;
pub type ErrorFn = Box<dyn FnOnce(StreamError) + Send>;

#[async_trait]
pub trait InsightsSource: Send + Sync {
    /// Single request for the current snapshot. No retry.
    async fn fetch_snapshot(&self, entity_id: &str) -> Result<InsightsSnapshot, ApiError>;

    /// Opens a push channel for `entity_id`.
    ///
    /// `on_update` fires once per well-formed message; malformed messages are
    /// dropped. A transport failure calls `on_error` exactly once and ends the
    /// channel. Nothing is delivered after the handle is released.
    fn subscribe(&self, entity_id: &str, on_update: UpdateFn, on_error: ErrorFn) -> SubscriptionHandle;
}

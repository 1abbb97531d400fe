//! Adapter interfaces for external systems.
//!
//! Adapters deliver notifications to whatever backend is configured. The
//! only production backend is a transactional-email HTTP API.

pub mod email;

use async_trait::async_trait;

use crate::domain::Payload;

// Re-export the email adapter
pub use email::{DeliveryClient, DeliveryError, DeliveryOutcome, DeliverySettings};

/// Trait for notification backends
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Human-readable backend name
    fn name(&self) -> &str;

    /// Deliver one payload.
    ///
    /// Never fails: transport and API errors are reported through the
    /// returned outcome.
    async fn send(&self, payload: &Payload) -> DeliveryOutcome;
}

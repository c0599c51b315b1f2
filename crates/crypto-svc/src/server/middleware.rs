//! Axum middleware layers applied to the router.
//!
//! Includes request tracing, timeout enforcement, and response compression.

use std::time::Duration;

/// Default per-request timeout applied to all routes.
///
/// Bounds the whole call, including the credential-store round trip, which has
/// its own tighter deadline in [`crate::service::EnvelopeService`].
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

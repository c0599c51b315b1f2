//! Tracing setup: structured JSON logs, optionally exported over OTLP.
//!
//! # Telemetry invariants
//!
//! - **No credentials, derived keys, plaintext, or ciphertext** may appear in
//!   any span attribute or log field.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`), overridden
//!   by `RUST_LOG` when set.

pub mod init;

pub use init::init_telemetry;

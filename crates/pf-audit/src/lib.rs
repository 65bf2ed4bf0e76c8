//! # pf-audit
//!
//! Decision telemetry and bounded audit retention for Preflight.
//!
//! Every gate decision the engine renders carries a [`Telemetry`] snapshot
//! (the payload a caller forwards to its observability pipeline) and a short
//! audit identifier derived from a SHA-256 digest. Decisions are retained in
//! an in-memory [`AuditTrail`] ring buffer bounded at a configured capacity;
//! nothing in this crate writes to any external sink.
//!
//! ## Quick Example
//!
//! ```rust
//! use pf_audit::{short_digest, AuditTrail};
//!
//! let id = short_digest("agent-1:refund_customer_12345:2026-08-04T12:00:00Z");
//! assert_eq!(id.len(), 8);
//!
//! let mut trail: AuditTrail<String> = AuditTrail::new(2);
//! trail.push("first".to_string());
//! trail.push("second".to_string());
//! trail.push("third".to_string()); // evicts "first"
//! assert_eq!(trail.len(), 2);
//! ```

// Module declarations — each `mod foo;` tells Rust to look for `foo.rs`
// in the same directory and include it as a submodule.
pub mod hasher;
pub mod telemetry;
pub mod trail;

// Re-export the main types at the crate root for convenience.
pub use hasher::{hash_bytes, hash_str, short_digest};
pub use telemetry::Telemetry;
pub use trail::AuditTrail;

//! # pf-gate
//!
//! Pre-execution safety gates for Preflight.
//!
//! Agents consult a per-identity [`GateEngine`] before performing any
//! state-changing action. The engine evaluates five weighted gates against
//! the proposed action, its stated reasoning, and a cache of recently
//! observed world-state, then returns a binding [`GateDecision`]:
//! deny means do not execute, a human-review flag means route to an
//! approver, and a non-zero override price is a paid-bypass signal the
//! caller may expose to an operator.
//!
//! ## Key invariants
//!
//! - **Hard blocks are absolute**: a failed `blast_bounded` or `reversible`
//!   gate denies the action regardless of aggregate risk.
//! - **Risk is additive**: the score is the sum of the weights of failed
//!   gates; configured weights sum to 1.0.
//! - **No error channel per call**: malformed input fails gates and surfaces
//!   as a denial with explanation, never as an error. The only genuine
//!   fault is an invalid [`GatePolicy`], rejected at construction time.
//! - **Every decision is retained**: allowed or not, each decision lands in
//!   the bounded audit trail.

pub mod clock;
pub mod decision;
pub mod engine;
pub mod error;
mod gates;
pub mod policy;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::{Gate, GateDecision, GateOutcome};
pub use engine::{ExecutionRequest, GateEngine};
pub use error::PolicyError;
pub use policy::{GatePolicy, MarkerSet};
pub use state::{StateCache, StateEntry};

// Re-export the telemetry payload so downstream callers only need pf-gate.
pub use pf_audit::Telemetry;

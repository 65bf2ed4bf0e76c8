// decision.rs — Gate identifiers and the decision data model.
//
// GateDecision is the wire contract with downstream systems (telemetry
// pipelines, human-review queues, override billing). It is constructed once
// per evaluation, never mutated, and retained in the engine's audit trail.

use serde::{Deserialize, Serialize};

use pf_audit::Telemetry;

/// The five safety gates, in their fixed evaluation order.
///
/// In Rust, an `enum` with unit variants is a closed set of identifiers.
/// `rename_all = "snake_case"` makes these serialize as "intent_clear",
/// "state_fresh", and so on — the names downstream systems key on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    /// The action and reasoning are specific, not vague boilerplate.
    IntentClear,
    /// Every declared state dependency was observed recently.
    StateFresh,
    /// The action's scope is bounded — no bulk/sweeping operations.
    BlastBounded,
    /// The action can be undone.
    Reversible,
    /// The reasoning contains a causal explanation.
    ReasoningValid,
}

impl Gate {
    /// All gates in evaluation order. Order affects only the reported
    /// reason text, never the aggregate decision.
    pub const ALL: [Gate; 5] = [
        Gate::IntentClear,
        Gate::StateFresh,
        Gate::BlastBounded,
        Gate::Reversible,
        Gate::ReasoningValid,
    ];

    /// The gate's wire name, matching its serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gate::IntentClear => "intent_clear",
            Gate::StateFresh => "state_fresh",
            Gate::BlastBounded => "blast_bounded",
            Gate::Reversible => "reversible",
            Gate::ReasoningValid => "reasoning_valid",
        }
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One gate's outcome for one evaluation. Ephemeral — produced fresh on
/// every call and folded into the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateOutcome {
    pub gate: Gate,
    pub passed: bool,
}

/// The engine's output for one proposed action.
///
/// Deny means do not execute. `human_review_required` means route to an
/// approver. A non-zero `override_price` is an advisory paid-bypass signal —
/// the engine prices the override but never grants it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateDecision {
    /// Whether the caller may execute the action.
    pub allowed: bool,

    /// Human-readable summary naming every failed gate.
    pub reason: String,

    /// Gates that passed, in evaluation order.
    pub gates_passed: Vec<Gate>,

    /// Gates that failed, in evaluation order.
    pub gates_failed: Vec<Gate>,

    /// Sum of the weights of failed gates, in [0, 1].
    pub risk_score: f64,

    /// Whether the action must be routed to a human approver.
    pub human_review_required: bool,

    /// Advisory cost of a human-operator bypass; 0.0 when none is offered.
    pub override_price: f64,

    /// Short digest correlating this decision across log lines.
    pub audit_id: String,

    /// The snapshot a caller forwards to its observability pipeline.
    pub telemetry: Telemetry,
}

impl GateDecision {
    /// Whether a given gate failed in this decision.
    pub fn failed(&self, gate: Gate) -> bool {
        self.gates_failed.contains(&gate)
    }
}

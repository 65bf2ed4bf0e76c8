// engine.rs — The pre-execution gate engine.
//
// One GateEngine is scoped to one agent identity. Every state-changing
// action the agent proposes passes through `can_execute()`, which runs the
// five gates in fixed order, sums the weights of the failures into a risk
// score, applies the hard-block and threshold policy, and records the
// decision in the audit trail.
//
// The engine is deliberately crash-proof: no input shape can make a
// decision call fail. Only an invalid policy is an error, and that is
// rejected at construction.
//
// Concurrency: the cache and trail sit behind one mutex because parallel
// sub-tasks of the same agent may call in concurrently. The lock is held
// only while reading the cache snapshot and appending to the trail, never
// across the full gate evaluation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use chrono::SecondsFormat;
use tracing::{debug, warn};

use pf_audit::{short_digest, AuditTrail, Telemetry};

use crate::clock::{Clock, SystemClock};
use crate::decision::{Gate, GateDecision, GateOutcome};
use crate::error::PolicyError;
use crate::gates;
use crate::policy::GatePolicy;
use crate::state::StateCache;

/// A proposed action, submitted to the engine for evaluation.
#[derive(Debug, Clone, Default)]
pub struct ExecutionRequest {
    /// What the agent intends to do (e.g., "refund_customer_12345").
    pub action: String,
    /// Parameters of the action. Carried on the surface for callers and
    /// telemetry consumers; no stock gate inspects them.
    pub params: BTreeMap<String, serde_json::Value>,
    /// Why the agent believes the action is right.
    pub reasoning: String,
    /// State keys the agent asserts this action logically depends on.
    pub state_dependencies: BTreeSet<String>,
}

impl ExecutionRequest {
    /// Create a request with no params and no state dependencies.
    pub fn new(action: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            reasoning: reasoning.into(),
            params: BTreeMap::new(),
            state_dependencies: BTreeSet::new(),
        }
    }

    /// Add a parameter and return self (builder pattern).
    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Declare a state dependency and return self.
    pub fn with_dependency(mut self, key: impl Into<String>) -> Self {
        self.state_dependencies.insert(key.into());
        self
    }
}

/// The shared mutable state: cache and trail move together under one lock
/// so a freshness check never observes a half-written entry.
struct Inner {
    cache: StateCache,
    trail: AuditTrail<GateDecision>,
}

/// The gate engine — one instance per agent identity.
///
/// Generic over its clock so tests drive time deterministically; production
/// callers use the default [`SystemClock`].
pub struct GateEngine<C: Clock = SystemClock> {
    agent_id: String,
    policy: GatePolicy,
    clock: C,
    inner: Mutex<Inner>,
}

impl GateEngine<SystemClock> {
    /// Create an engine on the system clock.
    ///
    /// The policy is validated eagerly; a bad policy never produces an
    /// engine.
    pub fn new(agent_id: impl Into<String>, policy: GatePolicy) -> Result<Self, PolicyError> {
        Self::with_clock(agent_id, policy, SystemClock)
    }
}

impl<C: Clock> GateEngine<C> {
    /// Create an engine on an explicit clock.
    pub fn with_clock(
        agent_id: impl Into<String>,
        policy: GatePolicy,
        clock: C,
    ) -> Result<Self, PolicyError> {
        policy.validate()?;
        let trail = AuditTrail::new(policy.trail_capacity);
        Ok(Self {
            agent_id: agent_id.into(),
            policy,
            clock,
            inner: Mutex::new(Inner {
                cache: StateCache::new(),
                trail,
            }),
        })
    }

    /// The agent identity this engine is scoped to.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// The validated policy this engine evaluates against.
    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    /// Record a fresh observation of a state key.
    ///
    /// Agents call this whenever they observe world facts; the observation
    /// timestamp is the engine clock's current reading.
    pub fn update_state(&self, key: impl Into<String>, value: serde_json::Value) {
        let now = self.clock.now();
        self.lock_inner().cache.update(key, value, now);
    }

    /// Evaluate a proposed action and render a binding decision.
    ///
    /// This is the single chokepoint — every state-changing action flows
    /// through here immediately before execution. It never fails: malformed
    /// input fails gates and surfaces as a denial with explanation.
    pub fn can_execute(&self, request: &ExecutionRequest) -> GateDecision {
        let now = self.clock.now();

        // The freshness gate reads the cache under the lock so it sees an
        // internally consistent snapshot; the other gates are pure text
        // checks and run unlocked.
        let fresh = {
            let inner = self.lock_inner();
            gates::state_fresh(
                &inner.cache,
                &request.state_dependencies,
                now,
                self.policy.freshness(),
            )
        };

        let outcomes = [
            GateOutcome {
                gate: Gate::IntentClear,
                passed: gates::intent_clear(&self.policy, &request.action, &request.reasoning),
            },
            GateOutcome {
                gate: Gate::StateFresh,
                passed: fresh,
            },
            GateOutcome {
                gate: Gate::BlastBounded,
                passed: gates::blast_bounded(&self.policy, &request.action),
            },
            GateOutcome {
                gate: Gate::Reversible,
                passed: gates::reversible(&self.policy, &request.action),
            },
            GateOutcome {
                gate: Gate::ReasoningValid,
                passed: gates::reasoning_valid(&self.policy, &request.reasoning),
            },
        ];

        let gates_passed: Vec<Gate> = outcomes
            .iter()
            .filter(|o| o.passed)
            .map(|o| o.gate)
            .collect();
        let gates_failed: Vec<Gate> = outcomes
            .iter()
            .filter(|o| !o.passed)
            .map(|o| o.gate)
            .collect();

        let risk_score: f64 = gates_failed.iter().map(|&g| self.policy.weight(g)).sum();
        let hard_blocked = gates_failed.iter().any(|&g| self.policy.is_hard_block(g));

        let allowed = !hard_blocked && risk_score < self.policy.allow_threshold;
        let human_review_required = risk_score > self.policy.review_threshold || hard_blocked;
        let override_price = if risk_score > self.policy.override_threshold {
            self.policy.override_price
        } else {
            0.0
        };

        let reason = if gates_failed.is_empty() {
            format!("ALLOWED - risk score {:.1}%", risk_score * 100.0)
        } else {
            let names: Vec<&str> = gates_failed.iter().map(Gate::as_str).collect();
            format!(
                "BLOCKED: {} - risk score {:.1}%",
                names.join(", "),
                risk_score * 100.0
            )
        };

        // The nanosecond timestamp makes repeated calls diverge; uniqueness
        // is probabilistic, and a collision is an acceptable index quirk.
        let audit_id = short_digest(&format!(
            "{}:{}:{}",
            self.agent_id,
            request.action,
            now.to_rfc3339_opts(SecondsFormat::Nanos, true)
        ));

        let gate_map: BTreeMap<String, bool> = outcomes
            .iter()
            .map(|o| (o.gate.as_str().to_string(), o.passed))
            .collect();
        let telemetry = Telemetry::new(now, self.agent_id.clone(), request.action.clone(), gate_map);

        let decision = GateDecision {
            allowed,
            reason,
            gates_passed,
            gates_failed,
            risk_score,
            human_review_required,
            override_price,
            audit_id,
            telemetry,
        };

        if hard_blocked {
            warn!(
                "hard block for agent '{}': action '{}' denied ({})",
                self.agent_id, request.action, decision.reason
            );
        } else {
            debug!(
                "decision {} for agent '{}': allowed={} risk={:.2}",
                decision.audit_id, self.agent_id, decision.allowed, decision.risk_score
            );
        }

        self.lock_inner().trail.push(decision.clone());
        decision
    }

    /// An ordered snapshot of retained decisions, oldest first.
    ///
    /// Bounded by the policy's trail capacity — callers needing durability
    /// consume each decision's telemetry as it is rendered.
    pub fn decisions(&self) -> Vec<GateDecision> {
        self.lock_inner().trail.snapshot()
    }

    /// Lock the shared state, recovering the guard if a panicking thread
    /// poisoned the mutex.
    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

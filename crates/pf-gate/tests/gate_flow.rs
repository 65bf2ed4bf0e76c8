// gate_flow.rs — End-to-end integration tests for the gate engine.
//
// These tests exercise the complete Preflight flow the way a calling agent
// would drive it:
//
//   1. Construct a GateEngine for one agent identity
//   2. Refresh observed world-state through update_state
//   3. Propose actions through can_execute immediately before acting
//   4. Honor the decision: deny ⇒ do not execute, review flag ⇒ route to
//      a human, override price ⇒ optional paid bypass owned by the caller
//   5. Read the retained decision trail back for correlation
//
// VERIFY:
//   - The canonical refund/promo scenarios decide exactly as documented
//   - The decision policy is exactly its predicate, across a request sweep
//   - Freshness follows the injected clock across the 30-second window
//   - The trail stays bounded and ordered
//   - Concurrent callers on one engine lose no decisions

use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;

use pf_gate::{
    ExecutionRequest, Gate, GateDecision, GateEngine, GatePolicy, ManualClock,
};

fn fixed_clock() -> ManualClock {
    ManualClock::new(Utc.with_ymd_and_hms(2026, 8, 4, 12, 0, 0).unwrap())
}

fn engine_at(clock: &ManualClock) -> GateEngine<ManualClock> {
    GateEngine::with_clock("agent-1", GatePolicy::default(), clock.clone()).unwrap()
}

// ── Canonical scenarios ──

#[test]
fn bulk_refund_is_hard_blocked_despite_fresh_state() {
    let clock = fixed_clock();
    let engine = engine_at(&clock);

    engine.update_state("customer_orders", json!(["ord-1", "ord-2"]));

    let request = ExecutionRequest::new("refund_all_customers", "bulk discount action")
        .with_dependency("customer_orders");
    let decision = engine.can_execute(&request);

    // "refund_all_customers" trips the broad-scope markers, and
    // blast_bounded is a hard block: denied no matter the aggregate risk.
    assert!(!decision.allowed);
    assert!(decision.human_review_required);
    assert!(decision.failed(Gate::BlastBounded));
    // State was fresh, so that gate is not among the failures.
    assert!(!decision.failed(Gate::StateFresh));
    assert!(decision.reason.starts_with("BLOCKED:"));
    assert!(decision.reason.contains("blast_bounded"));
}

#[test]
fn well_reasoned_single_refund_is_allowed() {
    let clock = fixed_clock();
    let engine = engine_at(&clock);

    let request = ExecutionRequest::new(
        "refund_customer_12345",
        "Customer requested refund because order was damaged in shipping. \
         Policy allows full refund for shipping damage.",
    )
    .with_param("amount", json!(49.99));
    let decision = engine.can_execute(&request);

    assert!(decision.allowed);
    assert_eq!(decision.risk_score, 0.0);
    assert!(!decision.human_review_required);
    assert_eq!(decision.override_price, 0.0);
    assert_eq!(decision.gates_passed, Gate::ALL.to_vec());
    assert_eq!(decision.reason, "ALLOWED - risk score 0.0%");
}

#[test]
fn vague_bulk_promo_fails_three_gates() {
    let clock = fixed_clock();
    let engine = engine_at(&clock);

    let request = ExecutionRequest::new("send_promotional_email_all", "send promo");
    let decision = engine.can_execute(&request);

    assert_eq!(
        decision.gates_failed,
        vec![Gate::IntentClear, Gate::BlastBounded, Gate::ReasoningValid]
    );
    // 0.15 + 0.30 + 0.10
    assert!((decision.risk_score - 0.55).abs() < 1e-9);
    assert!(!decision.allowed);
    assert!(decision.human_review_required);
    // Risk above 0.5 gets an override priced — advisory only, the denial
    // stands until a human takes the bypass path.
    assert_eq!(decision.override_price, 5.0);
}

// ── Decision policy is exactly its predicate ──

#[test]
fn decision_policy_invariants_hold_across_request_sweep() {
    let clock = fixed_clock();
    let engine = engine_at(&clock);
    let policy = GatePolicy::default();

    engine.update_state("inventory", json!(40));
    clock.advance(Duration::seconds(60)); // "inventory" is now stale

    let requests = vec![
        ExecutionRequest::new(
            "refund_customer_12345",
            "Customer requested refund because order was damaged in shipping.",
        ),
        ExecutionRequest::new("refund_all_customers", "bulk discount action"),
        ExecutionRequest::new("send_promotional_email_all", "send promo"),
        ExecutionRequest::new("drop_table_orders", "cleanup because the table is unused"),
        ExecutionRequest::new("", ""),
        ExecutionRequest::new(
            "archive_order_9876",
            "The order closed ninety days ago and retention expired.",
        ),
        ExecutionRequest::new(
            "refund_customer_12345",
            "Customer requested refund because order was damaged in shipping.",
        )
        .with_dependency("inventory"),
        ExecutionRequest::new(
            "refund_customer_12345",
            "Customer requested refund because order was damaged in shipping.",
        )
        .with_dependency("never_observed_key"),
    ];

    for request in &requests {
        let decision = engine.can_execute(request);

        // Risk is the sum of failed-gate weights, and lies in [0, 1].
        let expected_risk: f64 = decision
            .gates_failed
            .iter()
            .map(|&g| policy.weight(g))
            .sum();
        assert_eq!(decision.risk_score, expected_risk);
        assert!(decision.risk_score >= 0.0 && decision.risk_score <= 1.0);

        // Passed and failed partition the five gates, in evaluation order.
        let mut reported: Vec<Gate> = decision
            .gates_passed
            .iter()
            .chain(decision.gates_failed.iter())
            .copied()
            .collect();
        reported.sort();
        let mut all = Gate::ALL.to_vec();
        all.sort();
        assert_eq!(reported, all);

        let hard_blocked = decision
            .gates_failed
            .iter()
            .any(|&g| policy.is_hard_block(g));

        // allowed ⇔ !hard_blocked && risk < allow_threshold
        assert_eq!(
            decision.allowed,
            !hard_blocked && decision.risk_score < policy.allow_threshold
        );
        // human_review ⇔ risk > review_threshold || hard_blocked
        assert_eq!(
            decision.human_review_required,
            decision.risk_score > policy.review_threshold || hard_blocked
        );
        // override priced ⇔ risk > override_threshold
        let expected_price = if decision.risk_score > policy.override_threshold {
            policy.override_price
        } else {
            0.0
        };
        assert_eq!(decision.override_price, expected_price);

        // Telemetry mirrors the outcome partition.
        for gate in &decision.gates_failed {
            assert_eq!(decision.telemetry.gates[gate.as_str()], false);
        }
        for gate in &decision.gates_passed {
            assert_eq!(decision.telemetry.gates[gate.as_str()], true);
        }
    }

    // Every decision, allowed or denied, was retained in order.
    assert_eq!(engine.decisions().len(), requests.len());
}

#[test]
fn malformed_input_is_a_denial_not_an_error() {
    let clock = fixed_clock();
    let engine = engine_at(&clock);

    // Empty action, empty reasoning, unknown dependency — the worst shape a
    // caller can produce still comes back as a structured denial.
    let request = ExecutionRequest::new("", "").with_dependency("ghost");
    let decision = engine.can_execute(&request);

    assert!(!decision.allowed);
    assert!(decision.failed(Gate::IntentClear));
    assert!(decision.failed(Gate::StateFresh));
    assert!(decision.failed(Gate::ReasoningValid));
    // The empty action names no scope or irreversibility marker.
    assert!(!decision.failed(Gate::BlastBounded));
    assert!(!decision.failed(Gate::Reversible));
}

// ── Freshness window ──

#[test]
fn freshness_window_boundary_follows_the_clock() {
    let clock = fixed_clock();
    let engine = engine_at(&clock);

    engine.update_state("inventory", json!({"sku-1": 40}));
    let request = ExecutionRequest::new(
        "restock_sku_1_warehouse_a",
        "Stock dipped below threshold because of weekend sales volume.",
    )
    .with_dependency("inventory");

    // Exactly at the 30-second threshold the observation still counts.
    clock.advance(Duration::seconds(30));
    assert!(engine.can_execute(&request).allowed);

    // One second past, it does not.
    clock.advance(Duration::seconds(1));
    let stale = engine.can_execute(&request);
    assert!(!stale.allowed);
    assert_eq!(stale.gates_failed, vec![Gate::StateFresh]);

    // A fresh observation reopens the window.
    engine.update_state("inventory", json!({"sku-1": 12}));
    assert!(engine.can_execute(&request).allowed);
}

// ── Policy as data ──

#[test]
fn injected_markers_reshape_the_gates() {
    // A tuned policy where only "fleet-wide" is a scope marker: the stock
    // "all" marker no longer triggers, and the new one does.
    let yaml = r#"
markers:
  broad_scope: ["fleet-wide"]
"#;
    let policy = GatePolicy::from_yaml_str(yaml).unwrap();
    let engine = GateEngine::with_clock("agent-2", policy, fixed_clock()).unwrap();

    let allowed = engine.can_execute(&ExecutionRequest::new(
        "refund_all_customers",
        "Finance approved the batch because the vendor double-charged us.",
    ));
    assert!(allowed.allowed);

    let denied = engine.can_execute(&ExecutionRequest::new(
        "restart_fleet-wide_cache",
        "Latency regressed because the cache nodes hold stale routes.",
    ));
    assert!(!denied.allowed);
    assert!(denied.failed(Gate::BlastBounded));
}

#[test]
fn trail_retains_only_the_configured_window() {
    let mut policy = GatePolicy::default();
    policy.trail_capacity = 3;
    let engine = GateEngine::with_clock("agent-1", policy, fixed_clock()).unwrap();

    for i in 0..5 {
        engine.can_execute(&ExecutionRequest::new(
            format!("refund_customer_{i}"),
            "Customer requested refund because order was damaged in shipping.",
        ));
    }

    let decisions = engine.decisions();
    assert_eq!(decisions.len(), 3);
    // Oldest first, and the two earliest were evicted.
    let actions: Vec<&str> = decisions
        .iter()
        .map(|d| d.telemetry.action.as_str())
        .collect();
    assert_eq!(
        actions,
        vec!["refund_customer_2", "refund_customer_3", "refund_customer_4"]
    );
}

// ── Wire contract ──

#[test]
fn decision_serializes_to_the_wire_contract() {
    let clock = fixed_clock();
    let engine = engine_at(&clock);

    let decision = engine.can_execute(&ExecutionRequest::new(
        "refund_all_customers",
        "bulk discount action",
    ));

    let json = serde_json::to_value(&decision).unwrap();
    for field in [
        "allowed",
        "reason",
        "gates_passed",
        "gates_failed",
        "risk_score",
        "human_review_required",
        "override_price",
        "audit_id",
        "telemetry",
    ] {
        assert!(json.get(field).is_some(), "missing field '{}'", field);
    }
    for field in ["timestamp", "agent_id", "action", "gates"] {
        assert!(
            json["telemetry"].get(field).is_some(),
            "missing telemetry field '{}'",
            field
        );
    }

    let restored: GateDecision = serde_json::from_value(json).unwrap();
    assert_eq!(restored, decision);
}

// ── Concurrency ──

#[test]
fn concurrent_callers_share_one_engine_without_losing_decisions() {
    let engine = Arc::new(
        GateEngine::with_clock("agent-1", GatePolicy::default(), fixed_clock()).unwrap(),
    );

    let threads = 8;
    let calls_per_thread = 25;

    let mut handles = Vec::new();
    for t in 0..threads {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..calls_per_thread {
                let key = format!("state_{t}");
                engine.update_state(key.as_str(), json!(i));
                let decision = engine.can_execute(
                    &ExecutionRequest::new(
                        format!("refund_customer_{t}_{i}"),
                        "Customer requested refund because order was damaged in shipping.",
                    )
                    .with_dependency(key),
                );
                // The freshly updated dependency is always fresh.
                assert!(decision.allowed);
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    // No decision was lost to a race.
    assert_eq!(engine.decisions().len(), threads * calls_per_thread);
}

// ── Telemetry aggregation downstream ──

#[test]
fn telemetry_supports_downstream_aggregation() {
    let clock = fixed_clock();
    let engine = engine_at(&clock);

    engine.can_execute(&ExecutionRequest::new(
        "refund_customer_12345",
        "Customer requested refund because order was damaged in shipping.",
    ));
    engine.can_execute(&ExecutionRequest::new("refund_all_customers", "bulk"));
    engine.can_execute(&ExecutionRequest::new("drop_table_orders", "cleanup"));

    // A caller shipping telemetry can count hard failures per gate.
    let mut failures: BTreeMap<String, usize> = BTreeMap::new();
    for decision in engine.decisions() {
        for (gate, passed) in &decision.telemetry.gates {
            if !passed {
                *failures.entry(gate.clone()).or_default() += 1;
            }
        }
    }

    assert_eq!(failures.get("blast_bounded"), Some(&1));
    assert_eq!(failures.get("reversible"), Some(&1));
    assert_eq!(failures.get("state_fresh"), None);
}

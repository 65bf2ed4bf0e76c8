// policy.rs — Externally supplied gate policy.
//
// Everything tunable about the engine lives here: gate weights, the
// hard-block set, the marker lists the text gates scan for, decision
// thresholds, the freshness window, and trail retention. Policy is data,
// shipped as YAML, so it can evolve without touching the engine core and
// tests can inject deterministic fixtures.
//
// Every field has a serde default matching the stock policy, so a partial
// YAML file overrides only what it names.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::decision::Gate;
use crate::error::PolicyError;

/// Tolerance for the weight-sum check — weights are policy-authored floats.
const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Trigger-substring lists for the text gates.
///
/// Matching is case-insensitive substring containment: a marker "all"
/// triggers on "refund_all_customers".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarkerSet {
    /// Phrases that mark an action or reasoning as vague (`intent_clear`).
    #[serde(default = "default_vague_intent")]
    pub vague_intent: Vec<String>,

    /// Phrases that mark an action as sweeping in scope (`blast_bounded`).
    #[serde(default = "default_broad_scope")]
    pub broad_scope: Vec<String>,

    /// Phrases that mark an action as irreversible (`reversible`).
    #[serde(default = "default_irreversible")]
    pub irreversible: Vec<String>,

    /// Phrases whose presence marks reasoning as causal (`reasoning_valid`).
    #[serde(default = "default_causal")]
    pub causal: Vec<String>,
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self {
            vague_intent: default_vague_intent(),
            broad_scope: default_broad_scope(),
            irreversible: default_irreversible(),
            causal: default_causal(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_vague_intent() -> Vec<String> {
    strings(&["do the thing", "handle it", "process", "update"])
}

fn default_broad_scope() -> Vec<String> {
    strings(&["bulk", "all", "delete_all", "refund_all"])
}

fn default_irreversible() -> Vec<String> {
    strings(&["delete_permanently", "drop_table", "hard_delete"])
}

fn default_causal() -> Vec<String> {
    strings(&["because", "since", "due to"])
}

/// The complete gate policy for one engine instance.
///
/// Stored as YAML:
///
/// ```yaml
/// weights:
///   intent_clear: 0.15
///   state_fresh: 0.25
///   blast_bounded: 0.30
///   reversible: 0.20
///   reasoning_valid: 0.10
/// hard_block:
///   - blast_bounded
///   - reversible
/// markers:
///   broad_scope: ["bulk", "all", "delete_all", "refund_all"]
/// freshness_secs: 30
/// allow_threshold: 0.25
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatePolicy {
    /// Maximum risk contribution of each gate's failure. Must sum to 1.0.
    #[serde(default = "default_weights")]
    pub weights: BTreeMap<Gate, f64>,

    /// Gates whose failure denies unconditionally, regardless of aggregate
    /// risk. These encode irrecoverable harm.
    #[serde(default = "default_hard_block")]
    pub hard_block: BTreeSet<Gate>,

    /// Trigger substrings for the text gates.
    #[serde(default)]
    pub markers: MarkerSet,

    /// Minimum action length (characters) for `intent_clear`.
    #[serde(default = "default_min_action_chars")]
    pub min_action_chars: usize,

    /// Minimum reasoning length (characters) for `intent_clear`.
    #[serde(default = "default_min_reasoning_chars")]
    pub min_reasoning_chars: usize,

    /// Maximum age (seconds) of an observation before `state_fresh` treats
    /// it as stale.
    #[serde(default = "default_freshness_secs")]
    pub freshness_secs: u64,

    /// Risk score at or above which the action is denied.
    #[serde(default = "default_allow_threshold")]
    pub allow_threshold: f64,

    /// Risk score above which human review is required.
    #[serde(default = "default_review_threshold")]
    pub review_threshold: f64,

    /// Risk score above which a paid override is priced.
    #[serde(default = "default_override_threshold")]
    pub override_threshold: f64,

    /// Advisory cost of the paid override when offered.
    #[serde(default = "default_override_price")]
    pub override_price: f64,

    /// How many recent decisions the audit trail retains.
    #[serde(default = "default_trail_capacity")]
    pub trail_capacity: usize,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            weights: default_weights(),
            hard_block: default_hard_block(),
            markers: MarkerSet::default(),
            min_action_chars: default_min_action_chars(),
            min_reasoning_chars: default_min_reasoning_chars(),
            freshness_secs: default_freshness_secs(),
            allow_threshold: default_allow_threshold(),
            review_threshold: default_review_threshold(),
            override_threshold: default_override_threshold(),
            override_price: default_override_price(),
            trail_capacity: default_trail_capacity(),
        }
    }
}

fn default_weights() -> BTreeMap<Gate, f64> {
    BTreeMap::from([
        (Gate::IntentClear, 0.15),
        (Gate::StateFresh, 0.25),
        (Gate::BlastBounded, 0.30),
        (Gate::Reversible, 0.20),
        (Gate::ReasoningValid, 0.10),
    ])
}

fn default_hard_block() -> BTreeSet<Gate> {
    BTreeSet::from([Gate::BlastBounded, Gate::Reversible])
}

fn default_min_action_chars() -> usize {
    6
}

fn default_min_reasoning_chars() -> usize {
    21
}

fn default_freshness_secs() -> u64 {
    30
}

fn default_allow_threshold() -> f64 {
    0.25
}

fn default_review_threshold() -> f64 {
    0.15
}

fn default_override_threshold() -> f64 {
    0.5
}

fn default_override_price() -> f64 {
    5.0
}

fn default_trail_capacity() -> usize {
    1024
}

impl GatePolicy {
    /// Parse a policy from a YAML document and validate it.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, PolicyError> {
        let policy: GatePolicy = serde_yaml::from_str(yaml)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load a policy from a YAML file and validate it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let data = fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&data)
    }

    /// Validate the policy eagerly, before any engine is built on it.
    ///
    /// A bad policy is the one genuine fault in the system — it must never
    /// be discovered per call.
    pub fn validate(&self) -> Result<(), PolicyError> {
        for gate in Gate::ALL {
            match self.weights.get(&gate) {
                None => return Err(PolicyError::MissingWeight { gate }),
                Some(&weight) if weight < 0.0 => {
                    return Err(PolicyError::NegativeWeight { gate, weight })
                }
                Some(_) => {}
            }
        }

        let sum: f64 = self.weights.values().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(PolicyError::WeightSum { sum });
        }

        if self.hard_block.is_empty() {
            return Err(PolicyError::EmptyHardBlock);
        }

        if self.freshness_secs == 0 {
            return Err(PolicyError::ZeroFreshnessWindow);
        }

        if self.allow_threshold <= 0.0 {
            return Err(PolicyError::NonPositiveAllowThreshold {
                threshold: self.allow_threshold,
            });
        }

        if self.trail_capacity == 0 {
            return Err(PolicyError::ZeroTrailCapacity);
        }

        Ok(())
    }

    /// The configured weight of a gate. Validation guarantees every gate
    /// has one; an absent weight contributes nothing.
    pub fn weight(&self, gate: Gate) -> f64 {
        self.weights.get(&gate).copied().unwrap_or(0.0)
    }

    /// The freshness window as a chrono duration.
    pub fn freshness(&self) -> Duration {
        Duration::seconds(self.freshness_secs as i64)
    }

    /// Whether `gate` denies unconditionally on failure.
    pub fn is_hard_block(&self, gate: Gate) -> bool {
        self.hard_block.contains(&gate)
    }
}

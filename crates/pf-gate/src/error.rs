// error.rs — Error types for gate policy configuration.
//
// Configuration is the only error channel in this crate. A decision call
// never fails: malformed proposals fail gates and come back as denials.
// Bad policy, by contrast, is a genuine fault and is rejected eagerly at
// construction time, not discovered per call.

use std::path::PathBuf;

use thiserror::Error;

use crate::decision::Gate;

/// Errors raised when validating or loading a [`GatePolicy`](crate::GatePolicy).
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A gate has no configured weight.
    #[error("no weight configured for gate '{gate}'")]
    MissingWeight { gate: Gate },

    /// A gate weight is negative — weights are maximum risk contributions.
    #[error("negative weight {weight} configured for gate '{gate}'")]
    NegativeWeight { gate: Gate, weight: f64 },

    /// The configured weights do not sum to 1.0.
    #[error("gate weights sum to {sum}, expected 1.0")]
    WeightSum { sum: f64 },

    /// No hard-block gate is configured — the policy could never
    /// unconditionally deny irrecoverable harm.
    #[error("hard-block gate set is empty")]
    EmptyHardBlock,

    /// The freshness window is zero seconds — no observation could ever
    /// satisfy a state dependency.
    #[error("state freshness window must be non-zero")]
    ZeroFreshnessWindow,

    /// The allow threshold is not positive — every action would be denied.
    #[error("allow threshold must be positive, got {threshold}")]
    NonPositiveAllowThreshold { threshold: f64 },

    /// The audit trail capacity is zero — no decision would be retained.
    #[error("audit trail capacity must be non-zero")]
    ZeroTrailCapacity,

    /// A policy file could not be read.
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A policy document could not be parsed as YAML.
    #[error("failed to parse policy YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
}

// telemetry.rs — Decision telemetry data model.
//
// One Telemetry record is built per gate decision and embedded in it. It is
// the wire contract with downstream systems (telemetry pipelines, review
// queues): callers needing durability serialize this record and ship it
// elsewhere. The engine itself never writes to a sink.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A structured snapshot of one decision's inputs and per-gate outcomes.
///
/// `#[derive(Serialize, Deserialize)]` lets serde automatically convert
/// this struct to/from JSON. Each field maps to a JSON key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Telemetry {
    /// When the decision was rendered (UTC).
    pub timestamp: DateTime<Utc>,

    /// Which agent proposed the action.
    pub agent_id: String,

    /// The proposed action text, verbatim.
    pub action: String,

    /// Per-gate pass/fail outcomes, keyed by gate name.
    /// `BTreeMap` keeps the keys sorted so serialized output is stable.
    pub gates: BTreeMap<String, bool>,
}

impl Telemetry {
    /// Build a telemetry record from per-gate outcomes.
    pub fn new(
        timestamp: DateTime<Utc>,
        agent_id: impl Into<String>,
        action: impl Into<String>,
        gates: BTreeMap<String, bool>,
    ) -> Self {
        Self {
            timestamp,
            agent_id: agent_id.into(),
            action: action.into(),
            gates,
        }
    }
}

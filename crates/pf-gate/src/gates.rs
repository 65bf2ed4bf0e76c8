// gates.rs — The five gate predicates.
//
// Each gate is a pure function over the request text, the policy's marker
// lists, and (for state_fresh) a cache snapshot. Marker matching is
// case-insensitive substring containment. No gate can fail with an error —
// malformed input simply fails the check.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};

use crate::policy::GatePolicy;
use crate::state::StateCache;

/// Whether `text` contains any of `markers`, ignoring case.
fn contains_marker(text: &str, markers: &[String]) -> bool {
    let lowered = text.to_lowercase();
    markers
        .iter()
        .any(|marker| lowered.contains(&marker.to_lowercase()))
}

/// intent_clear: the proposal is specific, not vague boilerplate.
///
/// Both texts must meet their minimum length and neither may contain a
/// vague-intent marker. Length is counted in characters, not bytes.
pub(crate) fn intent_clear(policy: &GatePolicy, action: &str, reasoning: &str) -> bool {
    if contains_marker(action, &policy.markers.vague_intent)
        || contains_marker(reasoning, &policy.markers.vague_intent)
    {
        return false;
    }
    action.chars().count() >= policy.min_action_chars
        && reasoning.chars().count() >= policy.min_reasoning_chars
}

/// state_fresh: every declared dependency was observed within the freshness
/// window. Vacuously true for an empty dependency set. A never-observed key
/// and a stale one fail identically.
pub(crate) fn state_fresh(
    cache: &StateCache,
    dependencies: &BTreeSet<String>,
    now: DateTime<Utc>,
    threshold: Duration,
) -> bool {
    dependencies
        .iter()
        .all(|key| cache.is_fresh(key, now, threshold))
}

/// blast_bounded: the action names no sweeping-scope marker.
pub(crate) fn blast_bounded(policy: &GatePolicy, action: &str) -> bool {
    !contains_marker(action, &policy.markers.broad_scope)
}

/// reversible: the action names no irreversibility marker.
pub(crate) fn reversible(policy: &GatePolicy, action: &str) -> bool {
    !contains_marker(action, &policy.markers.irreversible)
}

/// reasoning_valid: the reasoning contains at least one causal marker.
pub(crate) fn reasoning_valid(policy: &GatePolicy, reasoning: &str) -> bool {
    contains_marker(reasoning, &policy.markers.causal)
}

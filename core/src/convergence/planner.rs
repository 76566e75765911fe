//! Desired-vs-actual comparisons that don't involve topology.
//!
//! Like the topology differ, everything here is pure: callers fetch the
//! current state, ask the planner what differs, and decide what to apply.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::index::{normalize_deployment_mode, IndexDefinition, IndexDefinitionSpec};

/// Keys whose desired value differs from (or is missing in) `current`.
/// Keys present only in `current` are left alone.
pub fn diff_settings(
    desired: &BTreeMap<String, String>,
    current: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    desired
        .iter()
        .filter(|(k, v)| current.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Sorted, comma-joined key list used in messages.
pub fn joined_keys(changes: &BTreeMap<String, String>) -> String {
    changes.keys().cloned().collect::<Vec<_>>().join(", ")
}

fn trimmed_reduce(reduce: Option<&str>) -> Option<&str> {
    reduce.map(str::trim).filter(|r| !r.is_empty())
}

/// Whether `existing` already satisfies `desired`.
///
/// Maps compare as a set of trimmed sources, so reordering maps is not a
/// change but adding one is. Deployment mode only counts when desired.
pub fn definition_matches(existing: &IndexDefinition, desired: &IndexDefinitionSpec) -> bool {
    let existing_maps: BTreeSet<&str> = existing.maps.iter().map(|m| m.trim()).collect();
    let desired_maps: BTreeSet<&str> = desired.maps.iter().map(|m| m.trim()).collect();
    if existing_maps != desired_maps {
        return false;
    }
    if trimmed_reduce(existing.reduce.as_deref()) != trimmed_reduce(desired.reduce.as_deref()) {
        return false;
    }
    match desired.deployment_mode.as_deref().and_then(normalize_deployment_mode) {
        None => true,
        Some(want) => {
            existing.deployment_mode.as_deref().and_then(normalize_deployment_mode)
                == Some(want)
        }
    }
}

/// `existing` with `changes` merged into its configuration; maps, reduce and
/// deployment mode are carried over untouched.
pub fn merged_definition(
    existing: &IndexDefinition,
    changes: &BTreeMap<String, String>,
) -> IndexDefinition {
    let mut merged = existing.clone();
    for (k, v) in changes {
        merged.configuration.insert(k.clone(), v.clone());
    }
    merged
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn kv(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn existing(maps: &[&str], reduce: Option<&str>, mode: Option<&str>) -> IndexDefinition {
        IndexDefinition {
            name: "by_name".into(),
            maps: maps.iter().map(|m| m.to_string()).collect(),
            reduce: reduce.map(String::from),
            deployment_mode: mode.map(String::from),
            configuration: BTreeMap::new(),
        }
    }

    fn desired(maps: &[&str], reduce: Option<&str>, mode: Option<&str>) -> IndexDefinitionSpec {
        IndexDefinitionSpec::new(maps.iter().map(|m| m.to_string()).collect(), reduce.map(String::from), mode)
            .unwrap()
    }

    #[test]
    fn settings_diff_reports_changed_and_new_keys() {
        let want = kv(&[("Indexing.MapBatchSize", "128"), ("Queries.MaxClauseCount", "2048")]);
        let have = kv(&[("Indexing.MapBatchSize", "64"), ("Other", "x")]);
        let diff = diff_settings(&want, &have);
        assert_eq!(diff, want);
        assert_eq!(joined_keys(&diff), "Indexing.MapBatchSize, Queries.MaxClauseCount");
    }

    #[test]
    fn settings_diff_empty_when_matching() {
        let want = kv(&[("a", "1")]);
        assert!(diff_settings(&want, &kv(&[("a", "1"), ("b", "2")])).is_empty());
    }

    #[test]
    fn identical_definition_matches() {
        let e = existing(&["from o in docs.Orders select new { o.Name } "], None, None);
        let d = desired(&["from o in docs.Orders select new { o.Name }"], None, None);
        assert!(definition_matches(&e, &d));
    }

    #[test]
    fn modified_map_does_not_match() {
        let e = existing(&["from o in docs.Orders select new { o.Name }"], None, None);
        let d = desired(&["from o in docs.Orders select new { o.Company }"], None, None);
        assert!(!definition_matches(&e, &d));
    }

    #[test]
    fn multi_map_does_not_match_single_map() {
        let e = existing(&["map1"], None, None);
        let d = desired(&["map1", "map2"], None, None);
        assert!(!definition_matches(&e, &d));
    }

    #[test]
    fn map_order_is_irrelevant() {
        let e = existing(&["map2", "map1"], None, None);
        assert!(definition_matches(&e, &desired(&["map1", "map2"], None, None)));
    }

    #[test]
    fn adding_reduce_does_not_match() {
        let e = existing(&["map1"], Some("  "), None);
        assert!(definition_matches(&e, &desired(&["map1"], None, None)));
        assert!(!definition_matches(&e, &desired(&["map1"], Some("from r in results"), None)));
    }

    #[test]
    fn deployment_mode_only_when_desired() {
        let e = existing(&["map1"], None, Some("Rolling"));
        assert!(definition_matches(&e, &desired(&["map1"], None, None)));
        assert!(definition_matches(&e, &desired(&["map1"], None, Some("rolling"))));
        assert!(!definition_matches(&e, &desired(&["map1"], None, Some("parallel"))));
    }

    #[test]
    fn merge_keeps_definition() {
        let mut e = existing(&["map1"], Some("r"), Some("rolling"));
        e.configuration.insert("Indexing.A".into(), "1".into());
        let merged = merged_definition(&e, &kv(&[("Indexing.B", "2")]));
        assert_eq!(merged.maps, e.maps);
        assert_eq!(merged.reduce.as_deref(), Some("r"));
        assert_eq!(merged.configuration, kv(&[("Indexing.A", "1"), ("Indexing.B", "2")]));
    }
}

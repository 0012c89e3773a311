//! Variable snapshot capture.
//!
//! Converts live engine values into [`TraceValue`]s. Capture is total: every
//! value lands on a native tag, a printable rendering, or the opaque
//! placeholder. Nothing here returns an error and nothing panics, because a
//! snapshot failure would abort the traced run it is meant to observe.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use steptrace_core::TraceValue;

/// Capture limits and filters for variable snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotPolicy {
    /// Container nesting budget. Containers below this depth are replaced
    /// by the opaque placeholder, which also bounds self-referencing
    /// structures.
    pub max_depth: usize,
    /// Skip bindings whose names start with `_`.
    pub skip_private: bool,
}

impl Default for SnapshotPolicy {
    fn default() -> Self {
        SnapshotPolicy {
            max_depth: 4,
            skip_private: true,
        }
    }
}

/// Captures every visible binding of a scope, in declaration order.
pub fn snapshot_scope(
    scope: &rhai::Scope,
    policy: &SnapshotPolicy,
) -> IndexMap<String, TraceValue> {
    let mut variables = IndexMap::new();
    for (name, _constant, value) in scope.iter() {
        if policy.skip_private && name.starts_with('_') {
            continue;
        }
        // Shadowed bindings resolve to the latest value.
        variables.insert(name.to_string(), capture(&value, policy.max_depth));
    }
    variables
}

/// Captures a single value.
pub fn snapshot_value(value: &rhai::Dynamic, policy: &SnapshotPolicy) -> TraceValue {
    capture(&value.flatten_clone(), policy.max_depth)
}

fn capture(value: &rhai::Dynamic, budget: usize) -> TraceValue {
    if value.is::<()>() {
        return TraceValue::Null;
    }
    if let Some(b) = value.read_lock::<bool>() {
        return TraceValue::Bool(*b);
    }
    if let Some(n) = value.read_lock::<rhai::INT>() {
        return TraceValue::int(*n);
    }
    if let Some(f) = value.read_lock::<rhai::FLOAT>() {
        // NaN and infinities have no JSON number form.
        return match TraceValue::float(*f) {
            Some(number) => number,
            None => TraceValue::text(f.to_string()),
        };
    }
    if let Some(c) = value.read_lock::<char>() {
        return TraceValue::text(c.to_string());
    }
    if let Some(s) = value.read_lock::<rhai::ImmutableString>() {
        return TraceValue::Text(s.to_string());
    }
    if let Some(items) = value.read_lock::<rhai::Array>() {
        if budget == 0 {
            return TraceValue::opaque("array");
        }
        return TraceValue::Sequence(
            items.iter().map(|item| capture(item, budget - 1)).collect(),
        );
    }
    if let Some(entries) = value.read_lock::<rhai::Map>() {
        if budget == 0 {
            return TraceValue::opaque("map");
        }
        // Engine maps iterate key-sorted, which keeps snapshots stable
        // across runs.
        return TraceValue::Mapping(
            entries
                .iter()
                .map(|(key, item)| (key.to_string(), capture(item, budget - 1)))
                .collect(),
        );
    }

    // Printable tier: values whose rendering is just their type name carry
    // no information and get the placeholder instead.
    let rendered = value.to_string();
    if rendered.is_empty() || rendered == value.type_name() {
        TraceValue::opaque(value.type_name())
    } else {
        TraceValue::Text(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rhai::Dynamic;

    fn capture_one(value: Dynamic) -> TraceValue {
        snapshot_value(&value, &SnapshotPolicy::default())
    }

    #[test]
    fn scalars_map_to_native_tags() {
        assert_eq!(capture_one(Dynamic::UNIT), TraceValue::Null);
        assert_eq!(capture_one(Dynamic::from(true)), TraceValue::Bool(true));
        assert_eq!(capture_one(Dynamic::from(41_i64)), TraceValue::int(41));
        assert_eq!(
            capture_one(Dynamic::from(1.5_f64)),
            TraceValue::float(1.5).unwrap()
        );
        assert_eq!(
            capture_one(Dynamic::from("hi".to_string())),
            TraceValue::Text("hi".to_string())
        );
        assert_eq!(
            capture_one(Dynamic::from('y')),
            TraceValue::Text("y".to_string())
        );
    }

    #[test]
    fn non_finite_floats_become_text() {
        assert_eq!(
            capture_one(Dynamic::from(f64::NAN)),
            TraceValue::Text("NaN".to_string())
        );
        assert_eq!(
            capture_one(Dynamic::from(f64::INFINITY)),
            TraceValue::Text("inf".to_string())
        );
    }

    #[test]
    fn containers_nest() {
        let inner: rhai::Array = vec![Dynamic::from(1_i64), Dynamic::from(2_i64)];
        let outer: rhai::Array = vec![Dynamic::from(inner), Dynamic::UNIT];
        let captured = capture_one(Dynamic::from(outer));
        assert_eq!(
            captured,
            TraceValue::Sequence(vec![
                TraceValue::Sequence(vec![TraceValue::int(1), TraceValue::int(2)]),
                TraceValue::Null,
            ])
        );
    }

    #[test]
    fn map_entries_arrive_key_sorted() {
        let mut map = rhai::Map::new();
        map.insert("b".into(), Dynamic::from(2_i64));
        map.insert("a".into(), Dynamic::from(1_i64));
        let captured = capture_one(Dynamic::from(map));

        let TraceValue::Mapping(entries) = captured else {
            panic!("expected a mapping");
        };
        let keys: Vec<&str> = entries.keys().map(String::as_str).collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn depth_budget_bounds_recursion() {
        let level3: rhai::Array = vec![Dynamic::from(1_i64)];
        let level2: rhai::Array = vec![Dynamic::from(level3)];
        let level1: rhai::Array = vec![Dynamic::from(level2)];
        let policy = SnapshotPolicy {
            max_depth: 2,
            ..SnapshotPolicy::default()
        };

        let captured = snapshot_value(&Dynamic::from(level1), &policy);
        assert_eq!(
            captured,
            TraceValue::Sequence(vec![TraceValue::Sequence(vec![TraceValue::Opaque(
                "<unserializable: array>".to_string()
            )])])
        );
    }

    #[test]
    fn shared_values_read_through() {
        let shared = Dynamic::from(7_i64).into_shared();
        assert_eq!(capture_one(shared), TraceValue::int(7));
    }

    #[test]
    fn function_pointers_use_the_printable_tier() {
        let fn_ptr = rhai::FnPtr::new("callback").unwrap();
        assert_eq!(
            capture_one(Dynamic::from(fn_ptr)),
            TraceValue::Text("Fn(callback)".to_string())
        );
    }

    #[test]
    fn unknown_types_get_the_placeholder() {
        #[derive(Debug, Clone)]
        struct Widget;

        let captured = capture_one(Dynamic::from(Widget));
        assert!(
            matches!(&captured, TraceValue::Opaque(text) if text.contains("Widget")),
            "expected placeholder, got {captured:?}"
        );
    }

    #[test]
    fn scope_snapshot_keeps_order_and_skips_private_names() {
        let mut scope = rhai::Scope::new();
        scope.push("x", 1_i64);
        scope.push("_scratch", 2_i64);
        scope.push("name", "dana".to_string());

        let variables = snapshot_scope(&scope, &SnapshotPolicy::default());
        let keys: Vec<&str> = variables.keys().map(String::as_str).collect();
        assert_eq!(keys, ["x", "name"]);
        assert_eq!(variables["name"], TraceValue::Text("dana".to_string()));

        let open = SnapshotPolicy {
            skip_private: false,
            ..SnapshotPolicy::default()
        };
        assert_eq!(snapshot_scope(&scope, &open).len(), 3);
    }

    fn dynamic_strategy() -> impl Strategy<Value = Dynamic> {
        // any::<f64>() includes NaN and the infinities, exercising the
        // printable-tier fallback.
        let leaf = prop_oneof![
            Just(Dynamic::UNIT),
            any::<bool>().prop_map(Dynamic::from),
            any::<i64>().prop_map(Dynamic::from),
            any::<f64>().prop_map(Dynamic::from),
            any::<char>().prop_map(Dynamic::from),
            "[ -~]{0,12}".prop_map(Dynamic::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                proptest::collection::vec(inner.clone(), 0..4).prop_map(Dynamic::from),
                proptest::collection::vec(("[a-z]{1,6}", inner), 0..4).prop_map(|entries| {
                    let mut map = rhai::Map::new();
                    for (key, value) in entries {
                        map.insert(key.into(), value);
                    }
                    Dynamic::from(map)
                }),
            ]
        })
    }

    proptest! {
        // Capture never fails and its output always serializes.
        #[test]
        fn capture_is_total_and_serializable(value in dynamic_strategy()) {
            let captured = snapshot_value(&value, &SnapshotPolicy::default());
            prop_assert!(serde_json::to_string(&captured).is_ok());
        }

        #[test]
        fn capture_is_deterministic(value in dynamic_strategy()) {
            let policy = SnapshotPolicy::default();
            prop_assert_eq!(
                snapshot_value(&value, &policy),
                snapshot_value(&value, &policy)
            );
        }
    }
}

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use trackwire_core::config::merge_options;
use trackwire_core::sanitize_event_name;

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 _-]{0,12}".prop_map(Value::String),
    ]
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        3 => scalar(),
        1 => prop::collection::vec(scalar(), 0..4).prop_map(Value::Array),
    ]
}

fn options() -> impl Strategy<Value = Value> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map("[a-e]{1,2}", inner, 0..4)
            .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>()))
    })
}

fn object() -> impl Strategy<Value = Value> {
    prop::collection::btree_map("[a-e]{1,2}", options(), 0..5)
        .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>()))
}

proptest! {
    #[test]
    fn sanitize_is_idempotent(s in ".{0,64}") {
        let once = sanitize_event_name(&s);
        prop_assert_eq!(sanitize_event_name(&once), once);
    }

    #[test]
    fn sanitize_output_is_collector_safe(s in ".{0,64}") {
        let name = sanitize_event_name(&s);
        prop_assert!(
            name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
            "unexpected character in {:?}",
            name
        );
        prop_assert!(!name.contains("__"));
        prop_assert!(!name.starts_with('_') && !name.ends_with('_'));
    }

    #[test]
    fn merge_keeps_every_default_key(defaults in object(), overrides in object()) {
        let merged = merge_options(&defaults, &overrides);
        let merged = merged.as_object().unwrap();
        for (key, value) in defaults.as_object().unwrap() {
            prop_assert!(merged.contains_key(key), "default key {:?} dropped", key);
            if overrides.get(key).is_none() {
                prop_assert_eq!(&merged[key], value);
            }
        }
    }

    #[test]
    fn merge_replaces_scalars_and_arrays(defaults in object(), key in "[a-e]{1,2}", value in leaf()) {
        let mut overrides = Map::new();
        overrides.insert(key.clone(), value.clone());
        let merged = merge_options(&defaults, &Value::Object(overrides));
        prop_assert_eq!(&merged[key.as_str()], &value);
    }

    #[test]
    fn merge_descends_into_nested_objects(inner in object(), extra in "[f-h]{1,2}", value in scalar()) {
        let defaults = json!({"tracking": inner.clone()});
        let overrides = json!({"tracking": {extra.clone(): value.clone()}});
        let merged = merge_options(&defaults, &overrides);
        let tracking = merged["tracking"].as_object().unwrap();
        prop_assert_eq!(&tracking[extra.as_str()], &value);
        for key in inner.as_object().unwrap().keys() {
            prop_assert!(tracking.contains_key(key));
        }
    }
}

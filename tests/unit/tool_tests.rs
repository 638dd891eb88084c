use sequencer_rs::tool::{self, extend, split, trim, type_in, type_of};
use serde_json::{Value, json};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_of_names_every_json_kind() {
        assert_eq!(type_of(&Value::Null), "null");
        assert_eq!(type_of(&json!(true)), "boolean");
        assert_eq!(type_of(&json!(1.5)), "number");
        assert_eq!(type_of(&json!("s")), "string");
        assert_eq!(type_of(&json!([1])), "array");
        assert_eq!(type_of(&json!({"a": 1})), "object");
    }

    #[test]
    fn type_in_matches_any_listed_name() {
        assert!(type_in(&json!("s"), &["number", "string"]));
        assert!(!type_in(&json!([]), &["number", "string"]));
        assert!(!type_in(&Value::Null, &[]));
    }

    #[test]
    fn predicates_agree_with_type_of() {
        let samples = [
            json!(false),
            json!(0),
            json!("x"),
            json!([]),
            json!({}),
            Value::Null,
        ];
        for sample in &samples {
            assert_eq!(tool::is_boolean(sample), type_of(sample) == "boolean");
            assert_eq!(tool::is_number(sample), type_of(sample) == "number");
            assert_eq!(tool::is_string(sample), type_of(sample) == "string");
            assert_eq!(tool::is_array(sample), type_of(sample) == "array");
            assert_eq!(tool::is_object(sample), type_of(sample) == "object");
        }
    }

    #[test]
    fn extend_objects_later_keys_win() {
        let merged = extend(
            json!({"a": 0, "b": 0}),
            [json!({"b": 1}), json!({"c": 2})],
        );
        assert_eq!(merged, json!({"a": 0, "b": 1, "c": 2}));
    }

    #[test]
    fn extend_replaces_nested_values_wholesale() {
        let merged = extend(
            json!({"inner": {"keep": true, "x": 1}}),
            [json!({"inner": {"x": 2}})],
        );
        assert_eq!(merged, json!({"inner": {"x": 2}}));
    }

    #[test]
    fn extend_arrays_append() {
        let merged = extend(json!(["a"]), [json!(["b"]), json!(["c", "d"])]);
        assert_eq!(merged, json!(["a", "b", "c", "d"]));
    }

    #[test]
    fn extend_array_into_object_uses_index_keys() {
        let merged = extend(json!({"name": "x"}), [json!(["p", "q"])]);
        assert_eq!(merged, json!({"name": "x", "0": "p", "1": "q"}));
    }

    #[test]
    fn extend_scalar_target_becomes_container() {
        assert_eq!(extend(json!(5), [json!({"a": 1})]), json!({"a": 1}));
        assert_eq!(extend(Value::Null, [json!([1, 2])]), json!([1, 2]));
    }

    #[test]
    fn extend_scalar_source_replaces_target() {
        assert_eq!(extend(json!({"a": 1}), [json!("flat")]), json!("flat"));
        assert_eq!(extend(json!([1]), Vec::new()), json!([1]));
    }

    #[test]
    fn trim_collapses_whitespace() {
        assert_eq!(trim("\t hello \n  world  "), "hello world");
        assert_eq!(trim("   "), "");
    }

    #[test]
    fn split_trims_parts() {
        assert_eq!(split("a | b|  c d ", "|", false), vec!["a", "b", "c d"]);
        assert_eq!(split("x,,y", ",", true), vec!["x", "y"]);
        assert_eq!(split("x,,y", ",", false), vec!["x", "", "y"]);
    }
}

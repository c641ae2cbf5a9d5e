//! Case-transcoding adapter for the wire boundary.
//!
//! The remote forms service speaks snake_case; everything inside this crate
//! speaks camelCase. `to_external` and `to_internal` rewrite every mapping
//! key of an arbitrary JSON value, recursing through objects and arrays.
//! Scalars and non-object array elements pass through untouched, so the rest
//! of the crate never observes an external-convention key.

use serde_json::{Map, Value};

/// Rewrite all keys camelCase → snake_case for an outgoing body or query.
pub fn to_external(value: Value) -> Value {
    rewrite_keys(value, &camel_to_snake)
}

/// Rewrite all keys snake_case → camelCase for an incoming JSON body.
pub fn to_internal(value: Value) -> Value {
    rewrite_keys(value, &snake_to_camel)
}

fn rewrite_keys(value: Value, convert: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(entries) => {
            let mut rewritten = Map::with_capacity(entries.len());
            for (key, nested) in entries {
                rewritten.insert(convert(&key), rewrite_keys(nested, convert));
            }
            Value::Object(rewritten)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| rewrite_keys(item, convert))
                .collect(),
        ),
        scalar => scalar,
    }
}

fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    let mut prev_lower_or_digit = false;
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            if prev_lower_or_digit {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
            prev_lower_or_digit = false;
        } else {
            out.push(ch);
            prev_lower_or_digit = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        }
    }
    out
}

fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for ch in key.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn to_external_rewrites_flat_keys() {
        let external = to_external(json!({"numOfCols": 3, "sectionId": "abc"}));
        assert_eq!(external, json!({"num_of_cols": 3, "section_id": "abc"}));
    }

    #[test]
    fn to_internal_rewrites_flat_keys() {
        let internal = to_internal(json!({"num_of_cols": 3, "section_id": "abc"}));
        assert_eq!(internal, json!({"numOfCols": 3, "sectionId": "abc"}));
    }

    #[test]
    fn recurses_through_objects_and_arrays() {
        let internal = to_internal(json!({
            "application_id": "app-1",
            "sections": [
                {"num_of_cols": 2, "rows": [{"section_id": "sec-1"}]},
            ],
        }));
        assert_eq!(
            internal,
            json!({
                "applicationId": "app-1",
                "sections": [
                    {"numOfCols": 2, "rows": [{"sectionId": "sec-1"}]},
                ],
            })
        );
    }

    #[test]
    fn scalars_and_scalar_arrays_pass_through() {
        assert_eq!(to_external(json!("rowId")), json!("rowId"));
        assert_eq!(to_external(json!([1, "colId", null])), json!([1, "colId", null]));
    }

    #[test]
    fn round_trip_is_identity_on_nested_structures() {
        let original = json!({
            "numOfCols": 3,
            "sectionId": "abc",
            "rows": [{"rowId": "r1", "columns": [{"columnId": "c1"}]}],
        });
        assert_eq!(to_internal(to_external(original.clone())), original);
    }

    #[test]
    fn single_word_keys_are_untouched() {
        let value = json!({"id": "x", "title": "Form", "sections": []});
        assert_eq!(to_external(value.clone()), value);
        assert_eq!(to_internal(value.clone()), value);
    }
}

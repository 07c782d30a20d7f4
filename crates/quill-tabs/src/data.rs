//! Tab display state
//!
//! Tab data is an untyped JSON object owned by whatever renders the tab.
//! The layout layer only merges it.

use serde_json::{Map, Value};

pub type TabData = Map<String, Value>;

/// Fill keys missing from `target` with values from `defaults`, recursing into
/// nested objects. Values already present in `target` always win.
pub fn defaults_deep(target: &mut TabData, defaults: &TabData) {
    for (key, default) in defaults {
        match target.get_mut(key) {
            None => {
                target.insert(key.clone(), default.clone());
            }
            Some(Value::Object(existing)) => {
                if let Value::Object(nested) = default {
                    defaults_deep(existing, nested);
                }
            }
            Some(_) => {}
        }
    }
}

/// Shallow merge of `patch` into `target`. The `options` object is merged one
/// level deeper so callers can update a single option.
pub fn merge_data(target: &mut TabData, patch: &TabData) {
    for (key, value) in patch {
        if key == "options" {
            if let (Some(Value::Object(existing)), Value::Object(incoming)) =
                (target.get_mut(key), value)
            {
                for (k, v) in incoming {
                    existing.insert(k.clone(), v.clone());
                }
                continue;
            }
        }
        target.insert(key.clone(), value.clone());
    }
}

/// Recursive merge of `patch` into `target`. Nested objects are merged key by
/// key; any other value in `patch` replaces the one in `target`.
pub fn merge_deep(target: &mut TabData, patch: &TabData) {
    for (key, value) in patch {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_deep(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> TabData {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_defaults_deep_keeps_existing_values() {
        let mut data = obj(json!({"panelOpen": true, "filters": {"status": "done"}}));
        let defaults = obj(json!({
            "panelOpen": false,
            "collapsed": {},
            "filters": {"status": "todo", "sort": "date"}
        }));

        defaults_deep(&mut data, &defaults);

        assert_eq!(
            Value::Object(data),
            json!({
                "panelOpen": true,
                "collapsed": {},
                "filters": {"status": "done", "sort": "date"}
            })
        );
    }

    #[test]
    fn test_defaults_deep_keeps_null() {
        let mut data = obj(json!({"date": null}));
        defaults_deep(&mut data, &obj(json!({"date": "2024-01-01"})));
        assert_eq!(data["date"], Value::Null);
    }

    #[test]
    fn test_merge_data_merges_options() {
        let mut data = obj(json!({"scroll": 10, "options": {"a": 1, "b": 2}}));
        merge_data(
            &mut data,
            &obj(json!({"scroll": 40, "options": {"b": 3}})),
        );
        assert_eq!(
            Value::Object(data),
            json!({"scroll": 40, "options": {"a": 1, "b": 3}})
        );
    }

    #[test]
    fn test_merge_deep() {
        let mut data = obj(json!({"filters": {"status": "done", "tags": ["a"]}, "sort": "date"}));
        merge_deep(
            &mut data,
            &obj(json!({"filters": {"tags": ["b"]}, "sort": {"by": "title"}})),
        );
        assert_eq!(
            Value::Object(data),
            json!({"filters": {"status": "done", "tags": ["b"]}, "sort": {"by": "title"}})
        );
    }

    #[test]
    fn test_merge_data_replaces_non_object_options() {
        let mut data = obj(json!({"options": 5}));
        merge_data(&mut data, &obj(json!({"options": {"x": true}})));
        assert_eq!(data["options"], json!({"x": true}));
    }
}

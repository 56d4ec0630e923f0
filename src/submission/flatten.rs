use serde_json::{Map, Value};

/// Collapses nested objects into one level keyed by leaf key.
///
/// Arrays and scalars are leaves. With `skip_empty`, null and empty-string
/// leaves are left out so "never set" stays distinguishable from an explicit
/// value. When two leaves share a key the later one wins.
pub fn flatten(value: &Value, skip_empty: bool) -> Map<String, Value> {
    let mut out = Map::new();
    if let Value::Object(map) = value {
        collect(map, skip_empty, &mut out);
    }
    out
}

fn collect(map: &Map<String, Value>, skip_empty: bool, out: &mut Map<String, Value>) {
    for (key, value) in map {
        match value {
            Value::Object(nested) => collect(nested, skip_empty, out),
            Value::Null if skip_empty => {}
            Value::String(text) if skip_empty && text.is_empty() => {}
            leaf => {
                if out.insert(key.clone(), leaf.clone()).is_some() {
                    tracing::warn!(key = %key, "flattening overwrote a duplicate leaf key");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn skip_empty_drops_blank_leaves() {
        let tree = json!({"a": {"b": "", "c": "x"}});
        assert_eq!(Value::Object(flatten(&tree, true)), json!({"c": "x"}));
        assert_eq!(Value::Object(flatten(&tree, false)), json!({"b": "", "c": "x"}));
    }

    #[test]
    fn flattening_is_idempotent() {
        let tree = json!({
            "general": {"name": "Bob", "age": 20, "nick": null},
            "fees": {"tiers": [{"from": 1}], "meta": {"currency": "EUR"}}
        });
        for skip_empty in [true, false] {
            let once = flatten(&tree, skip_empty);
            let twice = flatten(&Value::Object(once.clone()), skip_empty);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn arrays_stay_whole() {
        let flat = flatten(&json!({"fees": {"tiers": [{"from": 1}, {"from": 5}]}}), true);
        assert_eq!(flat["tiers"], json!([{"from": 1}, {"from": 5}]));
    }

    #[test]
    fn non_objects_flatten_to_nothing() {
        assert!(flatten(&json!([1, 2]), false).is_empty());
        assert!(flatten(&Value::Null, false).is_empty());
    }
}

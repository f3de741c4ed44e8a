//! Helpers for building [`Value`]s which are handed to templates.

use gtmpl_value::Value;
use std::collections::HashMap;

/// Builds a [`Value::Object`] from key/value pairs.
pub fn object<I>(pairs: I) -> Value
where
    I: IntoIterator<Item = (&'static str, Value)>,
{
    let m: HashMap<String, Value> = pairs
        .into_iter()
        .map(|(k, v)| (k.to_owned(), v))
        .collect();
    Value::Object(m)
}

pub fn string<S: Into<String>>(s: S) -> Value {
    Value::String(s.into())
}

pub fn option_to_value(opt: &Option<String>) -> Value {
    match opt {
        Some(s) => Value::String(s.clone()),
        None => Value::Nil,
    }
}

/// Converts a free-form YAML option into a template value.
pub fn from_yaml(yaml: &serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;
    match yaml {
        Yaml::Null => Value::Nil,
        Yaml::Bool(b) => Value::Bool(*b),
        Yaml::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => Value::from(i),
            (None, Some(u), _) => Value::from(u),
            (None, None, Some(f)) => Value::from(f),
            (None, None, None) => Value::String(n.to_string()),
        },
        Yaml::String(s) => Value::String(s.clone()),
        Yaml::Sequence(items) => Value::Array(items.iter().map(from_yaml).collect()),
        Yaml::Mapping(mapping) => Value::Object(
            mapping
                .iter()
                .filter_map(|(k, v)| k.as_str().map(|k| (k.to_owned(), from_yaml(v))))
                .collect(),
        ),
        #[allow(unreachable_patterns)]
        _ => Value::Nil,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_yaml_mapping() {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str("author: Ada\nyear: 1843\nlinks: [a, b]").unwrap();
        let m = match from_yaml(&yaml) {
            Value::Object(m) => m,
            _ => panic!("wanted object"),
        };
        match m.get("author") {
            Some(Value::String(s)) => assert_eq!("Ada", s.as_str()),
            _ => panic!("wanted string for `author`"),
        }
        match m.get("year") {
            Some(Value::Number(_)) => {}
            _ => panic!("wanted number for `year`"),
        }
        match m.get("links") {
            Some(Value::Array(items)) => assert_eq!(2, items.len()),
            _ => panic!("wanted array for `links`"),
        }
    }
}

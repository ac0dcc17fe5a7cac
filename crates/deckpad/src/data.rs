use std::collections::BTreeMap;

use serde_yaml::Value;

/// Shared values that slide templates interpolate with `{{ key }}`.
///
/// Populated from the `data` frontmatter of every slide in deck order, so a
/// later slide overwrites keys set by an earlier one. The session clears it
/// before each reparse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataStore {
    values: BTreeMap<String, Value>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn merge<'a>(&mut self, entries: impl IntoIterator<Item = (&'a String, &'a Value)>) {
        for (key, value) in entries {
            self.insert(key.clone(), value.clone());
        }
    }

    /// Resolve a dot-separated path (`team.lead`) into nested mappings and
    /// sequences.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.').map(str::trim);
        let mut value = self.get(parts.next()?)?;
        for part in parts {
            value = match value {
                Value::Mapping(map) => map.get(part)?,
                Value::Sequence(seq) => seq.get(part.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(value)
    }

    /// Text for an interpolation. Missing paths and nulls render empty.
    pub fn display(&self, path: &str) -> String {
        self.lookup(path).map(value_to_text).unwrap_or_default()
    }
}

pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Tagged(tagged) => value_to_text(&tagged.value),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_lookup_nested_path() {
        let mut store = DataStore::new();
        store.insert("team", yaml("lead: Ada\nmembers: [Bob, Cy]"));
        assert_eq!(store.display("team.lead"), "Ada");
        assert_eq!(store.display("team.members.1"), "Cy");
        assert_eq!(store.display("team.missing"), "");
    }

    #[test]
    fn test_missing_and_null_render_empty() {
        let mut store = DataStore::new();
        store.insert("nothing", Value::Null);
        assert_eq!(store.display("nothing"), "");
        assert_eq!(store.display("absent"), "");
    }

    #[test]
    fn test_scalars_render_as_text() {
        let mut store = DataStore::new();
        store.insert("n", yaml("42"));
        store.insert("flag", yaml("true"));
        assert_eq!(store.display("n"), "42");
        assert_eq!(store.display("flag"), "true");
    }

    #[test]
    fn test_merge_overwrites() {
        let mut store = DataStore::new();
        store.insert("x", yaml("1"));
        let mut other = BTreeMap::new();
        other.insert("x".to_string(), yaml("2"));
        other.insert("y".to_string(), yaml("3"));
        store.merge(&other);
        assert_eq!(store.display("x"), "2");
        assert_eq!(store.len(), 2);
    }
}

//! Stage arguments.
//!
//! Arguments are a free-form key/value map. Each stage reads the keys it
//! understands through the typed getters and ignores everything else.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Free-form arguments passed to a sanitizer stage.
///
/// Getters are lenient about representation so that values coming from TOML,
/// JSON or string-only sources read the same: `get_bool` accepts `true`,
/// `"true"`, `"1"` and `1`; `get_u32` accepts `600` and `"600"`.
///
/// # Example
///
/// ```
/// use amp_sanitizers::Args;
///
/// let global = Args::new().with("content_max_width", 720).with("width", 500);
/// let stage = Args::new().with("width", 600).with("add_placeholder", "true");
///
/// let args = global.overlay(&stage);
/// assert_eq!(args.get_u32("width"), Some(600));
/// assert_eq!(args.get_u32("content_max_width"), Some(720));
/// assert!(args.get_bool("add_placeholder"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Args(Map<String, Value>);

impl Args {
    /// Create empty arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` and return `self`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Set `key` to `value`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of `key`. Numbers and booleans are rendered as text.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Boolean value of `key`, `false` when absent or unrecognized.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
            Some(Value::String(s)) => matches!(s.trim(), "true" | "1" | "yes" | "on"),
            _ => false,
        }
    }

    /// Non-negative integer value of `key`.
    #[must_use]
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        match self.get(key)? {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// List of strings under `key`. A single string counts as a one-item list.
    #[must_use]
    pub fn get_str_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_owned))
                .collect(),
            Some(Value::String(s)) => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    /// Merge `other` into `self`; keys in `other` win.
    pub fn merge(&mut self, other: &Args) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// A copy of `self` with `other` laid over it.
    #[must_use]
    pub fn overlay(&self, other: &Args) -> Args {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }

    /// Whether no arguments are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(key, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for Args {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Args {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_get_bool_variants() {
        let args = Args::new()
            .with("a", true)
            .with("b", "true")
            .with("c", 1)
            .with("d", "0")
            .with("e", false);
        assert!(args.get_bool("a"));
        assert!(args.get_bool("b"));
        assert!(args.get_bool("c"));
        assert!(!args.get_bool("d"));
        assert!(!args.get_bool("e"));
        assert!(!args.get_bool("missing"));
    }

    #[test]
    fn test_get_u32_variants() {
        let args = Args::new()
            .with("n", 600)
            .with("s", " 380 ")
            .with("neg", -1)
            .with("text", "auto");
        assert_eq!(args.get_u32("n"), Some(600));
        assert_eq!(args.get_u32("s"), Some(380));
        assert_eq!(args.get_u32("neg"), None);
        assert_eq!(args.get_u32("text"), None);
    }

    #[test]
    fn test_get_str_renders_scalars() {
        let args = Args::new().with("w", 600).with("mode", "always");
        assert_eq!(args.get_str("w"), Some("600".to_owned()));
        assert_eq!(args.get_str("mode"), Some("always".to_owned()));
    }

    #[test]
    fn test_get_str_list() {
        let args = Args::from(
            json!({ "tags": ["amp-ad", "amp-fit-text", 3], "one": "x" })
                .as_object()
                .unwrap()
                .clone(),
        );
        assert_eq!(args.get_str_list("tags"), vec!["amp-ad", "amp-fit-text"]);
        assert_eq!(args.get_str_list("one"), vec!["x"]);
        assert!(args.get_str_list("missing").is_empty());
    }

    #[test]
    fn test_overlay_prefers_stage_values() {
        let global = Args::new().with("width", 500).with("content_max_width", 720);
        let stage = Args::new().with("width", 600);
        let merged = global.overlay(&stage);

        assert_eq!(merged.get_u32("width"), Some(600));
        assert_eq!(merged.get_u32("content_max_width"), Some(720));
        // overlay leaves the base untouched
        assert_eq!(global.get_u32("width"), Some(500));
    }

    #[test]
    fn test_deserialize_transparent_map() {
        let args: Args =
            serde_json::from_str(r#"{"align_wide_support": false, "width": 600}"#).unwrap();
        assert!(!args.get_bool("align_wide_support"));
        assert_eq!(args.get_u32("width"), Some(600));
    }
}

//! `TextValue` deliberately does not implement `Display`, `AsRef<str>`, or
//! `From<TextValue> for String` so that free text entered by end users
//! cannot be spliced into a SQL string at compile time. The only way to
//! get a value out of one is [`TextValue::bind`], which hands it to a
//! [`crate::capability::PlaceholderSink`] for parameterized binding.

/// Free text supplied by an end user (a parameter selection, a configurable
/// value, ...). Carries no string-coercion impls on purpose.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TextValue(String);

impl TextValue {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Bind this value into a placeholder sink, returning the name it was
    /// bound under. This is the only sanctioned way to move a `TextValue`
    /// into a query.
    pub fn bind(self, sink: &mut dyn PlaceholderSink, name: &str) {
        sink.set_placeholder(name, self.0);
    }

    /// Length of the underlying text, for validation purposes only.
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Escape hatch for code that has already decided to trust this text
    /// (e.g. comparing it against a regex during parameter validation,
    /// never for SQL construction). Kept separate from `Display`/`AsRef`
    /// so a reviewer sees every call site explicitly.
    pub fn as_trusted_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for TextValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TextValue(<redacted, {} chars>)", self.len())
    }
}

/// Sink for values bound through the embedded engine's prepared-statement
/// mechanism. Implemented by [`crate::capability::EmbeddedSql`]-backed
/// render contexts; never string-interpolated into SQL text.
pub trait PlaceholderSink {
    fn set_placeholder(&mut self, name: &str, value: String);
    fn get_placeholder_value(&self, name: &str) -> Option<&str>;
    fn is_placeholder(&self, name: &str) -> bool;
}

/// A concrete, single-query-scoped [`PlaceholderSink`] (§4.5, §9:
/// "Per-request engine connection" — each node's render/execute pass
/// gets its own scope rather than sharing one across the whole DAG, so
/// one node's bindings can never leak into another's query). Handed to
/// [`crate::capability::EmbeddedSql::query`]/`execute` as bind parameters.
#[derive(Debug, Default)]
pub struct PlaceholderScope(std::collections::HashMap<String, String>);

impl PlaceholderScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bindings(self) -> std::collections::HashMap<String, String> {
        self.0
    }
}

impl PlaceholderSink for PlaceholderScope {
    fn set_placeholder(&mut self, name: &str, value: String) {
        self.0.insert(name.to_string(), value);
    }

    fn get_placeholder_value(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    fn is_placeholder(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeSink(std::collections::HashMap<String, String>);

    impl PlaceholderSink for FakeSink {
        fn set_placeholder(&mut self, name: &str, value: String) {
            self.0.insert(name.to_string(), value);
        }
        fn get_placeholder_value(&self, name: &str) -> Option<&str> {
            self.0.get(name).map(|s| s.as_str())
        }
        fn is_placeholder(&self, name: &str) -> bool {
            self.0.contains_key(name)
        }
    }

    #[test]
    fn bind_round_trips_through_sink() {
        let mut sink = FakeSink(std::collections::HashMap::new());
        TextValue::new("'; DROP TABLE users; --").bind(&mut sink, "p1");
        assert!(sink.is_placeholder("p1"));
        assert_eq!(sink.get_placeholder_value("p1"), Some("'; DROP TABLE users; --"));
    }

    #[test]
    fn debug_redacts_content() {
        let tv = TextValue::new("secret");
        assert_eq!(format!("{tv:?}"), "TextValue(<redacted, 6 chars>)");
    }

    #[test]
    fn placeholder_scope_round_trips() {
        let mut scope = PlaceholderScope::new();
        TextValue::new("hello").bind(&mut scope, "p1");
        assert!(scope.is_placeholder("p1"));
        assert_eq!(scope.get_placeholder_value("p1"), Some("hello"));
        assert_eq!(scope.into_bindings().get("p1").map(String::as_str), Some("hello"));
    }
}

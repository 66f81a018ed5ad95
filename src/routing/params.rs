//! Captured path parameters
//!
//! Parameters are collected in capture order during a single matching walk
//! (root to leaf, then any wildcard remainder).

/// A single URL parameter captured during route matching
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Parameter name (segment without its `:` or `*` prefix)
    pub key: String,
    /// Value taken from the request path
    pub value: String,
}

impl Param {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Ordered collection of captured parameters
///
/// Duplicate keys are possible when a wildcard and an earlier parameter share
/// a name; lookups return the first entry, so the earlier capture wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(Vec<Param>);

impl Params {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Look up a parameter by name, scanning in capture order
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|param| param.key == name)
            .map(|param| param.value.as_str())
    }

    /// Like [`Params::get`], but returns an empty string when absent
    #[must_use]
    pub fn by_name(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, param: Param) {
        self.0.push(param);
    }

    /// Roll the accumulator back to a snapshot taken before a descent
    pub fn truncate(&mut self, len: usize) {
        self.0.truncate(len);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Param> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = &'a Param;
    type IntoIter = std::slice::Iter<'a, Param>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Param> for Params {
    fn from_iter<T: IntoIterator<Item = Param>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_by_name() {
        let mut params = Params::new();
        params.push(Param::new("id", "42"));

        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.by_name("id"), "42");
        assert_eq!(params.get("missing"), None);
        assert_eq!(params.by_name("missing"), "");
    }

    #[test]
    fn test_first_write_wins_on_duplicate_key() {
        let mut params = Params::new();
        params.push(Param::new("name", "first"));
        params.push(Param::new("name", "second"));

        assert_eq!(params.by_name("name"), "first");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_truncate_rolls_back_captures() {
        let mut params = Params::new();
        params.push(Param::new("a", "1"));
        let snapshot = params.len();
        params.push(Param::new("b", "2"));
        params.truncate(snapshot);

        assert_eq!(params.len(), 1);
        assert_eq!(params.get("b"), None);
    }
}

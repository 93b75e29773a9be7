use std::fmt::{self, Display, Write as _};

use indexmap::IndexMap;

/// An insertion-ordered `key=value` accumulator for Java-style properties
/// files.
///
/// Re-adding a key overwrites its value but keeps the position of the first
/// insertion, so repeated synthesis of the same input renders byte-identical
/// output.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PropertiesFile {
    entries: IndexMap<String, String>,
}

impl PropertiesFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a property. The last write wins.
    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Adds every property of `other`, overwriting already-set keys.
    pub fn extend(&mut self, other: &Self) {
        for (key, value) in &other.entries {
            self.add(key.clone(), value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Display for PropertiesFile {
    /// Renders one `key=value` line per property, in insertion order.
    /// Values are written verbatim, runtime placeholders like
    /// `{{ getenv "NODE_ADDRESS" }}` must survive unescaped.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            writeln!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// Renders a `${file:UTF-8:<path>}` reference, resolved by the NiFi runtime
/// when the configuration is loaded.
pub fn file_reference(path: impl Display) -> String {
    format!("${{file:UTF-8:{path}}}")
}

/// Renders a `{{ getenv "<var>" }}` placeholder, resolved by the templating
/// step of the prepare container.
pub fn getenv_reference(var: &str) -> String {
    format!("{{{{ getenv \"{var}\" }}}}")
}

/// Renders sorted `key=value` lines from any iterator of pairs, used for
/// artifacts with lexicographic key order such as `bootstrap.conf`.
pub fn to_sorted_properties<'a>(
    properties: impl IntoIterator<Item = (&'a String, &'a String)>,
) -> String {
    let mut entries = properties.into_iter().collect::<Vec<_>>();
    entries.sort_by_key(|(key, _)| key.as_str());

    let mut out = String::new();
    for (key, value) in entries {
        let _ = writeln!(out, "{key}={value}");
    }
    out
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn insertion_order_is_preserved() {
        let mut properties = PropertiesFile::new();
        properties
            .add("b", "2")
            .add("a", "1")
            .add("c", "3");

        assert_eq!(properties.to_string(), "b=2\na=1\nc=3\n");
    }

    #[test]
    fn last_write_wins() {
        let mut properties = PropertiesFile::new();
        properties.add("a", "1").add("b", "2").add("a", "overwritten");

        assert_eq!(properties.get("a"), Some("overwritten"));
        assert_eq!(properties.to_string(), "a=overwritten\nb=2\n");
    }

    #[test]
    fn extend_overwrites() {
        let mut properties = PropertiesFile::new();
        properties.add("a", "1");

        let mut extension = PropertiesFile::new();
        extension.add("a", "extended").add("z", "26");
        properties.extend(&extension);

        assert_eq!(properties.to_string(), "a=extended\nz=26\n");
    }

    #[test]
    fn references() {
        assert_eq!(
            file_reference("/stackable/users/admin"),
            "${file:UTF-8:/stackable/users/admin}"
        );
        assert_eq!(
            getenv_reference("NODE_ADDRESS"),
            "{{ getenv \"NODE_ADDRESS\" }}"
        );
    }

    #[test]
    fn sorted_properties() {
        let map = BTreeMap::from([
            ("run.as".to_string(), String::new()),
            ("java".to_string(), "java".to_string()),
        ]);

        assert_eq!(to_sorted_properties(&map), "java=java\nrun.as=\n");
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// Path to a column, or to a position inside a value tree.
///
/// Segments are field names. List positions use `[i]` segments and map
/// entries use `key` / `value`, which only appear in error paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnPath(Vec<String>);

impl ColumnPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Parse a dot-separated path (`"address.city"`). Empty input is the root.
    pub fn parse(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Self::root();
        }
        Self(dotted.split('.').map(str::to_string).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Prepend an enclosing segment.
    pub fn prepend(mut self, segment: impl Into<String>) -> Self {
        self.0.insert(0, segment.into());
        self
    }
}

impl fmt::Display for ColumnPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 && !segment.starts_with('[') {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

impl From<&str> for ColumnPath {
    fn from(dotted: &str) -> Self {
        Self::parse(dotted)
    }
}

impl From<Vec<String>> for ColumnPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let path = ColumnPath::parse("address.city");
        assert_eq!(path.segments(), ["address", "city"]);
        assert_eq!(path.to_string(), "address.city");
        assert!(ColumnPath::parse("").is_root());
        assert_eq!(ColumnPath::root().to_string(), "<root>");
    }

    #[test]
    fn index_segments_attach_without_dot() {
        let path = ColumnPath::parse("name").prepend("[3]").prepend("items");
        assert_eq!(path.to_string(), "items[3].name");
    }
}

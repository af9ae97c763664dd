use std::fmt::{self, Write};

use serde::{Serialize, Serializer};

/// One step from a container to a child value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Address of a value inside a document tree.
///
/// Renders as dot-joined keys with bracketed indices, e.g.
/// `data_privacy_statement.trustee_signatures[0].date`. The root renders as
/// the empty string.
///
/// A `\`, `.`, `[` or `]` inside a key is escaped with a backslash, so the
/// key `"a.b"` renders as `a\.b` and stays distinct from the nested `a.b`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Path to the value under `key` of the object at `self`.
    pub fn child(&self, key: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Key(key.to_string()));
        Self { segments }
    }

    /// Path to element `index` of the array at `self`.
    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(index));
        Self { segments }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Key(key) => {
                    if i > 0 {
                        f.write_char('.')?;
                    }
                    write_key(f, key)?;
                }
                Segment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

fn write_key(f: &mut fmt::Formatter<'_>, key: &str) -> fmt::Result {
    for c in key.chars() {
        if matches!(c, '\\' | '.' | '[' | ']') {
            f.write_char('\\')?;
        }
        f.write_char(c)?;
    }
    Ok(())
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_renders_empty() {
        assert_eq!(FieldPath::root().to_string(), "");
        assert!(FieldPath::root().is_root());
    }

    #[test]
    fn nested_keys_are_dot_joined() {
        let p = FieldPath::root()
            .child("trustee_details")
            .child("not_born_in_uk")
            .child("nationality");
        assert_eq!(p.to_string(), "trustee_details.not_born_in_uk.nationality");
    }

    #[test]
    fn indices_are_bracketed() {
        let p = FieldPath::root()
            .child("data_privacy_statement")
            .child("trustee_signatures")
            .index(0)
            .child("date");
        assert_eq!(p.to_string(), "data_privacy_statement.trustee_signatures[0].date");
    }

    #[test]
    fn root_array_index_has_no_leading_dot() {
        let p = FieldPath::root().index(2).child("name");
        assert_eq!(p.to_string(), "[2].name");
    }

    #[test]
    fn separator_chars_in_keys_are_escaped() {
        assert_eq!(FieldPath::root().child("a.b").to_string(), r"a\.b");
        assert_eq!(FieldPath::root().child("x").child("[0]").to_string(), r"x.\[0\]");
        assert_eq!(FieldPath::root().child(r"c:\tmp").to_string(), r"c:\\tmp");
    }

    #[test]
    fn dotted_key_and_nested_keys_render_differently() {
        let dotted = FieldPath::root().child("a.b");
        let nested = FieldPath::root().child("a").child("b");
        assert_ne!(dotted.to_string(), nested.to_string());

        let bracketed = FieldPath::root().child("a[0]");
        let indexed = FieldPath::root().child("a").index(0);
        assert_ne!(bracketed.to_string(), indexed.to_string());
    }
}

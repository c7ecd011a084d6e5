//! Path representation for navigating a session document.
//!
//! Paths are sequences of segments, each either an object key or an array
//! index. On the wire a path is a dotted string (`characters.0.name`), with
//! the bracket form (`characters[0].name`) accepted as an alias.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single segment in a document path.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Seg {
    /// Object key access.
    Key(String),
    /// Array index access.
    Index(usize),
}

impl Seg {
    /// Create a key segment.
    #[inline]
    pub fn key(k: impl Into<String>) -> Self {
        Seg::Key(k.into())
    }

    /// Create an index segment.
    #[inline]
    pub fn index(i: usize) -> Self {
        Seg::Index(i)
    }

    /// Returns true if this is an index segment.
    #[inline]
    pub fn is_index(&self) -> bool {
        matches!(self, Seg::Index(_))
    }

    /// Get the key if this is a key segment.
    #[inline]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Seg::Key(k) => Some(k),
            Seg::Index(_) => None,
        }
    }

    /// Get the index if this is an index segment.
    #[inline]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Seg::Key(_) => None,
            Seg::Index(i) => Some(*i),
        }
    }
}

impl fmt::Display for Seg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seg::Key(k) => write!(f, "{k}"),
            Seg::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for Seg {
    fn from(s: &str) -> Self {
        Seg::Key(s.to_owned())
    }
}

impl From<String> for Seg {
    fn from(s: String) -> Self {
        Seg::Key(s)
    }
}

impl From<usize> for Seg {
    fn from(i: usize) -> Self {
        Seg::Index(i)
    }
}

/// A complete path into a session document.
///
/// # Examples
///
/// ```
/// use vtt_state::Path;
///
/// let parsed = Path::parse("characters[0].pluginData.hitPoints");
/// let built = Path::root().key("characters").index(0).key("pluginData").key("hitPoints");
/// assert_eq!(parsed, built);
/// assert_eq!(parsed.to_string(), "characters.0.pluginData.hitPoints");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(Vec<Seg>);

impl Path {
    /// Create an empty path (document root).
    #[inline]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Create a path from a vector of segments.
    #[inline]
    pub fn from_segments(segments: Vec<Seg>) -> Self {
        Self(segments)
    }

    /// Parse a dotted path string, accepting the bracket-index alias.
    ///
    /// Bracket indices are normalized to dotted-numeric segments, the string
    /// is split on `.`, and empty segments are discarded. A purely numeric
    /// segment becomes an [`Seg::Index`]; everything else stays a key (a
    /// token too large for `usize` falls back to a key as well). Parsing
    /// never fails; an empty or all-separator string yields the root path.
    pub fn parse(input: &str) -> Self {
        let mut normalized = String::with_capacity(input.len());
        for ch in input.chars() {
            match ch {
                '[' => normalized.push('.'),
                ']' => {}
                other => normalized.push(other),
            }
        }

        normalized
            .split('.')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s.bytes().all(|b| b.is_ascii_digit()) {
                    s.parse::<usize>().map(Seg::Index).unwrap_or_else(|_| Seg::key(s))
                } else {
                    Seg::key(s)
                }
            })
            .collect()
    }

    /// Append a key segment and return self (builder pattern).
    #[inline]
    pub fn key(mut self, k: impl Into<String>) -> Self {
        self.0.push(Seg::Key(k.into()));
        self
    }

    /// Append an index segment and return self (builder pattern).
    #[inline]
    pub fn index(mut self, i: usize) -> Self {
        self.0.push(Seg::Index(i));
        self
    }

    /// Push a segment onto the path (mutating).
    #[inline]
    pub fn push(&mut self, seg: Seg) {
        self.0.push(seg);
    }

    /// Get the segments of this path.
    #[inline]
    pub fn segments(&self) -> &[Seg] {
        &self.0
    }

    /// Check if this path is empty (root).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the number of segments in this path.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Get the last segment.
    #[inline]
    pub fn last(&self) -> Option<&Seg> {
        self.0.last()
    }

    /// Get the parent path (path without the last segment).
    #[inline]
    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            None
        } else {
            Some(Path(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// The prefix of this path covering the first `len` segments.
    #[inline]
    pub fn prefix(&self, len: usize) -> Path {
        Path(self.0[..len.min(self.0.len())].to_vec())
    }

    /// Iterate over the segments.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Seg> {
        self.0.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::parse(s)
    }
}

impl FromIterator<Seg> for Path {
    fn from_iter<I: IntoIterator<Item = Seg>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl IntoIterator for Path {
    type Item = Seg;
    type IntoIter = std::vec::IntoIter<Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Seg;
    type IntoIter = std::slice::Iter<'a, Seg>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::ops::Index<usize> for Path {
    type Output = Seg;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

// Paths travel as dotted strings, matching the update-request wire shape.
impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw.is_empty() {
            return Err(D::Error::custom("operation path must not be empty"));
        }
        Ok(Path::parse(&raw))
    }
}

/// Construct a `Path` from a sequence of segments.
///
/// ```
/// use vtt_state::path;
///
/// let p = path!("characters", 0, "name");
/// assert_eq!(p.to_string(), "characters.0.name");
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::root()
    };
    ($($seg:expr),+ $(,)?) => {{
        let mut p = $crate::Path::root();
        $(
            p.push($crate::Seg::from($seg));
        )+
        p
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dotted() {
        let path = Path::parse("characters.0.pluginData.hitPoints");
        assert_eq!(path.len(), 4);
        assert_eq!(path[0], Seg::key("characters"));
        assert_eq!(path[1], Seg::Index(0));
        assert_eq!(path[3], Seg::key("hitPoints"));
    }

    #[test]
    fn parse_bracket_form_normalizes() {
        assert_eq!(
            Path::parse("characters[0].hitPoints"),
            Path::parse("characters.0.hitPoints")
        );
        assert_eq!(Path::parse("a[0][1]"), path!("a", 0, 1));
    }

    #[test]
    fn parse_discards_empty_segments() {
        assert_eq!(Path::parse("a..b."), path!("a", "b"));
        assert!(Path::parse("").is_empty());
        assert!(Path::parse("...").is_empty());
    }

    #[test]
    fn parse_mixed_digit_token_stays_key() {
        let path = Path::parse("turnManager.2nd");
        assert_eq!(path[1], Seg::key("2nd"));
    }

    #[test]
    fn parse_overflowing_index_stays_key() {
        let token = "99999999999999999999999999";
        let path = Path::parse(token);
        assert_eq!(path[0], Seg::key(token));
    }

    #[test]
    fn display_round_trips_through_parse() {
        let path = path!("actors", 2, "state", "conditions", 0);
        assert_eq!(path.to_string(), "actors.2.state.conditions.0");
        assert_eq!(Path::parse(&path.to_string()), path);
    }

    #[test]
    fn parent_drops_last_segment() {
        let path = path!("items", 3);
        assert_eq!(path.parent(), Some(path!("items")));
        assert_eq!(Path::root().parent(), None);
    }

    #[test]
    fn serde_as_string() {
        let path = path!("characters", 0, "name");
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"characters.0.name\"");
        let parsed: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, path);
    }

    #[test]
    fn serde_rejects_empty_path() {
        let result: Result<Path, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }
}

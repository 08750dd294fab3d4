// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Typed paths into a values document.
//!
//! A [`FieldPath`] is a parsed sequence of [`Segment`]s: mapping keys and sequence indices. The
//! wire form is a dotted string (`"a.items.0.name"`), where purely numeric segments denote
//! indices. All algorithms in this crate operate on the parsed form.
//!
//! Lookups never fail: a missing intermediate container resolves to an absent value
//! (`None`), just like reading a key that does not exist.
//!
//! Paths order lexicographically by segment, so every strict descendant of a path sorts
//! contiguously right after it. The dirty map relies on this for its range queries.

use crate::error::PathError;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::Value;
use smallvec::SmallVec;
use std::{borrow::Cow, fmt, str::FromStr};

/// A single step in a [`FieldPath`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// Mapping key access.
    Key(String),
    /// Sequence index access.
    Index(usize),
}

impl Segment {
    /// Parses one dotted-path segment. Canonical decimal numbers become indices.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<usize>() {
            Ok(index) if index.to_string() == raw => Segment::Index(index),
            _ => Segment::Key(raw.to_owned()),
        }
    }

    /// Returns true if this is an index segment.
    #[inline]
    pub fn is_index(&self) -> bool {
        matches!(self, Segment::Index(_))
    }

    /// Get the key if this is a key segment.
    #[inline]
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Segment::Key(k) => Some(k),
            Segment::Index(_) => None,
        }
    }

    /// Steps into `value`.
    ///
    /// An index segment on a mapping reads the decimal key, the way a dotted path cannot tell
    /// the two apart anyway.
    pub fn lookup<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        match (self, value) {
            (Segment::Key(k), Value::Object(map)) => map.get(k),
            (Segment::Index(i), Value::Array(items)) => items.get(*i),
            (Segment::Index(i), Value::Object(map)) => map.get(&i.to_string()),
            _ => None,
        }
    }

    /// Mutable counterpart of [`Segment::lookup`].
    pub fn lookup_mut<'v>(&self, value: &'v mut Value) -> Option<&'v mut Value> {
        match (self, value) {
            (Segment::Key(k), Value::Object(map)) => map.get_mut(k),
            (Segment::Index(i), Value::Array(items)) => items.get_mut(*i),
            (Segment::Index(i), Value::Object(map)) => map.get_mut(&i.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(k) => f.write_str(k),
            Segment::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<String> for Segment {
    fn from(s: String) -> Self {
        Segment::Key(s)
    }
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        Segment::Key(s.to_owned())
    }
}

impl From<usize> for Segment {
    fn from(i: usize) -> Self {
        Segment::Index(i)
    }
}

/// A complete path into a values document. The empty path is the document root.
///
/// # Examples
///
/// ```
/// use formstate::FieldPath;
///
/// let path = FieldPath::parse("users.0.name").unwrap();
/// assert_eq!(path.len(), 3);
/// assert_eq!(path.to_string(), "users.0.name");
/// assert_eq!(path.pattern(), "users.name");
/// ```
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldPath(SmallVec<[Segment; 4]>);

impl FieldPath {
    /// The root path.
    #[inline]
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    /// Parses a dotted path. The empty string is the root.
    pub fn parse(dotted: &str) -> Result<Self, PathError> {
        if dotted.is_empty() {
            return Ok(Self::root());
        }
        dotted
            .split('.')
            .enumerate()
            .map(|(position, raw)| {
                if raw.is_empty() {
                    Err(PathError::EmptySegment {
                        path: dotted.to_owned(),
                        position,
                    })
                } else {
                    Ok(Segment::parse(raw))
                }
            })
            .collect()
    }

    #[inline]
    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, segment: impl Into<Segment>) {
        self.0.push(segment.into());
    }

    /// Returns this path extended by one segment.
    pub fn child(&self, segment: impl Into<Segment>) -> Self {
        let mut child = self.clone();
        child.push(segment);
        child
    }

    /// Returns the path minus its final segment, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.0.split_last()?;
        Some(init.iter().cloned().collect())
    }

    #[inline]
    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    pub fn starts_with(&self, prefix: &FieldPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// True if `self` lies strictly below `ancestor`.
    pub fn is_strict_descendant_of(&self, ancestor: &FieldPath) -> bool {
        self.len() > ancestor.len() && self.starts_with(ancestor)
    }

    /// Every non-empty prefix of this path, shortest first, ending with the path itself.
    pub fn prefixes(&self) -> impl Iterator<Item = FieldPath> + '_ {
        (1..=self.len()).map(|n| self.0[..n].iter().cloned().collect())
    }

    /// The path with every index segment removed, in dotted form.
    ///
    /// Patterns address "the same container in every element", e.g. `groups.0.items` and
    /// `groups.3.items` share the pattern `groups.items`.
    pub fn pattern(&self) -> String {
        let mut pattern = String::new();
        for key in self.0.iter().filter_map(Segment::as_key) {
            if !pattern.is_empty() {
                pattern.push('.');
            }
            pattern.push_str(key);
        }
        pattern
    }

    /// Resolves this path inside `value`. Missing intermediates resolve to `None`.
    pub fn lookup<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        self.0
            .iter()
            .try_fold(value, |current, segment| segment.lookup(current))
    }

    /// Mutable counterpart of [`FieldPath::lookup`].
    pub fn lookup_mut<'v>(&self, value: &'v mut Value) -> Option<&'v mut Value> {
        self.0
            .iter()
            .try_fold(value, |current, segment| segment.lookup_mut(current))
    }
}

impl FromIterator<Segment> for FieldPath {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            segment.fmt(f)?;
        }
        Ok(())
    }
}

// The dotted form reads far better in dirty-map dumps than the segment list.
impl fmt::Debug for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldPath({:?})", self.to_string())
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dotted = String::deserialize(deserializer)?;
        FieldPath::parse(&dotted).map_err(de::Error::custom)
    }
}

/// Rejects mapping keys whose dotted form would not parse back to the same key.
pub(crate) fn check_key(key: &str) -> Result<(), PathError> {
    if key.is_empty() || key.contains('.') {
        return Err(PathError::UnaddressableKey {
            key: key.to_owned(),
        });
    }
    Ok(())
}

/// Checks every mapping key inside `value` with [`check_key`].
pub(crate) fn check_keys(value: &Value) -> Result<(), PathError> {
    match value {
        Value::Object(map) => map.iter().try_for_each(|(key, child)| {
            check_key(key)?;
            check_keys(child)
        }),
        Value::Array(items) => items.iter().try_for_each(check_keys),
        _ => Ok(()),
    }
}

/// Anything the public API accepts where a path is expected.
pub trait ToFieldPath {
    fn to_field_path(&self) -> Result<Cow<'_, FieldPath>, PathError>;
}

impl ToFieldPath for FieldPath {
    fn to_field_path(&self) -> Result<Cow<'_, FieldPath>, PathError> {
        Ok(Cow::Borrowed(self))
    }
}

impl ToFieldPath for str {
    fn to_field_path(&self) -> Result<Cow<'_, FieldPath>, PathError> {
        FieldPath::parse(self).map(Cow::Owned)
    }
}

impl ToFieldPath for String {
    fn to_field_path(&self) -> Result<Cow<'_, FieldPath>, PathError> {
        self.as_str().to_field_path()
    }
}

impl<T: ToFieldPath + ?Sized> ToFieldPath for &T {
    fn to_field_path(&self) -> Result<Cow<'_, FieldPath>, PathError> {
        (**self).to_field_path()
    }
}

#[cfg(any(test, feature = "arbitrary"))]
mod arbitrary {
    use super::{FieldPath, Segment};
    use quickcheck::{Arbitrary, Gen};

    const KEYS: &[&str] = &["a", "b", "c", "items", "name"];

    impl Arbitrary for Segment {
        fn arbitrary(g: &mut Gen) -> Self {
            if bool::arbitrary(g) {
                Segment::Key((*g.choose(KEYS).expect("KEYS is non-empty")).to_owned())
            } else {
                Segment::Index(usize::arbitrary(g) % 4)
            }
        }
    }

    impl Arbitrary for FieldPath {
        fn arbitrary(g: &mut Gen) -> Self {
            let len = usize::arbitrary(g) % 5;
            (0..len).map(|_| Segment::arbitrary(g)).collect()
        }

        fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
            Box::new(self.parent().into_iter())
        }
    }
}

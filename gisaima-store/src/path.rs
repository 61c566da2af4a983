//! A store-neutral hierarchical path, e.g. `worlds/w1/chunks/0,0/3,4/groups/g1`.

use std::fmt;

/// A `/`-segmented path into the hierarchical store.
///
/// Segments are opaque strings; the store never inspects them. Domain code
/// (in `gisaima-core::paths`) is responsible for building canonical segments
/// such as chunk and tile keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path(Vec<String>);

impl Path {
    /// The empty (root) path.
    #[must_use]
    pub const fn root() -> Self {
        Path(Vec::new())
    }

    /// Builds a path from segments.
    pub fn new(segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Path(segments.into_iter().map(Into::into).collect())
    }

    /// Returns a new path with `segment` appended.
    #[must_use]
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Path(segments)
    }

    /// Returns true if `self` is `other`, or a descendant of `other`.
    #[must_use]
    pub fn is_within(&self, other: &Path) -> bool {
        self.0.len() >= other.0.len() && self.0[..other.0.len()] == other.0[..]
    }

    /// The path's segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl<S: Into<String>> FromIterator<S> for Path {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Path::new(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_and_display() {
        let p = Path::root().join("worlds").join("w1").join("info");
        assert_eq!(p.to_string(), "worlds/w1/info");
    }

    #[test]
    fn is_within_checks_prefix() {
        let root = Path::new(["worlds", "w1"]);
        let child = root.join("chunks").join("0,0");
        assert!(child.is_within(&root));
        assert!(!root.is_within(&child));
    }
}

//! Virtual path normalization.
//!
//! Paths in the emulated namespace are `/`-separated and absolute. `..`
//! resolves upward and stops at the root, so a normalized path can never
//! point above it.

use std::fmt;

use crate::error::{CraftError, CraftResult};

/// Normalized absolute path in the emulated namespace.
///
/// Invariants: leading `/`, no trailing slash except for the root itself,
/// no `.`, `..`, or empty segments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualPath(String);

impl VirtualPath {
    /// The namespace root, `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Normalize a raw emulated path.
    ///
    /// Lenient: a missing leading slash is tolerated (`rom` and `/rom` name
    /// the same location), `.` and empty segments are dropped, `..` pops the
    /// previous segment and clamps at the root. Fails with `InvalidPath`
    /// only for empty or whitespace-only input.
    pub fn normalize(raw: &str) -> CraftResult<Self> {
        if raw.trim().is_empty() {
            return Err(CraftError::InvalidPath(raw.to_string()));
        }
        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    // Clamp: above the root there is nothing to pop.
                    segments.pop();
                }
                s => segments.push(s),
            }
        }
        if segments.is_empty() {
            return Ok(Self::root());
        }
        Ok(Self(format!("/{}", segments.join("/"))))
    }

    /// Parse a path that must already be in normalized absolute form.
    ///
    /// Strict: used for mount points, where `/rom/` or `a/../b` would hide
    /// a caller bug rather than a user typo.
    pub fn parse_canonical(raw: &str) -> CraftResult<Self> {
        if raw == "/" {
            return Ok(Self::root());
        }
        if !raw.starts_with('/') || raw.ends_with('/') {
            return Err(CraftError::InvalidPath(raw.to_string()));
        }
        for segment in raw[1..].split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(CraftError::InvalidPath(raw.to_string()));
            }
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Iterate the path's segments; the root has none.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    pub fn segment_count(&self) -> usize {
        self.segments().count()
    }

    /// Remainder of `self` below `prefix`, matched on whole segments.
    ///
    /// Returns `None` when `self` is not at or below `prefix`; returns the
    /// empty string when they are equal. `/romx` is not below `/rom`.
    pub fn strip_prefix(&self, prefix: &VirtualPath) -> Option<String> {
        let mut remaining = self.segments();
        for want in prefix.segments() {
            match remaining.next() {
                Some(have) if have == want => {}
                _ => return None,
            }
        }
        Some(remaining.collect::<Vec<_>>().join("/"))
    }
}

impl fmt::Display for VirtualPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

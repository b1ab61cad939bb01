//! Dot-segmented permission pattern matching.
//!
//! # Purpose
//! Decides whether an owned permission pattern grants a requested permission.
//!
//! # Key invariants
//! - Both strings are split on `.`; matching walks segments left to right.
//! - `*` consumes exactly one requested segment.
//! - `**` consumes every remaining requested segment (zero or more) and
//!   matches immediately. On its own it grants everything.
//! - Matching is total: malformed input yields `false`, never a panic.
//!
//! # Examples
//! ```rust
//! use kanban_authz::permission_match;
//!
//! assert!(permission_match("boards.create", "boards.*"));
//! assert!(!permission_match("boards.create.sub", "boards.*"));
//! assert!(permission_match("anything.at.all", "**"));
//! ```

pub const SEGMENT_SEPARATOR: char = '.';
pub const SINGLE_WILDCARD: &str = "*";
pub const DEEP_WILDCARD: &str = "**";

/// Return whether `pattern` grants `requested`.
pub fn permission_match(requested: &str, pattern: &str) -> bool {
    if pattern == DEEP_WILDCARD {
        return true;
    }

    let mut requested_segments = requested.split(SEGMENT_SEPARATOR);
    let mut pattern_segments = pattern.split(SEGMENT_SEPARATOR);

    loop {
        match (pattern_segments.next(), requested_segments.next()) {
            // `**` swallows whatever is left, including nothing.
            (Some(DEEP_WILDCARD), _) => return true,
            (Some(SINGLE_WILDCARD), Some(_)) => continue,
            (Some(literal), Some(segment)) if literal == segment => continue,
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// A set of owned patterns evaluated together.
#[derive(Debug, Clone, Default)]
pub struct PermissionMatcher {
    patterns: Vec<String>,
}

impl PermissionMatcher {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// True if any owned pattern grants `permission`.
    pub fn allows(&self, permission: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| permission_match(permission, pattern))
    }

    /// True if at least one of `permissions` is granted.
    pub fn allows_any<S: AsRef<str>>(&self, permissions: &[S]) -> bool {
        permissions
            .iter()
            .any(|permission| self.allows(permission.as_ref()))
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_wildcard_consumes_one_segment() {
        assert!(permission_match("boards.create", "boards.*"));
        assert!(!permission_match("boards.create.sub", "boards.*"));
        assert!(!permission_match("boards", "boards.*"));
    }

    #[test]
    fn deep_wildcard_matches_everything() {
        assert!(permission_match("anything.at.all", "**"));
        assert!(permission_match("boards", "**"));
        assert!(permission_match("", "**"));
    }

    #[test]
    fn trailing_deep_wildcard_matches_zero_or_more() {
        assert!(permission_match("boards.create.sub", "boards.**"));
        assert!(permission_match("boards.create", "boards.**"));
        assert!(permission_match("boards", "boards.**"));
        assert!(!permission_match("users.create", "boards.**"));
    }

    #[test]
    fn literal_segments_must_be_equal() {
        assert!(permission_match("boards.create", "boards.create"));
        assert!(!permission_match("boards.create", "users.*"));
        assert!(!permission_match("boards.create", "boards.remove"));
        assert!(!permission_match("boards.create", "boards"));
    }

    #[test]
    fn inner_wildcard_segment() {
        assert!(permission_match("boards.lists.create", "boards.*.create"));
        assert!(!permission_match("boards.lists.remove", "boards.*.create"));
    }

    #[test]
    fn malformed_input_never_panics() {
        assert!(!permission_match("", "boards.*"));
        assert!(permission_match("boards.", "boards.*"));
        assert!(!permission_match("..", "boards"));
        assert!(permission_match("", ""));
    }

    #[test]
    fn matcher_allows_any() {
        let matcher = PermissionMatcher::new(vec![
            "boards.list".to_string(),
            "cards.*".to_string(),
        ]);
        assert!(matcher.allows("cards.move"));
        assert!(!matcher.allows("boards.create"));
        assert!(matcher.allows_any(&["boards.create", "boards.list"]));
        assert!(!matcher.allows_any::<&str>(&[]));
        assert_eq!(matcher.patterns().len(), 2);
    }
}

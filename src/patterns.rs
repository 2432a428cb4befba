// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Allocator-origin pattern matching.
//!
//! Attributes an allocation receiver expression (the text left of the
//! allocation call) to a named allocator kind through an ordered table
//! of literal substring rules. User rules are matched before the
//! built-in defaults; a user rule reusing a default's name replaces the
//! default entirely.

use masterror::AppResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    analyzer::Severity,
    error::{DuplicatePatternNameError, EmptyPatternError, EmptyPatternNameError}
};

/// Origin reported when no pattern matches a receiver expression.
pub const UNKNOWN_ORIGIN: &str = "<unknown>";

/// Single allocator attribution rule.
///
/// `pattern` is a literal substring searched for in the receiver text;
/// `name` is the allocator kind reported for a match.
///
/// # Examples
///
/// ```
/// use zigcheck::patterns::AllocatorPattern;
///
/// let rule = AllocatorPattern::new("PageAllocator", "page_allocator");
/// assert_eq!(rule.name, "PageAllocator");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatorPattern {
    /// Allocator kind reported on match
    pub name:    String,
    /// Literal substring matched against receiver text
    pub pattern: String
}

impl AllocatorPattern {
    /// Create new pattern rule.
    ///
    /// # Arguments
    ///
    /// * `name` - Allocator kind reported on match
    /// * `pattern` - Literal substring to search for
    pub fn new(name: &str, pattern: &str) -> Self {
        Self {
            name:    name.to_string(),
            pattern: pattern.to_string()
        }
    }
}

/// Configuration note produced while compiling the pattern table.
///
/// Notes are accepted configurations with caveats: a single-character
/// pattern that will over-match, or a user rule shadowing a built-in
/// name. The facade surfaces them as `pattern_warning` issues.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternNote {
    /// How serious the caveat is
    pub severity: Severity,
    /// Human-readable description
    pub message:  String
}

/// Built-in allocator attribution rules, in match order.
///
/// # Returns
///
/// The default rules applied after any user rules
pub fn default_patterns() -> Vec<AllocatorPattern> {
    vec![
        AllocatorPattern::new("GeneralPurposeAllocator", "GeneralPurposeAllocator"),
        AllocatorPattern::new("ArenaAllocator", "arena"),
        AllocatorPattern::new("PageAllocator", "page_allocator"),
        AllocatorPattern::new("CAllocator", "c_allocator"),
        AllocatorPattern::new("FixedBufferAllocator", "FixedBufferAllocator"),
        AllocatorPattern::new("std.testing.allocator", "std.testing.allocator"),
        AllocatorPattern::new("testing.allocator", "testing.allocator"),
    ]
}

/// Compiled ordered table of allocator attribution rules.
///
/// Built once per analysis from the defaults, the user rules, and the
/// disabled-default names. Matching walks the table in order and the
/// first rule whose `pattern` occurs in the candidate text wins.
///
/// # Examples
///
/// ```
/// use zigcheck::patterns::PatternMatcher;
///
/// let matcher = PatternMatcher::with_defaults().unwrap();
/// assert_eq!(
///     matcher.resolve("std.heap.page_allocator"),
///     Some("PageAllocator")
/// );
/// assert_eq!(matcher.resolve("some_random_thing"), None);
/// ```
#[derive(Debug)]
pub struct PatternMatcher {
    entries: Vec<AllocatorPattern>,
    notes:   Vec<PatternNote>
}

impl Default for PatternMatcher {
    /// Table holding just the built-in rules.
    fn default() -> Self {
        Self {
            entries: default_patterns(),
            notes:   Vec::new()
        }
    }
}

impl PatternMatcher {
    /// Compile a match table from defaults and user configuration.
    ///
    /// User rules precede defaults in match order. A user rule whose
    /// name equals a default's name replaces that default and records
    /// an info note. Defaults named in `disabled_defaults` are dropped;
    /// `use_defaults: false` drops all of them.
    ///
    /// # Arguments
    ///
    /// * `user` - User rules in declaration order
    /// * `disabled_defaults` - Default rule names to drop
    /// * `use_defaults` - Whether the built-in rules participate
    ///
    /// # Returns
    ///
    /// `AppResult<PatternMatcher>` - Compiled table, or a validation
    /// error (`EmptyPatternName`, `EmptyPattern`, `DuplicatePatternName`)
    pub fn compile(
        user: &[AllocatorPattern],
        disabled_defaults: &[String],
        use_defaults: bool
    ) -> AppResult<Self> {
        let mut notes = Vec::new();

        for rule in user {
            if rule.name.is_empty() {
                return Err(EmptyPatternNameError.into());
            }
            if rule.pattern.is_empty() {
                return Err(EmptyPatternError::new(rule.name.clone()).into());
            }
            if rule.pattern.len() == 1 {
                notes.push(PatternNote {
                    severity: Severity::Warning,
                    message:  format!(
                        "Allocator pattern '{}' matches the single character '{}' and will \
                         over-match",
                        rule.name, rule.pattern
                    )
                });
            }
        }

        for (i, rule) in user.iter().enumerate() {
            if user[..i].iter().any(|other| other.name == rule.name) {
                return Err(DuplicatePatternNameError::new(rule.name.clone()).into());
            }
        }

        let mut entries: Vec<AllocatorPattern> = user.to_vec();

        if use_defaults {
            for default in default_patterns() {
                if disabled_defaults.contains(&default.name) {
                    continue;
                }
                if let Some(shadow) = user.iter().find(|u| u.name == default.name) {
                    notes.push(PatternNote {
                        severity: Severity::Info,
                        message:  format!(
                            "User pattern '{}' overrides the built-in pattern \"{}\"",
                            shadow.name, default.pattern
                        )
                    });
                    continue;
                }
                entries.push(default);
            }
        }

        debug!(rules = entries.len(), "compiled allocator pattern table");

        Ok(Self {
            entries,
            notes
        })
    }

    /// Compile the built-in rules only.
    ///
    /// # Returns
    ///
    /// `AppResult<PatternMatcher>` - Table holding just the defaults
    pub fn with_defaults() -> AppResult<Self> {
        Self::compile(&[], &[], true)
    }

    /// Attribute a candidate receiver expression to an allocator kind.
    ///
    /// # Arguments
    ///
    /// * `candidate` - Receiver text, e.g. `std.heap.page_allocator`
    ///
    /// # Returns
    ///
    /// Name of the first matching rule, or None
    pub fn resolve(&self, candidate: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|rule| candidate.contains(&rule.pattern))
            .map(|rule| rule.name.as_str())
    }

    /// Attribute a candidate, falling back to the unknown origin.
    ///
    /// # Arguments
    ///
    /// * `candidate` - Receiver text
    ///
    /// # Returns
    ///
    /// Matched rule name or [`UNKNOWN_ORIGIN`]
    pub fn resolve_or_unknown(&self, candidate: &str) -> String {
        self.resolve(candidate)
            .unwrap_or(UNKNOWN_ORIGIN)
            .to_string()
    }

    /// Configuration notes recorded during compilation.
    pub fn notes(&self) -> &[PatternNote] {
        &self.notes
    }

    /// Number of rules in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no rules.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolve() {
        let matcher = PatternMatcher::with_defaults().unwrap();

        assert_eq!(
            matcher.resolve("std.heap.GeneralPurposeAllocator(.{}){}"),
            Some("GeneralPurposeAllocator")
        );
        assert_eq!(
            matcher.resolve("std.heap.page_allocator"),
            Some("PageAllocator")
        );
        assert_eq!(matcher.resolve("std.heap.c_allocator"), Some("CAllocator"));
        assert_eq!(
            matcher.resolve("std.testing.allocator"),
            Some("std.testing.allocator")
        );
        assert_eq!(matcher.resolve("my_arena_state"), Some("ArenaAllocator"));
    }

    #[test]
    fn test_no_match_returns_none() {
        let matcher = PatternMatcher::with_defaults().unwrap();
        assert_eq!(matcher.resolve("allocator"), None);
        assert_eq!(matcher.resolve_or_unknown("allocator"), UNKNOWN_ORIGIN);
    }

    #[test]
    fn test_user_patterns_match_before_defaults() {
        let user = vec![AllocatorPattern::new("CustomArena", "arena")];
        let matcher = PatternMatcher::compile(&user, &[], true).unwrap();

        assert_eq!(matcher.resolve("my_arena"), Some("CustomArena"));
    }

    #[test]
    fn test_user_declaration_order_decides() {
        let user = vec![
            AllocatorPattern::new("First", "alloc_state"),
            AllocatorPattern::new("Second", "state"),
        ];
        let matcher = PatternMatcher::compile(&user, &[], true).unwrap();

        assert_eq!(matcher.resolve("global_alloc_state"), Some("First"));
    }

    #[test]
    fn test_user_override_replaces_default() {
        let user = vec![AllocatorPattern::new("ArenaAllocator", "MyArenaPool")];
        let matcher = PatternMatcher::compile(&user, &[], true).unwrap();

        // The default "arena" substring no longer participates.
        assert_eq!(matcher.resolve("my_arena"), None);
        assert_eq!(matcher.resolve("MyArenaPool.get()"), Some("ArenaAllocator"));
        assert!(
            matcher
                .notes()
                .iter()
                .any(|n| n.severity == Severity::Info && n.message.contains("overrides"))
        );
    }

    #[test]
    fn test_disabled_default_dropped() {
        let disabled = vec!["ArenaAllocator".to_string()];
        let matcher = PatternMatcher::compile(&[], &disabled, true).unwrap();

        assert_eq!(matcher.resolve("my_arena"), None);
        assert_eq!(
            matcher.resolve("std.heap.page_allocator"),
            Some("PageAllocator")
        );
    }

    #[test]
    fn test_use_defaults_false_drops_all() {
        let matcher = PatternMatcher::compile(&[], &[], false).unwrap();
        assert!(matcher.is_empty());
        assert_eq!(matcher.resolve("std.heap.page_allocator"), None);
    }

    #[test]
    fn test_empty_name_rejected() {
        let user = vec![AllocatorPattern::new("", "something")];
        assert!(PatternMatcher::compile(&user, &[], true).is_err());
    }

    #[test]
    fn test_empty_pattern_rejected() {
        let user = vec![AllocatorPattern::new("Named", "")];
        assert!(PatternMatcher::compile(&user, &[], true).is_err());
    }

    #[test]
    fn test_duplicate_user_names_rejected() {
        let user = vec![
            AllocatorPattern::new("Mine", "aaa"),
            AllocatorPattern::new("Mine", "bbb"),
        ];
        assert!(PatternMatcher::compile(&user, &[], true).is_err());
    }

    #[test]
    fn test_single_char_pattern_accepted_with_note() {
        let user = vec![AllocatorPattern::new("Tiny", "a")];
        let matcher = PatternMatcher::compile(&user, &[], true).unwrap();

        assert_eq!(matcher.resolve("banana"), Some("Tiny"));
        assert!(
            matcher
                .notes()
                .iter()
                .any(|n| n.severity == Severity::Warning && n.message.contains("Tiny"))
        );
    }

    #[test]
    fn test_no_two_defaults_share_a_name() {
        let defaults = default_patterns();
        for (i, rule) in defaults.iter().enumerate() {
            assert!(
                !defaults[..i].iter().any(|other| other.name == rule.name),
                "duplicate default name: {}",
                rule.name
            );
        }
    }
}

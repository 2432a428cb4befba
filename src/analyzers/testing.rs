// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Testing compliance analyzer.
//!
//! Validates `test "..."` declarations against the configured category
//! set and naming scheme: every test name starts with a recognized
//! category token followed by `:`, carries a descriptive remainder, and
//! memory-category tests exercise cleanup patterns. Optionally flags
//! source files that declare public functions but contain no tests.

use std::path::Path;

use masterror::AppResult;
use tracing::debug;

use crate::{
    analyzer::{Analyzer, Issue, IssueType, Severity},
    config::Config,
    scope::{ScopeTree, ScopeType},
    scope_tracker::ScopeTracker,
    source_context::SourceContext
};

/// Category tokens that demand memory-safety patterns in the body.
const MEMORY_CATEGORIES: [&str; 2] = ["memory", "memory safety"];

/// Analyzer for test naming and categorization defects.
///
/// # Examples
///
/// ```
/// use zigcheck::{
///     analyzer::{Analyzer, IssueType},
///     analyzers::testing::TestingAnalyzer,
///     config::Config
/// };
///
/// let source = "test \"no category here\" {\n}\n";
/// let issues = TestingAnalyzer::new()
///     .analyze(source, "main.zig", &Config::default())
///     .unwrap();
/// assert_eq!(issues[0].issue_type, IssueType::MissingTestCategory);
/// ```
pub struct TestingAnalyzer;

impl TestingAnalyzer {
    /// Create new testing analyzer instance.
    #[inline]
    pub fn new() -> Self {
        Self
    }

    /// Split a test name into its category token and remainder.
    fn split_category(name: &str) -> Option<(&str, &str)> {
        let colon = name.find(':')?;
        Some((name[..colon].trim(), name[colon + 1..].trim()))
    }

    /// Whether the filename follows the test-file convention.
    fn is_test_file(file_path: &str) -> bool {
        Path::new(file_path)
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.contains("test"))
    }

    /// Whether a test scope's body contains a cleanup pattern: a
    /// defer or errdefer against an allocation declared in the body.
    fn has_memory_safety_patterns(tree: &ScopeTree, test_idx: usize) -> bool {
        tree.subtree(test_idx).into_iter().any(|idx| {
            tree.scopes()[idx]
                .variables
                .iter()
                .any(|v| v.has_defer || v.has_errdefer)
        })
    }

    fn missing_category_issue(
        file_path: &str,
        line: usize,
        name: &str,
        categories: &[String]
    ) -> Issue {
        Issue {
            file_path:  file_path.to_string(),
            line,
            column:     1,
            issue_type: IssueType::MissingTestCategory,
            severity:   Severity::Error,
            message:    format!(
                "Test \"{}\" does not start with a recognized category",
                name
            ),
            suggestion: Some(format!(
                "prefix the name with one of: {}",
                categories.join(", ")
            ))
        }
    }
}

impl Analyzer for TestingAnalyzer {
    fn name(&self) -> &'static str {
        "testing"
    }

    fn analyze(&self, source: &str, file_path: &str, config: &Config) -> AppResult<Vec<Issue>> {
        let ctx = SourceContext::new(source);
        let tracker = ScopeTracker::from_config(config)?;
        let tree = tracker.build(source, &ctx)?;

        let testing = &config.testing;
        let mut issues = Vec::new();
        let mut test_count = 0usize;

        for (idx, scope) in tree.scopes().iter().enumerate() {
            if scope.scope_type != ScopeType::TestFunction {
                continue;
            }
            test_count += 1;
            let name = scope.name.as_str();
            let line = scope.start_line;

            let category = Self::split_category(name)
                .filter(|(token, _)| testing.allowed_categories.iter().any(|c| c == token));

            let Some((token, rest)) = category else {
                if testing.enforce_categories {
                    issues.push(Self::missing_category_issue(
                        file_path,
                        line,
                        name,
                        &testing.allowed_categories
                    ));
                }
                continue;
            };

            if testing.enforce_naming && !rest.contains(':') && rest.len() < 3 {
                issues.push(Issue {
                    file_path:  file_path.to_string(),
                    line,
                    column:     1,
                    issue_type: IssueType::InvalidTestNaming,
                    severity:   Severity::Warning,
                    message:    format!(
                        "Test \"{}\" has no descriptive name after its category",
                        name
                    ),
                    suggestion: Some(
                        "use \"category: subject: description\" naming".to_string()
                    )
                });
            }

            if MEMORY_CATEGORIES.contains(&token)
                && !Self::has_memory_safety_patterns(&tree, idx)
            {
                issues.push(Issue {
                    file_path:  file_path.to_string(),
                    line,
                    column:     1,
                    issue_type: IssueType::MissingMemorySafetyPatterns,
                    severity:   Severity::Warning,
                    message:    format!(
                        "Memory test \"{}\" exercises no cleanup pattern",
                        name
                    ),
                    suggestion: Some(
                        "allocate in the test body and release with defer or errdefer"
                            .to_string()
                    )
                });
            }
        }

        if testing.require_test_files && test_count == 0 && !Self::is_test_file(file_path) {
            let has_public_functions = tree
                .scopes()
                .iter()
                .any(|s| s.scope_type == ScopeType::Function && source_declares_pub(source, s.start_line));
            if has_public_functions {
                issues.push(Issue {
                    file_path:  file_path.to_string(),
                    line:       1,
                    column:     1,
                    issue_type: IssueType::MissingTestFile,
                    severity:   Severity::Warning,
                    message:    "File declares public functions but contains no tests"
                        .to_string(),
                    suggestion: Some(
                        "add tests here or a companion test file".to_string()
                    )
                });
            }
        }

        debug!(file = file_path, issues = issues.len(), "testing analysis done");
        Ok(issues)
    }
}

/// Whether the declaration on `line` is marked `pub`.
fn source_declares_pub(source: &str, line: usize) -> bool {
    source
        .lines()
        .nth(line.saturating_sub(1))
        .is_some_and(|l| l.trim_start().starts_with("pub "))
}

impl Default for TestingAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(source: &str) -> Vec<Issue> {
        TestingAnalyzer::new()
            .analyze(source, "main.zig", &Config::default())
            .unwrap()
    }

    fn analyze_with(source: &str, file_path: &str, config: &Config) -> Vec<Issue> {
        TestingAnalyzer::new().analyze(source, file_path, config).unwrap()
    }

    #[test]
    fn test_analyzer_name() {
        assert_eq!(TestingAnalyzer::new().name(), "testing");
    }

    #[test]
    fn test_missing_category() {
        let issues = analyze("test \"no category here\" {\n}\n");

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::MissingTestCategory);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].line, 1);
    }

    #[test]
    fn test_missing_category_suggestion_lists_all_verbatim() {
        let mut config = Config::default();
        config.testing.allowed_categories = vec![
            "unit".to_string(),
            "a quite long category name that must not be truncated".to_string(),
        ];

        let issues = analyze_with("test \"nope\" {\n}\n", "main.zig", &config);
        let suggestion = issues[0].suggestion.as_deref().unwrap();
        assert!(suggestion.contains("unit"));
        assert!(
            suggestion.contains("a quite long category name that must not be truncated")
        );
    }

    #[test]
    fn test_valid_category_and_name() {
        let issues = analyze("test \"unit: parser: handles empty input\" {\n}\n");
        assert!(issues.is_empty());
    }

    #[test]
    fn test_unknown_category_token() {
        let issues = analyze("test \"bogus: something\" {\n}\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::MissingTestCategory);
    }

    #[test]
    fn test_invalid_naming_short_remainder() {
        let issues = analyze("test \"unit: x\" {\n}\n");

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::InvalidTestNaming);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_descriptive_phrase_without_second_colon_is_fine() {
        let issues = analyze("test \"unit: handles empty input\" {\n}\n");
        assert!(issues.is_empty());
    }

    #[test]
    fn test_enforcement_flags_off() {
        let mut config = Config::default();
        config.testing.enforce_categories = false;
        config.testing.enforce_naming = false;

        let issues = analyze_with("test \"whatever\" {\n}\n", "main.zig", &config);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_memory_category_without_cleanup() {
        let issues = analyze("test \"memory: allocator: no cleanup at all\" {\n    const x = 1;\n    _ = x;\n}\n");

        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].issue_type,
            IssueType::MissingMemorySafetyPatterns
        );
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_memory_category_with_cleanup() {
        let source = "test \"memory: allocator: frees what it allocates\" {\n    const allocator = std.testing.allocator;\n    const buf = try allocator.alloc(u8, 16);\n    defer allocator.free(buf);\n}\n";
        assert!(analyze(source).is_empty());
    }

    #[test]
    fn test_non_memory_category_needs_no_cleanup() {
        let issues = analyze("test \"unit: math: adds numbers\" {\n    const x = 1 + 2;\n    _ = x;\n}\n");
        assert!(issues.is_empty());
    }

    #[test]
    fn test_multiple_tests_in_source_order() {
        let source = "test \"first one\" {\n}\ntest \"unit: y\" {\n}\n";
        let issues = analyze(source);

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].line, 1);
        assert_eq!(issues[0].issue_type, IssueType::MissingTestCategory);
        assert_eq!(issues[1].line, 3);
        assert_eq!(issues[1].issue_type, IssueType::InvalidTestNaming);
    }

    #[test]
    fn test_missing_test_file_opt_in() {
        let mut config = Config::default();
        config.testing.require_test_files = true;

        let source = "pub fn api() void {\n}\n";
        let issues = analyze_with(source, "src/api.zig", &config);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::MissingTestFile);
        assert_eq!(issues[0].line, 1);
    }

    #[test]
    fn test_missing_test_file_skips_test_files() {
        let mut config = Config::default();
        config.testing.require_test_files = true;

        let source = "pub fn helper() void {\n}\n";
        let issues = analyze_with(source, "src/api_test.zig", &config);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_missing_test_file_skips_private_only() {
        let mut config = Config::default();
        config.testing.require_test_files = true;

        let source = "fn internal() void {\n}\n";
        let issues = analyze_with(source, "src/api.zig", &config);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_missing_test_file_off_by_default() {
        let source = "pub fn api() void {\n}\n";
        assert!(analyze(source).is_empty());
    }

    #[test]
    fn test_empty_source() {
        assert!(analyze("").is_empty());
    }

    #[test]
    fn test_custom_memory_safety_category() {
        let mut config = Config::default();
        config
            .testing
            .allowed_categories
            .push("memory safety".to_string());

        let source = "test \"memory safety: arena: bulk free path\" {\n    const x = 1;\n    _ = x;\n}\n";
        let issues = analyze_with(source, "main.zig", &config);

        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].issue_type,
            IssueType::MissingMemorySafetyPatterns
        );
    }
}

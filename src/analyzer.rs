// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Core analyzer trait and diagnostic types.
//!
//! This module defines the fundamental abstractions shared by all
//! analyzers:
//! - `Analyzer` trait that all analyzers must implement
//! - `Issue` struct representing a single finding
//! - `IssueType` and `Severity` closed enums
//! - `AnalysisResult` struct containing analysis outcomes

use std::{fmt, str::FromStr};

use masterror::AppResult;
use serde::Serialize;

use crate::{config::Config, error::InvalidSeverityError};

/// Severity of a reported issue.
///
/// Ordered from most to least severe so results can be filtered with a
/// simple comparison.
///
/// # Examples
///
/// ```
/// use zigcheck::analyzer::Severity;
///
/// assert!(Severity::Error < Severity::Warning);
/// assert_eq!(Severity::Warning.to_string(), "warning");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be fixed before the code is acceptable
    Error,
    /// Should be fixed but does not block
    Warning,
    /// Informational note
    Info
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info"
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Severity {
    type Err = InvalidSeverityError;

    /// Parse the wire-format severity names back into the enum.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            _ => Err(InvalidSeverityError::new(value.to_string()))
        }
    }
}

/// Kind of defect an issue reports.
///
/// Closed set; extended only by adding new tags. Serialized in
/// snake_case for the JSON report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    /// Allocation without a `defer` cleanup in its scope
    MissingDefer,
    /// Transferred allocation without `errdefer` protection
    MissingErrdefer,
    /// Allocation provably unreachable by any cleanup path
    MemoryLeak,
    /// Allocator not permitted by the project policy
    IncorrectAllocator,
    /// Arena handle without a `deinit` teardown
    ArenaNotDeinitialized,
    /// Same allocation freed on two paths
    DoubleFree,
    /// Allocation referenced after its cleanup ran
    UseAfterFree,
    /// Ownership leaves the function; informational acknowledgement
    OwnershipTransfer,
    /// Test name lacks a recognized category prefix
    MissingTestCategory,
    /// Test name violates the naming scheme
    InvalidTestNaming,
    /// Source file with public functions but no test coverage
    MissingTestFile,
    /// Test name conflicts with source file conventions
    ImproperTestNaming,
    /// Memory-category test without cleanup patterns
    MissingMemorySafetyPatterns,
    /// Allocator pattern configuration accepted with caveats
    PatternWarning
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MissingDefer => "missing_defer",
            Self::MissingErrdefer => "missing_errdefer",
            Self::MemoryLeak => "memory_leak",
            Self::IncorrectAllocator => "incorrect_allocator",
            Self::ArenaNotDeinitialized => "arena_not_deinitialized",
            Self::DoubleFree => "double_free",
            Self::UseAfterFree => "use_after_free",
            Self::OwnershipTransfer => "ownership_transfer",
            Self::MissingTestCategory => "missing_test_category",
            Self::InvalidTestNaming => "invalid_test_naming",
            Self::MissingTestFile => "missing_test_file",
            Self::ImproperTestNaming => "improper_test_naming",
            Self::MissingMemorySafetyPatterns => "missing_memory_safety_patterns",
            Self::PatternWarning => "pattern_warning"
        };
        write!(f, "{}", name)
    }
}

/// Analysis issue found in Zig source code.
///
/// Represents a single defect detected by an analyzer, including its
/// location, classification, description, and optional fix suggestion.
/// Lines and columns are 1-based throughout the crate. All string
/// fields are owned by the issue itself; results stay valid after every
/// analyzer-internal buffer has been dropped.
///
/// # Examples
///
/// ```
/// use zigcheck::analyzer::{Issue, IssueType, Severity};
///
/// let issue = Issue {
///     file_path:  "src/main.zig".to_string(),
///     line:       42,
///     column:     11,
///     issue_type: IssueType::MissingDefer,
///     severity:   Severity::Error,
///     message:    "allocation is never freed".to_string(),
///     suggestion: Some("add `defer allocator.free(buf);`".to_string())
/// };
/// assert_eq!(issue.line, 42);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    /// Path of the file the issue was found in
    pub file_path:  String,
    /// Line number, 1-based
    pub line:       usize,
    /// Column number, 1-based
    pub column:     usize,
    /// Defect classification
    pub issue_type: IssueType,
    /// How serious the finding is
    pub severity:   Severity,
    /// Human-readable description
    pub message:    String,
    /// Optional one-line fix suggestion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>
}

/// Result of analyzing one or more sources.
///
/// Contains every issue found plus bookkeeping counters. The
/// `issues_found == issues.len()` invariant holds after aggregation.
/// Dropping the result releases every owned string exactly once.
///
/// # Examples
///
/// ```
/// use zigcheck::analyzer::AnalysisResult;
///
/// let result = AnalysisResult::default();
/// assert_eq!(result.issues.len(), 0);
/// assert_eq!(result.issues_found, 0);
/// ```
#[derive(Debug, Default, Clone)]
pub struct AnalysisResult {
    /// Issues found, in source order
    pub issues:           Vec<Issue>,
    /// Number of files analyzed
    pub files_analyzed:   usize,
    /// Total issues found; equals `issues.len()`
    pub issues_found:     usize,
    /// Wall-clock analysis duration in milliseconds
    pub analysis_time_ms: u64
}

impl AnalysisResult {
    /// Count issues at exactly the given severity.
    ///
    /// # Arguments
    ///
    /// * `severity` - Severity level to count
    ///
    /// # Returns
    ///
    /// Number of issues with that severity
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Whether any issue is an error.
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Whether any issue is a warning.
    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }
}

/// Trait for source analyzers.
///
/// Implement this trait to create custom analyzers over Zig source
/// text. Each analyzer must provide a unique name and analysis logic.
/// Analyzers receive raw source plus the effective configuration and
/// return the issues they found; aggregation and ordering is handled by
/// the caller.
pub trait Analyzer {
    /// Returns unique analyzer identifier.
    ///
    /// Used for reporting and mode filtering. Must be lowercase
    /// snake_case.
    fn name(&self) -> &'static str;

    /// Analyze Zig source text for issues.
    ///
    /// # Arguments
    ///
    /// * `source` - Raw source text to analyze
    /// * `file_path` - Path reported in emitted issues
    /// * `config` - Effective configuration
    ///
    /// # Returns
    ///
    /// `AppResult<Vec<Issue>>` - Issues found or error
    fn analyze(&self, source: &str, file_path: &str, config: &Config) -> AppResult<Vec<Issue>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_creation() {
        let issue = Issue {
            file_path:  "main.zig".to_string(),
            line:       42,
            column:     10,
            issue_type: IssueType::MissingDefer,
            severity:   Severity::Error,
            message:    "Test issue".to_string(),
            suggestion: Some("Fix suggestion".to_string())
        };

        assert_eq!(issue.line, 42);
        assert_eq!(issue.column, 10);
        assert!(issue.suggestion.is_some());
    }

    #[test]
    fn test_analysis_result_default() {
        let result = AnalysisResult::default();
        assert_eq!(result.issues.len(), 0);
        assert_eq!(result.issues_found, 0);
        assert_eq!(result.files_analyzed, 0);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error < Severity::Warning);
        assert!(Severity::Warning < Severity::Info);
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(Severity::Error.to_string(), "error");
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Info.to_string(), "info");
    }

    #[test]
    fn test_severity_from_str_round_trip() {
        for severity in [Severity::Error, Severity::Warning, Severity::Info] {
            assert_eq!(severity.to_string().parse::<Severity>().unwrap(), severity);
        }
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn test_issue_type_display_snake_case() {
        assert_eq!(IssueType::MissingDefer.to_string(), "missing_defer");
        assert_eq!(IssueType::MissingErrdefer.to_string(), "missing_errdefer");
        assert_eq!(
            IssueType::ArenaNotDeinitialized.to_string(),
            "arena_not_deinitialized"
        );
        assert_eq!(
            IssueType::MissingMemorySafetyPatterns.to_string(),
            "missing_memory_safety_patterns"
        );
    }

    #[test]
    fn test_issue_type_serializes_like_display() {
        let json = serde_json::to_string(&IssueType::IncorrectAllocator).unwrap();
        assert_eq!(json, "\"incorrect_allocator\"");

        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }

    #[test]
    fn test_count_severity() {
        let mut result = AnalysisResult::default();
        result.issues.push(Issue {
            file_path:  "a.zig".to_string(),
            line:       1,
            column:     1,
            issue_type: IssueType::MissingDefer,
            severity:   Severity::Error,
            message:    "m".to_string(),
            suggestion: None
        });
        result.issues.push(Issue {
            file_path:  "a.zig".to_string(),
            line:       2,
            column:     1,
            issue_type: IssueType::MissingErrdefer,
            severity:   Severity::Warning,
            message:    "m".to_string(),
            suggestion: None
        });
        result.issues_found = result.issues.len();

        assert_eq!(result.count_severity(Severity::Error), 1);
        assert_eq!(result.count_severity(Severity::Warning), 1);
        assert_eq!(result.count_severity(Severity::Info), 0);
        assert!(result.has_errors());
        assert!(result.has_warnings());
    }

    #[test]
    fn test_issue_suggestion_skipped_when_absent() {
        let issue = Issue {
            file_path:  "a.zig".to_string(),
            line:       1,
            column:     1,
            issue_type: IssueType::MissingDefer,
            severity:   Severity::Error,
            message:    "m".to_string(),
            suggestion: None
        };

        let json = serde_json::to_string(&issue).unwrap();
        assert!(!json.contains("suggestion"));
    }
}

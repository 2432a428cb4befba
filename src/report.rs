// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Report rendering for analysis results.
//!
//! Three output formats over the same issue stream: a human-readable
//! text report grouped by file, a JSON document with a metadata header,
//! and GitHub Actions workflow commands with the annotation grammar's
//! percent-encoding.

use std::fmt::Write as _;

use owo_colors::OwoColorize;
use serde::Serialize;

use crate::{
    analyzer::{AnalysisResult, Issue, Severity},
    project::ProjectAnalysisResult
};

/// Output format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text grouped by file
    Text,
    /// JSON document with metadata and issues
    Json,
    /// GitHub Actions workflow commands
    GithubActions
}

impl OutputFormat {
    /// Parse a format name.
    ///
    /// # Arguments
    ///
    /// * `value` - `text`, `json` or `github-actions`
    ///
    /// # Returns
    ///
    /// The parsed format, or None for unknown names
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            "github-actions" => Some(Self::GithubActions),
            _ => None
        }
    }
}

/// Counters attached to a rendered report.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReportMeta {
    /// Files successfully analyzed
    pub files_analyzed:   usize,
    /// Total issues found
    pub issues_found:     usize,
    /// Wall-clock analysis duration in milliseconds
    pub analysis_time_ms: u64
}

impl ReportMeta {
    /// Metadata of a single-source result.
    pub fn of(result: &AnalysisResult) -> Self {
        Self {
            files_analyzed:   result.files_analyzed,
            issues_found:     result.issues_found,
            analysis_time_ms: result.analysis_time_ms
        }
    }

    /// Metadata of a project result.
    pub fn of_project(result: &ProjectAnalysisResult) -> Self {
        Self {
            files_analyzed:   result.files_analyzed,
            issues_found:     result.issues_found,
            analysis_time_ms: result.analysis_time_ms
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    metadata: ReportMeta,
    issues:   &'a [Issue]
}

/// Render issues in the selected format.
///
/// # Arguments
///
/// * `issues` - Issues in report order
/// * `meta` - Result counters
/// * `format` - Output format
/// * `color` - Colorize text output
///
/// # Returns
///
/// The rendered report
pub fn render(issues: &[Issue], meta: &ReportMeta, format: OutputFormat, color: bool) -> String {
    match format {
        OutputFormat::Text => render_text(issues, meta, color),
        OutputFormat::Json => render_json(issues, meta),
        OutputFormat::GithubActions => render_github(issues)
    }
}

/// Render a human-readable report grouped by file.
///
/// # Arguments
///
/// * `issues` - Issues in report order
/// * `meta` - Result counters
/// * `color` - Colorize severities and file names
///
/// # Returns
///
/// Multi-line text report ending with a summary
pub fn render_text(issues: &[Issue], meta: &ReportMeta, color: bool) -> String {
    let mut out = String::new();

    let mut current_file: Option<&str> = None;
    for issue in issues {
        if current_file != Some(issue.file_path.as_str()) {
            if current_file.is_some() {
                out.push('\n');
            }
            if color {
                let _ = writeln!(out, "{}", issue.file_path.bold());
            } else {
                let _ = writeln!(out, "{}", issue.file_path);
            }
            current_file = Some(issue.file_path.as_str());
        }

        let severity = if color {
            match issue.severity {
                Severity::Error => issue.severity.to_string().red().to_string(),
                Severity::Warning => issue.severity.to_string().yellow().to_string(),
                Severity::Info => issue.severity.to_string().cyan().to_string()
            }
        } else {
            issue.severity.to_string()
        };

        let _ = writeln!(
            out,
            "  {}:{} {} [{}] {}",
            issue.line, issue.column, severity, issue.issue_type, issue.message
        );
        if let Some(suggestion) = &issue.suggestion {
            let _ = writeln!(out, "      suggestion: {}", suggestion);
        }
    }

    if !issues.is_empty() {
        out.push('\n');
    }

    let errors = issues.iter().filter(|i| i.severity == Severity::Error).count();
    let warnings = issues
        .iter()
        .filter(|i| i.severity == Severity::Warning)
        .count();
    let _ = writeln!(
        out,
        "{} files analyzed, {} issues found ({} errors, {} warnings) in {} ms",
        meta.files_analyzed, meta.issues_found, errors, warnings, meta.analysis_time_ms
    );

    out
}

/// Render the JSON document.
///
/// Field names and structure are part of the wire contract:
/// `metadata {files_analyzed, issues_found, analysis_time_ms}` plus
/// `issues[]` with `file_path, line, column, issue_type, severity,
/// message, suggestion?`. serde_json escapes control characters as
/// `\u00XX`.
///
/// # Arguments
///
/// * `issues` - Issues in report order
/// * `meta` - Result counters
///
/// # Returns
///
/// Pretty-printed JSON document
pub fn render_json(issues: &[Issue], meta: &ReportMeta) -> String {
    let report = JsonReport {
        metadata: *meta,
        issues
    };
    // A serialization failure here would be a programming error in the
    // issue types themselves.
    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
}

/// Render GitHub Actions workflow commands.
///
/// One `::LEVEL file=F,line=L,col=C::MESSAGE` line per issue. The
/// annotation grammar requires percent-encoding of `%`, `\r`, `\n`
/// in messages, plus `:` and `,` in property values.
///
/// # Arguments
///
/// * `issues` - Issues in report order
///
/// # Returns
///
/// Newline-separated workflow commands
pub fn render_github(issues: &[Issue]) -> String {
    let mut out = String::new();

    for issue in issues {
        let level = match issue.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "notice"
        };

        let mut message = issue.message.clone();
        if let Some(suggestion) = &issue.suggestion {
            message.push('\n');
            message.push_str(suggestion);
        }

        let _ = writeln!(
            out,
            "::{} file={},line={},col={},title={}::{}",
            level,
            escape_property(&issue.file_path),
            issue.line,
            issue.column,
            escape_property(&issue.issue_type.to_string()),
            escape_message(&message)
        );
    }

    out
}

/// Percent-encode a workflow-command message value.
fn escape_message(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Percent-encode a workflow-command property value.
fn escape_property(value: &str) -> String {
    escape_message(value).replace(':', "%3A").replace(',', "%2C")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::IssueType;

    fn issue(line: usize, severity: Severity, suggestion: Option<&str>) -> Issue {
        Issue {
            file_path: "src/main.zig".to_string(),
            line,
            column: 5,
            issue_type: IssueType::MissingDefer,
            severity,
            message: "allocation is never freed".to_string(),
            suggestion: suggestion.map(str::to_string)
        }
    }

    fn meta(issues: &[Issue]) -> ReportMeta {
        ReportMeta {
            files_analyzed:   1,
            issues_found:     issues.len(),
            analysis_time_ms: 7
        }
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!(OutputFormat::parse("text"), Some(OutputFormat::Text));
        assert_eq!(OutputFormat::parse("json"), Some(OutputFormat::Json));
        assert_eq!(
            OutputFormat::parse("github-actions"),
            Some(OutputFormat::GithubActions)
        );
        assert_eq!(OutputFormat::parse("yaml"), None);
    }

    #[test]
    fn test_text_report_contents() {
        let issues = vec![issue(3, Severity::Error, Some("add `defer`"))];
        let out = render_text(&issues, &meta(&issues), false);

        assert!(out.contains("src/main.zig"));
        assert!(out.contains("3:5 error [missing_defer] allocation is never freed"));
        assert!(out.contains("suggestion: add `defer`"));
        assert!(out.contains("1 files analyzed, 1 issues found (1 errors, 0 warnings)"));
    }

    #[test]
    fn test_text_report_groups_by_file() {
        let mut a = issue(1, Severity::Error, None);
        a.file_path = "a.zig".to_string();
        let mut b = issue(2, Severity::Warning, None);
        b.file_path = "b.zig".to_string();

        let issues = vec![a, b];
        let out = render_text(&issues, &meta(&issues), false);

        let a_at = out.find("a.zig").unwrap();
        let b_at = out.find("b.zig").unwrap();
        assert!(a_at < b_at);
    }

    #[test]
    fn test_text_report_empty() {
        let out = render_text(
            &[],
            &ReportMeta {
                files_analyzed:   3,
                issues_found:     0,
                analysis_time_ms: 1
            },
            false
        );
        assert!(out.contains("3 files analyzed, 0 issues found"));
    }

    #[test]
    fn test_json_report_wire_format() {
        let issues = vec![issue(3, Severity::Error, Some("fix it"))];
        let out = render_json(&issues, &meta(&issues));
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert_eq!(parsed["metadata"]["files_analyzed"], 1);
        assert_eq!(parsed["metadata"]["issues_found"], 1);
        assert_eq!(parsed["issues"][0]["file_path"], "src/main.zig");
        assert_eq!(parsed["issues"][0]["line"], 3);
        assert_eq!(parsed["issues"][0]["column"], 5);
        assert_eq!(parsed["issues"][0]["issue_type"], "missing_defer");
        assert_eq!(parsed["issues"][0]["severity"], "error");
        assert_eq!(parsed["issues"][0]["suggestion"], "fix it");
    }

    #[test]
    fn test_json_report_omits_missing_suggestion() {
        let issues = vec![issue(3, Severity::Error, None)];
        let out = render_json(&issues, &meta(&issues));
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();

        assert!(parsed["issues"][0].get("suggestion").is_none());
    }

    #[test]
    fn test_json_escapes_control_characters() {
        let mut bad = issue(1, Severity::Error, None);
        bad.message = "line\u{1}break".to_string();

        let out = render_json(std::slice::from_ref(&bad), &meta(std::slice::from_ref(&bad)));
        assert!(out.contains("\\u0001"));
    }

    #[test]
    fn test_github_annotation_format() {
        let issues = vec![issue(3, Severity::Error, None)];
        let out = render_github(&issues);

        assert!(out.starts_with("::error "));
        assert!(out.contains("file=src/main.zig"));
        assert!(out.contains("line=3"));
        assert!(out.contains("col=5"));
        assert!(out.contains("title=missing_defer"));
        assert!(out.trim_end().ends_with("::allocation is never freed"));
    }

    #[test]
    fn test_github_levels() {
        let issues = vec![
            issue(1, Severity::Error, None),
            issue(2, Severity::Warning, None),
            issue(3, Severity::Info, None),
        ];
        let out = render_github(&issues);

        assert!(out.contains("::error "));
        assert!(out.contains("::warning "));
        assert!(out.contains("::notice "));
    }

    #[test]
    fn test_github_percent_encoding() {
        let mut tricky = issue(1, Severity::Error, None);
        tricky.file_path = "dir,with:odd.zig".to_string();
        tricky.message = "50% done\nsecond line".to_string();

        let out = render_github(std::slice::from_ref(&tricky));

        assert!(out.contains("file=dir%2Cwith%3Aodd.zig"));
        assert!(out.contains("50%25 done%0Asecond line"));
        assert!(!out.contains("50% "));
    }

    #[test]
    fn test_github_suggestion_appended() {
        let issues = vec![issue(1, Severity::Error, Some("do this"))];
        let out = render_github(&issues);
        assert!(out.contains("%0Ado this"));
    }

    #[test]
    fn test_render_dispatch() {
        let issues = vec![issue(1, Severity::Error, None)];
        let m = meta(&issues);

        assert!(render(&issues, &m, OutputFormat::Text, false).contains("missing_defer"));
        assert!(render(&issues, &m, OutputFormat::Json, false).contains("\"issues\""));
        assert!(render(&issues, &m, OutputFormat::GithubActions, false).starts_with("::error"));
    }
}

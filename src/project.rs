// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Project-level analysis driver.
//!
//! Walks a project root, filters the discovered Zig files through the
//! configured include/exclude globs, analyzes each survivor and
//! aggregates the results. Per-file IO failures are captured in
//! `failed_files` and the scan continues; files discovered but excluded
//! by policy are recorded in `skipped_files`.
//!
//! Files are visited in a deterministic sorted order; issues appear in
//! file-visit order, then in source order within each file. The
//! optional progress callback is invoked sequentially per file, never
//! concurrently.

use std::{path::Path, time::Instant};

use masterror::AppResult;
use tracing::{debug, warn};

use crate::{
    analyzer::{AnalysisResult, Issue, Severity},
    checker::{self, AnalysisMode},
    config::Config,
    file_utils::{collect_zig_files, is_included}
};

/// Progress callback: `(files_processed, total_files, current_file)`.
pub type ProgressFn<'a> = &'a mut dyn FnMut(usize, usize, &Path);

/// Aggregate result of a project scan.
///
/// # Examples
///
/// ```
/// use zigcheck::project::ProjectAnalysisResult;
///
/// let result = ProjectAnalysisResult::default();
/// assert_eq!(result.files_analyzed, 0);
/// assert!(result.failed_files.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct ProjectAnalysisResult {
    /// Issues across all files, in visit order
    pub issues:           Vec<Issue>,
    /// Files successfully analyzed
    pub files_analyzed:   usize,
    /// Total issues found; equals `issues.len()`
    pub issues_found:     usize,
    /// Wall-clock scan duration in milliseconds
    pub analysis_time_ms: u64,
    /// Files that could not be read or analyzed
    pub failed_files:     Vec<String>,
    /// Files excluded by the include/exclude policy
    pub skipped_files:    Vec<String>
}

impl ProjectAnalysisResult {
    /// Whether any issue is an error.
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Whether any issue is a warning.
    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }
}

/// Analyze every matching Zig file under a project root.
///
/// # Arguments
///
/// * `root` - Project root (or a single file)
/// * `config` - Effective configuration
/// * `mode` - Which analyzers to run
/// * `progress` - Optional sequential progress callback
///
/// # Returns
///
/// `AppResult<ProjectAnalysisResult>` - Aggregated results, or a
/// configuration error raised before any file was touched
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
///
/// use zigcheck::{
///     checker::AnalysisMode, config::Config, project::check_project
/// };
///
/// let result = check_project(
///     Path::new("."),
///     &Config::default(),
///     AnalysisMode::All,
///     None
/// )
/// .unwrap();
/// println!("{} issues", result.issues_found);
/// ```
pub fn check_project(
    root: &Path,
    config: &Config,
    mode: AnalysisMode,
    mut progress: Option<ProgressFn<'_>>
) -> AppResult<ProjectAnalysisResult> {
    config.validate()?;

    let started = Instant::now();
    let discovered = collect_zig_files(&root.display().to_string())?;

    let mut result = ProjectAnalysisResult::default();
    let mut selected = Vec::new();
    for path in discovered {
        // A file root strips to an empty path; match its name instead.
        let relative = match path.strip_prefix(root) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel,
            _ => Path::new(path.file_name().unwrap_or(path.as_os_str()))
        };
        if is_included(
            relative,
            &config.options.include_patterns,
            &config.options.exclude_patterns
        ) {
            selected.push(path);
        } else {
            debug!(file = %path.display(), "skipped by policy");
            result.skipped_files.push(path.display().to_string());
        }
    }

    let total = selected.len();
    for (index, path) in selected.iter().enumerate() {
        if let Some(callback) = progress.as_deref_mut() {
            callback(index, total, path);
        }

        match checker::analyze_file(path, config, mode) {
            Ok(file_result) => {
                result.files_analyzed += 1;
                result.issues.extend(file_result.issues);
            }
            Err(err) => {
                warn!(file = %path.display(), error = %err, "analysis failed");
                result.failed_files.push(path.display().to_string());
            }
        }
    }

    if let Some(cap) = config.options.max_issues {
        result.issues.truncate(cap);
    }
    result.issues_found = result.issues.len();
    result.analysis_time_ms = started.elapsed().as_millis() as u64;

    debug!(
        files = result.files_analyzed,
        issues = result.issues_found,
        failed = result.failed_files.len(),
        skipped = result.skipped_files.len(),
        "project scan complete"
    );
    Ok(result)
}

/// Analyze a single file, project-style.
///
/// # Arguments
///
/// * `path` - File to analyze
/// * `config` - Effective configuration
/// * `mode` - Which analyzers to run
///
/// # Returns
///
/// `AppResult<AnalysisResult>` - Per-file result or error
pub fn check_file(path: &Path, config: &Config, mode: AnalysisMode) -> AppResult<AnalysisResult> {
    checker::analyze_file(path, config, mode)
}

/// Analyze an in-memory source buffer, project-style.
///
/// # Arguments
///
/// * `source` - Raw Zig source text
/// * `config` - Effective configuration
///
/// # Returns
///
/// `AppResult<AnalysisResult>` - Per-buffer result or error
pub fn check_source(source: &str, config: &Config) -> AppResult<AnalysisResult> {
    checker::analyze_source(source, config)
}

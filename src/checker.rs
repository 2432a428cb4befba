// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Analysis facade.
//!
//! Entry points for analyzing a single source buffer or file:
//! [`analyze_memory`], [`analyze_tests`], [`analyze_source`] and
//! [`analyze_file`]. The facade validates configuration before any
//! analysis, runs the requested analyzers, sorts issues into source
//! order and stamps timing.
//!
//! Results own every string they carry. Analyzer internals are dropped
//! when these functions return, so a result stays valid for as long as
//! the caller keeps it; releasing it releases each owned string exactly
//! once.

use std::{io, path::Path, time::Instant};

use masterror::AppResult;
use tracing::info;

use crate::{
    analyzer::{AnalysisResult, Analyzer, Issue},
    analyzers::{MemoryAnalyzer, TestingAnalyzer},
    config::Config,
    error::{FileNotFoundError, IoError, PermissionDeniedError}
};

/// File path reported for in-memory buffers.
pub const SOURCE_PSEUDO_PATH: &str = "<source>";

/// Which analyzers to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Memory analysis only
    Memory,
    /// Testing compliance only
    Tests,
    /// Both analyzers
    All
}

impl AnalysisMode {
    fn includes_memory(self) -> bool {
        matches!(self, Self::Memory | Self::All)
    }

    fn includes_tests(self) -> bool {
        matches!(self, Self::Tests | Self::All)
    }
}

/// Analyze a source buffer for memory-management defects.
///
/// # Arguments
///
/// * `source` - Raw Zig source text
/// * `file_path` - Path reported in emitted issues
/// * `config` - Effective configuration
///
/// # Returns
///
/// `AppResult<AnalysisResult>` - Issues in source order, or error
///
/// # Examples
///
/// ```
/// use zigcheck::{checker::analyze_memory, config::Config};
///
/// let source = "fn f(allocator: std.mem.Allocator) !void {\n    const b = try allocator.alloc(u8, 1);\n    _ = b;\n}\n";
/// let result = analyze_memory(source, "f.zig", &Config::default()).unwrap();
/// assert_eq!(result.issues_found, 1);
/// ```
pub fn analyze_memory(source: &str, file_path: &str, config: &Config) -> AppResult<AnalysisResult> {
    run(source, file_path, config, AnalysisMode::Memory)
}

/// Analyze a source buffer for testing-compliance defects.
///
/// # Arguments
///
/// * `source` - Raw Zig source text
/// * `file_path` - Path reported in emitted issues
/// * `config` - Effective configuration
///
/// # Returns
///
/// `AppResult<AnalysisResult>` - Issues in source order, or error
pub fn analyze_tests(source: &str, file_path: &str, config: &Config) -> AppResult<AnalysisResult> {
    run(source, file_path, config, AnalysisMode::Tests)
}

/// Analyze a source buffer with every analyzer.
///
/// Issues are reported against the pseudo path `<source>`.
///
/// # Arguments
///
/// * `source` - Raw Zig source text
/// * `config` - Effective configuration
///
/// # Returns
///
/// `AppResult<AnalysisResult>` - Issues in source order, or error
pub fn analyze_source(source: &str, config: &Config) -> AppResult<AnalysisResult> {
    run(source, SOURCE_PSEUDO_PATH, config, AnalysisMode::All)
}

/// Read a file and analyze it with the requested analyzers.
///
/// # Arguments
///
/// * `path` - File to read
/// * `config` - Effective configuration
/// * `mode` - Which analyzers to run
///
/// # Returns
///
/// `AppResult<AnalysisResult>` - Issues in source order, or
/// `FileNotFound` / `PermissionDenied` / IO error
pub fn analyze_file(path: &Path, config: &Config, mode: AnalysisMode) -> AppResult<AnalysisResult> {
    let source = read_source(path)?;
    run(&source, &path.display().to_string(), config, mode)
}

/// Read a source file, mapping IO failures to the error taxonomy.
pub(crate) fn read_source(path: &Path) -> AppResult<String> {
    std::fs::read_to_string(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => FileNotFoundError::new(path.display().to_string()).into(),
        io::ErrorKind::PermissionDenied => {
            PermissionDeniedError::new(path.display().to_string()).into()
        }
        _ => IoError::from(err).into()
    })
}

fn run(
    source: &str,
    file_path: &str,
    config: &Config,
    mode: AnalysisMode
) -> AppResult<AnalysisResult> {
    config.validate()?;

    let started = Instant::now();
    let mut issues: Vec<Issue> = Vec::new();

    if mode.includes_memory() {
        issues.extend(MemoryAnalyzer::new().analyze(source, file_path, config)?);
    }
    if mode.includes_tests() {
        issues.extend(TestingAnalyzer::new().analyze(source, file_path, config)?);
    }

    issues.sort_by_key(|issue| (issue.line, issue.column));
    if let Some(cap) = config.options.max_issues {
        issues.truncate(cap);
    }

    let result = AnalysisResult {
        issues_found: issues.len(),
        issues,
        files_analyzed: 1,
        analysis_time_ms: started.elapsed().as_millis() as u64
    };

    info!(
        file = file_path,
        issues = result.issues_found,
        elapsed_ms = result.analysis_time_ms,
        "analysis complete"
    );
    Ok(result)
}

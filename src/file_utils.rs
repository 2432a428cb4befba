// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Source file collection and glob matching.
//!
//! Walks a project tree for Zig sources (gitignore-aware, through the
//! `ignore` crate) and provides the `**`/`*`/literal-segment glob
//! matcher used by the include/exclude policy.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use masterror::AppResult;

/// Collects all Zig source files under the given path.
///
/// Recursively walks directories and finds all `.zig` files. Respects
/// .gitignore, .ignore, and other ignore files. The result is sorted
/// for a deterministic traversal order.
///
/// # Arguments
///
/// * `path` - File or directory path to search
///
/// # Returns
///
/// `AppResult<Vec<PathBuf>>` - Sorted list of Zig file paths
///
/// # Examples
///
/// ```no_run
/// use zigcheck::file_utils::collect_zig_files;
/// let files = collect_zig_files("src/").unwrap();
/// ```
pub fn collect_zig_files(path: &str) -> AppResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let path_buf = PathBuf::from(path);

    if path_buf.is_file() && path_buf.extension().is_some_and(|e| e == "zig") {
        files.push(path_buf);
    } else if path_buf.is_dir() {
        for entry in WalkBuilder::new(path)
            .follow_links(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .build()
            .flatten()
        {
            if entry.file_type().is_some_and(|ft| ft.is_file())
                && let Some(ext) = entry.path().extension()
                && ext == "zig"
            {
                files.push(entry.path().to_path_buf());
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Match a path against a glob pattern.
///
/// Supports `**` (any number of path segments, including none), `*`
/// (any run of characters within one segment) and literal segments.
/// Matching is performed against `/`-separated components.
///
/// # Arguments
///
/// * `pattern` - Glob pattern, e.g. `**/*.zig` or `src/*/gen.zig`
/// * `path` - Path to test
///
/// # Returns
///
/// True if the pattern matches the whole path
///
/// # Examples
///
/// ```
/// use std::path::Path;
///
/// use zigcheck::file_utils::matches_glob;
///
/// assert!(matches_glob("**/*.zig", Path::new("src/deep/main.zig")));
/// assert!(!matches_glob("src/*.zig", Path::new("src/deep/main.zig")));
/// ```
pub fn matches_glob(pattern: &str, path: &Path) -> bool {
    let pattern_segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_segments: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None
        })
        .collect();

    match_segments(&pattern_segments, &path_segments)
}

/// Whether a path survives the include/exclude policy.
///
/// The path must match at least one include pattern and no exclude
/// pattern. An empty include list admits everything.
///
/// # Arguments
///
/// * `path` - Path to test
/// * `include` - Include globs
/// * `exclude` - Exclude globs
pub fn is_included(path: &Path, include: &[String], exclude: &[String]) -> bool {
    let included =
        include.is_empty() || include.iter().any(|pattern| matches_glob(pattern, path));
    if !included {
        return false;
    }
    !exclude.iter().any(|pattern| matches_glob(pattern, path))
}

fn match_segments(pattern: &[&str], path: &[String]) -> bool {
    match pattern.first() {
        None => path.is_empty(),
        Some(&"**") => {
            // `**` absorbs zero or more leading segments.
            (0..=path.len()).any(|skip| match_segments(&pattern[1..], &path[skip..]))
        }
        Some(&segment) => match path.first() {
            Some(part) => match_segment(segment, part) && match_segments(&pattern[1..], &path[1..]),
            None => false
        }
    }
}

/// Match one segment with `*` wildcards.
///
/// The first piece is anchored to the start and the last to the end;
/// middle pieces match greedily left to right.
fn match_segment(pattern: &str, part: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == part;
    }

    let pieces: Vec<&str> = pattern.split('*').collect();
    let first = pieces[0];
    let last = pieces[pieces.len() - 1];

    if !part.starts_with(first) || !part.ends_with(last) {
        return false;
    }
    if part.len() < first.len() + last.len() {
        return false;
    }

    let mut rest = &part[first.len()..part.len() - last.len()];
    for piece in &pieces[1..pieces.len() - 1] {
        if piece.is_empty() {
            continue;
        }
        match rest.find(piece) {
            Some(at) => rest = &rest[at + piece.len()..],
            None => return false
        }
    }
    true
}

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Built-in analyzers.
//!
//! This module contains the analyzers that ship with zigcheck. Each
//! analyzer detects one class of defect over raw Zig source text.
//!
//! # Available Analyzers
//!
//! | Analyzer | Issues Detected |
//! |----------|-----------------|
//! | [`MemoryAnalyzer`] | missing defer/errdefer, incorrect allocator, arena teardown |
//! | [`TestingAnalyzer`] | test categories, test naming, memory-safety patterns |
//!
//! # Usage
//!
//! Get all analyzers:
//!
//! ```rust
//! use zigcheck::analyzers::get_analyzers;
//!
//! let analyzers = get_analyzers();
//! assert_eq!(analyzers.len(), 2);
//! ```
//!
//! Use a specific analyzer:
//!
//! ```rust
//! use zigcheck::{
//!     analyzer::Analyzer, analyzers::MemoryAnalyzer, config::Config
//! };
//!
//! let analyzer = MemoryAnalyzer::new();
//! let source = "fn f() void {\n}\n";
//! let issues = analyzer.analyze(source, "f.zig", &Config::default()).unwrap();
//! assert!(issues.is_empty());
//! ```

pub mod memory;
pub mod testing;

pub use memory::MemoryAnalyzer;
pub use testing::TestingAnalyzer;

use crate::analyzer::Analyzer;

/// Returns all built-in analyzers.
///
/// # Returns
///
/// Vector of boxed analyzer trait objects, in order:
/// 1. [`MemoryAnalyzer`] - memory-management defects
/// 2. [`TestingAnalyzer`] - testing-compliance defects
///
/// # Examples
///
/// ```rust
/// use zigcheck::analyzers::get_analyzers;
///
/// for analyzer in get_analyzers() {
///     println!("Analyzer: {}", analyzer.name());
/// }
/// ```
pub fn get_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(MemoryAnalyzer::new()),
        Box::new(TestingAnalyzer::new()),
    ]
}

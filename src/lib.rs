// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Zig static analysis library.
//!
//! This library analyzes Zig source code for memory-management defects
//! (allocations without deterministic cleanup, disallowed allocators,
//! arenas that are never deinitialized) and testing-compliance defects
//! (test names outside the enforced category and naming scheme).
//!
//! Analysis is a pure function of `(source, configuration)`: a single
//! brace-balanced pass builds a scope tree with allocator-attributed
//! variables, then the analyzers traverse it and emit [`analyzer::Issue`]s
//! in source order. Lines and columns are 1-based. Results own every
//! string they carry and stay valid after analyzer internals are gone.
//!
//! # Examples
//!
//! ```rust
//! use zigcheck::{checker::analyze_memory, config::Config};
//!
//! let source = r#"
//! fn process(allocator: std.mem.Allocator) !void {
//!     const buffer = try allocator.alloc(u8, 100);
//!     _ = buffer;
//! }
//! "#;
//! let result = analyze_memory(source, "process.zig", &Config::default()).unwrap();
//! assert_eq!(result.issues_found, 1);
//! println!("{}", result.issues[0].message);
//! ```

pub mod analyzer;
pub mod analyzers;
pub mod checker;
pub mod cli;
pub mod config;
pub mod error;
pub mod file_utils;
pub mod hooks;
pub mod patterns;
pub mod project;
pub mod report;
pub mod scope;
pub mod scope_tracker;
pub mod source_context;

// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Analyzer configuration.
//!
//! The effective configuration is assembled from built-in defaults, an
//! optional JSON configuration file, and environment variable
//! overrides, in that order. The file uses the top-level keys
//! `global`, `memory_checker`, `testing_compliance` and `logger`.
//!
//! Environment overrides: `ZIGCHECK_LOG_PATH`, `ZIGCHECK_OUTPUT_FORMAT`
//! and `ZIGCHECK_VERBOSITY`.

use std::{env, fs, path::Path};

use masterror::AppResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{FileNotFoundError, InvalidLogLevelError, IoError, ParseError},
    patterns::AllocatorPattern
};

/// Ownership-transfer inference rule.
///
/// A function transfers ownership of its allocations to the caller when
/// its identifier matches `function_pattern`, or its raw return-type
/// text matches `return_type_pattern`. A `$` suffix anchors the
/// function pattern to the end of the identifier; otherwise it is a
/// substring match. Empty patterns never match.
///
/// # Examples
///
/// ```
/// use zigcheck::config::OwnershipPattern;
///
/// let rule = OwnershipPattern::new("create", None, "factory functions");
/// assert!(rule.matches_function("createBuffer"));
/// assert!(!rule.matches_function("recalculate"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipPattern {
    /// Substring of the function identifier, or suffix with `$`
    pub function_pattern:    String,
    /// Substring of the raw return-type text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type_pattern: Option<String>,
    /// Human description shown in acknowledgements
    #[serde(default)]
    pub description:         String
}

impl OwnershipPattern {
    /// Create new ownership rule.
    ///
    /// # Arguments
    ///
    /// * `function_pattern` - Identifier substring or `$`-anchored suffix
    /// * `return_type_pattern` - Optional return-type substring
    /// * `description` - Human description
    pub fn new(
        function_pattern: &str,
        return_type_pattern: Option<&str>,
        description: &str
    ) -> Self {
        Self {
            function_pattern:    function_pattern.to_string(),
            return_type_pattern: return_type_pattern.map(str::to_string),
            description:         description.to_string()
        }
    }

    /// Whether a function identifier matches this rule.
    ///
    /// # Arguments
    ///
    /// * `name` - Function identifier
    pub fn matches_function(&self, name: &str) -> bool {
        if self.function_pattern.is_empty() {
            return false;
        }
        match self.function_pattern.strip_suffix('$') {
            Some(suffix) => !suffix.is_empty() && name.ends_with(suffix),
            None => {
                let pattern = &self.function_pattern;
                match name.find(pattern.as_str()) {
                    // Substring match, but an identifier like
                    // `recreate` must not match `create`: the hit has
                    // to start at a word boundary.
                    Some(0) => true,
                    Some(at) => !name.as_bytes()[at - 1].is_ascii_alphanumeric(),
                    None => false
                }
            }
        }
    }

    /// Whether a raw return-type text matches this rule.
    ///
    /// # Arguments
    ///
    /// * `return_type` - Raw return-type text from the signature
    pub fn matches_return_type(&self, return_type: &str) -> bool {
        match &self.return_type_pattern {
            Some(pattern) if !pattern.is_empty() => return_type.contains(pattern.as_str()),
            _ => false
        }
    }
}

/// Built-in ownership rules.
///
/// Function-name based only; projects with accessor-style `get`
/// functions that do not transfer ownership should replace the list.
pub fn default_ownership_patterns() -> Vec<OwnershipPattern> {
    [
        ("create", "factory function"),
        ("make", "factory function"),
        ("init", "initializer"),
        ("build", "builder"),
        ("get", "accessor returning owned memory"),
        ("acquire", "resource acquisition"),
        ("dupe", "duplicating function"),
        ("copy", "copying function"),
    ]
    .into_iter()
    .map(|(pattern, description)| OwnershipPattern::new(pattern, None, description))
    .collect()
}

/// Memory analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Allocator names permitted by policy; empty allows all
    pub allowed_allocators: Vec<String>,
    /// Emit missing defer/errdefer diagnostics
    pub check_defer:        bool,
    /// Emit arena teardown diagnostics
    pub check_arena_usage:  bool,
    /// Emit informational ownership-transfer acknowledgements
    pub report_transfers:   bool,
    /// Ownership-transfer inference rules
    pub ownership_patterns: Vec<OwnershipPattern>
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            allowed_allocators: Vec::new(),
            check_defer:        true,
            check_arena_usage:  true,
            report_transfers:   false,
            ownership_patterns: default_ownership_patterns()
        }
    }
}

/// Testing compliance configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestingConfig {
    /// Require a category prefix on every test name
    pub enforce_categories: bool,
    /// Require a descriptive name after the category
    pub enforce_naming:     bool,
    /// Recognized category tokens
    pub allowed_categories: Vec<String>,
    /// Flag non-test files with public functions and no tests
    pub require_test_files: bool
}

impl Default for TestingConfig {
    fn default() -> Self {
        Self {
            enforce_categories: true,
            enforce_naming:     true,
            allowed_categories: vec![
                "unit".to_string(),
                "integration".to_string(),
                "e2e".to_string(),
                "performance".to_string(),
                "memory".to_string(),
                "stress".to_string(),
            ],
            require_test_files: false
        }
    }
}

/// Allocator pattern configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Whether the built-in rules participate
    pub use_defaults:      bool,
    /// User rules, matched before defaults in declaration order
    pub patterns:          Vec<AllocatorPattern>,
    /// Built-in rule names to drop
    pub disabled_defaults: Vec<String>
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            use_defaults:      true,
            patterns:          Vec::new(),
            disabled_defaults: Vec::new()
        }
    }
}

/// Engine options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Scope nesting limit; exceeding it aborts the file
    pub max_scope_depth:          usize,
    /// Stop emitting issues past this count; the pass still completes
    pub max_issues:               Option<usize>,
    /// Track arena handles and aliases
    pub track_arena_allocators:   bool,
    /// Track defer/errdefer statements
    pub track_defer_statements:   bool,
    /// Track allocation-bearing variable declarations
    pub track_variable_lifecycles: bool,
    /// Project include globs
    pub include_patterns:         Vec<String>,
    /// Project exclude globs
    pub exclude_patterns:         Vec<String>,
    /// Default output format when the CLI flag is absent
    pub output_format:            Option<String>
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_scope_depth:          64,
            max_issues:               None,
            track_arena_allocators:   true,
            track_defer_statements:   true,
            track_variable_lifecycles: true,
            include_patterns:         vec!["**/*.zig".to_string()],
            exclude_patterns:         vec![
                "**/zig-cache/**".to_string(),
                "**/zig-out/**".to_string(),
                "**/.zig-cache/**".to_string(),
                "**/.*/**".to_string(),
                "**/vendor/**".to_string(),
            ],
            output_format:            None
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug or trace
    pub level:    String,
    /// Optional log file path
    pub log_path: Option<String>
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level:    "info".to_string(),
            log_path: None
        }
    }
}

/// Effective analyzer configuration.
///
/// # Examples
///
/// ```
/// use zigcheck::config::Config;
///
/// let config = Config::default();
/// assert!(config.memory.allowed_allocators.is_empty());
/// assert_eq!(config.options.max_scope_depth, 64);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Memory analysis settings
    pub memory:  MemoryConfig,
    /// Testing compliance settings
    pub testing: TestingConfig,
    /// Allocator attribution rules
    pub patterns: PatternConfig,
    /// Engine options
    pub options: AnalysisOptions,
    /// Logging settings
    pub logging: LoggingConfig
}

/// On-disk configuration document.
///
/// Key names follow the established configuration file layout rather
/// than the in-memory struct names.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    global:             GlobalSection,
    memory_checker:     MemorySection,
    testing_compliance: TestingSection,
    logger:             LoggerSection
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GlobalSection {
    include:         Option<Vec<String>>,
    exclude:         Option<Vec<String>>,
    max_scope_depth: Option<usize>,
    max_issues:      Option<usize>,
    output_format:   Option<String>
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MemorySection {
    allowed_allocators: Option<Vec<String>>,
    check_defer:        Option<bool>,
    check_arena_usage:  Option<bool>,
    report_transfers:   Option<bool>,
    ownership_patterns: Option<Vec<OwnershipPattern>>,
    patterns:           Option<Vec<AllocatorPattern>>,
    disabled_defaults:  Option<Vec<String>>,
    use_defaults:       Option<bool>
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TestingSection {
    enforce_categories: Option<bool>,
    enforce_naming:     Option<bool>,
    allowed_categories: Option<Vec<String>>,
    require_test_files: Option<bool>
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LoggerSection {
    level: Option<String>,
    path:  Option<String>
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// Unset keys keep their defaults. Environment overrides are not
    /// applied here; call [`Config::apply_env`] afterwards.
    ///
    /// # Arguments
    ///
    /// * `path` - Path of the JSON configuration document
    ///
    /// # Returns
    ///
    /// `AppResult<Config>` - Parsed configuration or error
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(FileNotFoundError::new(path.display().to_string()).into());
        }

        let text = fs::read_to_string(path).map_err(IoError::from)?;
        let file: ConfigFile = serde_json::from_str(&text)
            .map_err(|e| ParseError::new(format!("{}: {}", path.display(), e)))?;

        let mut config = Self::default();
        config.merge_file(file);
        debug!(path = %path.display(), "loaded configuration file");
        Ok(config)
    }

    fn merge_file(&mut self, file: ConfigFile) {
        let ConfigFile {
            global,
            memory_checker,
            testing_compliance,
            logger
        } = file;

        if let Some(include) = global.include {
            self.options.include_patterns = include;
        }
        if let Some(exclude) = global.exclude {
            self.options.exclude_patterns = exclude;
        }
        if let Some(depth) = global.max_scope_depth {
            self.options.max_scope_depth = depth;
        }
        if let Some(max) = global.max_issues {
            self.options.max_issues = Some(max);
        }
        if let Some(format) = global.output_format {
            self.options.output_format = Some(format);
        }

        if let Some(allowed) = memory_checker.allowed_allocators {
            self.memory.allowed_allocators = allowed;
        }
        if let Some(check) = memory_checker.check_defer {
            self.memory.check_defer = check;
        }
        if let Some(check) = memory_checker.check_arena_usage {
            self.memory.check_arena_usage = check;
        }
        if let Some(report) = memory_checker.report_transfers {
            self.memory.report_transfers = report;
        }
        if let Some(ownership) = memory_checker.ownership_patterns {
            self.memory.ownership_patterns = ownership;
        }
        if let Some(patterns) = memory_checker.patterns {
            self.patterns.patterns = patterns;
        }
        if let Some(disabled) = memory_checker.disabled_defaults {
            self.patterns.disabled_defaults = disabled;
        }
        if let Some(use_defaults) = memory_checker.use_defaults {
            self.patterns.use_defaults = use_defaults;
        }

        if let Some(enforce) = testing_compliance.enforce_categories {
            self.testing.enforce_categories = enforce;
        }
        if let Some(enforce) = testing_compliance.enforce_naming {
            self.testing.enforce_naming = enforce;
        }
        if let Some(categories) = testing_compliance.allowed_categories {
            self.testing.allowed_categories = categories;
        }
        if let Some(require) = testing_compliance.require_test_files {
            self.testing.require_test_files = require;
        }

        if let Some(level) = logger.level {
            self.logging.level = level;
        }
        if let Some(path) = logger.path {
            self.logging.log_path = Some(path);
        }
    }

    /// Apply environment variable overrides.
    ///
    /// `ZIGCHECK_LOG_PATH` overrides the log file path,
    /// `ZIGCHECK_OUTPUT_FORMAT` the default output format, and
    /// `ZIGCHECK_VERBOSITY` the log level.
    pub fn apply_env(&mut self) {
        if let Ok(path) = env::var("ZIGCHECK_LOG_PATH") {
            self.logging.log_path = Some(path);
        }
        if let Ok(format) = env::var("ZIGCHECK_OUTPUT_FORMAT") {
            self.options.output_format = Some(format);
        }
        if let Ok(level) = env::var("ZIGCHECK_VERBOSITY") {
            self.logging.level = level;
        }
    }

    /// Validate cross-field constraints.
    ///
    /// Checks the log level. The allocator pattern table is validated
    /// separately when it is compiled, before any analysis begins.
    ///
    /// # Returns
    ///
    /// `AppResult<()>` - Ok, or the first validation error
    pub fn validate(&self) -> AppResult<()> {
        const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(InvalidLogLevelError::new(self.logging.level.clone()).into());
        }

        Ok(())
    }
}
